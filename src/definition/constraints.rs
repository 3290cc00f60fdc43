//! definition::constraints — bounds attached to nonlinear model
//! parameters.
//!
//! Purpose
//! -------
//! Provide the two constraint shapes a component can carry: a disc in the
//! plane ([`CircleConstraint`], for positions and ellipticities) and a
//! closed interval on the line ([`MinMaxConstraint`], for radii).
//!
//! Key behaviors
//! -------------
//! - Constructors validate their parameters; a constraint that exists is
//!   well formed.
//! - The [`Constraint`] trait ties each shape to the value type it bounds
//!   and to its [`ConstraintKind`] tag, so a component's bounds type is
//!   fixed at compile time.
//! - [`Bounds`] is the sum type used where components of different kinds
//!   are handled together.

use crate::definition::errors::{DefinitionError, DefinitionResult};

/// Tag for the constraint shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Circle,
    MinMax,
}

/// A region of admissible values.
pub trait Constraint {
    type Value: Copy;
    const KIND: ConstraintKind;

    fn contains(&self, value: Self::Value) -> bool;

    /// The admissible value closest to `value`.
    fn clamp(&self, value: Self::Value) -> Self::Value;
}

/// Closed disc of radius `radius` around `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleConstraint {
    center: [f64; 2],
    radius: f64,
}

impl CircleConstraint {
    /// Errors
    /// ------
    /// - `DefinitionError::InvalidConstraint` when the center is not finite
    ///   or the radius is negative or NaN. An infinite radius is allowed
    ///   and leaves the value unconstrained.
    pub fn new(center: [f64; 2], radius: f64) -> DefinitionResult<Self> {
        for value in center {
            if !value.is_finite() {
                return Err(DefinitionError::InvalidConstraint {
                    name: "center",
                    value,
                    reason: "must be finite",
                });
            }
        }
        if radius.is_nan() || radius < 0.0 {
            return Err(DefinitionError::InvalidConstraint {
                name: "radius",
                value: radius,
                reason: "must be non-negative",
            });
        }
        Ok(CircleConstraint { center, radius })
    }

    /// Disc of the given radius around the origin.
    pub fn centered(radius: f64) -> DefinitionResult<Self> {
        Self::new([0.0, 0.0], radius)
    }

    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn offset(&self, value: [f64; 2]) -> ([f64; 2], f64) {
        let d = [value[0] - self.center[0], value[1] - self.center[1]];
        (d, d[0].hypot(d[1]))
    }
}

impl Constraint for CircleConstraint {
    type Value = [f64; 2];
    const KIND: ConstraintKind = ConstraintKind::Circle;

    fn contains(&self, value: [f64; 2]) -> bool {
        self.offset(value).1 <= self.radius
    }

    fn clamp(&self, value: [f64; 2]) -> [f64; 2] {
        let (d, dist) = self.offset(value);
        if dist <= self.radius {
            return value;
        }
        let scale = self.radius / dist;
        [self.center[0] + d[0] * scale, self.center[1] + d[1] * scale]
    }
}

/// Closed interval `[min, max]`; either end may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxConstraint {
    min: f64,
    max: f64,
}

impl MinMaxConstraint {
    /// Errors
    /// ------
    /// - `DefinitionError::InvalidConstraint` when either end is NaN or
    ///   `min > max`.
    pub fn new(min: f64, max: f64) -> DefinitionResult<Self> {
        if min.is_nan() {
            return Err(DefinitionError::InvalidConstraint {
                name: "min",
                value: min,
                reason: "must not be NaN",
            });
        }
        if max.is_nan() || max < min {
            return Err(DefinitionError::InvalidConstraint {
                name: "max",
                value: max,
                reason: "must be at least min",
            });
        }
        Ok(MinMaxConstraint { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl Constraint for MinMaxConstraint {
    type Value = f64;
    const KIND: ConstraintKind = ConstraintKind::MinMax;

    fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Bounds — either constraint shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Circle(CircleConstraint),
    MinMax(MinMaxConstraint),
}

impl Bounds {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Bounds::Circle(_) => ConstraintKind::Circle,
            Bounds::MinMax(_) => ConstraintKind::MinMax,
        }
    }
}

impl From<CircleConstraint> for Bounds {
    fn from(c: CircleConstraint) -> Self {
        Bounds::Circle(c)
    }
}

impl From<MinMaxConstraint> for Bounds {
    fn from(c: MinMaxConstraint) -> Self {
        Bounds::MinMax(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Constructor validation for both shapes.
    // - Membership and clamping, including boundary points.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Malformed constraint parameters are rejected with the parameter name.
    fn constructors_reject_invalid_parameters() {
        // Arrange / Act
        let neg = CircleConstraint::centered(-1.0).unwrap_err();
        let nan_center = CircleConstraint::new([f64::NAN, 0.0], 1.0).unwrap_err();
        let inverted = MinMaxConstraint::new(2.0, 1.0).unwrap_err();

        // Assert
        assert!(matches!(neg, DefinitionError::InvalidConstraint { name: "radius", .. }));
        assert!(matches!(nan_center, DefinitionError::InvalidConstraint { name: "center", .. }));
        assert!(matches!(inverted, DefinitionError::InvalidConstraint { name: "max", .. }));
        assert!(MinMaxConstraint::new(0.0, f64::INFINITY).is_ok());
        assert!(CircleConstraint::centered(f64::INFINITY).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // A disc contains its boundary and clamps radially onto it.
    //
    // Given
    // -----
    // - Disc of radius 2 around (1, 1).
    //
    // Expect
    // ------
    // - (3, 1) is inside; (1, 5) clamps to (1, 3); inside points are fixed.
    fn circle_contains_and_clamps() {
        // Arrange
        let disc = CircleConstraint::new([1.0, 1.0], 2.0).unwrap();

        // Act
        let clamped = disc.clamp([1.0, 5.0]);

        // Assert
        assert!(disc.contains([3.0, 1.0]));
        assert!(!disc.contains([1.0, 5.0]));
        assert_relative_eq!(clamped[0], 1.0);
        assert_relative_eq!(clamped[1], 3.0);
        assert_eq!(disc.clamp([1.5, 0.5]), [1.5, 0.5]);
        assert_eq!(Bounds::from(disc).kind(), ConstraintKind::Circle);
    }

    #[test]
    // Purpose
    // -------
    // Intervals are closed and clamp to the nearest end.
    fn min_max_contains_and_clamps() {
        // Arrange
        let interval = MinMaxConstraint::new(0.5, 4.0).unwrap();

        // Act / Assert
        assert!(interval.contains(0.5) && interval.contains(4.0));
        assert!(!interval.contains(4.5));
        assert_eq!(interval.clamp(-1.0), 0.5);
        assert_eq!(interval.clamp(7.0), 4.0);
        assert_eq!(<MinMaxConstraint as Constraint>::KIND, ConstraintKind::MinMax);
    }
}
