//! definition::components — nonlinear parameters of a model object.
//!
//! Purpose
//! -------
//! Describe the position, radius and ellipticity of an object as typed
//! components, each carrying the constraint shape that bounds it.
//!
//! Key behaviors
//! -------------
//! - Every component type implements [`Component`], whose associated
//!   `Bounds` type fixes the pairing at compile time:
//!   position ↦ [`CircleConstraint`], radius ↦ [`MinMaxConstraint`],
//!   ellipticity ↦ [`CircleConstraint`].
//! - [`ComponentKind::constraint_kind`] exposes the same pairing as data.
//! - [`ObjectComponent`] is the tagged union used when components of
//!   different kinds are stored or iterated together.
//! - Components may be frozen (`active = false`); frozen components keep
//!   their value and contribute no free parameters.
//!
//! Invariants & assumptions
//! ------------------------
//! - A constructed component's value lies inside its bounds.

use crate::definition::{
    constraints::{Bounds, CircleConstraint, Constraint, ConstraintKind, MinMaxConstraint},
    errors::{DefinitionError, DefinitionResult},
};

/// Tag for the component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Position,
    Radius,
    Ellipticity,
}

impl ComponentKind {
    pub const fn constraint_kind(self) -> ConstraintKind {
        match self {
            ComponentKind::Position | ComponentKind::Ellipticity => ConstraintKind::Circle,
            ComponentKind::Radius => ConstraintKind::MinMax,
        }
    }

    /// Number of scalar parameters a component of this kind carries.
    pub const fn dimension(self) -> usize {
        match self {
            ComponentKind::Position | ComponentKind::Ellipticity => 2,
            ComponentKind::Radius => 1,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComponentKind::Position => "position",
            ComponentKind::Radius => "radius",
            ComponentKind::Ellipticity => "ellipticity",
        };
        f.write_str(name)
    }
}

/// A bounded nonlinear parameter.
pub trait Component {
    type Bounds: Constraint + Into<Bounds> + Copy;
    const KIND: ComponentKind;

    fn value(&self) -> <Self::Bounds as Constraint>::Value;
    fn bounds(&self) -> &Self::Bounds;
    fn is_active(&self) -> bool;

    fn is_within_bounds(&self) -> bool {
        self.bounds().contains(self.value())
    }
}

macro_rules! bounded_component {
    ($(#[$meta:meta])* $name:ident, $bounds:ty, $value:ty, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name {
            value: $value,
            bounds: $bounds,
            active: bool,
        }

        impl $name {
            /// Errors
            /// ------
            /// - `DefinitionError::OutsideBounds` (with object id `0`; the
            ///   owning set re-labels it) when `value` violates `bounds`.
            pub fn new(value: $value, bounds: $bounds, active: bool) -> DefinitionResult<Self> {
                if !bounds.contains(value) {
                    return Err(DefinitionError::OutsideBounds { object: 0, component: $kind });
                }
                Ok($name { value, bounds, active })
            }

            /// Replace the value, clamping it into the bounds.
            pub fn set_value(&mut self, value: $value) {
                self.value = self.bounds.clamp(value);
            }

            pub fn set_active(&mut self, active: bool) {
                self.active = active;
            }
        }

        impl Component for $name {
            type Bounds = $bounds;
            const KIND: ComponentKind = $kind;

            fn value(&self) -> $value {
                self.value
            }

            fn bounds(&self) -> &$bounds {
                &self.bounds
            }

            fn is_active(&self) -> bool {
                self.active
            }
        }
    };
}

bounded_component!(
    /// Centroid of an object, bounded by a disc.
    PositionComponent,
    CircleConstraint,
    [f64; 2],
    ComponentKind::Position
);

bounded_component!(
    /// Characteristic size of an object, bounded by an interval.
    RadiusComponent,
    MinMaxConstraint,
    f64,
    ComponentKind::Radius
);

bounded_component!(
    /// Shape `(e₁, e₂)` of an object, bounded by a disc (usually the unit
    /// disc).
    EllipticityComponent,
    CircleConstraint,
    [f64; 2],
    ComponentKind::Ellipticity
);

/// ObjectComponent — one component of any kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectComponent {
    Position(PositionComponent),
    Radius(RadiusComponent),
    Ellipticity(EllipticityComponent),
}

impl ObjectComponent {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ObjectComponent::Position(_) => ComponentKind::Position,
            ObjectComponent::Radius(_) => ComponentKind::Radius,
            ObjectComponent::Ellipticity(_) => ComponentKind::Ellipticity,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            ObjectComponent::Position(c) => (*c.bounds()).into(),
            ObjectComponent::Radius(c) => (*c.bounds()).into(),
            ObjectComponent::Ellipticity(c) => (*c.bounds()).into(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            ObjectComponent::Position(c) => c.is_active(),
            ObjectComponent::Radius(c) => c.is_active(),
            ObjectComponent::Ellipticity(c) => c.is_active(),
        }
    }

    /// Scalar values in a fixed order (`x, y`; `r`; `e₁, e₂`).
    pub fn values(&self) -> Vec<f64> {
        match self {
            ObjectComponent::Position(c) => c.value().to_vec(),
            ObjectComponent::Radius(c) => vec![c.value()],
            ObjectComponent::Ellipticity(c) => c.value().to_vec(),
        }
    }

    /// Number of free scalar parameters: the kind's dimension when active,
    /// zero otherwise.
    pub fn free_parameters(&self) -> usize {
        if self.is_active() { self.kind().dimension() } else { 0 }
    }
}

impl From<PositionComponent> for ObjectComponent {
    fn from(c: PositionComponent) -> Self {
        ObjectComponent::Position(c)
    }
}

impl From<RadiusComponent> for ObjectComponent {
    fn from(c: RadiusComponent) -> Self {
        ObjectComponent::Radius(c)
    }
}

impl From<EllipticityComponent> for ObjectComponent {
    fn from(c: EllipticityComponent) -> Self {
        ObjectComponent::Ellipticity(c)
    }
}
