//! definition::model — the complete model definition.
//!
//! Purpose
//! -------
//! Tie the objects being fit to the frames they are fit against, and
//! evaluate the amplitude-marginalized likelihood summed over frames.
//!
//! Downstream usage
//! ----------------
//! - An optimizer reads [`Definition::parameter_vector`] for its starting
//!   point, builds one design matrix per frame from the nonlinear
//!   parameters, and calls [`Definition::marginal_likelihood`] at each
//!   step. A divergent amplitude integral surfaces as
//!   `DefinitionError::Integral` with a divergent kind, which the
//!   optimizer treats as an infeasible region.

use crate::{
    definition::{
        errors::{DefinitionError, DefinitionResult},
        frames::{Frame, FrameSet},
        objects::ObjectComponentSet,
    },
    integrals::IntegrationOptions,
};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Definition — objects and frames of one fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definition {
    objects: BTreeMap<u64, ObjectComponentSet>,
    frames: FrameSet,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors
    /// ------
    /// - `DefinitionError::DuplicateObject` when the id is taken.
    /// - `DefinitionError::OutsideBounds` when a component violates its
    ///   bounds.
    pub fn add_object(&mut self, object: ObjectComponentSet) -> DefinitionResult<()> {
        let id = object.id();
        if self.objects.contains_key(&id) {
            return Err(DefinitionError::DuplicateObject { id });
        }
        object.check_bounds()?;
        self.objects.insert(id, object);
        Ok(())
    }

    /// Errors
    /// ------
    /// - `DefinitionError::DuplicateFrame` when the id is taken.
    pub fn add_frame(&mut self, frame: Frame) -> DefinitionResult<()> {
        self.frames.insert(frame)
    }

    pub fn object(&self, id: u64) -> Option<&ObjectComponentSet> {
        self.objects.get(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectComponentSet> {
        self.objects.values()
    }

    pub fn frames(&self) -> &FrameSet {
        &self.frames
    }

    /// Total free nonlinear parameters over all objects.
    pub fn free_parameter_count(&self) -> usize {
        self.objects.values().map(|o| o.free_parameters()).sum()
    }

    /// Active component values, objects in ascending id order.
    pub fn parameter_vector(&self) -> Array1<f64> {
        self.objects.values().flat_map(|o| o.active_values()).collect()
    }

    /// Sum over frames of [`Frame::amplitude_likelihood`].
    ///
    /// Parameters
    /// ----------
    /// - `design`: `FnMut(&Frame) -> Array2<f64>`
    ///   Builds a frame's design matrix (one column per amplitude).
    /// - `opts`: `&IntegrationOptions`
    ///
    /// Errors
    /// ------
    /// - The first frame's error, wrapped as `DefinitionError::Integral`.
    pub fn marginal_likelihood<F>(&self, mut design: F, opts: &IntegrationOptions) -> DefinitionResult<f64>
    where
        F: FnMut(&Frame) -> Array2<f64>,
    {
        let mut total = 0.0;
        for frame in self.frames.iter() {
            let m = design(frame);
            total += frame.amplitude_likelihood(m.view(), opts)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        definition::{
            components::{PositionComponent, RadiusComponent},
            constraints::{CircleConstraint, MinMaxConstraint},
        },
        integrals::{ErrorKind, amplitude_marginal_likelihood},
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Object registration, parameter counting and the parameter vector.
    // - The summed likelihood, including a divergent frame.
    // -------------------------------------------------------------------------

    fn point_source(id: u64, x: f64, y: f64) -> ObjectComponentSet {
        let sky = CircleConstraint::new([x, y], 2.0).unwrap();
        ObjectComponentSet::new(id).with(PositionComponent::new([x, y], sky, true).unwrap()).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Objects are kept in id order and duplicate ids are rejected.
    //
    // Expect
    // ------
    // - Parameter vector lists object 1 before object 4; 5 free parameters.
    fn objects_register_in_id_order() {
        // Arrange
        let mut def = Definition::new();
        let size = MinMaxConstraint::new(0.0, 3.0).unwrap();
        let galaxy = point_source(4, 5.0, 6.0)
            .with(RadiusComponent::new(1.5, size, true).unwrap())
            .unwrap();

        // Act
        def.add_object(galaxy).unwrap();
        def.add_object(point_source(1, 0.5, 0.25)).unwrap();
        let dup = def.add_object(point_source(1, 0.0, 0.0)).unwrap_err();

        // Assert
        assert_eq!(dup, DefinitionError::DuplicateObject { id: 1 });
        assert_eq!(def.free_parameter_count(), 5);
        assert_eq!(def.parameter_vector(), array![0.5, 0.25, 5.0, 6.0, 1.5]);
        assert!(def.object(4).and_then(|o| o.radius()).is_some());
    }

    #[test]
    // Purpose
    // -------
    // The summed likelihood adds per-frame amplitude likelihoods.
    //
    // Given
    // -----
    // - Two unit-weight frames sharing the design [[1], [0.5]].
    //
    // Expect
    // ------
    // - Sum of the two direct amplitude likelihoods.
    fn marginal_likelihood_sums_frames() {
        // Arrange
        let opts = IntegrationOptions::default();
        let mut def = Definition::new();
        def.add_frame(Frame::new(1, "g", array![1.0, 0.2], None).unwrap()).unwrap();
        def.add_frame(Frame::new(2, "r", array![0.4, 0.9], None).unwrap()).unwrap();
        let design = array![[1.0], [0.5]];

        // Act
        let total = def.marginal_likelihood(|_| design.clone(), &opts).unwrap();
        let a = amplitude_marginal_likelihood(design.view(), array![1.0, 0.2].view(), &opts)
            .unwrap();
        let b = amplitude_marginal_likelihood(design.view(), array![0.4, 0.9].view(), &opts)
            .unwrap();

        // Assert
        assert_relative_eq!(total, a + b, max_relative = 1e-13);
    }

    #[test]
    // Purpose
    // -------
    // A design whose columns cancel leaves an unconstrained amplitude
    // direction and is reported as divergence.
    //
    // Given
    // -----
    // - Columns c and −c: M(1, 1) = 0 with (1, 1) ≥ 0.
    //
    // Expect
    // ------
    // - `DefinitionError::Integral` of kind `DivergentIntegral`.
    fn cancelling_columns_diverge() {
        // Arrange
        let mut def = Definition::new();
        def.add_frame(Frame::new(1, "g", array![1.0, 0.2], None).unwrap()).unwrap();

        // Act
        let err = def
            .marginal_likelihood(|_| array![[1.0, -1.0], [0.5, -0.5]], &IntegrationOptions::default())
            .unwrap_err();

        // Assert
        match err {
            DefinitionError::Integral(inner) => assert_eq!(inner.kind(), ErrorKind::DivergentIntegral),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
