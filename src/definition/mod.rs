//! definition — objects, frames and bounded parameters of a fit.
//!
//! Purpose
//! -------
//! Describe what a model-fitting pipeline fits: a set of objects, each with
//! bounded nonlinear components (position, radius, ellipticity), and a set
//! of data frames. The linear amplitudes of the objects are not stored
//! here; they are integrated out per frame by
//! [`crate::integrals::amplitude_marginal_likelihood`].
//!
//! Key behaviors
//! -------------
//! - Component kinds are a closed enum, [`ObjectComponent`], and each
//!   component type names its constraint type through [`Component::Bounds`]:
//!   positions and ellipticities are bounded by a [`CircleConstraint`],
//!   radii by a [`MinMaxConstraint`].
//! - [`ObjectComponentSet`] holds at most one component of each kind for an
//!   object; [`FrameSet`] holds frames by id; [`Definition`] combines both.
//! - Duplicate ids and out-of-bounds values are rejected with
//!   [`DefinitionError`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Objects and frames iterate in ascending id order, so parameter
//!   vectors and likelihood sums are deterministic.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests; `model` exercises the likelihood
//!   sum end to end, including a divergent design.

pub mod components;
pub mod constraints;
pub mod errors;
pub mod frames;
pub mod model;
pub mod objects;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::components::{
    Component, ComponentKind, EllipticityComponent, ObjectComponent, PositionComponent,
    RadiusComponent,
};
pub use self::constraints::{
    Bounds, CircleConstraint, Constraint, ConstraintKind, MinMaxConstraint,
};
pub use self::errors::{DefinitionError, DefinitionResult};
pub use self::frames::{Frame, FrameSet};
pub use self::model::Definition;
pub use self::objects::ObjectComponentSet;

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::components::{
        Component, EllipticityComponent, ObjectComponent, PositionComponent, RadiusComponent,
    };
    pub use super::constraints::{CircleConstraint, Constraint, MinMaxConstraint};
    pub use super::errors::{DefinitionError, DefinitionResult};
    pub use super::frames::{Frame, FrameSet};
    pub use super::model::Definition;
    pub use super::objects::ObjectComponentSet;
}
