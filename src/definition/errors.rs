//! definition::errors — error type for model definitions.
//!
//! Purpose
//! -------
//! Report malformed constraints, component values outside their bounds,
//! duplicate identifiers and inconsistent frame data, and wrap integral
//! failures raised while evaluating a frame's likelihood.
//!
//! Conventions
//! -----------
//! - Identifiers are the caller's `u64` ids, reported verbatim.
//! - With `python-bindings`, everything maps to `ValueError` except wrapped
//!   integral errors, which keep their own mapping.

use crate::{definition::components::ComponentKind, integrals::IntegralError};

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// DefinitionError — failures while building or evaluating a
/// [`Definition`](crate::definition::Definition).
///
/// Variants
/// --------
/// - `InvalidConstraint { name, value, reason }`
///   A constraint parameter is NaN, negative or inverted.
/// - `OutsideBounds { object, component }`
///   A component value violates its constraint.
/// - `DuplicateComponent { object, component }`
///   An object already carries a component of this kind.
/// - `DuplicateObject { id }`, `DuplicateFrame { id }`
///   The id is already registered.
/// - `UnknownFrame { id }`
///   No frame with this id.
/// - `FrameShape { id, data, weights }`
///   Weights do not match the data length.
/// - `NonFiniteFrameData { id, index, value }`
///   A data value is not finite or a weight is negative or not finite.
/// - `Integral(IntegralError)`
///   The amplitude integral failed.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionError {
    // ---- Constraints and components ----
    InvalidConstraint { name: &'static str, value: f64, reason: &'static str },
    OutsideBounds { object: u64, component: ComponentKind },
    DuplicateComponent { object: u64, component: ComponentKind },

    // ---- Registries ----
    DuplicateObject { id: u64 },
    DuplicateFrame { id: u64 },
    UnknownFrame { id: u64 },

    // ---- Frame data ----
    FrameShape { id: u64, data: usize, weights: usize },
    NonFiniteFrameData { id: u64, index: usize, value: f64 },

    // ---- Evaluation ----
    Integral(IntegralError),
}

impl std::error::Error for DefinitionError {}

impl std::fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitionError::InvalidConstraint { name, value, reason } => {
                write!(f, "Invalid constraint parameter `{name}` = {value}: {reason}.")
            }
            DefinitionError::OutsideBounds { object, component } => {
                write!(f, "Object {object}: {component} value lies outside its bounds.")
            }
            DefinitionError::DuplicateComponent { object, component } => {
                write!(f, "Object {object} already has a {component} component.")
            }
            DefinitionError::DuplicateObject { id } => {
                write!(f, "Object id {id} is already registered.")
            }
            DefinitionError::DuplicateFrame { id } => {
                write!(f, "Frame id {id} is already registered.")
            }
            DefinitionError::UnknownFrame { id } => write!(f, "No frame with id {id}."),
            DefinitionError::FrameShape { id, data, weights } => write!(
                f,
                "Frame {id}: {weights} weights supplied for {data} data values."
            ),
            DefinitionError::NonFiniteFrameData { id, index, value } => {
                write!(f, "Frame {id}: invalid value {value} at position {index}.")
            }
            DefinitionError::Integral(err) => write!(f, "{err}"),
        }
    }
}

impl From<IntegralError> for DefinitionError {
    fn from(err: IntegralError) -> Self {
        DefinitionError::Integral(err)
    }
}

#[cfg(feature = "python-bindings")]
impl From<DefinitionError> for PyErr {
    fn from(err: DefinitionError) -> PyErr {
        match err {
            DefinitionError::Integral(inner) => inner.into(),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}
