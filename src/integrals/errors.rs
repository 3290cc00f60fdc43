//! integrals::errors — error taxonomy for orthant integrals.
//!
//! Purpose
//! -------
//! Define the error enum and result alias shared by the bivariate evaluator,
//! the general Gaussian integrator and the degeneracy handler, plus the
//! bridge into Python exceptions.
//!
//! Key behaviors
//! -------------
//! - [`IntegralError`] carries structured payloads (offending value,
//!   location, direction) so callers can log or react without parsing text.
//! - [`IntegralError::kind`] collapses variants into the two conditions a
//!   caller must tell apart: malformed input ([`ErrorKind::InvalidParameter`])
//!   and an integral that is infinite ([`ErrorKind::DivergentIntegral`]).
//!   Model-fitting code treats the latter as an infeasible parameter region.
//! - With `python-bindings`, invalid parameters become `ValueError` and
//!   divergence becomes `ArithmeticError`.
//!
//! Conventions
//! -----------
//! - Loss of precision on the primary factorization is not an error visible
//!   here; it is handled internally by the spectral fallback in
//!   `integrals::decomposition`.
//!
//! Testing notes
//! -------------
//! - Unit tests check that `Display` messages embed their payloads and that
//!   `kind()` classifies every variant.

#[cfg(feature = "python-bindings")]
use pyo3::{
    PyErr,
    exceptions::{PyArithmeticError, PyValueError},
};

pub type IntegralResult<T> = Result<T, IntegralError>;

/// ErrorKind — coarse classification of [`IntegralError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParameter,
    DivergentIntegral,
}

/// IntegralError — failures of orthant-integral evaluation.
///
/// Variants
/// --------
/// - `CorrelationOutOfRange { r }`
///   `|r| > 1` beyond the clamping slack, or `r` is NaN.
/// - `NonFiniteInput { name, index, value }`
///   An input entry is NaN (or ±∞ where infinities are meaningless);
///   `index` is the flat position in row-major order.
/// - `EmptyInput`
///   Zero-dimensional problem.
/// - `DimensionMismatch { gradient, rows, cols }`
///   `F` is not square or does not match the length of `g`.
/// - `NotSymmetric { row, col, difference }`
///   `|F_ij − F_ji|` exceeds the symmetry tolerance.
/// - `InvalidOption { name, value, reason }`
///   A configuration value is outside its domain.
/// - `DivergentDirection { direction, slope }`
///   `direction` is a non-negative null vector of `F` along which the
///   exponent's slope `g·u` is not positive, so the integrand does not
///   decay.
/// - `NotPositiveSemidefinite { eigenvalue }`
///   `F` has a clearly negative eigenvalue; the integrand grows without
///   bound along the corresponding direction.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegralError {
    // ---- Invalid parameters ----
    CorrelationOutOfRange { r: f64 },
    NonFiniteInput { name: &'static str, index: usize, value: f64 },
    EmptyInput,
    DimensionMismatch { gradient: usize, rows: usize, cols: usize },
    NotSymmetric { row: usize, col: usize, difference: f64 },
    InvalidOption { name: &'static str, value: f64, reason: &'static str },

    // ---- Divergence ----
    DivergentDirection { direction: Vec<f64>, slope: f64 },
    NotPositiveSemidefinite { eigenvalue: f64 },
}

impl IntegralError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntegralError::DivergentDirection { .. }
            | IntegralError::NotPositiveSemidefinite { .. } => ErrorKind::DivergentIntegral,
            _ => ErrorKind::InvalidParameter,
        }
    }

    pub fn is_divergent(&self) -> bool {
        self.kind() == ErrorKind::DivergentIntegral
    }
}

impl std::error::Error for IntegralError {}

impl std::fmt::Display for IntegralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegralError::CorrelationOutOfRange { r } => {
                write!(f, "Correlation {r} is outside [-1, 1].")
            }
            IntegralError::NonFiniteInput { name, index, value } => {
                write!(f, "Non-finite value {value} in `{name}` at position {index}.")
            }
            IntegralError::EmptyInput => {
                write!(f, "The quadratic form must have at least one dimension.")
            }
            IntegralError::DimensionMismatch { gradient, rows, cols } => write!(
                f,
                "Dimension mismatch: linear term has length {gradient} but the quadratic \
                 term is {rows}x{cols}; expected a square matrix of matching size."
            ),
            IntegralError::NotSymmetric { row, col, difference } => write!(
                f,
                "Quadratic term is not symmetric: entries ({row}, {col}) and ({col}, {row}) \
                 differ by {difference}."
            ),
            IntegralError::InvalidOption { name, value, reason } => {
                write!(f, "Invalid option `{name}` = {value}: {reason}.")
            }
            IntegralError::DivergentDirection { direction, slope } => write!(
                f,
                "Integral diverges along null direction {direction:?} of the quadratic \
                 term (linear slope {slope} is not positive)."
            ),
            IntegralError::NotPositiveSemidefinite { eigenvalue } => write!(
                f,
                "Integral diverges: quadratic term has negative eigenvalue {eigenvalue}."
            ),
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<IntegralError> for PyErr {
    fn from(err: IntegralError) -> PyErr {
        match err.kind() {
            ErrorKind::InvalidParameter => PyValueError::new_err(err.to_string()),
            ErrorKind::DivergentIntegral => PyArithmeticError::new_err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `Display` messages embedding their payloads.
    // - Classification of every variant through `kind()`.
    //
    // They intentionally DO NOT cover:
    // - The PyErr conversion, which needs a Python interpreter.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Correlation and symmetry errors report the offending values.
    fn display_includes_payloads() {
        // Arrange
        let corr = IntegralError::CorrelationOutOfRange { r: 1.5 };
        let sym = IntegralError::NotSymmetric { row: 0, col: 2, difference: 0.25 };

        // Act
        let corr_msg = corr.to_string();
        let sym_msg = sym.to_string();

        // Assert
        assert!(corr_msg.contains("1.5"), "Got: {corr_msg}");
        assert!(sym_msg.contains("(0, 2)") && sym_msg.contains("0.25"), "Got: {sym_msg}");
    }

    #[test]
    // Purpose
    // -------
    // Every variant maps to the expected coarse kind.
    //
    // Given
    // -----
    // - One value of each variant.
    //
    // Expect
    // ------
    // - Divergence variants report `DivergentIntegral`; all others report
    //   `InvalidParameter`.
    fn kind_classifies_all_variants() {
        let invalid = [
            IntegralError::CorrelationOutOfRange { r: f64::NAN },
            IntegralError::NonFiniteInput { name: "g", index: 1, value: f64::NAN },
            IntegralError::EmptyInput,
            IntegralError::DimensionMismatch { gradient: 2, rows: 3, cols: 3 },
            IntegralError::NotSymmetric { row: 1, col: 0, difference: 1.0 },
            IntegralError::InvalidOption { name: "rank_tolerance", value: -1.0, reason: "x" },
        ];
        for err in &invalid {
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "{err}");
            assert!(!err.is_divergent());
        }

        let divergent = [
            IntegralError::DivergentDirection { direction: vec![1.0, 1.0], slope: 0.0 },
            IntegralError::NotPositiveSemidefinite { eigenvalue: -2.0 },
        ];
        for err in &divergent {
            assert_eq!(err.kind(), ErrorKind::DivergentIntegral, "{err}");
            assert!(err.is_divergent());
        }
    }
}
