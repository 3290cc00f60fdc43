//! integrals::validation — input guards for orthant integrals.
//!
//! Purpose
//! -------
//! Reject malformed inputs before any factorization or quadrature runs:
//! correlations outside `[-1, 1]`, NaN thresholds, mismatched or empty
//! shapes, non-finite entries and asymmetric quadratic terms.
//!
//! Key behaviors
//! -------------
//! - [`validate_correlation`] accepts `|r| ≤ 1 + CORRELATION_EPS` and returns
//!   the clamped value.
//! - [`validate_threshold`] rejects NaN limits; `±∞` are meaningful limits
//!   for the bivariate upper tail and pass through.
//! - [`validate_gaussian_form`] checks shape, finiteness and symmetry of
//!   `(g, F)` and returns the symmetrized quadratic term.
//!
//! Conventions
//! -----------
//! - Flat indices in `NonFiniteInput` are row-major for matrices.
//! - Symmetry is measured relative to `max |F_ij|`; an all-zero `F` is
//!   trivially symmetric.

use crate::{
    integrals::errors::{IntegralError, IntegralResult},
    numerical_stability::CORRELATION_EPS,
};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Validate a correlation coefficient and clamp it into `[-1, 1]`.
///
/// Errors
/// ------
/// - `IntegralError::CorrelationOutOfRange`
///   When `r` is NaN or `|r| > 1 + CORRELATION_EPS`.
pub fn validate_correlation(r: f64) -> IntegralResult<f64> {
    if r.is_nan() || r.abs() > 1.0 + CORRELATION_EPS {
        return Err(IntegralError::CorrelationOutOfRange { r });
    }
    Ok(r.clamp(-1.0, 1.0))
}

/// Reject a NaN integration limit.
///
/// Errors
/// ------
/// - `IntegralError::NonFiniteInput`
///   When `value` is NaN; `index` is the argument position.
pub fn validate_threshold(name: &'static str, index: usize, value: f64) -> IntegralResult<f64> {
    if value.is_nan() {
        return Err(IntegralError::NonFiniteInput { name, index, value });
    }
    Ok(value)
}

/// Validate the linear and quadratic terms of a Gaussian form.
///
/// Parameters
/// ----------
/// - `g`: `ArrayView1<f64>`
///   Linear coefficient vector of length `n ≥ 1`.
/// - `f`: `ArrayView2<f64>`
///   Quadratic coefficient matrix, expected `n × n` and symmetric.
/// - `symmetry_tolerance`: `f64`
///   Accepted `|F_ij − F_ji|` relative to `max |F_ij|`.
///
/// Returns
/// -------
/// `IntegralResult<Array2<f64>>`
///   The symmetrized matrix `(F + Fᵀ)/2`.
///
/// Errors
/// ------
/// - `IntegralError::EmptyInput` when `n = 0`.
/// - `IntegralError::DimensionMismatch` when `F` is not `n × n`.
/// - `IntegralError::NonFiniteInput` for the first non-finite entry of `g`
///   or `F`.
/// - `IntegralError::NotSymmetric` for the first pair exceeding the
///   tolerance.
pub fn validate_gaussian_form(
    g: ArrayView1<f64>, f: ArrayView2<f64>, symmetry_tolerance: f64,
) -> IntegralResult<Array2<f64>> {
    let n = g.len();
    let (rows, cols) = f.dim();
    if rows != n || cols != n {
        return Err(IntegralError::DimensionMismatch { gradient: n, rows, cols });
    }
    if n == 0 {
        return Err(IntegralError::EmptyInput);
    }
    if let Some((index, &value)) = g.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(IntegralError::NonFiniteInput { name: "g", index, value });
    }
    if let Some((index, &value)) = f.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(IntegralError::NonFiniteInput { name: "F", index, value });
    }

    let scale = f.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    for i in 0..n {
        for j in (i + 1)..n {
            let difference = (f[[i, j]] - f[[j, i]]).abs();
            if difference > symmetry_tolerance * scale {
                return Err(IntegralError::NotSymmetric { row: i, col: j, difference });
            }
        }
    }

    let mut sym = f.to_owned();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (f[[i, j]] + f[[j, i]]);
            sym[[i, j]] = avg;
            sym[[j, i]] = avg;
        }
    }
    Ok(sym)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Clamping and rejection of correlations near and beyond ±1.
    // - Every error branch of `validate_gaussian_form` and its symmetrized
    //   output on success.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Correlations within the slack are clamped; larger or NaN ones fail.
    fn correlation_is_clamped_or_rejected() {
        assert_eq!(validate_correlation(0.3).unwrap(), 0.3);
        assert_eq!(validate_correlation(1.0 + 1e-14).unwrap(), 1.0);
        assert_eq!(validate_correlation(-1.0 - 1e-14).unwrap(), -1.0);
        assert!(matches!(
            validate_correlation(1.001),
            Err(IntegralError::CorrelationOutOfRange { .. })
        ));
        assert!(validate_correlation(f64::NAN).is_err());
    }

    #[test]
    // Purpose
    // -------
    // NaN limits are rejected while infinite limits are allowed.
    fn thresholds_reject_only_nan() {
        assert_eq!(validate_threshold("h", 0, f64::INFINITY).unwrap(), f64::INFINITY);
        assert!(matches!(
            validate_threshold("k", 1, f64::NAN),
            Err(IntegralError::NonFiniteInput { name: "k", index: 1, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Shape problems are reported before content problems.
    //
    // Given
    // -----
    // - A length-2 `g` with a 2×3 `F`, and an empty problem.
    //
    // Expect
    // ------
    // - `DimensionMismatch` and `EmptyInput` respectively.
    fn shape_errors_are_reported() {
        let g = array![1.0, 2.0];
        let f = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            validate_gaussian_form(g.view(), f.view(), 1e-10),
            Err(IntegralError::DimensionMismatch { gradient: 2, rows: 2, cols: 3 })
        ));

        let g0 = ndarray::Array1::<f64>::zeros(0);
        let f0 = Array2::<f64>::zeros((0, 0));
        assert_eq!(
            validate_gaussian_form(g0.view(), f0.view(), 1e-10),
            Err(IntegralError::EmptyInput)
        );
    }

    #[test]
    // Purpose
    // -------
    // Non-finite entries are located by flat index.
    fn non_finite_entries_are_located() {
        let g = array![1.0, f64::NAN];
        let f = array![[1.0, 0.0], [0.0, 1.0]];
        assert!(matches!(
            validate_gaussian_form(g.view(), f.view(), 1e-10),
            Err(IntegralError::NonFiniteInput { name: "g", index: 1, .. })
        ));

        let g = array![1.0, 0.0];
        let f = array![[1.0, 0.0], [f64::INFINITY, 1.0]];
        assert!(matches!(
            validate_gaussian_form(g.view(), f.view(), 1e-10),
            Err(IntegralError::NonFiniteInput { name: "F", index: 2, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Asymmetry beyond tolerance fails; asymmetry within tolerance is
    // averaged away.
    //
    // Given
    // -----
    // - F with off-diagonals 0.5 and 0.6 (rejected), and 0.5 vs 0.5 + 1e-13
    //   (accepted).
    //
    // Expect
    // ------
    // - `NotSymmetric { row: 0, col: 1 }` for the first; an exactly
    //   symmetric matrix for the second.
    fn symmetry_is_checked_and_enforced() {
        let g = array![0.0, 0.0];
        let bad = array![[2.0, 0.5], [0.6, 1.0]];
        match validate_gaussian_form(g.view(), bad.view(), 1e-10) {
            Err(IntegralError::NotSymmetric { row, col, difference }) => {
                assert_eq!((row, col), (0, 1));
                assert!((difference - 0.1).abs() < 1e-12);
            }
            other => panic!("unexpected: {other:?}"),
        }

        let ok = array![[2.0, 0.5], [0.5 + 1e-13, 1.0]];
        let sym = validate_gaussian_form(g.view(), ok.view(), 1e-10).unwrap();
        assert_eq!(sym[[0, 1]], sym[[1, 0]]);
    }
}
