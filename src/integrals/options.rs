//! integrals::options — numerical configuration for the integrators.
//!
//! Purpose
//! -------
//! Collect every tolerance that influences how an orthant integral is
//! evaluated into two small value types, [`IntegrationOptions`] and
//! [`QuadratureOptions`], so callers can tune rank detection, branch
//! selection and quadrature accuracy in one place.
//!
//! Key behaviors
//! -------------
//! - `Default` implementations reproduce the documented crate defaults
//!   (see `numerical_stability`).
//! - `new` constructors validate their inputs and return
//!   [`IntegralError::InvalidOption`] on violation; `with_*` setters build on
//!   an existing value and validate the single field they change.
//!
//! Invariants & assumptions
//! ------------------------
//! - `0 ≤ rank_tolerance < 1`, `condition_threshold ≥ 1`,
//!   `symmetry_tolerance ≥ 0`.
//! - `0 < rel_tol < 1`, `abs_tol ≥ 0`, `max_intervals ≥ 1`.

use crate::{
    integrals::errors::{IntegralError, IntegralResult},
    numerical_stability::{CONDITION_THRESHOLD, RANK_TOL, SYMMETRY_TOL},
};

/// QuadratureOptions — adaptive Gauss–Kronrod settings.
///
/// Fields
/// ------
/// - `rel_tol`: relative error target of the outermost adaptive quadrature.
///   Inner levels of the orthant recursion use fixed rules and do not
///   consult it.
/// - `abs_tol`: absolute error floor, effective only when the integral is
///   essentially zero.
/// - `max_intervals`: subdivision budget per quadrature call. Exhausting it
///   logs at debug level and returns the best estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureOptions {
    pub rel_tol: f64,
    pub abs_tol: f64,
    pub max_intervals: usize,
}

impl QuadratureOptions {
    pub fn new(rel_tol: f64, abs_tol: f64, max_intervals: usize) -> IntegralResult<Self> {
        if !(rel_tol > 0.0 && rel_tol < 1.0) {
            return Err(IntegralError::InvalidOption {
                name: "rel_tol",
                value: rel_tol,
                reason: "must lie in (0, 1)",
            });
        }
        if !(abs_tol >= 0.0) || !abs_tol.is_finite() {
            return Err(IntegralError::InvalidOption {
                name: "abs_tol",
                value: abs_tol,
                reason: "must be finite and non-negative",
            });
        }
        if max_intervals == 0 {
            return Err(IntegralError::InvalidOption {
                name: "max_intervals",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        Ok(QuadratureOptions { rel_tol, abs_tol, max_intervals })
    }
}

impl Default for QuadratureOptions {
    fn default() -> Self {
        QuadratureOptions { rel_tol: 1e-10, abs_tol: 1e-300, max_intervals: 256 }
    }
}

/// IntegrationOptions — configuration for [`crate::integrals::integrate_gaussian_with`].
///
/// Fields
/// ------
/// - `rank_tolerance`: eigenvalues `λ ≤ rank_tolerance · λ_max` of `F`
///   count as zero. Also bounds how negative an eigenvalue may be before
///   `F` is rejected as not positive semi-definite.
/// - `condition_threshold`: largest condition number for which the
///   Cholesky branch is attempted; above it the spectral branch is used.
/// - `symmetry_tolerance`: accepted `|F_ij − F_ji| / max|F|`.
/// - `quadrature`: settings for the adaptive quadratures used when `n > 2`
///   or when `F` is rank-deficient.
///
/// Notes
/// -----
/// - `Default` gives `rank_tolerance = 1e-12`, `condition_threshold = 1e8`,
///   `symmetry_tolerance = 1e-10` and `QuadratureOptions::default()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationOptions {
    pub rank_tolerance: f64,
    pub condition_threshold: f64,
    pub symmetry_tolerance: f64,
    pub quadrature: QuadratureOptions,
}

impl IntegrationOptions {
    /// Construct options from explicit values.
    ///
    /// Errors
    /// ------
    /// - `IntegralError::InvalidOption`
    ///   When any field is outside the domain listed in the module docs.
    pub fn new(
        rank_tolerance: f64, condition_threshold: f64, symmetry_tolerance: f64,
        quadrature: QuadratureOptions,
    ) -> IntegralResult<Self> {
        Self::default()
            .with_rank_tolerance(rank_tolerance)?
            .with_condition_threshold(condition_threshold)?
            .with_symmetry_tolerance(symmetry_tolerance)
            .map(|opts| opts.with_quadrature(quadrature))
    }

    pub fn with_rank_tolerance(mut self, rank_tolerance: f64) -> IntegralResult<Self> {
        if !(0.0..1.0).contains(&rank_tolerance) {
            return Err(IntegralError::InvalidOption {
                name: "rank_tolerance",
                value: rank_tolerance,
                reason: "must lie in [0, 1)",
            });
        }
        self.rank_tolerance = rank_tolerance;
        Ok(self)
    }

    pub fn with_condition_threshold(mut self, condition_threshold: f64) -> IntegralResult<Self> {
        if !(condition_threshold >= 1.0) {
            return Err(IntegralError::InvalidOption {
                name: "condition_threshold",
                value: condition_threshold,
                reason: "must be at least 1",
            });
        }
        self.condition_threshold = condition_threshold;
        Ok(self)
    }

    pub fn with_symmetry_tolerance(mut self, symmetry_tolerance: f64) -> IntegralResult<Self> {
        if !(symmetry_tolerance >= 0.0) || !symmetry_tolerance.is_finite() {
            return Err(IntegralError::InvalidOption {
                name: "symmetry_tolerance",
                value: symmetry_tolerance,
                reason: "must be finite and non-negative",
            });
        }
        self.symmetry_tolerance = symmetry_tolerance;
        Ok(self)
    }

    pub fn with_quadrature(mut self, quadrature: QuadratureOptions) -> Self {
        self.quadrature = quadrature;
        self
    }
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        IntegrationOptions {
            rank_tolerance: RANK_TOL,
            condition_threshold: CONDITION_THRESHOLD,
            symmetry_tolerance: SYMMETRY_TOL,
            quadrature: QuadratureOptions::default(),
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
    // - Default values.
    // - Validation in `new` and the `with_*` setters.
    // - Valid values passing through unchanged.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Defaults mirror the shared numerical-stability constants.
    fn defaults_match_crate_constants() {
        let opts = IntegrationOptions::default();
        assert_eq!(opts.rank_tolerance, RANK_TOL);
        assert_eq!(opts.condition_threshold, CONDITION_THRESHOLD);
        assert_eq!(opts.symmetry_tolerance, SYMMETRY_TOL);
        assert_eq!(opts.quadrature, QuadratureOptions::default());
    }

    #[test]
    // Purpose
    // -------
    // Out-of-domain values are rejected with `InvalidOption` naming the field.
    //
    // Given
    // -----
    // - A negative rank tolerance, a condition threshold below one, a NaN
    //   symmetry tolerance and zero quadrature intervals.
    //
    // Expect
    // ------
    // - Each constructor returns `InvalidOption` with the matching `name`.
    fn invalid_values_are_rejected() {
        let q = QuadratureOptions::default();
        match IntegrationOptions::new(-1e-3, 1e8, 1e-10, q) {
            Err(IntegralError::InvalidOption { name, .. }) => assert_eq!(name, "rank_tolerance"),
            other => panic!("unexpected: {other:?}"),
        }
        match IntegrationOptions::new(1e-12, 0.5, 1e-10, q) {
            Err(IntegralError::InvalidOption { name, .. }) => {
                assert_eq!(name, "condition_threshold")
            }
            other => panic!("unexpected: {other:?}"),
        }
        match IntegrationOptions::default().with_symmetry_tolerance(f64::NAN) {
            Err(IntegralError::InvalidOption { name, .. }) => {
                assert_eq!(name, "symmetry_tolerance")
            }
            other => panic!("unexpected: {other:?}"),
        }
        match QuadratureOptions::new(1e-8, 0.0, 0) {
            Err(IntegralError::InvalidOption { name, .. }) => assert_eq!(name, "max_intervals"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(QuadratureOptions::new(1.5, 0.0, 10).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Valid values round-trip through `new`.
    fn valid_values_are_kept() {
        // Arrange
        let q = QuadratureOptions::new(1e-8, 1e-200, 64).unwrap();

        // Act
        let opts = IntegrationOptions::new(1e-10, 1e6, 0.0, q).unwrap();

        // Assert
        assert_eq!(opts.rank_tolerance, 1e-10);
        assert_eq!(opts.condition_threshold, 1e6);
        assert_eq!(opts.quadrature.max_intervals, 64);
        assert_eq!(opts.quadrature.rel_tol, 1e-8);
        assert_eq!(opts.quadrature.abs_tol, 1e-200);
    }
}
