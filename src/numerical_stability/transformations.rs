//! Numerical stability constants and log-space helpers.
//!
//! The integrals computed by this crate span hundreds of orders of
//! magnitude, so intermediate results are carried as logarithms and only
//! combined through the guarded helpers below.
//!
//! # Provided items
//! - [`RANK_TOL`]: relative eigenvalue threshold for numerical rank.
//! - [`CONDITION_THRESHOLD`]: condition number above which the Cholesky
//!   branch is bypassed.
//! - [`SYMMETRY_TOL`]: relative asymmetry accepted in a quadratic form.
//! - [`CORRELATION_EPS`]: slack accepted beyond `|r| = 1`.
//! - [`RAY_TOL`]: sign tolerance when testing null directions against the
//!   positive orthant.
//! - [`safe_softplus(x)`], [`log_add_exp(a, b)`], [`log_sub_exp(a, b)`].

/// Eigenvalues `λ ≤ RANK_TOL · λ_max` are treated as exact zeros.
///
/// A duplicated column in a design matrix leaves a computed eigenvalue of
/// roughly `1e-16 · λ_max`; a genuine but tiny direction sits well above
/// `1e-12 · λ_max` in practice.
pub const RANK_TOL: f64 = 1e-12;

/// Condition number above which the Cholesky factorization is not trusted
/// and the spectral branch is used instead.
pub const CONDITION_THRESHOLD: f64 = 1e8;

/// Largest accepted `|F_ij − F_ji|` relative to `max |F|`.
pub const SYMMETRY_TOL: f64 = 1e-10;

/// Correlations with `1 < |r| ≤ 1 + CORRELATION_EPS` are clamped to `±1`.
pub const CORRELATION_EPS: f64 = 1e-12;

/// Components of a unit-max null direction may dip to `-RAY_TOL` and still
/// count as non-negative.
pub const RAY_TOL: f64 = 1e-8;

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// # Parameters
/// - `x`: real input
///
/// # Returns
/// - `softplus(x)` as `f64`; for `x > 20` the result is `x` to working
///   precision.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// `ln(exp(a) + exp(b))` without overflow.
///
/// # Parameters
/// - `a`, `b`: logarithms of non-negative quantities (`-∞` allowed).
///
/// # Returns
/// - The logarithm of the sum. Two `-∞` arguments give `-∞`.
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if hi == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    hi + safe_softplus(lo - hi)
}

/// `ln(exp(a) − exp(b))` for `a ≥ b`, accurate when the two are close.
///
/// # Parameters
/// - `a`: logarithm of the minuend.
/// - `b`: logarithm of the subtrahend, `b ≤ a`.
///
/// # Returns
/// - The logarithm of the difference, `-∞` when `a == b`, and `NaN` when
///   `b > a`.
pub fn log_sub_exp(a: f64, b: f64) -> f64 {
    if b > a {
        return f64::NAN;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    a + (-(b - a).exp_m1()).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of the guarded log-space helpers with naive formulas on
    //   moderate arguments.
    // - Behavior at the extremes: large gaps, `-∞` inputs, near-equal
    //   arguments in `log_sub_exp`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `safe_softplus` matches `ln(1 + e^x)` on a safe grid and saturates to
    // `x` for large inputs.
    fn safe_softplus_matches_naive_and_saturates() {
        for &x in &[-30.0, -3.0, 0.0, 2.5, 15.0] {
            assert_relative_eq!(safe_softplus(x), (1.0 + f64::exp(x)).ln(), max_relative = 1e-12);
        }
        assert_eq!(safe_softplus(800.0), 800.0);
    }

    #[test]
    // Purpose
    // -------
    // `log_add_exp` agrees with direct evaluation and survives arguments
    // whose exponentials overflow.
    //
    // Given
    // -----
    // - Pairs with moderate values, and a pair near 1000 in log space.
    //
    // Expect
    // ------
    // - Moderate pairs match `ln(e^a + e^b)`; the large pair equals
    //   `1000 + ln 2` when both arguments are 1000.
    fn log_add_exp_matches_naive_and_handles_overflow() {
        // Arrange
        let pairs = [(0.0, 0.0), (-2.0, 1.5), (3.0, -40.0)];

        // Act / Assert
        for &(a, b) in &pairs {
            let naive = (f64::exp(a) + f64::exp(b)).ln();
            assert_relative_eq!(log_add_exp(a, b), naive, max_relative = 1e-13);
        }
        assert_relative_eq!(log_add_exp(1000.0, 1000.0), 1000.0 + 2f64.ln(), max_relative = 1e-15);
        assert_eq!(log_add_exp(f64::NEG_INFINITY, f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(log_add_exp(f64::NEG_INFINITY, -5.0), -5.0);
    }

    #[test]
    // Purpose
    // -------
    // `log_sub_exp` keeps relative accuracy when the arguments nearly cancel.
    //
    // Given
    // -----
    // - a = 0, b = -1e-10, so e^a − e^b ≈ 1e-10.
    //
    // Expect
    // ------
    // - The result is ln(1e-10) to high relative precision; equal arguments
    //   give -∞ and a reversed pair gives NaN.
    fn log_sub_exp_handles_near_cancellation() {
        // Act
        let v = log_sub_exp(0.0, -1e-10);

        // Assert
        assert_relative_eq!(v, (-(-1e-10f64).exp_m1()).ln(), max_relative = 1e-14);
        assert_relative_eq!(v, (1e-10f64).ln(), max_relative = 1e-9);
        assert_eq!(log_sub_exp(2.0, 2.0), f64::NEG_INFINITY);
        assert!(log_sub_exp(1.0, 2.0).is_nan());
        assert_eq!(log_sub_exp(3.0, f64::NEG_INFINITY), 3.0);
    }
}
