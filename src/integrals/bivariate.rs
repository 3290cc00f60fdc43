//! integrals::bivariate — upper-orthant probability of a standard bivariate
//! normal.
//!
//! Purpose
//! -------
//! Evaluate `bvnu(h, k, r) = P(X > h, Y > k)` for a standard bivariate
//! normal with correlation `r` to 1e-14 relative accuracy, and its
//! logarithm [`ln_bvnu`] for probabilities below `f64` underflow. This is
//! the workhorse of the general integrator: every two-dimensional orthant
//! probability, including the innermost level of the peeled recursion,
//! ends here.
//!
//! Key behaviors
//! -------------
//! - Infinite limits and `r = 0` are answered in closed form.
//! - `|r| < 0.925`: Gauss–Legendre quadrature of the Plackett derivative
//!   over `θ ∈ (0, asin r)` on top of the independent product.
//! - `|r| ≥ 0.925`: Drezner–Wesolowsky style expansion around the
//!   perfectly correlated case plus a transformed single integral; for
//!   `r < 0` the problem is reflected through `k → −k` and combined with
//!   the univariate tails at the end.
//! - `|r| = 1` reduces to `Φ̄(max(h, k))` or to a band probability.
//! - Both series add a correction to a product or tail term, so their
//!   error is absolute (about 1e-16). Below [`TAIL_SWITCH`] the series
//!   value is replaced by the single integral
//!   `∫_h^∞ φ(x) Φ̄((k − rx)/√(1−r²)) dx` (with `h ≥ k`), integrated on
//!   the log scale over a rational map of `[h, ∞)`. Its integrand is
//!   log-concave and positive, so nothing cancels.
//! - The result is clamped to `[0, 1]`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `bvnu` is symmetric in `(h, k)` up to rounding.
//! - `bvnu(0, 0, r) = 1/4 + asin(r)/(2π)`.
//! - `ln_bvnu(h, k, r)` is finite whenever the event has positive
//!   probability, however small.
//!
//! Downstream usage
//! ----------------
//! - `integrals::orthant` and `integrals::gaussian` call
//!   [`ln_bvnu_unchecked`] with standardized thresholds `h = −μ₀/σ₀`,
//!   `k = −μ₁/σ₁`.
//! - Python callers reach [`bvnu`] through the `python-bindings` feature.

use crate::{
    integrals::{
        errors::IntegralResult,
        normal::{SQRT_2PI, cdf, ln_density, ln_mills_ratio, ln_upper_tail, upper_tail},
        options::QuadratureOptions,
        quadrature::{gauss_legendre_for_correlation, integrate_adaptive, integrate_adaptive_ln},
        validation::{validate_correlation, validate_threshold},
    },
    numerical_stability::log_sub_exp,
};
use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

/// Magnitude of `r` where the evaluation switches to the high-correlation
/// expansion.
const HIGH_CORRELATION: f64 = 0.925;

/// Exponents below this are dropped from the high-correlation terms.
const EXP_CUTOFF: f64 = -100.0;

/// Series values below this are recomputed by the tail integral.
pub const TAIL_SWITCH: f64 = 1e-3;

/// Settings of the tail integral; its error estimate is pessimistic, so
/// 1e-14 gives results good to a few ulps.
const TAIL_QUADRATURE: QuadratureOptions =
    QuadratureOptions { rel_tol: 1e-14, abs_tol: 0.0, max_intervals: 64 };

/// Upper-orthant probability `P(X > h, Y > k)` of a standard bivariate
/// normal with correlation `r`.
///
/// Parameters
/// ----------
/// - `h`, `k`: `f64`
///   Lower limits; `±∞` allowed.
/// - `r`: `f64`
///   Correlation in `[-1, 1]`; values within `1e-12` outside the interval
///   are clamped.
///
/// Returns
/// -------
/// `IntegralResult<f64>`
///   The probability in `[0, 1]`.
///
/// Errors
/// ------
/// - `IntegralError::NonFiniteInput` when `h` or `k` is NaN.
/// - `IntegralError::CorrelationOutOfRange` when `r` is NaN or `|r| > 1`.
///
/// Examples
/// --------
/// ```rust
/// use orthant_integrals::integrals::bvnu;
/// let p = bvnu(0.0, 0.0, 0.5).unwrap();
/// assert!((p - 1.0 / 3.0).abs() < 1e-14);
/// ```
pub fn bvnu(h: f64, k: f64, r: f64) -> IntegralResult<f64> {
    let h = validate_threshold("h", 0, h)?;
    let k = validate_threshold("k", 1, k)?;
    let r = validate_correlation(r)?;
    Ok(bvnu_unchecked(h, k, r))
}

/// [`bvnu`] without input validation. Expects non-NaN limits and
/// `r ∈ [-1, 1]`.
pub fn bvnu_unchecked(h: f64, k: f64, r: f64) -> f64 {
    if h == f64::INFINITY || k == f64::INFINITY {
        return 0.0;
    }
    if h == f64::NEG_INFINITY {
        return if k == f64::NEG_INFINITY { 1.0 } else { upper_tail(k) };
    }
    if k == f64::NEG_INFINITY {
        return upper_tail(h);
    }
    if r == 0.0 {
        return upper_tail(h) * upper_tail(k);
    }

    let value = series(h, k, r);
    if value < TAIL_SWITCH && r.abs() < 1.0 {
        return tail_integral(h, k, r).clamp(0.0, 1.0);
    }
    value
}

/// Logarithm of the upper-orthant probability, `ln P(X > h, Y > k)`.
///
/// Parameters
/// ----------
/// - `h`, `k`: `f64`
///   Lower limits; `±∞` allowed.
/// - `r`: `f64`
///   Correlation in `[-1, 1]`, validated as in [`bvnu`].
///
/// Returns
/// -------
/// `IntegralResult<f64>`
///   `ln P` in `[−∞, 0]`; `−∞` only when the event is impossible (an
///   infinite lower limit, or disjoint half-lines at `r = −1`).
///
/// Examples
/// --------
/// ```rust
/// use orthant_integrals::integrals::ln_bvnu;
/// // P(X > 40, Y > 40) ≈ 1e-700 underflows, its logarithm does not.
/// let lp = ln_bvnu(40.0, 40.0, 0.3).unwrap();
/// assert!(lp.is_finite() && lp < -1000.0);
/// ```
pub fn ln_bvnu(h: f64, k: f64, r: f64) -> IntegralResult<f64> {
    let h = validate_threshold("h", 0, h)?;
    let k = validate_threshold("k", 1, k)?;
    let r = validate_correlation(r)?;
    Ok(ln_bvnu_unchecked(h, k, r))
}

/// [`ln_bvnu`] without input validation.
pub fn ln_bvnu_unchecked(h: f64, k: f64, r: f64) -> f64 {
    if h == f64::INFINITY || k == f64::INFINITY {
        return f64::NEG_INFINITY;
    }
    if h == f64::NEG_INFINITY {
        return if k == f64::NEG_INFINITY { 0.0 } else { ln_upper_tail(k) };
    }
    if k == f64::NEG_INFINITY {
        return ln_upper_tail(h);
    }
    if r == 0.0 {
        return ln_upper_tail(h) + ln_upper_tail(k);
    }
    if r >= 1.0 {
        return ln_upper_tail(h.max(k));
    }
    if r <= -1.0 {
        // P(h < X < −k) = Φ̄(h) − Φ̄(−k).
        let (outer, inner) = (ln_upper_tail(h), ln_upper_tail(-k));
        return if inner < outer { log_sub_exp(outer, inner) } else { f64::NEG_INFINITY };
    }

    let value = series(h, k, r);
    if value < TAIL_SWITCH { ln_tail_integral(h, k, r) } else { value.ln() }
}

/// Genz's series value for finite limits and `r ≠ 0`, clamped to `[0, 1]`.
fn series(h: f64, k: f64, r: f64) -> f64 {
    let value = if r.abs() < HIGH_CORRELATION {
        moderate_correlation(h, k, r)
    } else {
        high_correlation(h, k, r)
    };
    value.clamp(0.0, 1.0)
}

/// Log integrand of `∫_h^∞ φ(x) Φ̄(z(x)) dx`, `z(x) = (k − rx)/ρ`,
/// `ρ = √(1−r²)`, on `s ∈ [0, 1)` for finite limits and `|r| < 1`.
///
/// The limits are ordered so that `h ≥ k`. The log integrand is concave
/// in `x` with slope `−x + (r/ρ)/R(z)` (`R` the Mills ratio); the map
/// `x = h + T s/(1−s)` uses the decay length `T` read off that slope at
/// `x = h`, so the mass sits at `s = O(1)`.
fn tail_integrand(h: f64, k: f64, r: f64) -> impl Fn(f64) -> f64 {
    let (h, k) = if h >= k { (h, k) } else { (k, h) };
    let rho = ((1.0 - r) * (1.0 + r)).sqrt();
    let z = move |x: f64| (k - r * x) / rho;

    let slope = -h + (r / rho) * (-ln_mills_ratio(z(h))).exp();
    let scale = if slope <= 0.0 { 1.0 / (1.0 / rho - slope) } else { rho * (1.0 + slope * rho) };
    let ln_scale = scale.ln();

    move |s: f64| {
        if s >= 1.0 {
            return f64::NEG_INFINITY;
        }
        let w = 1.0 - s;
        let x = h + scale * s / w;
        ln_density(x) + ln_upper_tail(z(x)) + ln_scale - 2.0 * w.ln()
    }
}

/// The tail integral in linear scale; falls back to the log scale when the
/// integrand underflows.
fn tail_integral(h: f64, k: f64, r: f64) -> f64 {
    let ln_f = tail_integrand(h, k, r);
    let estimate = integrate_adaptive(|s| ln_f(s).exp(), 0.0, 1.0, &TAIL_QUADRATURE);
    if estimate.value > f64::MIN_POSITIVE * 1e10 {
        estimate.value
    } else {
        ln_tail_integral(h, k, r).exp()
    }
}

fn ln_tail_integral(h: f64, k: f64, r: f64) -> f64 {
    integrate_adaptive_ln(tail_integrand(h, k, r), 0.0, 1.0, &TAIL_QUADRATURE).ln_value.min(0.0)
}

fn moderate_correlation(h: f64, k: f64, r: f64) -> f64 {
    let rule = gauss_legendre_for_correlation(r.abs());
    let hk = h * k;
    let hs = 0.5 * (h * h + k * k);
    let asr = 0.5 * r.asin();

    let mut sum = 0.0;
    for (w, x) in rule.weights.iter().zip(rule.nodes) {
        for sign in [-1.0, 1.0] {
            let sn = (asr * (1.0 + sign * x)).sin();
            sum += w * ((sn * hk - hs) / (1.0 - sn * sn)).exp();
        }
    }
    sum * asr / TWO_PI + upper_tail(h) * upper_tail(k)
}

fn high_correlation(h: f64, k: f64, r: f64) -> f64 {
    let rule = gauss_legendre_for_correlation(r.abs());
    let (k, hk) = if r < 0.0 { (-k, -h * k) } else { (k, h * k) };

    let mut bvn = 0.0;
    if r.abs() < 1.0 {
        let a_s = (1.0 - r) * (1.0 + r);
        let a = a_s.sqrt();
        let b_s = (h - k) * (h - k);
        let c = (4.0 - hk) / 8.0;
        let d = (12.0 - hk) / 80.0;

        let asr = -0.5 * (b_s / a_s + hk);
        if asr > EXP_CUTOFF {
            bvn = a * asr.exp() * (1.0 - c * (b_s - a_s) * (1.0 - d * b_s) / 3.0 + c * d * a_s * a_s);
        }
        if hk > EXP_CUTOFF {
            let b = b_s.sqrt();
            let sp = SQRT_2PI * upper_tail(b / a);
            bvn -= (-0.5 * hk).exp() * sp * b * (1.0 - c * b_s * (1.0 - d * b_s) / 3.0);
        }

        let a = 0.5 * a;
        let mut sum = 0.0;
        for (w, x) in rule.weights.iter().zip(rule.nodes) {
            for sign in [-1.0, 1.0] {
                let xs = (a * (1.0 + sign * x)).powi(2);
                let asr = -0.5 * (b_s / xs + hk);
                if asr > EXP_CUTOFF {
                    let sp = 1.0 + c * xs * (1.0 + 5.0 * d * xs);
                    let rs = (1.0 - xs).sqrt();
                    let ep = (-0.5 * hk * xs / ((1.0 + rs) * (1.0 + rs))).exp() / rs;
                    sum += w * asr.exp() * (sp - ep);
                }
            }
        }
        bvn = (a * sum - bvn) / TWO_PI;
    }

    if r > 0.0 {
        bvn + upper_tail(h.max(k))
    } else if h >= k {
        -bvn
    } else {
        // k here is the reflected limit; the band is P(h < X < k').
        let band = if h < 0.0 { cdf(k) - cdf(h) } else { upper_tail(h) - upper_tail(k) };
        band - bvn
    }
}
