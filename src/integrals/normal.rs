//! integrals::normal — univariate standard normal building blocks.
//!
//! Purpose
//! -------
//! Provide the scalar normal-distribution functions every other layer is
//! built on: CDF and upper tail, density, their logarithms, and the Mills
//! ratio `R(x) = Φ̄(x)/φ(x)` with its derivatives.
//!
//! Key behaviors
//! -------------
//! - `cdf`/`upper_tail` are evaluated through `statrs`' `erfc`, so both
//!   tails keep full relative precision.
//! - [`mills_ratio`] switches from the direct ratio to a Laplace continued
//!   fraction for `x ≥ 10`, where `φ(x)` starts to underflow.
//! - [`ln_upper_tail`] and [`ln_cdf`] stay finite for arbitrarily large
//!   `|x|`.
//! - [`ln_mills_slope_series`] evaluates `ln[−φ(h) · (R(h+δ) − R(h))/δ]` for small
//!   `δ` by a third-order Taylor expansion, avoiding a 0/0 when the linear
//!   coefficient of a degenerate direction vanishes.
//!
//! Conventions
//! -----------
//! - `Φ` is the standard normal CDF, `Φ̄ = 1 − Φ`, `φ` the density.
//! - Derivatives of the Mills ratio follow from `R' = xR − 1`.

use statrs::function::erf::erfc;
use std::f64::consts::FRAC_1_SQRT_2;

/// `ln √(2π)`.
pub const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// `√(2π)`.
pub const SQRT_2PI: f64 = 2.506_628_274_631_000_7;

/// Below this argument the Mills ratio is the direct quotient `Φ̄/φ`.
const MILLS_CF_THRESHOLD: f64 = 10.0;

const MILLS_CF_MAX_TERMS: usize = 500;

/// Standard normal CDF `Φ(z)`.
pub fn cdf(z: f64) -> f64 {
    0.5 * erfc(-z * FRAC_1_SQRT_2)
}

/// Standard normal upper tail `Φ̄(z) = Φ(−z)`.
pub fn upper_tail(z: f64) -> f64 {
    0.5 * erfc(z * FRAC_1_SQRT_2)
}

/// Standard normal density `φ(z)`.
pub fn density(z: f64) -> f64 {
    (-0.5 * z * z).exp() / SQRT_2PI
}

/// `ln φ(z)`, exact for arguments where `φ(z)` underflows.
pub fn ln_density(z: f64) -> f64 {
    -0.5 * z * z - LN_SQRT_2PI
}

/// Mills ratio `R(x) = Φ̄(x)/φ(x)`.
///
/// Notes
/// -----
/// - For `x ≥ 10` the continued fraction
///   `R(x) = 1/(x + 1/(x + 2/(x + 3/(x + …))))` is evaluated with the
///   modified Lentz algorithm.
/// - For very negative `x` the ratio overflows to `+∞`, which is the
///   correct limit.
pub fn mills_ratio(x: f64) -> f64 {
    if x < MILLS_CF_THRESHOLD {
        return upper_tail(x) / density(x);
    }
    let tiny = 1e-300;
    let mut f = x;
    let mut c = x;
    let mut d = 0.0;
    for j in 1..=MILLS_CF_MAX_TERMS {
        let a = j as f64;
        d = x + a * d;
        if d == 0.0 {
            d = tiny;
        }
        d = 1.0 / d;
        c = x + a / c;
        if c == 0.0 {
            c = tiny;
        }
        let delta = c * d;
        f *= delta;
        if (delta - 1.0).abs() < 4.0 * f64::EPSILON {
            break;
        }
    }
    1.0 / f
}

/// `ln Φ̄(x)`, finite for every finite `x`.
pub fn ln_upper_tail(x: f64) -> f64 {
    if x < MILLS_CF_THRESHOLD {
        upper_tail(x).ln()
    } else {
        mills_ratio(x).ln() + ln_density(x)
    }
}

/// `ln Φ(x) = ln Φ̄(−x)`.
pub fn ln_cdf(x: f64) -> f64 {
    ln_upper_tail(-x)
}

/// `ln R(x)`, finite for every finite `x` (including very negative `x`,
/// where `R` itself overflows).
pub fn ln_mills_ratio(x: f64) -> f64 {
    if x < MILLS_CF_THRESHOLD { ln_upper_tail(x) - ln_density(x) } else { mills_ratio(x).ln() }
}

/// Logarithm of the third-order Taylor evaluation of
/// `−φ(h) · (R(h+δ) − R(h)) / δ`.
///
/// Parameters
/// ----------
/// - `h`: expansion point.
/// - `delta`: step, expected `|δ| ≲ 1e-4`; the truncation error is
///   `O(δ³)` relative to the leading term.
///
/// Returns
/// -------
/// `f64`
///   The log of a positive quantity. At `δ = 0` the quantity equals
///   `φ(h) − hΦ̄(h) = ∫_h^∞ Φ̄`.
///
/// Notes
/// -----
/// - With `s = φ(h)` and `t = Φ̄(h)` the scaled derivatives are
///   `φR' = ht − s`, `φR'' = (1+h²)t − hs`, `φR''' = (h³+3h)t − (h²+2)s`.
///   For `h ≤ 0` the leading term `s − ht` has no cancellation; for
///   `h > 0` the factor `φ(h)` is split off in log space and the bracket
///   is formed from `R(h)`.
pub fn ln_mills_slope_series(h: f64, delta: f64) -> f64 {
    let h2 = h * h;
    let combine = |d1: f64, d2: f64, d3: f64| -(d1 + 0.5 * d2 * delta + d3 * delta * delta / 6.0);
    if h <= 0.0 {
        let s = density(h);
        let t = upper_tail(h);
        combine(h * t - s, (1.0 + h2) * t - h * s, (h2 * h + 3.0 * h) * t - (h2 + 2.0) * s).ln()
    } else {
        let r = mills_ratio(h);
        let bracket = combine(h * r - 1.0, (1.0 + h2) * r - h, (h2 * h + 3.0 * h) * r - h2 - 2.0);
        ln_density(h) + bracket.ln()
    }
}
