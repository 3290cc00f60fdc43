//! integrals::orthant — positive-orthant probability of a multivariate
//! normal.
//!
//! Purpose
//! -------
//! Compute `ln P(N(μ, Σ) > 0)` for any dimension, reducing recursively to
//! the bivariate evaluator. Everything is carried on the log scale, so
//! probabilities far below `f64::MIN_POSITIVE` stay finite.
//!
//! Key behaviors
//! -------------
//! - `n = 0` is `0`, `n = 1` is `ln Φ(μ/σ)`, `n = 2` is
//!   `ln bvnu(−μ₀/σ₀, −μ₁/σ₁, Σ₀₁/(σ₀σ₁))`.
//! - `n > 2`: peel coordinate `j` with the largest marginal variance (lowest
//!   index on ties). Conditioning on `X_j = μ_j + σ_j u` shifts the rest to
//!   mean `μ_{−j} + c·u` with `c = Σ_{−j,j}/σ_j` and covariance
//!   `Σ_{−j,−j} − c cᵀ`, so
//!   `P = ∫_{h_j}^∞ φ(u) P_{n−1}(μ_{−j} + c·u, Σ_{−j,−j} − ccᵀ) du`
//!   with `h_j = −μ_j/σ_j`.
//! - The log integrand is concave in `u` and bounded above by the
//!   [`Envelope`] `ln φ(u) + min_i ln Φ(m_i(u)/s_i)`. The envelope's mode
//!   and its level `ln f(mode) − WINDOW_DROP` bound a finite window that
//!   holds all but `e^{−36}` of the mass.
//! - The outermost level integrates the window adaptively on the log scale
//!   to the configured tolerance. Inner levels apply a 16-point
//!   Gauss–Legendre rule on each side of the mode, so a level costs a
//!   fixed 33 evaluations of the next one.
//! - Coordinates with (numerically) zero variance are deterministic. At the
//!   top they contribute `0` if their mean is positive and `−∞` otherwise;
//!   after conditioning they restrict `u` to a half-line.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Σ` is symmetric positive semi-definite. The conditional covariance
//!   is re-symmetrized and its diagonal floored at zero at every level.
//! - Results are clamped to `ln P ≤ 0`.
//!
//! Downstream usage
//! ----------------
//! - `integrals::gaussian` for full-rank forms with `n > 2`, and
//!   `integrals::degenerate` for the kept block of rank-deficient forms.

use crate::{
    integrals::{
        bivariate::ln_bvnu_unchecked,
        decomposition::{Spectrum, to_dmatrix, to_dvector},
        errors::IntegralResult,
        normal::{ln_cdf, ln_density, ln_mills_ratio},
        options::{IntegrationOptions, QuadratureOptions},
        quadrature::{GL16, integrate_adaptive_ln, legendre_ln},
        validation::validate_gaussian_form,
    },
    numerical_stability::log_add_exp,
};
use nalgebra::{DMatrix, DVector};
use ndarray::{ArrayView1, ArrayView2};

/// Variances at or below this fraction of the largest one are treated as
/// zero.
const DETERMINISTIC_VARIANCE: f64 = 1e-14;

/// Log drop below the reference value that bounds the integration window.
const WINDOW_DROP: f64 = 36.0;

/// Relative width at which window and mode searches stop.
const BRACKET_TOL: f64 = 1e-6;

/// Doublings allowed when searching for a finite bracket.
const MAX_EXPANSIONS: usize = 64;

/// Probability that `N(mean, covariance)` lies in the open positive orthant.
///
/// Parameters
/// ----------
/// - `mean`: `ArrayView1<f64>`
///   Mean vector of length `n ≥ 1`.
/// - `covariance`: `ArrayView2<f64>`
///   Symmetric positive semi-definite `n × n` covariance.
/// - `opts`: `&IntegrationOptions`
///   Symmetry tolerance, PSD tolerance and quadrature settings.
///
/// Returns
/// -------
/// `IntegralResult<f64>`
///   The probability in `[0, 1]`.
///
/// Errors
/// ------
/// - `IntegralError::DimensionMismatch`, `EmptyInput`, `NonFiniteInput`,
///   `NotSymmetric` for malformed inputs.
/// - `IntegralError::NotPositiveSemidefinite` for an indefinite covariance.
///
/// Examples
/// --------
/// ```rust
/// use ndarray::array;
/// use orthant_integrals::integrals::{IntegrationOptions, orthant_probability};
/// let cov = array![[1.0, 0.5, 0.5], [0.5, 1.0, 0.5], [0.5, 0.5, 1.0]];
/// let p = orthant_probability(array![0.0, 0.0, 0.0].view(), cov.view(),
///     &IntegrationOptions::default()).unwrap();
/// assert!((p - 0.25).abs() < 1e-9);
/// ```
pub fn orthant_probability(
    mean: ArrayView1<f64>, covariance: ArrayView2<f64>, opts: &IntegrationOptions,
) -> IntegralResult<f64> {
    Ok(ln_orthant_probability(mean, covariance, opts)?.exp())
}

/// `ln P(N(mean, covariance) > 0)`, finite however small the probability.
///
/// Same inputs and errors as [`orthant_probability`]; `−∞` only when the
/// orthant is unreachable (a deterministic coordinate with non-positive
/// mean).
pub fn ln_orthant_probability(
    mean: ArrayView1<f64>, covariance: ArrayView2<f64>, opts: &IntegrationOptions,
) -> IntegralResult<f64> {
    let sym = validate_gaussian_form(mean, covariance, opts.symmetry_tolerance)?;
    let cov = to_dmatrix(&sym);
    Spectrum::new(&cov, opts.rank_tolerance)?;
    Ok(ln_positive_orthant(&to_dvector(mean), &cov, &opts.quadrature))
}

/// Unvalidated recursion behind [`ln_orthant_probability`].
pub(crate) fn ln_positive_orthant(
    mean: &DVector<f64>, cov: &DMatrix<f64>, quad: &QuadratureOptions,
) -> f64 {
    ln_orthant_level(mean, cov, quad, Level::Outer)
}

/// Position in the recursion; only the outermost level adapts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Outer,
    Inner,
}

fn ln_orthant_level(
    mean: &DVector<f64>, cov: &DMatrix<f64>, quad: &QuadratureOptions, level: Level,
) -> f64 {
    let n = mean.len();
    if n == 0 {
        return 0.0;
    }

    let max_var = (0..n).map(|i| cov[(i, i)]).fold(0.0_f64, f64::max);
    let mut random = Vec::with_capacity(n);
    for i in 0..n {
        if cov[(i, i)] <= DETERMINISTIC_VARIANCE * max_var {
            if mean[i] <= 0.0 {
                return f64::NEG_INFINITY;
            }
        } else {
            random.push(i);
        }
    }
    if random.len() < n {
        let sub_mean = DVector::from_iterator(random.len(), random.iter().map(|&i| mean[i]));
        let sub_cov = cov.select_rows(&random).select_columns(&random);
        return ln_orthant_level(&sub_mean, &sub_cov, quad, level);
    }

    let value = match n {
        1 => ln_cdf(mean[0] / cov[(0, 0)].sqrt()),
        2 => {
            let s0 = cov[(0, 0)].sqrt();
            let s1 = cov[(1, 1)].sqrt();
            let r = (cov[(0, 1)] / (s0 * s1)).clamp(-1.0, 1.0);
            ln_bvnu_unchecked(-mean[0] / s0, -mean[1] / s1, r)
        }
        _ => peel(mean, cov, quad, level),
    };
    value.min(0.0)
}

fn peel(mean: &DVector<f64>, cov: &DMatrix<f64>, quad: &QuadratureOptions, level: Level) -> f64 {
    let n = mean.len();
    let mut j = 0;
    for i in 1..n {
        if cov[(i, i)] > cov[(j, j)] {
            j = i;
        }
    }
    let sigma = cov[(j, j)].sqrt();

    let rest: Vec<usize> = (0..n).filter(|&i| i != j).collect();
    let base = DVector::from_iterator(n - 1, rest.iter().map(|&i| mean[i]));
    let shift = DVector::from_iterator(n - 1, rest.iter().map(|&i| cov[(i, j)] / sigma));

    let mut cond = cov.select_rows(&rest).select_columns(&rest);
    for a in 0..n - 1 {
        for b in a..n - 1 {
            let v = cond[(a, b)] - shift[a] * shift[b];
            let v = if a == b { v.max(0.0) } else { v };
            cond[(a, b)] = v;
            cond[(b, a)] = v;
        }
    }

    // Coordinates fixed by u cut the range of u; the rest shape the envelope.
    let mut lower = -mean[j] / sigma;
    let mut upper = f64::INFINITY;
    let max_var = (0..n - 1).map(|a| cond[(a, a)]).fold(0.0_f64, f64::max);
    let mut margins = Vec::with_capacity(n - 1);
    for a in 0..n - 1 {
        if cond[(a, a)] <= DETERMINISTIC_VARIANCE * max_var {
            if shift[a] > 0.0 {
                lower = lower.max(-base[a] / shift[a]);
            } else if shift[a] < 0.0 {
                upper = upper.min(-base[a] / shift[a]);
            } else if base[a] <= 0.0 {
                return f64::NEG_INFINITY;
            }
        } else {
            margins.push(Margin { base: base[a], shift: shift[a], sd: cond[(a, a)].sqrt() });
        }
    }
    if !(lower < upper) {
        return f64::NEG_INFINITY;
    }

    let mut ln_f = |u: f64| {
        let shifted = &base + u * &shift;
        ln_density(u) + ln_orthant_level(&shifted, &cond, quad, Level::Inner)
    };

    let envelope = Envelope { margins };
    let mode = envelope.mode(lower, upper);
    let mut reference = ln_f(mode);
    if reference == f64::NEG_INFINITY {
        reference = envelope.value(mode);
    }
    let (left, right) = envelope.window(lower, mode, upper, reference - WINDOW_DROP);

    match level {
        Level::Outer => integrate_adaptive_ln(&mut ln_f, left, right, quad).ln_value,
        Level::Inner => log_add_exp(
            legendre_ln(&mut ln_f, left, mode, &GL16),
            legendre_ln(&mut ln_f, mode, right, &GL16),
        ),
    }
}

/// A conditioned coordinate `N(base + shift·u, sd²)`.
#[derive(Debug, Clone, Copy)]
struct Margin {
    base: f64,
    shift: f64,
    sd: f64,
}

impl Margin {
    fn ln_positive(&self, u: f64) -> f64 {
        ln_cdf((self.base + self.shift * u) / self.sd)
    }

    /// `d/du ln Φ(t)` with `t = (base + shift·u)/sd`; `φ(t)/Φ(t) = 1/R(−t)`.
    fn slope(&self, u: f64) -> f64 {
        let t = (self.base + self.shift * u) / self.sd;
        (self.shift / self.sd) * (-ln_mills_ratio(-t)).exp()
    }
}

/// Envelope — concave upper bound `ln φ(u) + min_i ln Φ(m_i(u)/s_i)` of
/// the peeled log integrand.
///
/// Each conditioned coordinate alone is at least as likely to be positive
/// as all of them together, so the envelope dominates the integrand; the
/// minimum of concave functions is concave, so its super-level sets are
/// intervals found by bisection.
#[derive(Debug)]
struct Envelope {
    margins: Vec<Margin>,
}

impl Envelope {
    /// Smallest margin log-probability at `u` and the margin attaining it.
    fn tightest(&self, u: f64) -> Option<(f64, &Margin)> {
        self.margins
            .iter()
            .map(|m| (m.ln_positive(u), m))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn value(&self, u: f64) -> f64 {
        ln_density(u) + self.tightest(u).map_or(0.0, |(ln_p, _)| ln_p)
    }

    /// A supergradient: the slope of the active piece.
    fn slope(&self, u: f64) -> f64 {
        -u + self.tightest(u).map_or(0.0, |(_, m)| m.slope(u))
    }

    /// Maximizer on `[lower, upper]`, `lower` finite.
    fn mode(&self, lower: f64, upper: f64) -> f64 {
        if self.slope(lower) <= 0.0 {
            return lower;
        }
        if upper.is_finite() && self.slope(upper) >= 0.0 {
            return upper;
        }
        let far = if upper.is_finite() { upper } else { expand(lower, |u| self.slope(u) > 0.0) };
        let (a, b) = bisect(|u| self.slope(u) > 0.0, lower, far);
        0.5 * (a + b)
    }

    /// Interval around `mode` outside which the envelope is below `floor`.
    fn window(&self, lower: f64, mode: f64, upper: f64, floor: f64) -> (f64, f64) {
        let above = |u: f64| self.value(u) >= floor;
        let left = if above(lower) { lower } else { bisect(|u| !above(u), lower, mode).0 };
        let right = if upper.is_finite() && above(upper) {
            upper
        } else {
            let far = if upper.is_finite() { upper } else { expand(mode, above) };
            bisect(above, mode, far).1
        };
        (left, right)
    }
}

/// First `from + 2^m` (m ≥ 0) where `holds` fails.
fn expand(from: f64, holds: impl Fn(f64) -> bool) -> f64 {
    let mut step = 1.0;
    for _ in 0..MAX_EXPANSIONS {
        if !holds(from + step) {
            break;
        }
        step *= 2.0;
    }
    from + step
}

/// Shrink `[a, b]` with `holds(a)` and `!holds(b)` until its width is
/// below `BRACKET_TOL` relative to the endpoints.
fn bisect(holds: impl Fn(f64) -> bool, mut a: f64, mut b: f64) -> (f64, f64) {
    while (b - a).abs() > BRACKET_TOL * (1.0 + a.abs() + b.abs()) {
        let c = 0.5 * (a + b);
        if c == a || c == b {
            break;
        }
        if holds(c) {
            a = c;
        } else {
            b = c;
        }
    }
    (a, b)
}
