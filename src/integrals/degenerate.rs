//! integrals::degenerate — Gaussian orthant integrals with a singular or
//! nearly singular quadratic form.
//!
//! Purpose
//! -------
//! Evaluate `ln ∫_{z>0} exp(−gᵀz − ½zᵀFz) dz` when `F` is positive
//! semi-definite but rank-deficient, or report that the integral diverges.
//! The same split also serves full-rank forms too ill-conditioned to
//! complete the square accurately.
//!
//! Key behaviors
//! -------------
//! - Divergence: the integral is infinite exactly when some nonzero
//!   `u ≥ 0` with `Fu = 0` has `g·u ≤ 0`. Such vectors form a polyhedral
//!   cone inside the null space; its extreme rays are enumerated from the
//!   null basis and the first one with a non-positive slope is returned in
//!   the error.
//! - Reduction: with `r = rank F`, greedy diagonal pivoting picks `r`
//!   kept coordinates `S` whose block `A = F_SS` is positive definite; the
//!   rest `T` are degenerate. For fixed `z_T` the kept block is a Gaussian
//!   whose mean moves linearly in `z_T`, which gives
//!   `I = K · ∫_{z_T>0} exp(−βᵀz_T) P(N(μ₀ − D z_T, A⁻¹) > 0) dz_T`
//!   with `D = A⁻¹F_ST`, `β = g_T + F_TS μ₀` and `K` the completed-square
//!   scale of `(g_S, A)`.
//! - Near-singular forms: [`DegenerateReduction::near_singular`] keeps the
//!   coordinates spanning the well-conditioned eigenvalues and carries the
//!   small Schur complement `C = F_TT − F_TS A⁻¹ F_ST` as an extra
//!   `exp(−½ z_Tᵀ C z_T)` factor. Nothing is divided by `C`, so the result
//!   stays accurate where `F⁻¹` has lost most of its digits.
//! - The remaining `d` dimensional integral is peeled one degenerate
//!   coordinate at a time. Uncoupled columns of `D` that vanish factor out
//!   as `1/β_j` (or a Mills ratio when `C_jj > 0`); the `r = d = 1` flat
//!   case has a closed form; the rest is adaptive quadrature of the log
//!   integrand over `t ∈ [0, ∞)` on a rational map.
//!
//! Invariants & assumptions
//! ------------------------
//! - For singular forms the projected matrix (eigenvalues below the rank
//!   tolerance set to zero) is used throughout, so the split is exact and
//!   `C = 0`.
//! - After [`DegenerateReduction::new`] succeeds, every column of `D`
//!   with no positive entry has `β_j > 0`, so each peeled integral
//!   converges. Near-singular splits need no such check: `C` has a
//!   positive diagonal.
//! - Every level works on the log scale; a vanishing orthant probability
//!   is `−∞`, never an error.
//!
//! Downstream usage
//! ----------------
//! - Called by `integrals::gaussian` when the spectrum of `F` is not full
//!   rank, or when its condition number is above the configured threshold.

use crate::{
    integrals::{
        decomposition::{GaussianMoments, Spectrum, pivot_order},
        errors::{IntegralError, IntegralResult},
        normal::{ln_mills_ratio, ln_mills_slope_series, ln_upper_tail},
        options::{IntegrationOptions, QuadratureOptions},
        orthant::ln_positive_orthant,
        quadrature::integrate_adaptive_ln,
    },
    numerical_stability::{RAY_TOL, log_add_exp, log_sub_exp},
};
use nalgebra::{DMatrix, DVector};

/// Slopes at or below this multiple of `max|g|` count as non-decaying.
const SLOPE_TOL: f64 = 1e-12;

/// Cofactor vectors smaller than this come from dependent null-basis rows.
const COFACTOR_TOL: f64 = 1e-10;

/// Below this `|β/p|` the closed form loses digits to cancellation and the
/// Taylor expansion takes over.
const SLOPE_SERIES_CUTOFF: f64 = 1e-4;

/// DegenerateReduction — a form split into a Gaussian block and a set of
/// flat (or nearly flat) directions.
///
/// Fields
/// ------
/// - `kept`, `degenerate`: the index sets `S` (pivot order) and `T`
///   (ascending).
/// - `log_scale`: `ln K` for `(g_S, A)`; `0` when `r = 0`.
/// - `mean`, `covariance`: `μ₀ = −A⁻¹g_S` and `A⁻¹`.
/// - `shift`: `D = A⁻¹F_ST`, `r × d`. Negligible columns are stored as
///   exact zeros.
/// - `slope`: `β = g_T + F_TS μ₀`, the exponent's rate along the null
///   direction attached to each degenerate coordinate.
/// - `curvature`: `C = F_TT − F_TS A⁻¹ F_ST`, `d × d`; exactly zero for a
///   singular form.
#[derive(Debug, Clone)]
pub struct DegenerateReduction {
    pub kept: Vec<usize>,
    pub degenerate: Vec<usize>,
    pub log_scale: f64,
    pub mean: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub shift: DMatrix<f64>,
    pub slope: DVector<f64>,
    pub curvature: DMatrix<f64>,
}

impl DegenerateReduction {
    /// Split a rank-deficient `(g, F)` along the spectrum of `F`.
    ///
    /// Errors
    /// ------
    /// - `IntegralError::DivergentDirection`
    ///   A degenerate coordinate's null direction `(−D_j on S, e_j on T)`
    ///   is non-negative while `β_j` is not positive.
    pub fn new(
        g: &DVector<f64>, spectrum: &Spectrum, opts: &IntegrationOptions,
    ) -> IntegralResult<Self> {
        let f = spectrum.projected();
        let mut reduction = Self::split(g, &f, spectrum.rank, opts)?;
        reduction.curvature.fill(0.0);
        reduction.clear_negligible_columns();
        reduction.check_flat_directions(g)?;
        Ok(reduction)
    }

    /// Split a full-rank but ill-conditioned `(g, F)`, keeping the
    /// coordinates that span eigenvalues within `condition_threshold` of
    /// the largest.
    ///
    /// Errors
    /// ------
    /// - `IntegralError::NotPositiveSemidefinite` if the kept block fails
    ///   its own spectral check (only for inputs that were not PSD to begin
    ///   with).
    pub fn near_singular(
        g: &DVector<f64>, f: &DMatrix<f64>, spectrum: &Spectrum, opts: &IntegrationOptions,
    ) -> IntegralResult<Self> {
        let count = spectrum.effective_rank(opts.condition_threshold).max(1);
        let mut reduction = Self::split(g, f, count, opts)?;
        let c = &mut reduction.curvature;
        for i in 0..c.nrows() {
            c[(i, i)] = c[(i, i)].max(0.0);
            for j in (i + 1)..c.ncols() {
                let avg = 0.5 * (c[(i, j)] + c[(j, i)]);
                c[(i, j)] = avg;
                c[(j, i)] = avg;
            }
        }
        reduction.clear_negligible_columns();
        Ok(reduction)
    }

    fn split(
        g: &DVector<f64>, f: &DMatrix<f64>, rank: usize, opts: &IntegrationOptions,
    ) -> IntegralResult<Self> {
        let n = g.len();
        let kept = pivot_order(f, rank);
        let degenerate: Vec<usize> = (0..n).filter(|i| !kept.contains(i)).collect();
        let g_t = DVector::from_iterator(degenerate.len(), degenerate.iter().map(|&i| g[i]));
        let f_tt = f.select_rows(&degenerate).select_columns(&degenerate);

        if rank == 0 {
            return Ok(DegenerateReduction {
                kept,
                degenerate,
                log_scale: 0.0,
                mean: DVector::zeros(0),
                covariance: DMatrix::zeros(0, 0),
                shift: DMatrix::zeros(0, n),
                slope: g_t,
                curvature: f_tt,
            });
        }

        let rows = f.select_rows(&kept);
        let a = rows.select_columns(&kept);
        let b = rows.select_columns(&degenerate);
        let g_s = DVector::from_iterator(rank, kept.iter().map(|&i| g[i]));

        let block_spectrum = Spectrum::new(&a, opts.rank_tolerance)?;
        let moments = GaussianMoments::new(&g_s, &a, &block_spectrum, opts.condition_threshold);
        let shift = &moments.covariance * &b;
        let slope = g_t + b.transpose() * &moments.mean;
        let curvature = f_tt - b.transpose() * &shift;
        Ok(DegenerateReduction {
            kept,
            degenerate,
            log_scale: moments.log_scale,
            mean: moments.mean,
            covariance: moments.covariance,
            shift,
            slope,
            curvature,
        })
    }

    pub fn rank(&self) -> usize {
        self.kept.len()
    }

    /// `ln V`, the log of the reduced integral; `ln I = log_scale + ln V`.
    pub fn ln_reduced_integral(&self, quad: &QuadratureOptions) -> f64 {
        ln_tail_integral(
            &self.mean,
            &self.covariance,
            &self.shift,
            self.slope.as_slice(),
            &self.curvature,
            quad,
        )
    }

    /// The null vector of `F` attached to degenerate coordinate `j`,
    /// scaled to unit max-norm.
    pub fn null_direction(&self, j: usize) -> DVector<f64> {
        let n = self.kept.len() + self.degenerate.len();
        let mut u = DVector::<f64>::zeros(n);
        for (i, &idx) in self.kept.iter().enumerate() {
            u[idx] = -self.shift[(i, j)];
        }
        u[self.degenerate[j]] = 1.0;
        let scale = u.amax();
        u / scale
    }

    fn clear_negligible_columns(&mut self) {
        let tol = RAY_TOL * (1.0 + self.shift.amax());
        for mut col in self.shift.column_iter_mut() {
            if col.amax() <= tol {
                col.fill(0.0);
            }
        }
    }

    fn check_flat_directions(&self, g: &DVector<f64>) -> IntegralResult<()> {
        let slope_floor = SLOPE_TOL * g.amax();
        for j in 0..self.degenerate.len() {
            let in_orthant = self.shift.column(j).iter().all(|&d| d <= 0.0);
            if in_orthant && self.slope[j] <= slope_floor {
                let direction = self.null_direction(j);
                let slope = g.dot(&direction);
                return Err(IntegralError::DivergentDirection {
                    direction: direction.as_slice().to_vec(),
                    slope,
                });
            }
        }
        Ok(())
    }
}

/// Search the cone `{u ≥ 0 : u ∈ span(null)}` for an extreme ray with
/// `g·u ≤ 0`.
///
/// Parameters
/// ----------
/// - `g`: `&DVector<f64>`
///   Linear coefficients.
/// - `null`: `&DMatrix<f64>`
///   `n × d` orthonormal null-space basis.
///
/// Returns
/// -------
/// `Option<(DVector<f64>, f64)>`
///   The offending ray (unit max-norm) and its slope, or `None` when every
///   ray has a positive slope (including when the cone is `{0}`).
///
/// Notes
/// -----
/// - An extreme ray of `{c : Nc ≥ 0}` in `d` dimensions is fixed by
///   `d − 1` active rows of `N`; it is their cofactor vector up to sign.
///   All `C(n, d − 1)` row subsets are tried.
pub fn find_divergent_direction(
    g: &DVector<f64>, null: &DMatrix<f64>,
) -> Option<(DVector<f64>, f64)> {
    let (n, d) = null.shape();
    if d == 0 {
        return None;
    }
    let slope_floor = SLOPE_TOL * g.amax();

    let check = |c: DVector<f64>| -> Option<(DVector<f64>, f64)> {
        let base = null * c;
        for sign in [1.0, -1.0] {
            let u = sign * &base;
            let scale = u.amax();
            if scale <= COFACTOR_TOL {
                return None;
            }
            let u = u / scale;
            if u.iter().all(|&v| v >= -RAY_TOL) {
                let slope = g.dot(&u);
                if slope <= slope_floor {
                    return Some((u, slope));
                }
            }
        }
        None
    };

    if d == 1 {
        return check(DVector::from_element(1, 1.0));
    }

    for rows in combinations(n, d - 1) {
        let active = null.select_rows(&rows);
        let cofactors = DVector::from_iterator(
            d,
            (0..d).map(|k| {
                let minor = active.clone().remove_column(k).determinant();
                if k % 2 == 0 { minor } else { -minor }
            }),
        );
        if cofactors.amax() <= COFACTOR_TOL {
            continue;
        }
        if let Some(found) = check(cofactors) {
            return Some(found);
        }
    }
    None
}

/// Every `k`-subset of `0..n` in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn extend(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            if n - i < k - current.len() {
                break;
            }
            current.push(i);
            extend(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    extend(0, n, k, &mut Vec::with_capacity(k), &mut out);
    out
}

/// `ln ∫_{t>0} exp(−βᵀt − ½tᵀCt) P(N(mean − D t, cov) > 0) dt`, peeling
/// the last column of `D` first.
///
/// The peeled coordinate's coupling `C[..j, j]` moves the remaining slopes
/// linearly in `t`.
fn ln_tail_integral(
    mean: &DVector<f64>, cov: &DMatrix<f64>, shift: &DMatrix<f64>, slope: &[f64],
    curvature: &DMatrix<f64>, quad: &QuadratureOptions,
) -> f64 {
    let d = slope.len();
    if d == 0 {
        return ln_positive_orthant(mean, cov, quad);
    }

    let j = d - 1;
    let beta = slope[j];
    let c = curvature[(j, j)];
    let col = shift.column(j).into_owned();
    let coupling: Vec<f64> = (0..j).map(|i| curvature[(i, j)]).collect();
    let rest_shift = shift.columns(0, j).into_owned();
    let rest_curvature = curvature.view((0, 0), (j, j)).into_owned();
    let rest_slope = &slope[..j];

    let coupled = coupling.iter().any(|&k| k != 0.0);
    if !coupled && col.iter().all(|&v| v == 0.0) {
        let ln_peeled = if c > 0.0 {
            ln_mills_ratio(beta / c.sqrt()) - 0.5 * c.ln()
        } else {
            -beta.ln()
        };
        return ln_peeled
            + ln_tail_integral(mean, cov, &rest_shift, rest_slope, &rest_curvature, quad);
    }
    if mean.len() == 1 && d == 1 && c == 0.0 {
        return ln_single_tail(mean[0], cov[(0, 0)].sqrt(), col[0], beta);
    }

    let horizon = match tail_horizon(mean, cov, &col, beta, c) {
        Some(h) => h,
        None => return f64::INFINITY,
    };
    let ln_integrand = |t: f64| -> f64 {
        let shifted = mean - t * &col;
        let moved: Vec<f64> = rest_slope.iter().zip(&coupling).map(|(b, k)| b + k * t).collect();
        let ln_v = ln_tail_integral(&shifted, cov, &rest_shift, &moved, &rest_curvature, quad);
        ln_v - beta * t - 0.5 * c * t * t
    };
    let ln_horizon = horizon.ln();
    let estimate = integrate_adaptive_ln(
        |s: f64| {
            if s >= 1.0 {
                return f64::NEG_INFINITY;
            }
            let w = 1.0 - s;
            ln_integrand(horizon * s / w) + ln_horizon - 2.0 * w.ln()
        },
        0.0,
        1.0,
        quad,
    );
    estimate.ln_value
}

/// Scale of `t` over which the peeled integrand carries its mass.
///
/// Each kept coordinate with `c_i > 0` is pushed below zero past
/// `t ≈ m_i/c_i`, with spread `σ_i/c_i`; growth `e^{|β|t}` moves the peak
/// out by `|β|(σ_i/c_i)²`. A positive `β` caps the scale at `1/β`, and a
/// positive curvature at the Gaussian factor's peak plus three widths.
fn tail_horizon(
    mean: &DVector<f64>, cov: &DMatrix<f64>, col: &DVector<f64>, beta: f64, curvature: f64,
) -> Option<f64> {
    let growth = (-beta).max(0.0);
    let mut horizon = f64::INFINITY;
    for (i, &c) in col.iter().enumerate() {
        if c > 0.0 {
            let w = cov[(i, i)].sqrt() / c;
            horizon = horizon.min((mean[i] / c).max(0.0) + w * (3.0 + growth * w));
        }
    }
    if beta > 0.0 {
        horizon = horizon.min(1.0 / beta);
    }
    if curvature > 0.0 {
        horizon = horizon.min(growth / curvature + 3.0 / curvature.sqrt());
    }
    (horizon.is_finite() && horizon > 0.0).then_some(horizon)
}

/// `ln ∫_0^∞ e^{−βt} Φ((m − ct)/s) dt` in closed form.
///
/// With `h = −m/s` and `p = c/s` the integrand is `e^{−βt} Φ̄(h + pt)`;
/// integrating by parts against the Gaussian tail gives differences of
/// `Φ̄` terms, each kept on the log scale.
fn ln_single_tail(m: f64, s: f64, c: f64, beta: f64) -> f64 {
    let h = -m / s;
    let p = c / s;
    if p == 0.0 {
        return ln_upper_tail(h) - beta.ln();
    }

    let base = ln_upper_tail(h);
    if p > 0.0 {
        let delta = beta / p;
        if delta.abs() < SLOPE_SERIES_CUTOFF {
            return ln_mills_slope_series(h, delta) - p.ln();
        }
        let q = h + delta;
        let shifted = 0.5 * delta * (q + h) + ln_upper_tail(q);
        if beta > 0.0 {
            log_sub_exp(base, shifted) - beta.ln()
        } else {
            log_sub_exp(shifted, base) - (-beta).ln()
        }
    } else {
        let q = h + beta / p;
        let reflected = 0.5 * (q - h) * (q + h) + ln_upper_tail(-q);
        log_add_exp(base, reflected) - beta.ln()
    }
}
