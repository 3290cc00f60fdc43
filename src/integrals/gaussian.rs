//! integrals::gaussian — negative log of a Gaussian integral over the
//! positive orthant.
//!
//! Purpose
//! -------
//! Evaluate `L(g, F) = −ln ∫_{z>0} exp(−gᵀz − ½zᵀFz) dz` for a symmetric
//! positive semi-definite `F`, the quantity a model-fitting pipeline needs
//! when it marginalizes non-negative linear amplitudes out of a Gaussian
//! likelihood.
//!
//! Key behaviors
//! -------------
//! - Inputs are validated (shape, finiteness, symmetry) and symmetrized.
//! - The spectrum of `F` fixes the numerical rank. Well-conditioned
//!   full-rank forms complete the square (Cholesky first, spectral
//!   fallback) and evaluate the orthant probability of `N(−F⁻¹g, F⁻¹)`:
//!   - `n = 1` through the log Mills ratio, finite for any `g`;
//!   - `n = 2` through `ln_bvnu` with `r = −F₀₁/√(F₀₀F₁₁)`;
//!   - `n > 2` through the peeled recursion in `integrals::orthant`.
//!
//!   The orthant probability is carried as a logarithm throughout, so a
//!   large `g`, whose completed square puts the mean deep outside the
//!   orthant, still returns a finite `L`.
//! - Rank-deficient forms go to `integrals::degenerate`, which either
//!   reports a divergent direction or integrates the flat directions.
//! - Full-rank forms whose condition number exceeds the threshold report a
//!   `NumericDegradation` and are split the same way, with the small Schur
//!   complement kept as curvature along the near-flat directions.
//!
//! Invariants & assumptions
//! ------------------------
//! - The result is finite for every convergent integral, including those
//!   whose orthant probability is below `f64::MIN_POSITIVE`; it is never
//!   NaN for validated inputs.
//! - Divergence is always an `Err`, never an infinite `Ok` value.
//!
//! Conventions
//! -----------
//! - `ndarray` at the boundary; `nalgebra` for every factorization.
//!
//! Downstream usage
//! ----------------
//! - Python callers reach [`integrate_gaussian`] through the
//!   `python-bindings` feature.
//! - [`amplitude_marginal_likelihood`] is the form most callers want: a
//!   linear model `y ≈ M a` with `a ≥ 0` and unit noise.
//!
//! Testing notes
//! -------------
//! - Unit tests here cover routing by rank and dimension against closed
//!   forms; Monte Carlo and degenerate-limit checks live in
//!   `tests/integration_orthant_integrals.rs`.

use crate::integrals::{
    bivariate::ln_bvnu_unchecked,
    decomposition::{
        FactorizationBranch, GaussianMoments, NumericDegradation, Spectrum, to_dmatrix, to_dvector,
    },
    degenerate::{DegenerateReduction, find_divergent_direction},
    errors::{IntegralError, IntegralResult},
    normal::ln_mills_ratio,
    options::IntegrationOptions,
    orthant::ln_positive_orthant,
    validation::validate_gaussian_form,
};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// GaussianForm — validated linear and quadratic terms of
/// `exp(−gᵀz − ½zᵀFz)`.
///
/// Fields
/// ------
/// - `linear`: `g`, length `n ≥ 1`, finite.
/// - `quadratic`: `F`, `n × n`, finite and exactly symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianForm {
    linear: Array1<f64>,
    quadratic: Array2<f64>,
}

impl GaussianForm {
    /// Validate `(g, F)` with the default symmetry tolerance.
    ///
    /// Errors
    /// ------
    /// - `IntegralError::DimensionMismatch`, `EmptyInput`, `NonFiniteInput`,
    ///   `NotSymmetric`.
    pub fn new(g: ArrayView1<f64>, f: ArrayView2<f64>) -> IntegralResult<Self> {
        Self::with_symmetry_tolerance(g, f, IntegrationOptions::default().symmetry_tolerance)
    }

    /// Validate `(g, F)` accepting asymmetry up to `symmetry_tolerance`
    /// relative to `max|F|`.
    pub fn with_symmetry_tolerance(
        g: ArrayView1<f64>, f: ArrayView2<f64>, symmetry_tolerance: f64,
    ) -> IntegralResult<Self> {
        let quadratic = validate_gaussian_form(g, f, symmetry_tolerance)?;
        Ok(GaussianForm { linear: g.to_owned(), quadratic })
    }

    /// The form of `−ln ∫_{a>0} exp(−½|Ma − y|²) da` without its constant
    /// `½|y|²`: `g = −Mᵀy`, `F = MᵀM`.
    ///
    /// Errors
    /// ------
    /// - `IntegralError::DimensionMismatch` when `y` does not match the rows
    ///   of `M`.
    /// - `IntegralError::NonFiniteInput` / `EmptyInput` as for [`new`](Self::new).
    pub fn from_linear_model(design: ArrayView2<f64>, data: ArrayView1<f64>) -> IntegralResult<Self> {
        let (rows, cols) = design.dim();
        if data.len() != rows {
            return Err(IntegralError::DimensionMismatch { gradient: data.len(), rows, cols });
        }
        if let Some((index, &value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(IntegralError::NonFiniteInput { name: "y", index, value });
        }
        if let Some((index, &value)) = design.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(IntegralError::NonFiniteInput { name: "M", index, value });
        }
        let g = -design.t().dot(&data);
        let f = design.t().dot(&design);
        Self::new(g.view(), f.view())
    }

    pub fn dim(&self) -> usize {
        self.linear.len()
    }

    pub fn linear(&self) -> ArrayView1<'_, f64> {
        self.linear.view()
    }

    pub fn quadratic(&self) -> ArrayView2<'_, f64> {
        self.quadratic.view()
    }

    /// Integrate over the positive orthant.
    ///
    /// Returns
    /// -------
    /// `IntegralResult<OrthantIntegral>`
    ///   `−ln I` together with the numerical rank of `F` and the
    ///   factorization that produced the moments.
    ///
    /// Errors
    /// ------
    /// - `IntegralError::NotPositiveSemidefinite` when `F` has a clearly
    ///   negative eigenvalue.
    /// - `IntegralError::DivergentDirection` when a non-negative null
    ///   direction of `F` does not decay.
    pub fn integrate(&self, opts: &IntegrationOptions) -> IntegralResult<OrthantIntegral> {
        let g = to_dvector(self.linear.view());
        let f = to_dmatrix(&self.quadratic);
        let spectrum = Spectrum::new(&f, opts.rank_tolerance)?;

        if !spectrum.is_full_rank() {
            return degenerate_integral(&g, &spectrum, opts);
        }
        match full_rank_integral(&g, &f, &spectrum, opts) {
            Ok(result) => Ok(result),
            Err(degradation) => {
                log::debug!(
                    "completing the square is unstable (condition number {:.3e}): {}; \
                     splitting off near-flat directions",
                    degradation.condition,
                    degradation.reason
                );
                near_singular_integral(&g, &f, &spectrum, opts)
            }
        }
    }
}

/// OrthantIntegral — result of [`GaussianForm::integrate`].
///
/// Fields
/// ------
/// - `neg_log_integral`: `−ln I`; `+∞` if `I` underflows.
/// - `rank`: numerical rank of `F` used for routing.
/// - `branch`: factorization of the full-rank moments; `None` for `n = 1`
///   and for forms evaluated through the kept/flat split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthantIntegral {
    pub neg_log_integral: f64,
    pub rank: usize,
    pub branch: Option<FactorizationBranch>,
}

impl OrthantIntegral {
    /// `I` itself; may underflow to `0` or overflow to `∞`.
    pub fn value(&self) -> f64 {
        (-self.neg_log_integral).exp()
    }

    pub fn is_degenerate(&self, dim: usize) -> bool {
        self.rank < dim
    }
}

/// `−ln ∫_{z>0} exp(−gᵀz − ½zᵀFz) dz` with default options.
///
/// Parameters
/// ----------
/// - `g`: `ArrayView1<f64>`
///   Linear coefficients, length `n ≥ 1`.
/// - `f`: `ArrayView2<f64>`
///   Symmetric positive semi-definite `n × n` matrix.
///
/// Returns
/// -------
/// `IntegralResult<f64>`
///   `−ln I`, finite or `+∞`.
///
/// Errors
/// ------
/// - Invalid inputs: `DimensionMismatch`, `EmptyInput`, `NonFiniteInput`,
///   `NotSymmetric` (see [`IntegralError::kind`]).
/// - Divergence: `NotPositiveSemidefinite`, `DivergentDirection`.
///
/// Examples
/// --------
/// ```rust
/// use ndarray::array;
/// use orthant_integrals::integrals::integrate_gaussian;
/// // ∫_0^∞ e^{−z²/2} dz = √(π/2)
/// let l = integrate_gaussian(array![0.0].view(), array![[1.0]].view()).unwrap();
/// assert!((l + (std::f64::consts::PI / 2.0).sqrt().ln()).abs() < 1e-12);
/// ```
pub fn integrate_gaussian(g: ArrayView1<f64>, f: ArrayView2<f64>) -> IntegralResult<f64> {
    integrate_gaussian_with(g, f, &IntegrationOptions::default())
}

/// [`integrate_gaussian`] with explicit tolerances and quadrature budget.
pub fn integrate_gaussian_with(
    g: ArrayView1<f64>, f: ArrayView2<f64>, opts: &IntegrationOptions,
) -> IntegralResult<f64> {
    let form = GaussianForm::with_symmetry_tolerance(g, f, opts.symmetry_tolerance)?;
    Ok(form.integrate(opts)?.neg_log_integral)
}

/// Negative log marginal likelihood of a linear model with non-negative
/// amplitudes and unit Gaussian noise:
/// `−ln ∫_{a>0} exp(−½|Ma − y|²) da`.
///
/// Parameters
/// ----------
/// - `design`: `ArrayView2<f64>`
///   `M`, one column per amplitude.
/// - `data`: `ArrayView1<f64>`
///   `y`, one entry per row of `M`.
/// - `opts`: `&IntegrationOptions`
///
/// Notes
/// -----
/// - Equals `½|y|² + integrate_gaussian(−Mᵀy, MᵀM)`.
/// - Collinear columns make `MᵀM` singular but the integral stays finite.
///   It diverges only when a non-negative combination of columns
///   vanishes.
pub fn amplitude_marginal_likelihood(
    design: ArrayView2<f64>, data: ArrayView1<f64>, opts: &IntegrationOptions,
) -> IntegralResult<f64> {
    let form = GaussianForm::from_linear_model(design, data)?;
    let offset = 0.5 * data.dot(&data);
    Ok(offset + form.integrate(opts)?.neg_log_integral)
}

fn full_rank_integral(
    g: &DVector<f64>, f: &DMatrix<f64>, spectrum: &Spectrum, opts: &IntegrationOptions,
) -> Result<OrthantIntegral, NumericDegradation> {
    let n = g.len();
    if n == 1 {
        let curvature = f[(0, 0)];
        let ln_integral = ln_mills_ratio(g[0] / curvature.sqrt()) - 0.5 * curvature.ln();
        return Ok(OrthantIntegral { neg_log_integral: -ln_integral, rank: 1, branch: None });
    }
    let condition = spectrum.condition_number();
    if condition.is_nan() || condition > opts.condition_threshold {
        return Err(NumericDegradation { condition, reason: "condition number above threshold" });
    }

    let moments = GaussianMoments::new(g, f, spectrum, opts.condition_threshold);
    let ln_probability = if n == 2 {
        let s0 = moments.covariance[(0, 0)].sqrt();
        let s1 = moments.covariance[(1, 1)].sqrt();
        let r = (-f[(0, 1)] / (f[(0, 0)] * f[(1, 1)]).sqrt()).clamp(-1.0, 1.0);
        ln_bvnu_unchecked(-moments.mean[0] / s0, -moments.mean[1] / s1, r)
    } else {
        ln_positive_orthant(&moments.mean, &moments.covariance, &opts.quadrature)
    };

    Ok(OrthantIntegral {
        neg_log_integral: -(moments.log_scale + ln_probability),
        rank: n,
        branch: Some(moments.branch),
    })
}

fn near_singular_integral(
    g: &DVector<f64>, f: &DMatrix<f64>, spectrum: &Spectrum, opts: &IntegrationOptions,
) -> IntegralResult<OrthantIntegral> {
    let reduction = DegenerateReduction::near_singular(g, f, spectrum, opts)?;
    let ln_integral = reduction.log_scale + reduction.ln_reduced_integral(&opts.quadrature);
    Ok(OrthantIntegral { neg_log_integral: -ln_integral, rank: spectrum.rank, branch: None })
}

fn degenerate_integral(
    g: &DVector<f64>, spectrum: &Spectrum, opts: &IntegrationOptions,
) -> IntegralResult<OrthantIntegral> {
    log::debug!(
        "quadratic form has rank {} of {}; integrating flat directions separately",
        spectrum.rank,
        spectrum.dim()
    );
    if let Some((direction, slope)) = find_divergent_direction(g, &spectrum.null_basis()) {
        return Err(IntegralError::DivergentDirection {
            direction: direction.as_slice().to_vec(),
            slope,
        });
    }

    let reduction = DegenerateReduction::new(g, spectrum, opts)?;
    let ln_integral = reduction.log_scale + reduction.ln_reduced_integral(&opts.quadrature);
    Ok(OrthantIntegral { neg_log_integral: -ln_integral, rank: reduction.rank(), branch: None })
}
