//! integrals — Gaussian integrals over the positive orthant.
//!
//! Purpose
//! -------
//! Evaluate `−ln ∫_{z>0} exp(−gᵀz − ½zᵀFz) dz` for symmetric positive
//! semi-definite `F`, together with the bivariate upper-orthant probability
//! `bvnu(h, k, r)` it bottoms out in. These are the likelihood terms of a
//! model-fitting pipeline that marginalizes non-negative linear amplitudes.
//!
//! Key behaviors
//! -------------
//! - [`bvnu`] evaluates `P(X > h, Y > k)` for a standard bivariate normal
//!   with correlation `r` to near machine precision; [`ln_bvnu`] returns its
//!   logarithm, finite far beyond `f64` underflow.
//! - [`orthant_probability`] and [`ln_orthant_probability`] evaluate
//!   `P(N(μ, Σ) > 0)` in any dimension by peeling the highest-variance
//!   coordinate, integrating on the log scale over a window around the
//!   integrand's mode.
//! - [`integrate_gaussian`] / [`GaussianForm::integrate`] complete the
//!   square for full-rank `F` (Cholesky, spectral fallback) and route
//!   rank-deficient `F` through the degeneracy handler, which either
//!   integrates the flat directions or reports divergence.
//! - [`amplitude_marginal_likelihood`] wraps the common linear-model case.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every routine is a pure function of its inputs: no shared state, no
//!   I/O, safe to call from many threads.
//! - Numerical rank is decided by a relative eigenvalue threshold
//!   ([`IntegrationOptions::rank_tolerance`], default `1e-12 · λ_max`).
//! - A divergent integral is always an [`IntegralError`] with
//!   [`ErrorKind::DivergentIntegral`]. Probabilities are carried as
//!   logarithms, so a convergent integral always has a finite `−ln`
//!   value, even when its orthant probability underflows `f64`.
//!
//! Conventions
//! -----------
//! - `ndarray` views at the public boundary; `nalgebra` inside for
//!   eigendecompositions, Cholesky factors and sub-matrix selection.
//! - Fallbacks between numerical branches are reported through the `log`
//!   facade at `debug` level; the library installs no logger.
//!
//! Downstream usage
//! ----------------
//! - `use orthant_integrals::integrals::prelude::*;` imports the main
//!   entry points, options and error types.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests against closed forms; the Monte
//!   Carlo cross-check and the degenerate-limit continuity check live in
//!   `tests/integration_orthant_integrals.rs`.

pub mod bivariate;
pub mod decomposition;
pub mod degenerate;
pub mod errors;
pub mod gaussian;
pub mod normal;
pub mod options;
pub mod orthant;
pub mod quadrature;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::bivariate::{bvnu, ln_bvnu};
pub use self::decomposition::{FactorizationBranch, GaussianMoments, Spectrum};
pub use self::errors::{ErrorKind, IntegralError, IntegralResult};
pub use self::gaussian::{
    GaussianForm, OrthantIntegral, amplitude_marginal_likelihood, integrate_gaussian,
    integrate_gaussian_with,
};
pub use self::options::{IntegrationOptions, QuadratureOptions};
pub use self::orthant::{ln_orthant_probability, orthant_probability};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use orthant_integrals::integrals::prelude::*;
//
// to import the integration surface in a single line.

pub mod prelude {
    pub use super::bivariate::{bvnu, ln_bvnu};
    pub use super::errors::{ErrorKind, IntegralError, IntegralResult};
    pub use super::gaussian::{
        GaussianForm, OrthantIntegral, amplitude_marginal_likelihood, integrate_gaussian,
        integrate_gaussian_with,
    };
    pub use super::options::{IntegrationOptions, QuadratureOptions};
    pub use super::orthant::{ln_orthant_probability, orthant_probability};
}
