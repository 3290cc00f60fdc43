//! orthant_integrals — Gaussian integrals over the positive orthant with
//! Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the integration engine to Python via the `_orthant_integrals`
//! extension module. The central quantity is
//! `L(g, F) = −ln ∫_{z>0} exp(−gᵀz − ½zᵀFz) dz` for a symmetric positive
//! semi-definite `F`, which a model-fitting pipeline evaluates once per
//! likelihood call when it marginalizes non-negative linear amplitudes.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules: `integrals` (the bivariate evaluator,
//!   the n-dimensional integrator and the degeneracy handler), `definition`
//!   (objects, frames and bounded parameters of a fit) and
//!   `numerical_stability` (shared tolerances and log-space helpers).
//! - Define `#[pyfunction]` wrappers and the `#[pymodule]` initializer for
//!   the `_orthant_integrals` Python extension.
//! - Register the `integrals` submodule under `orthant_integrals` so that
//!   dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner modules; this file performs only
//!   FFI glue, argument extraction and error mapping.
//! - Python callers get `ValueError` for invalid parameters and
//!   `ArithmeticError` for divergent integrals, mirroring
//!   `IntegralError::kind`.
//!
//! Conventions
//! -----------
//! - Vectors are accepted as 1-D numpy arrays, pandas Series or sequences;
//!   matrices as 2-D numpy arrays, pandas DataFrames or sequences of rows.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend directly on [`integrals`] and
//!   [`definition`] and can ignore the items guarded by the
//!   `python-bindings` feature.
//! - The Python package imports `_orthant_integrals` and re-exports its
//!   `integrals` functions at the top level.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in the inner modules and by
//!   `tests/integration_orthant_integrals.rs`.

pub mod definition;
pub mod integrals;
pub mod numerical_stability;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    integrals::{GaussianForm, IntegrationOptions},
    utils::{extract_f64_matrix, extract_integration_options, extract_vector},
};

/// bvnu — `P(X > h, Y > k)` for a standard bivariate normal pair with
/// correlation `r`.
///
/// Parameters
/// ----------
/// - `h`, `k`: `f64`
///   Lower integration limits; `±inf` are accepted.
/// - `r`: `f64`
///   Correlation in `[−1, 1]`.
///
/// Errors
/// ------
/// - `ValueError` for `|r| > 1` or a NaN argument.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "bvnu", text_signature = "(h, k, r, /)")]
pub fn py_bvnu(h: f64, k: f64, r: f64) -> PyResult<f64> {
    Ok(integrals::bvnu(h, k, r)?)
}

/// ln_bvnu — `ln P(X > h, Y > k)`, finite where `bvnu` underflows to zero.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "ln_bvnu", text_signature = "(h, k, r, /)")]
pub fn py_ln_bvnu(h: f64, k: f64, r: f64) -> PyResult<f64> {
    Ok(integrals::ln_bvnu(h, k, r)?)
}

/// integrate_gaussian — `−ln ∫_{z>0} exp(−gᵀz − ½zᵀFz) dz`.
///
/// Parameters
/// ----------
/// - `g`: `&PyAny`
///   1-D array-like of length `n ≥ 1`.
/// - `f`: `&PyAny`
///   `n × n` symmetric positive semi-definite array-like.
/// - `rank_tolerance`, `condition_threshold`, `rel_tol`, `max_intervals`:
///   optional overrides of [`IntegrationOptions`].
///
/// Returns
/// -------
/// `float`
///   The negative log integral, finite for every convergent integral.
///
/// Errors
/// ------
/// - `ValueError` for malformed inputs or options.
/// - `ArithmeticError` when the integral diverges.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    name = "integrate_gaussian",
    text_signature = "(g, f, /, rank_tolerance=None, condition_threshold=None, rel_tol=None, max_intervals=None)",
    signature = (g, f, rank_tolerance = None, condition_threshold = None, rel_tol = None, max_intervals = None)
)]
pub fn py_integrate_gaussian<'py>(
    py: Python<'py>, g: &Bound<'py, PyAny>, f: &Bound<'py, PyAny>, rank_tolerance: Option<f64>,
    condition_threshold: Option<f64>, rel_tol: Option<f64>, max_intervals: Option<usize>,
) -> PyResult<f64> {
    let opts =
        extract_integration_options(rank_tolerance, condition_threshold, rel_tol, max_intervals)?;
    let g = extract_vector(py, g, "g")?;
    let f = extract_f64_matrix(f, "f")?;
    Ok(integrals::integrate_gaussian_with(g.view(), f.view(), &opts)?)
}

/// integrate_gaussian_rank — like `integrate_gaussian`, also returning the
/// numerical rank of `F` used to route the computation.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "integrate_gaussian_rank", text_signature = "(g, f, /)")]
pub fn py_integrate_gaussian_rank<'py>(
    py: Python<'py>, g: &Bound<'py, PyAny>, f: &Bound<'py, PyAny>,
) -> PyResult<(f64, usize)> {
    let g = extract_vector(py, g, "g")?;
    let f = extract_f64_matrix(f, "f")?;
    let result = GaussianForm::new(g.view(), f.view())?.integrate(&IntegrationOptions::default())?;
    Ok((result.neg_log_integral, result.rank))
}

/// orthant_probability — `P(N(mean, cov) > 0)` coordinate-wise.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "orthant_probability", text_signature = "(mean, cov, /)")]
pub fn py_orthant_probability<'py>(
    py: Python<'py>, mean: &Bound<'py, PyAny>, cov: &Bound<'py, PyAny>,
) -> PyResult<f64> {
    let mean = extract_vector(py, mean, "mean")?;
    let cov = extract_f64_matrix(cov, "cov")?;
    Ok(integrals::orthant_probability(mean.view(), cov.view(), &IntegrationOptions::default())?)
}

/// amplitude_marginal_likelihood — `−ln ∫_{a>0} exp(−½|Ma − y|²) da`.
///
/// Parameters
/// ----------
/// - `design`: `&PyAny`
///   `M`, one row per data value and one column per amplitude.
/// - `data`: `&PyAny`
///   `y`, one entry per row of `M`.
///
/// Errors
/// ------
/// - `ValueError` when shapes disagree or values are not finite.
/// - `ArithmeticError` when a non-negative combination of columns of `M`
///   vanishes.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(name = "amplitude_marginal_likelihood", text_signature = "(design, data, /)")]
pub fn py_amplitude_marginal_likelihood<'py>(
    py: Python<'py>, design: &Bound<'py, PyAny>, data: &Bound<'py, PyAny>,
) -> PyResult<f64> {
    let design = extract_f64_matrix(design, "design")?;
    let data = extract_vector(py, data, "data")?;
    Ok(integrals::amplitude_marginal_likelihood(
        design.view(),
        data.view(),
        &IntegrationOptions::default(),
    )?)
}

/// _orthant_integrals — PyO3 module initializer for the Python extension.
///
/// Key behaviors
/// -------------
/// - Create the `integrals` submodule, attach it to `_orthant_integrals`
///   and register it in `sys.modules` as `orthant_integrals.integrals`.
///
/// Errors
/// ------
/// - `PyErr`
///   If creating the submodule or manipulating `sys.modules` fails.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _orthant_integrals<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let integrals_mod = PyModule::new(_py, "integrals")?;
    integrals_module(_py, m, &integrals_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("orthant_integrals.integrals", integrals_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn integrals_module<'py>(
    _py: Python, orthant_integrals: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_bvnu, m)?)?;
    m.add_function(wrap_pyfunction!(py_ln_bvnu, m)?)?;
    m.add_function(wrap_pyfunction!(py_integrate_gaussian, m)?)?;
    m.add_function(wrap_pyfunction!(py_integrate_gaussian_rank, m)?)?;
    m.add_function(wrap_pyfunction!(py_orthant_probability, m)?)?;
    m.add_function(wrap_pyfunction!(py_amplitude_marginal_likelihood, m)?)?;
    orthant_integrals.add_submodule(m)?;
    Ok(())
}
