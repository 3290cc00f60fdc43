//! utils — Python argument extraction for the PyO3 bindings.
//!
//! Purpose
//! -------
//! Convert the array-likes Python callers pass (numpy arrays, pandas
//! objects, nested sequences) into `ndarray` values, and keyword options
//! into [`IntegrationOptions`]. Everything here is compiled only with the
//! `python-bindings` feature.

#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

#[cfg(feature = "python-bindings")]
use crate::integrals::{IntegrationOptions, QuadratureOptions};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64")
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Owned copy of a 1-D array-like.
#[cfg(feature = "python-bindings")]
pub fn extract_vector<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{name} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(Array1::from(slice.to_vec()))
}

/// Owned copy of a 2-D array-like: a numpy array, a pandas DataFrame or a
/// sequence of equal-length rows.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(raw_data: &Bound<'py, PyAny>, name: &str) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (), None) {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(frame_ro.as_array().to_owned());
        }
    }

    let rows: Vec<Vec<f64>> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err(format!(
            "{name} must be a 2-D numpy.ndarray, pandas.DataFrame, or sequence of float64 rows"
        ))
    })?;
    let ncols = rows.first().map_or(0, |r| r.len());
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(PyValueError::new_err(format!("{name} rows must all have the same length")));
    }
    let nrows = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| PyValueError::new_err(format!("{name}: {e}")))
}

/// Build [`IntegrationOptions`] from optional keyword arguments; missing
/// values take the documented defaults.
#[cfg(feature = "python-bindings")]
pub fn extract_integration_options(
    rank_tolerance: Option<f64>, condition_threshold: Option<f64>, rel_tol: Option<f64>,
    max_intervals: Option<usize>,
) -> PyResult<IntegrationOptions> {
    let defaults = IntegrationOptions::default();
    let quadrature = QuadratureOptions::new(
        rel_tol.unwrap_or(defaults.quadrature.rel_tol),
        defaults.quadrature.abs_tol,
        max_intervals.unwrap_or(defaults.quadrature.max_intervals),
    )?;
    let opts = defaults
        .with_rank_tolerance(rank_tolerance.unwrap_or(defaults.rank_tolerance))?
        .with_condition_threshold(condition_threshold.unwrap_or(defaults.condition_threshold))?
        .with_quadrature(quadrature);
    Ok(opts)
}
