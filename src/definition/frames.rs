//! definition::frames — observed data frames and their registry.
//!
//! Purpose
//! -------
//! Hold the pixel data of each exposure with optional inverse-variance
//! weights, and evaluate the amplitude-marginalized likelihood of a frame
//! for a given design matrix.
//!
//! Key behaviors
//! -------------
//! - [`Frame::new`] checks that data are finite and weights are finite,
//!   non-negative and of matching length.
//! - [`Frame::amplitude_likelihood`] whitens the design and data by `√w`
//!   and calls
//!   [`amplitude_marginal_likelihood`](crate::integrals::amplitude_marginal_likelihood).
//! - [`FrameSet`] keys frames by id in ascending order.

use crate::{
    definition::errors::{DefinitionError, DefinitionResult},
    integrals::{IntegrationOptions, amplitude_marginal_likelihood},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::collections::BTreeMap;

/// Frame — one exposure's data.
///
/// Fields
/// ------
/// - `id`: caller-assigned id, unique within a [`FrameSet`].
/// - `filter`: band name.
/// - `data`: flattened pixel values.
/// - `weights`: inverse variances; `None` means unit weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    id: u64,
    filter: String,
    data: Array1<f64>,
    weights: Option<Array1<f64>>,
}

impl Frame {
    /// Errors
    /// ------
    /// - `DefinitionError::FrameShape` when `weights` and `data` differ in
    ///   length.
    /// - `DefinitionError::NonFiniteFrameData` for a non-finite data value
    ///   or a negative or non-finite weight.
    pub fn new(
        id: u64, filter: impl Into<String>, data: Array1<f64>, weights: Option<Array1<f64>>,
    ) -> DefinitionResult<Self> {
        if let Some((index, &value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DefinitionError::NonFiniteFrameData { id, index, value });
        }
        if let Some(w) = &weights {
            if w.len() != data.len() {
                return Err(DefinitionError::FrameShape {
                    id,
                    data: data.len(),
                    weights: w.len(),
                });
            }
            if let Some((index, &value)) =
                w.iter().enumerate().find(|(_, v)| !(v.is_finite() && **v >= 0.0))
            {
                return Err(DefinitionError::NonFiniteFrameData { id, index, value });
            }
        }
        Ok(Frame { id, filter: filter.into(), data, weights })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn data(&self) -> ArrayView1<'_, f64> {
        self.data.view()
    }

    pub fn weights(&self) -> Option<ArrayView1<'_, f64>> {
        self.weights.as_ref().map(|w| w.view())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `−ln ∫_{a>0} exp(−½ Σ_i w_i ((Ma)_i − y_i)²) da`.
    ///
    /// Parameters
    /// ----------
    /// - `design`: `ArrayView2<f64>`
    ///   One row per data value, one column per non-negative amplitude.
    /// - `opts`: `&IntegrationOptions`
    ///
    /// Errors
    /// ------
    /// - `DefinitionError::Integral` wrapping the integral's error (shape
    ///   mismatch, divergence).
    pub fn amplitude_likelihood(
        &self, design: ArrayView2<f64>, opts: &IntegrationOptions,
    ) -> DefinitionResult<f64> {
        match &self.weights {
            None => Ok(amplitude_marginal_likelihood(design, self.data.view(), opts)?),
            Some(w) => {
                let root = w.mapv(f64::sqrt);
                let data = &self.data * &root;
                let design = whiten_rows(design, root.view());
                Ok(amplitude_marginal_likelihood(design.view(), data.view(), opts)?)
            }
        }
    }
}

fn whiten_rows(design: ArrayView2<f64>, root: ArrayView1<f64>) -> Array2<f64> {
    let mut out = design.to_owned();
    for (mut row, &s) in out.axis_iter_mut(Axis(0)).zip(root.iter()) {
        row *= s;
    }
    out
}

/// FrameSet — frames keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSet {
    frames: BTreeMap<u64, Frame>,
}

impl FrameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors
    /// ------
    /// - `DefinitionError::DuplicateFrame` when the id is taken.
    pub fn insert(&mut self, frame: Frame) -> DefinitionResult<()> {
        let id = frame.id();
        if self.frames.contains_key(&id) {
            return Err(DefinitionError::DuplicateFrame { id });
        }
        self.frames.insert(id, frame);
        Ok(())
    }

    /// Errors
    /// ------
    /// - `DefinitionError::UnknownFrame` when no frame has this id.
    pub fn get(&self, id: u64) -> DefinitionResult<&Frame> {
        self.frames.get(&id).ok_or(DefinitionError::UnknownFrame { id })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    /// Distinct filter names in ascending order.
    pub fn filters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.frames.values().map(|f| f.filter()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
