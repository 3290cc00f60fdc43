//! numerical_stability — shared tolerances and log-space arithmetic.
//!
//! Purpose
//! -------
//! Centralize the small numerical tolerances used by the orthant-integral
//! routines and provide overflow-safe helpers for combining quantities that
//! are carried on the log scale. Keeping these in one place means the
//! decomposition, degeneracy and quadrature layers agree on what counts as
//! "zero", "symmetric" or "on the correlation boundary".
//!
//! Key behaviors
//! -------------
//! - Expose default tolerances (`RANK_TOL`, `CONDITION_THRESHOLD`,
//!   `SYMMETRY_TOL`, `CORRELATION_EPS`, `RAY_TOL`) that seed
//!   [`crate::integrals::IntegrationOptions`].
//! - Provide `safe_softplus`, `log_add_exp` and `log_sub_exp` for summing
//!   and differencing exponentials without leaving `f64` range.
//!
//! Invariants & assumptions
//! ------------------------
//! - Helpers accept `-∞` as the log of zero and propagate it; `NaN` inputs
//!   are not screened here.
//! - `log_sub_exp(a, b)` requires `a ≥ b`; equality yields `-∞`.
//!
//! Conventions
//! -----------
//! - Pure scalar functions, no allocation, no logging.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] compare the guarded formulas with
//!   naive evaluation on safe grids and check the extreme-argument branches.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    CONDITION_THRESHOLD, CORRELATION_EPS, RANK_TOL, RAY_TOL, SYMMETRY_TOL, log_add_exp,
    log_sub_exp, safe_softplus,
};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::transformations::{
        CONDITION_THRESHOLD, CORRELATION_EPS, RANK_TOL, SYMMETRY_TOL, log_add_exp, log_sub_exp,
    };
}
