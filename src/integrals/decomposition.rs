//! integrals::decomposition — spectral analysis of the quadratic term and
//! moments of the equivalent Gaussian.
//!
//! Purpose
//! -------
//! Turn `(g, F)` into the quantities the orthant routines need:
//! - a [`Spectrum`] of `F` (sorted eigenpairs, numerical rank, condition
//!   number, null-space basis, rank-r projection), and
//! - [`GaussianMoments`]: mean `μ = −F⁻¹g`, covariance `Σ = F⁻¹` and the log
//!   scale `½ gᵀF⁻¹g + (n/2) ln 2π − ½ ln det F` of the completed square.
//!
//! Key behaviors
//! -------------
//! - Moments come from a Cholesky factorization when `F` is well
//!   conditioned. When the condition number exceeds the configured threshold
//!   or the factorization fails, the attempt reports a crate-private
//!   [`NumericDegradation`] and the spectral formulas
//!   `Σ = V Λ⁻¹ Vᵀ`, `μ = −V Λ⁻¹ Vᵀ g` take over. The switch is logged at
//!   `debug` level and recorded in [`GaussianMoments::branch`].
//! - Eigenvalues below `−tol · max|λ|` reject `F` as not positive
//!   semi-definite; eigenvalues in `[−tol, tol] · max|λ|` count as zero.
//! - [`pivot_order`] picks well-conditioned coordinates by greedy diagonal
//!   pivoting on Schur complements, which the degeneracy handler uses to
//!   choose the kept block.
//!
//! Conventions
//! -----------
//! - Public inputs arrive as `ndarray` values and are copied into
//!   `nalgebra` matrices for factorization.
//! - Eigenpairs are stored in descending eigenvalue order.

use crate::integrals::errors::{IntegralError, IntegralResult};
use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use ndarray::{Array2, ArrayView1};
use std::f64::consts::PI;

/// Copy an `ndarray` matrix into a column-major `DMatrix`.
pub fn to_dmatrix(f: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = f.dim();
    let mut out = DMatrix::<f64>::zeros(rows, cols);
    for j in 0..cols {
        for i in 0..rows {
            out[(i, j)] = f[[i, j]];
        }
    }
    out
}

pub fn to_dvector(g: ArrayView1<f64>) -> DVector<f64> {
    DVector::from_iterator(g.len(), g.iter().copied())
}

/// Spectrum — eigen-structure of a symmetric positive semi-definite matrix.
///
/// Fields
/// ------
/// - `eigenvalues`: descending; entries past `rank` are numerically zero
///   (they may be slightly negative).
/// - `eigenvectors`: orthonormal columns matching `eigenvalues`.
/// - `rank`: number of eigenvalues above `tol · max|λ|`.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub eigenvalues: DVector<f64>,
    pub eigenvectors: DMatrix<f64>,
    pub rank: usize,
}

impl Spectrum {
    /// Eigendecompose `f` and determine its numerical rank.
    ///
    /// Parameters
    /// ----------
    /// - `f`: `&DMatrix<f64>`
    ///   Symmetric square matrix.
    /// - `rank_tolerance`: `f64`
    ///   Relative eigenvalue threshold.
    ///
    /// Errors
    /// ------
    /// - `IntegralError::NotPositiveSemidefinite`
    ///   When the smallest eigenvalue is below
    ///   `−max(rank_tolerance, n·ε) · max|λ|`.
    pub fn new(f: &DMatrix<f64>, rank_tolerance: f64) -> IntegralResult<Self> {
        let n = f.nrows();
        let eig = SymmetricEigen::new(f.clone());

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

        let eigenvalues = DVector::from_iterator(n, order.iter().map(|&i| eig.eigenvalues[i]));
        let mut eigenvectors = DMatrix::<f64>::zeros(n, n);
        for (dst, &src) in order.iter().enumerate() {
            eigenvectors.set_column(dst, &eig.eigenvectors.column(src));
        }

        let scale = eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let negative_floor = rank_tolerance.max(n as f64 * f64::EPSILON) * scale;
        if let Some(&smallest) = eigenvalues.as_slice().last() {
            if smallest < -negative_floor {
                return Err(IntegralError::NotPositiveSemidefinite { eigenvalue: smallest });
            }
        }
        let rank = eigenvalues.iter().filter(|&&v| v > rank_tolerance * scale && v > 0.0).count();

        Ok(Spectrum { eigenvalues, eigenvectors, rank })
    }

    pub fn dim(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_full_rank(&self) -> bool {
        self.rank == self.dim()
    }

    /// Ratio of the largest to the smallest retained eigenvalue; `∞` when
    /// the matrix is rank-deficient.
    pub fn condition_number(&self) -> f64 {
        if self.rank == 0 || !self.is_full_rank() {
            return f64::INFINITY;
        }
        self.eigenvalues[0] / self.eigenvalues[self.rank - 1]
    }

    /// Number of eigenvalues within a factor `condition_threshold` of the
    /// largest; never more than `rank`.
    pub fn effective_rank(&self, condition_threshold: f64) -> usize {
        let floor = self.eigenvalues.iter().next().copied().unwrap_or(0.0) / condition_threshold;
        self.eigenvalues.iter().take(self.rank).filter(|&&v| v > floor).count()
    }

    /// Orthonormal basis of the numerical null space, `n × (n − rank)`.
    pub fn null_basis(&self) -> DMatrix<f64> {
        self.eigenvectors.columns(self.rank, self.dim() - self.rank).into_owned()
    }

    /// `Σ_{i < rank} λ_i v_i v_iᵀ`: the matrix with its numerically zero
    /// eigenvalues set exactly to zero.
    pub fn projected(&self) -> DMatrix<f64> {
        let n = self.dim();
        let mut out = DMatrix::<f64>::zeros(n, n);
        for i in 0..self.rank {
            let v = self.eigenvectors.column(i);
            out += self.eigenvalues[i] * &v * v.transpose();
        }
        out
    }
}

/// Which factorization produced a set of [`GaussianMoments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorizationBranch {
    Cholesky,
    Spectral,
}

/// The primary factorization could not be trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NumericDegradation {
    pub condition: f64,
    pub reason: &'static str,
}

/// GaussianMoments — the Gaussian obtained by completing the square in
/// `exp(−gᵀz − ½ zᵀFz)` for a positive definite `F`.
///
/// Fields
/// ------
/// - `mean`: `μ = −F⁻¹g`.
/// - `covariance`: `Σ = F⁻¹`, exactly symmetric.
/// - `log_scale`: `½ gᵀF⁻¹g + (n/2) ln 2π − ½ ln det F`, so that
///   `∫_{z>0} exp(−gᵀz − ½zᵀFz) dz = exp(log_scale) · P(N(μ, Σ) > 0)`.
/// - `branch`: factorization that produced the values.
#[derive(Debug, Clone)]
pub struct GaussianMoments {
    pub mean: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub log_scale: f64,
    pub branch: FactorizationBranch,
}

impl GaussianMoments {
    /// Complete the square for a full-rank `f` with known spectrum.
    ///
    /// Parameters
    /// ----------
    /// - `g`: `&DVector<f64>`
    ///   Linear coefficients.
    /// - `f`: `&DMatrix<f64>`
    ///   Symmetric positive definite quadratic coefficients.
    /// - `spectrum`: `&Spectrum`
    ///   Spectrum of `f`; must be full rank.
    /// - `condition_threshold`: `f64`
    ///   Largest condition number for which Cholesky is attempted.
    pub fn new(
        g: &DVector<f64>, f: &DMatrix<f64>, spectrum: &Spectrum, condition_threshold: f64,
    ) -> Self {
        match cholesky_moments(g, f, spectrum, condition_threshold) {
            Ok(moments) => moments,
            Err(degradation) => {
                log::debug!(
                    "switching to spectral moments (condition number {:.3e}): {}",
                    degradation.condition,
                    degradation.reason
                );
                spectral_moments(g, spectrum)
            }
        }
    }
}

fn cholesky_moments(
    g: &DVector<f64>, f: &DMatrix<f64>, spectrum: &Spectrum, condition_threshold: f64,
) -> Result<GaussianMoments, NumericDegradation> {
    let condition = spectrum.condition_number();
    if condition.is_nan() || condition > condition_threshold {
        return Err(NumericDegradation { condition, reason: "condition number above threshold" });
    }
    let chol = Cholesky::new(f.clone())
        .ok_or(NumericDegradation { condition, reason: "Cholesky factorization failed" })?;

    let n = g.len();
    let mean = -chol.solve(g);
    let covariance = symmetrize(chol.inverse());
    let log_det: f64 = 2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>();
    let quad = -g.dot(&mean);
    let log_scale = 0.5 * quad + 0.5 * n as f64 * (2.0 * PI).ln() - 0.5 * log_det;

    Ok(GaussianMoments { mean, covariance, log_scale, branch: FactorizationBranch::Cholesky })
}

fn spectral_moments(g: &DVector<f64>, spectrum: &Spectrum) -> GaussianMoments {
    let n = g.len();
    let mut mean = DVector::<f64>::zeros(n);
    let mut covariance = DMatrix::<f64>::zeros(n, n);
    let mut quad = 0.0;
    let mut log_det = 0.0;
    for i in 0..spectrum.rank {
        let lambda = spectrum.eigenvalues[i];
        let v = spectrum.eigenvectors.column(i);
        let proj = v.dot(g);
        mean -= (proj / lambda) * &v;
        covariance += (1.0 / lambda) * &v * v.transpose();
        quad += proj * proj / lambda;
        log_det += lambda.ln();
    }
    let log_scale = 0.5 * quad + 0.5 * n as f64 * (2.0 * PI).ln() - 0.5 * log_det;
    GaussianMoments {
        mean,
        covariance: symmetrize(covariance),
        log_scale,
        branch: FactorizationBranch::Spectral,
    }
}

fn symmetrize(mut m: DMatrix<f64>) -> DMatrix<f64> {
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (m[(i, j)] + m[(j, i)]);
            m[(i, j)] = avg;
            m[(j, i)] = avg;
        }
    }
    m
}

/// Greedy diagonal pivoting: the first `count` coordinates chosen by
/// repeatedly taking the largest remaining Schur-complement diagonal
/// (lowest index on ties).
///
/// Notes
/// -----
/// - On a rank-`r` PSD matrix with `count = r`, the selected principal
///   submatrix is positive definite and as well conditioned as greedy
///   selection allows.
pub fn pivot_order(f: &DMatrix<f64>, count: usize) -> Vec<usize> {
    let n = f.nrows();
    let mut work = f.clone();
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut chosen = Vec::with_capacity(count);

    for _ in 0..count.min(n) {
        let mut best = 0;
        for (pos, &idx) in remaining.iter().enumerate() {
            if work[(idx, idx)] > work[(remaining[best], remaining[best])] {
                best = pos;
            }
        }
        let p = remaining.remove(best);
        let pivot = work[(p, p)];
        chosen.push(p);
        if pivot <= 0.0 {
            continue;
        }
        let col = work.column(p).into_owned();
        for &i in &remaining {
            for &j in &remaining {
                work[(i, j)] -= col[i] * col[j] / pivot;
            }
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - ndarray → nalgebra copies.
    // - Rank detection, PSD rejection, null basis and projection.
    // - Agreement of the Cholesky and spectral branches, and the automatic
    //   switch for ill-conditioned input.
    // - Pivot selection order.
    // -------------------------------------------------------------------------

    const TOL: f64 = 1e-12;

    fn duplicated_column_gram() -> DMatrix<f64> {
        // MᵀM for M with columns (1, 2, 0), (1, 2, 0), (0, 1, 3).
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 1.0, 0.0, 2.0, 2.0, 1.0, 0.0, 0.0, 3.0]);
        m.transpose() * m
    }

    #[test]
    // Purpose
    // -------
    // `to_dmatrix` preserves entries and layout of a non-symmetric matrix.
    fn to_dmatrix_copies_entries() {
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let m = to_dmatrix(&a);
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(0, 2)], 3.0);
        assert_eq!(m[(1, 0)], 4.0);
        let v = to_dvector(array![7.0, 8.0].view());
        assert_eq!(v.as_slice(), &[7.0, 8.0]);
    }

    #[test]
    // Purpose
    // -------
    // A Gram matrix with a duplicated column has rank 2, a one-dimensional
    // null space annihilated by F, and equals its own projection.
    //
    // Given
    // -----
    // - F = MᵀM with two identical columns of M.
    //
    // Expect
    // ------
    // - rank = 2, condition number ∞, F·u ≈ 0 for the null basis vector
    //   u ∝ (1, −1, 0), and projected() ≈ F.
    fn rank_deficient_gram_is_detected() {
        // Arrange
        let f = duplicated_column_gram();

        // Act
        let spectrum = Spectrum::new(&f, 1e-12).unwrap();
        let null = spectrum.null_basis();

        // Assert
        assert_eq!(spectrum.rank, 2);
        assert!(!spectrum.is_full_rank());
        assert_eq!(spectrum.condition_number(), f64::INFINITY);
        assert_eq!(null.ncols(), 1);
        assert!((&f * &null).norm() < 1e-12);
        assert_relative_eq!(null[(0, 0)].abs(), 0.5_f64.sqrt(), max_relative = 1e-10);
        assert_relative_eq!(null[(0, 0)], -null[(1, 0)], max_relative = 1e-10);
        assert!((spectrum.projected() - &f).norm() < 1e-12 * f.norm());
    }

    #[test]
    // Purpose
    // -------
    // A clearly indefinite matrix is rejected; a zero matrix has rank 0.
    fn indefinite_and_zero_matrices() {
        let f = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -0.5]);
        match Spectrum::new(&f, 1e-12) {
            Err(IntegralError::NotPositiveSemidefinite { eigenvalue }) => {
                assert_relative_eq!(eigenvalue, -0.5, max_relative = TOL)
            }
            other => panic!("unexpected: {other:?}"),
        }
        let zero = DMatrix::<f64>::zeros(3, 3);
        let spectrum = Spectrum::new(&zero, 1e-12).unwrap();
        assert_eq!(spectrum.rank, 0);
        assert_eq!(spectrum.null_basis().ncols(), 3);
    }

    #[test]
    // Purpose
    // -------
    // The Cholesky and spectral branches agree on a well-conditioned
    // matrix, and forcing a threshold of 1 selects the spectral branch.
    //
    // Given
    // -----
    // - F = [[2, 0.5, 0.1], [0.5, 1, 0.2], [0.1, 0.2, 1.5]], g = (0.3, −1, 0.7).
    //
    // Expect
    // ------
    // - Identical mean, covariance and log scale to 1e-12; F·Σ ≈ I;
    //   μ = −Σg.
    fn cholesky_and_spectral_branches_agree() {
        // Arrange
        let f = DMatrix::from_row_slice(3, 3, &[2.0, 0.5, 0.1, 0.5, 1.0, 0.2, 0.1, 0.2, 1.5]);
        let g = DVector::from_vec(vec![0.3, -1.0, 0.7]);
        let spectrum = Spectrum::new(&f, 1e-12).unwrap();

        // Act
        let primary = GaussianMoments::new(&g, &f, &spectrum, 1e8);
        let fallback = GaussianMoments::new(&g, &f, &spectrum, 1.0);

        // Assert
        assert_eq!(primary.branch, FactorizationBranch::Cholesky);
        assert_eq!(fallback.branch, FactorizationBranch::Spectral);
        assert!((&primary.mean - &fallback.mean).norm() < TOL);
        assert!((&primary.covariance - &fallback.covariance).norm() < TOL);
        assert_relative_eq!(primary.log_scale, fallback.log_scale, max_relative = TOL);
        assert!((&f * &primary.covariance - DMatrix::<f64>::identity(3, 3)).norm() < TOL);
        assert!((&primary.mean + &primary.covariance * &g).norm() < TOL);

        let expected_log_scale = 0.5 * g.dot(&(&primary.covariance * &g))
            + 1.5 * (2.0 * PI).ln()
            - 0.5 * f.determinant().ln();
        assert_relative_eq!(primary.log_scale, expected_log_scale, max_relative = TOL);
    }

    #[test]
    // Purpose
    // -------
    // A nearly singular matrix (condition ≈ 4e8) is routed to the
    // spectral branch automatically.
    fn ill_conditioned_matrix_uses_spectral_branch() {
        let eps = 1e-4;
        let f = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0 + eps * eps]);
        let g = DVector::from_vec(vec![0.1, 0.2]);
        let spectrum = Spectrum::new(&f, 1e-12).unwrap();
        assert!(spectrum.is_full_rank());
        assert!(spectrum.condition_number() > 1e8);
        assert_eq!(spectrum.effective_rank(1e8), 1);
        assert_eq!(spectrum.effective_rank(1e10), 2);

        let moments = GaussianMoments::new(&g, &f, &spectrum, 1e8);
        assert_eq!(moments.branch, FactorizationBranch::Spectral);
        // Σ = F⁻¹ = [[1 + ε², −1], [−1, 1]] / ε².
        assert_relative_eq!(moments.covariance[(1, 1)], 1.0 / (eps * eps), max_relative = 1e-6);
        assert_relative_eq!(moments.covariance[(0, 1)], -1.0 / (eps * eps), max_relative = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Pivoting takes the largest diagonal first, then the largest Schur
    // complement diagonal, with ties resolved toward the lower index.
    fn pivot_order_is_greedy_and_stable() {
        let f = DMatrix::from_row_slice(3, 3, &[1.0, 0.9, 0.0, 0.9, 1.0, 0.0, 0.0, 0.0, 0.5]);
        // Diagonal tie between 0 and 1 → 0; Schur complement of 1 is 0.19 < 0.5.
        assert_eq!(pivot_order(&f, 3), vec![0, 2, 1]);

        let dup = duplicated_column_gram();
        let order = pivot_order(&dup, 2);
        assert_eq!(order.len(), 2);
        assert!(!(order.contains(&0) && order.contains(&1)));
    }
}
