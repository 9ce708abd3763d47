//! Eigen-structure of a cluster covariance.
//!
//! The E-step never inverts a covariance matrix directly. Each cluster keeps
//! its (floored) eigenvalues, their reciprocals and, in generic mode, the
//! orthonormal rotation that diagonalizes the covariance:
//!
//! ```text
//! (x - μ)ᵀ Σ⁻¹ (x - μ) = Σ_d  ((x - μ)ᵀ U)_d² / λ_d
//! log|Σ|              = Σ_d  log λ_d
//! ```

use crate::config::CovarianceType;
use crate::error::EmError;
use nalgebra::{DMatrix, DVector};

const SVD_MAX_ITERS: usize = 10_000;

/// Decomposed covariance of one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEigen {
    /// Floored eigenvalues (length D, or 1 in spherical mode).
    pub values: DVector<f64>,
    /// Reciprocals of `values`.
    pub inv_values: DVector<f64>,
    /// Eigenvectors as columns; only present in generic mode.
    pub rotation: Option<DMatrix<f64>>,
}

impl ClusterEigen {
    /// Build from raw eigenvalues, flooring them and caching the reciprocals.
    pub fn from_values(
        mut values: DVector<f64>,
        rotation: Option<DMatrix<f64>>,
        min_eigen_value: f64,
    ) -> Self {
        values.apply(|v| *v = v.max(min_eigen_value));
        let inv_values = values.map(|v| 1.0 / v);
        Self {
            values,
            inv_values,
            rotation,
        }
    }

    /// Eigenvalue along dimension `d`; spherical clusters share one value.
    #[inline]
    pub fn value(&self, d: usize) -> f64 {
        if self.values.len() == 1 {
            self.values[0]
        } else {
            self.values[d]
        }
    }

    #[inline]
    fn inv_value(&self, d: usize) -> f64 {
        if self.inv_values.len() == 1 {
            self.inv_values[0]
        } else {
            self.inv_values[d]
        }
    }

    /// log det(Σ) over `dim` dimensions.
    pub fn log_det(&self, dim: usize) -> f64 {
        (0..dim).map(|d| self.value(d).ln()).sum()
    }

    /// Squared Mahalanobis distance of an already-centered sample.
    pub fn mahalanobis_sq(&self, centered: &DVector<f64>) -> f64 {
        match &self.rotation {
            Some(u) => {
                let rotated = u.tr_mul(centered);
                rotated
                    .iter()
                    .enumerate()
                    .map(|(d, &v)| self.inv_value(d) * v * v)
                    .sum()
            }
            None => centered
                .iter()
                .enumerate()
                .map(|(d, &v)| self.inv_value(d) * v * v)
                .sum(),
        }
    }

    /// Covariance matrix implied by the stored eigen-structure.
    pub fn reconstruct(&self, dim: usize) -> DMatrix<f64> {
        match &self.rotation {
            Some(u) => {
                let lambda = DMatrix::from_diagonal(&self.values);
                u * lambda * u.transpose()
            }
            None => DMatrix::from_fn(dim, dim, |i, j| if i == j { self.value(i) } else { 0.0 }),
        }
    }
}

/// Decompose a full covariance matrix according to the covariance structure.
///
/// Generic mode keeps the singular values and left singular vectors. Diagonal
/// mode reads the diagonal directly so eigenvalues stay aligned with the
/// feature axes. Spherical mode keeps the largest singular value.
pub fn decompose(
    cov: &DMatrix<f64>,
    covariance_type: CovarianceType,
    min_eigen_value: f64,
    cluster: usize,
) -> Result<ClusterEigen, EmError> {
    match covariance_type {
        CovarianceType::Diagonal => Ok(ClusterEigen::from_values(
            cov.diagonal(),
            None,
            min_eigen_value,
        )),
        CovarianceType::Spherical => {
            let svd = cov
                .clone()
                .try_svd(false, false, f64::EPSILON, SVD_MAX_ITERS)
                .ok_or(EmError::Decomposition { cluster })?;
            let max_val = svd.singular_values.max();
            Ok(ClusterEigen::from_values(
                DVector::from_element(1, max_val),
                None,
                min_eigen_value,
            ))
        }
        CovarianceType::Generic => {
            let svd = cov
                .clone()
                .try_svd(true, false, f64::EPSILON, SVD_MAX_ITERS)
                .ok_or(EmError::Decomposition { cluster })?;
            let u = svd.u.ok_or(EmError::Decomposition { cluster })?;
            Ok(ClusterEigen::from_values(
                svd.singular_values,
                Some(u),
                min_eigen_value,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn generic_decomposition_reconstructs_covariance() {
        let cov = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let eig = decompose(&cov, CovarianceType::Generic, f64::EPSILON, 0).unwrap();
        let back = eig.reconstruct(2);
        for (a, b) in back.iter().zip(cov.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
        assert_abs_diff_eq!(eig.log_det(2), cov.determinant().ln(), epsilon = 1e-10);
    }

    #[test]
    fn generic_mahalanobis_matches_inverse() {
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let eig = decompose(&cov, CovarianceType::Generic, f64::EPSILON, 0).unwrap();
        let x = DVector::from_vec(vec![1.0, -2.0]);
        let inv = cov.clone().try_inverse().unwrap();
        let expected = (x.transpose() * inv * &x)[(0, 0)];
        assert_abs_diff_eq!(eig.mahalanobis_sq(&x), expected, epsilon = 1e-10);
    }

    #[test]
    fn diagonal_keeps_axis_order() {
        let cov = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 9.0, 4.0]));
        let eig = decompose(&cov, CovarianceType::Diagonal, f64::EPSILON, 0).unwrap();
        assert_eq!(eig.values.as_slice(), &[1.0, 9.0, 4.0]);
        assert!(eig.rotation.is_none());
    }

    #[test]
    fn spherical_takes_largest_value() {
        let cov = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 9.0, 4.0]));
        let eig = decompose(&cov, CovarianceType::Spherical, f64::EPSILON, 0).unwrap();
        assert_eq!(eig.values.len(), 1);
        assert_abs_diff_eq!(eig.values[0], 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.log_det(3), 3.0 * 9f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn singular_covariance_is_floored() {
        let cov = DMatrix::zeros(2, 2);
        let eig = decompose(&cov, CovarianceType::Generic, 1e-6, 0).unwrap();
        assert!(eig.values.iter().all(|&v| v >= 1e-6));
        assert!(eig.inv_values.iter().all(|v| v.is_finite()));
    }
}
