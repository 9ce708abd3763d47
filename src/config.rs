use crate::error::EmError;
use serde::{Deserialize, Serialize};

/// Default iteration budget of the EM loop.
pub const DEFAULT_MAX_ITERS: usize = 100;

/// Shape constraint placed on every cluster's covariance matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceType {
    /// Full D×D covariance, stored as eigenvalues plus a rotation.
    Generic,
    /// Axis-aligned covariance, D eigenvalues and no rotation.
    #[default]
    Diagonal,
    /// Isotropic covariance, a single eigenvalue.
    Spherical,
}

/// Construction parameters of a [`GaussianMixture`](crate::GaussianMixture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EmConfig {
    /// Number of mixture components.
    pub n_clusters: usize,
    /// Covariance structure shared by all components.
    pub covariance_type: CovarianceType,
    /// Maximum number of E-steps.
    pub max_iters: usize,
    /// Minimum fractional log-likelihood improvement to keep iterating.
    pub epsilon: f64,
    /// Floor applied to every covariance eigenvalue.
    pub min_eigen_value: f64,
    /// Seed of the k-means++ bootstrap.
    pub seed: u64,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            n_clusters: 5,
            covariance_type: CovarianceType::Diagonal,
            max_iters: DEFAULT_MAX_ITERS,
            epsilon: f32::EPSILON as f64,
            min_eigen_value: f64::EPSILON,
            seed: 0,
        }
    }
}

impl EmConfig {
    pub fn new(n_clusters: usize, covariance_type: CovarianceType) -> Self {
        Self {
            n_clusters,
            covariance_type,
            ..Default::default()
        }
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_min_eigen_value(mut self, min_eigen_value: f64) -> Self {
        self.min_eigen_value = min_eigen_value;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the parameters that do not depend on the training data.
    pub fn validate(&self) -> Result<(), EmError> {
        if self.n_clusters == 0 {
            return Err(EmError::InvalidConfig(
                "number of clusters must be > 0".to_string(),
            ));
        }
        if self.max_iters == 0 {
            return Err(EmError::InvalidConfig(
                "max_iters must be > 0".to_string(),
            ));
        }
        if !(self.epsilon >= 0.0) {
            return Err(EmError::InvalidConfig(format!(
                "epsilon must be non-negative (got {})",
                self.epsilon
            )));
        }
        if !(self.min_eigen_value > 0.0) {
            return Err(EmError::InvalidConfig(format!(
                "min_eigen_value must be positive (got {})",
                self.min_eigen_value
            )));
        }
        Ok(())
    }
}
