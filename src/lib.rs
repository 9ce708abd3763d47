//! Gaussian mixture models trained by expectation-maximization.
//!
//! [`GaussianMixture`] fits K multivariate Gaussians to a sample matrix
//! (one observation per row) with generic, diagonal or spherical covariances.
//! Training starts from a k-means bootstrap, from given parameters, or from
//! given responsibilities. The [`predictor`] module wraps trained mixtures
//! and a threshold rule into per-cell subject/object classifiers.
//!
//! ```no_run
//! use gmm_em::{CovarianceType, EmConfig, GaussianMixture};
//! use nalgebra::DMatrix;
//!
//! let samples = DMatrix::from_row_slice(4, 2, &[0.0, 0.1, 0.2, 0.0, 9.9, 10.0, 10.1, 9.8]);
//! let mut gmm = GaussianMixture::new(EmConfig::new(2, CovarianceType::Spherical))?;
//! let output = gmm.train(&samples)?;
//! let prediction = gmm.predict(&[0.0, 0.0])?;
//! assert_eq!(prediction.label, output.labels[0]);
//! # Ok::<(), gmm_em::EmError>(())
//! ```

pub mod config;
pub mod covariance;
mod em;
pub mod error;
pub mod kmeans;
pub mod model;
pub mod predictor;
pub mod utils;

pub use config::{CovarianceType, EmConfig};
pub use error::EmError;
pub use model::{DetailedPrediction, GaussianMixture, InitialParams, Prediction, TrainOutput};
pub use predictor::{
    CellPrediction, CellPredictor, MixturePredictor, Predictor, PredictorKind, ThresholdPredictor,
};
