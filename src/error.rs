use thiserror::Error;

/// Errors that can occur when training or evaluating a Gaussian mixture.
#[derive(Debug, Error)]
pub enum EmError {
    #[error("Invalid number of clusters: {clusters} (must be in 1..={samples})")]
    InvalidClusterCount { clusters: usize, samples: usize },

    #[error("Sample matrix must have at least one row and one column")]
    EmptySamples,

    #[error("Invalid {what} dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Model is not trained")]
    NotTrained,

    #[error("Training diverged (total log-likelihood {log_likelihood})")]
    TrainingDiverged { log_likelihood: f64 },

    #[error("Covariance decomposition failed for cluster {cluster}")]
    Decomposition { cluster: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Model file not found: {0}")]
    ModelFileNotFound(String),

    #[error("Invalid model format: {0}")]
    InvalidModelFormat(String),
}
