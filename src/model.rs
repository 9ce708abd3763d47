use crate::config::{CovarianceType, EmConfig};
use crate::em::{self, Mixture, TrainingState};
use crate::error::EmError;
use crate::kmeans::{self, KMeansCriteria};
use crate::utils;
use nalgebra::{DMatrix, DVector, Scalar};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Gaussian mixture model trained by expectation-maximization.
///
/// The estimator starts untrained. Each `train*` call discards the previous
/// parameters, fits new ones and returns the per-sample results of the final
/// E-step. A failed call either leaves the previous model untouched
/// (malformed input) or clears it (divergence).
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    config: EmConfig,
    mixture: Option<Mixture>,
}

/// Optional starting point for [`GaussianMixture::train_e`].
#[derive(Debug, Clone)]
pub struct InitialParams {
    /// K×D initial means.
    pub means: DMatrix<f64>,
    /// K covariance matrices of size D×D.
    pub covs: Option<Vec<DMatrix<f64>>>,
    /// K mixing weights, normalized before use.
    pub weights: Option<DVector<f64>>,
}

impl InitialParams {
    pub fn from_means(means: DMatrix<f64>) -> Self {
        Self {
            means,
            covs: None,
            weights: None,
        }
    }

    pub fn with_covs(mut self, covs: Vec<DMatrix<f64>>) -> Self {
        self.covs = Some(covs);
        self
    }

    pub fn with_weights(mut self, weights: DVector<f64>) -> Self {
        self.weights = Some(weights);
        self
    }
}

/// Per-sample results of the last E-step of a training run.
#[derive(Debug, Clone)]
pub struct TrainOutput {
    /// Log-likelihood of every training sample.
    pub log_likelihoods: DVector<f64>,
    /// Most probable cluster of every training sample.
    pub labels: Vec<usize>,
    /// N×K posterior probabilities.
    pub probs: DMatrix<f64>,
    /// Sum of `log_likelihoods`.
    pub total_log_likelihood: f64,
    /// Number of E-steps performed.
    pub iterations: usize,
}

/// Log-likelihood and most probable cluster of one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub log_likelihood: f64,
    pub label: usize,
}

/// [`Prediction`] plus the posterior and per-cluster log-likelihood vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailedPrediction {
    pub log_likelihood: f64,
    pub label: usize,
    /// Posterior probability of each cluster.
    pub probs: DVector<f64>,
    /// log(w_k · N(x | μ_k, Σ_k)) for each cluster.
    pub cluster_log_likelihoods: DVector<f64>,
}

/// Serialized form of a trained model. Eigen-decompositions are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct MixtureDocument {
    #[serde(flatten)]
    config: EmConfig,
    #[serde(default)]
    n_features: usize,
    weights: Vec<f64>,
    means: Vec<Vec<f64>>,
    #[serde(alias = "covariances")]
    covs: Vec<Vec<Vec<f64>>>,
}

enum Initialization {
    KMeans { seeds: Option<DMatrix<f64>> },
    Given(InitialParams),
    Responsibilities(DMatrix<f64>),
}

fn to_working<T>(samples: &DMatrix<T>) -> DMatrix<f64>
where
    T: Scalar + Copy + Into<f64>,
{
    samples.map(|v| v.into())
}

fn check_shape(
    what: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<(), EmError> {
    if expected.0 != actual.0 {
        return Err(EmError::DimensionMismatch {
            what,
            expected: expected.0,
            actual: actual.0,
        });
    }
    if expected.1 != actual.1 {
        return Err(EmError::DimensionMismatch {
            what,
            expected: expected.1,
            actual: actual.1,
        });
    }
    Ok(())
}

impl GaussianMixture {
    pub fn new(config: EmConfig) -> Result<Self, EmError> {
        config.validate()?;
        Ok(Self {
            config,
            mixture: None,
        })
    }

    /// Build a trained model directly from in-memory parameters.
    ///
    /// `covs` holds one full D×D matrix per cluster; diagonal and spherical
    /// models only use its diagonal or largest eigenvalue respectively.
    pub fn from_parameters(
        config: EmConfig,
        weights: DVector<f64>,
        means: DMatrix<f64>,
        covs: Vec<DMatrix<f64>>,
    ) -> Result<Self, EmError> {
        config.validate()?;
        let k = config.n_clusters;
        if means.ncols() == 0 {
            return Err(EmError::EmptySamples);
        }
        let dim = means.ncols();
        check_shape("means", (k, dim), means.shape())?;
        check_shape("weights", (k, 1), (weights.len(), 1))?;
        check_shape("covariance list", (k, 1), (covs.len(), 1))?;
        for cov in &covs {
            check_shape("covariance", (dim, dim), cov.shape())?;
        }
        for (index, &w) in weights.iter().enumerate() {
            if !(w >= 0.0) || !w.is_finite() {
                return Err(EmError::InvalidModelFormat(format!(
                    "weight {} is invalid ({})",
                    index, w
                )));
            }
        }
        let weight_sum = weights.sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(EmError::InvalidModelFormat(format!(
                "weights must sum to 1.0 (got {})",
                weight_sum
            )));
        }

        let mut mixture = Mixture::from_covs(weights, means, covs, &config)?;
        mixture.sync_covs_with_eigen(config.covariance_type);
        Ok(Self {
            config,
            mixture: Some(mixture),
        })
    }

    pub fn config(&self) -> &EmConfig {
        &self.config
    }

    pub fn n_clusters(&self) -> usize {
        self.config.n_clusters
    }

    pub fn covariance_type(&self) -> CovarianceType {
        self.config.covariance_type
    }

    /// Number of features of the trained model, or `None` when untrained.
    pub fn n_features(&self) -> Option<usize> {
        self.mixture.as_ref().map(Mixture::dim)
    }

    pub fn is_trained(&self) -> bool {
        self.mixture.is_some()
    }

    pub fn weights(&self) -> Option<&DVector<f64>> {
        self.mixture.as_ref().map(|m| &m.weights)
    }

    pub fn means(&self) -> Option<&DMatrix<f64>> {
        self.mixture.as_ref().map(|m| &m.means)
    }

    /// Full covariance matrix of every cluster.
    pub fn covs(&self) -> Option<&[DMatrix<f64>]> {
        self.mixture.as_ref().map(|m| m.covs.as_slice())
    }

    /// Floored covariance eigenvalues of `cluster` (a single value in spherical mode).
    pub fn eigenvalues(&self, cluster: usize) -> Option<&DVector<f64>> {
        self.mixture
            .as_ref()
            .and_then(|m| m.eigen.get(cluster))
            .map(|e| &e.values)
    }

    /// Drop all parameters; the estimator returns to the untrained state.
    pub fn clear(&mut self) {
        self.mixture = None;
    }

    /// Train from scratch, bootstrapping clusters with k-means.
    pub fn train<T>(&mut self, samples: &DMatrix<T>) -> Result<TrainOutput, EmError>
    where
        T: Scalar + Copy + Into<f64>,
    {
        let samples = to_working(samples);
        self.check_samples(&samples)?;
        self.fit(samples, Initialization::KMeans { seeds: None })
    }

    /// Train starting at the E-step from caller-supplied parameters.
    ///
    /// Unless both covariances and weights are supplied, the means only seed
    /// a short k-means pass that derives the remaining parameters.
    pub fn train_e<T>(
        &mut self,
        samples: &DMatrix<T>,
        initial: InitialParams,
    ) -> Result<TrainOutput, EmError>
    where
        T: Scalar + Copy + Into<f64>,
    {
        let samples = to_working(samples);
        self.check_samples(&samples)?;
        let k = self.config.n_clusters;
        let dim = samples.ncols();

        check_shape("initial means", (k, dim), initial.means.shape())?;
        if let Some(covs) = &initial.covs {
            check_shape("initial covariance list", (k, 1), (covs.len(), 1))?;
            for cov in covs {
                check_shape("initial covariance", (dim, dim), cov.shape())?;
            }
        }
        if let Some(weights) = &initial.weights {
            check_shape("initial weights", (k, 1), (weights.len(), 1))?;
        }

        let init = if initial.covs.is_some() && initial.weights.is_some() {
            Initialization::Given(initial)
        } else {
            Initialization::KMeans {
                seeds: Some(initial.means),
            }
        };
        self.fit(samples, init)
    }

    /// Train starting at the M-step from an N×K responsibility matrix.
    ///
    /// Rows are clamped to be non-negative and normalized; rows without any
    /// significant entry become uniform.
    pub fn train_m<T>(
        &mut self,
        samples: &DMatrix<T>,
        probs: &DMatrix<f64>,
    ) -> Result<TrainOutput, EmError>
    where
        T: Scalar + Copy + Into<f64>,
    {
        let samples = to_working(samples);
        self.check_samples(&samples)?;
        check_shape(
            "initial responsibilities",
            (samples.nrows(), self.config.n_clusters),
            probs.shape(),
        )?;
        let mut probs = probs.clone();
        utils::normalize_probability_rows(&mut probs);
        self.fit(samples, Initialization::Responsibilities(probs))
    }

    /// Log-likelihood and most probable cluster of `sample`.
    pub fn predict<T>(&self, sample: &[T]) -> Result<Prediction, EmError>
    where
        T: Copy + Into<f64>,
    {
        let detailed = self.predict_proba(sample)?;
        Ok(Prediction {
            log_likelihood: detailed.log_likelihood,
            label: detailed.label,
        })
    }

    /// Like [`predict`](Self::predict), also returning posteriors and
    /// per-cluster log-likelihoods.
    pub fn predict_proba<T>(&self, sample: &[T]) -> Result<DetailedPrediction, EmError>
    where
        T: Copy + Into<f64>,
    {
        let mixture = self.mixture.as_ref().ok_or(EmError::NotTrained)?;
        if sample.len() != mixture.dim() {
            return Err(EmError::DimensionMismatch {
                what: "sample",
                expected: mixture.dim(),
                actual: sample.len(),
            });
        }
        let sample = DVector::from_iterator(sample.len(), sample.iter().map(|&v| v.into()));
        let eval = mixture.evaluate(&sample);
        Ok(DetailedPrediction {
            log_likelihood: eval.log_likelihood,
            label: eval.label,
            probs: eval.probs,
            cluster_log_likelihoods: eval.cluster_log_likelihoods,
        })
    }

    /// Predict every row of `samples`.
    pub fn predict_batch<T>(&self, samples: &DMatrix<T>) -> Result<Vec<Prediction>, EmError>
    where
        T: Scalar + Copy + Into<f64>,
    {
        let samples = to_working(samples);
        samples
            .row_iter()
            .map(|row| {
                let values: Vec<f64> = row.iter().copied().collect();
                self.predict(values.as_slice())
            })
            .collect()
    }

    fn check_samples(&self, samples: &DMatrix<f64>) -> Result<(), EmError> {
        if samples.nrows() == 0 || samples.ncols() == 0 {
            return Err(EmError::EmptySamples);
        }
        let k = self.config.n_clusters;
        if k == 0 || k > samples.nrows() {
            return Err(EmError::InvalidClusterCount {
                clusters: k,
                samples: samples.nrows(),
            });
        }
        Ok(())
    }

    fn fit(&mut self, samples: DMatrix<f64>, init: Initialization) -> Result<TrainOutput, EmError> {
        self.clear();
        let k = self.config.n_clusters;

        let (mut mixture, mut state, start_with_m_step) = match init {
            Initialization::KMeans { seeds } => {
                log::debug!(
                    "initializing {} clusters with k-means ({})",
                    k,
                    if seeds.is_some() { "seeded" } else { "k-means++" }
                );
                let mixture = self.kmeans_mixture(&samples, seeds.as_ref())?;
                (mixture, TrainingState::new(samples, k), false)
            }
            Initialization::Given(initial) => {
                log::debug!("initializing {} clusters from given parameters", k);
                let weights = initial
                    .weights
                    .as_ref()
                    .map(utils::normalize_probability_vector)
                    .unwrap_or_else(|| DVector::from_element(k, 1.0 / k as f64));
                let covs = initial.covs.unwrap_or_default();
                let mixture = Mixture::from_covs(weights, initial.means, covs, &self.config)?;
                (mixture, TrainingState::new(samples, k), false)
            }
            Initialization::Responsibilities(probs) => {
                log::debug!("initializing {} clusters from responsibilities", k);
                let mixture = Mixture {
                    weights: DVector::zeros(k),
                    means: DMatrix::zeros(k, samples.ncols()),
                    covs: Vec::new(),
                    eigen: Vec::new(),
                    log_weight_div_det: DVector::zeros(k),
                };
                (mixture, TrainingState::with_probs(samples, probs), true)
            }
        };

        let outcome = match em::run(&mut mixture, &mut state, &self.config, start_with_m_step) {
            Ok(outcome) => outcome,
            Err(err) => {
                if let EmError::TrainingDiverged { log_likelihood } = &err {
                    log::warn!("EM training diverged (log-likelihood {})", log_likelihood);
                }
                return Err(err);
            }
        };

        log::info!(
            "EM trained {} clusters ({:?}) in {} iterations, log-likelihood {:.6}",
            k,
            self.config.covariance_type,
            outcome.iterations,
            outcome.log_likelihood
        );

        self.mixture = Some(mixture);
        Ok(TrainOutput {
            log_likelihoods: state.log_likelihoods,
            labels: state.labels,
            probs: state.probs,
            total_log_likelihood: outcome.log_likelihood,
            iterations: outcome.iterations,
        })
    }

    /// Initial parameters from a k-means partition: per-cluster sample
    /// fractions, k-means centers and scaled empirical covariances around them.
    fn kmeans_mixture(
        &self,
        samples: &DMatrix<f64>,
        seeds: Option<&DMatrix<f64>>,
    ) -> Result<Mixture, EmError> {
        let k = self.config.n_clusters;
        let n = samples.nrows();
        let dim = samples.ncols();

        let samples_f32 = samples.map(|v| v as f32);
        let seeds_f32 = seeds.map(|m| m.map(|v| v as f32));
        let criteria = if seeds_f32.is_some() {
            KMeansCriteria::seeded()
        } else {
            KMeansCriteria::bootstrap()
        };
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let result = kmeans::kmeans(&samples_f32, k, &criteria, seeds_f32.as_ref(), &mut rng);

        let means = result.centers.map(|v| v as f64);
        let mut counts = vec![0usize; k];
        let mut covs = vec![DMatrix::zeros(dim, dim); k];
        for (i, &label) in result.labels.iter().enumerate() {
            counts[label] += 1;
            let centered = samples.row(i).transpose() - means.row(label).transpose();
            covs[label].ger(1.0, &centered, &centered, 1.0);
        }
        for (cov, &count) in covs.iter_mut().zip(counts.iter()) {
            if count > 0 {
                *cov /= count as f64;
            }
        }
        let weights = DVector::from_iterator(k, counts.iter().map(|&c| c as f64 / n as f64));

        Mixture::from_covs(weights, means, covs, &self.config)
    }

    /// Serialize the trained parameters to a JSON string.
    pub fn to_json_string(&self) -> Result<String, EmError> {
        let mixture = self.mixture.as_ref().ok_or(EmError::NotTrained)?;
        let doc = MixtureDocument {
            config: self.config.clone(),
            n_features: mixture.dim(),
            weights: mixture.weights.iter().copied().collect(),
            means: mixture
                .means
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
            covs: mixture
                .covs
                .iter()
                .map(|cov| cov.row_iter().map(|row| row.iter().copied().collect()).collect())
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Rebuild a trained model from [`to_json_string`](Self::to_json_string) output.
    pub fn from_json_str(content: &str) -> Result<Self, EmError> {
        let doc: MixtureDocument = serde_json::from_str(content)?;
        let k = doc.weights.len();
        if k != doc.config.n_clusters {
            return Err(EmError::InvalidModelFormat(format!(
                "n_clusters is {} but {} weights are stored",
                doc.config.n_clusters, k
            )));
        }

        // Missing or zero n_features: take it from the stored means.
        let dim = if doc.n_features == 0 {
            doc.means.first().map_or(0, Vec::len)
        } else {
            doc.n_features
        };
        if dim == 0 {
            return Err(EmError::InvalidModelFormat("model has no features".to_string()));
        }

        if doc.means.len() != k || doc.means.iter().any(|row| row.len() != dim) {
            return Err(EmError::InvalidModelFormat(format!(
                "means must be {}x{}",
                k, dim
            )));
        }
        if doc.covs.len() != k
            || doc
                .covs
                .iter()
                .any(|cov| cov.len() != dim || cov.iter().any(|row| row.len() != dim))
        {
            return Err(EmError::InvalidModelFormat(format!(
                "expected {} covariance matrices of size {}x{}",
                k, dim, dim
            )));
        }

        let weights = DVector::from_vec(doc.weights);
        let means = DMatrix::from_row_iterator(k, dim, doc.means.into_iter().flatten());
        let covs = doc
            .covs
            .into_iter()
            .map(|cov| DMatrix::from_row_iterator(dim, dim, cov.into_iter().flatten()))
            .collect();

        Self::from_parameters(doc.config, weights, means, covs)
    }

    /// Load model from JSON file.
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self, EmError> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EmError::ModelFileNotFound(path_ref.display().to_string())
            } else {
                EmError::IoError(e)
            }
        })?;
        Self::from_json_str(&content)
    }

    /// Save model to JSON file.
    pub fn save_to_json<P: AsRef<Path>>(&self, path: P) -> Result<(), EmError> {
        let json = self.to_json_string()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn small_samples() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            8,
            2,
            &[
                0.0, 0.0, 0.2, 0.1, -0.1, 0.3, 0.1, -0.2, //
                8.0, 8.0, 8.2, 7.9, 7.8, 8.1, 8.1, 8.3,
            ],
        )
    }

    #[test]
    fn new_rejects_invalid_config() {
        assert!(GaussianMixture::new(EmConfig::new(0, CovarianceType::Diagonal)).is_err());
    }

    #[test]
    fn predict_before_training_fails() {
        let model = GaussianMixture::new(EmConfig::new(2, CovarianceType::Diagonal)).unwrap();
        assert!(matches!(model.predict(&[0.0, 0.0]), Err(EmError::NotTrained)));
        assert!(matches!(model.to_json_string(), Err(EmError::NotTrained)));
    }

    #[test]
    fn train_rejects_more_clusters_than_samples() {
        let mut model = GaussianMixture::new(EmConfig::new(9, CovarianceType::Diagonal)).unwrap();
        let err = model.train(&small_samples()).unwrap_err();
        assert!(matches!(
            err,
            EmError::InvalidClusterCount {
                clusters: 9,
                samples: 8
            }
        ));
        assert!(!model.is_trained());
    }

    #[test]
    fn train_rejects_empty_samples() {
        let mut model = GaussianMixture::new(EmConfig::new(1, CovarianceType::Diagonal)).unwrap();
        let empty = DMatrix::<f64>::zeros(0, 2);
        assert!(matches!(model.train(&empty), Err(EmError::EmptySamples)));
    }

    #[test]
    fn bad_input_keeps_previous_model() {
        let mut model = GaussianMixture::new(EmConfig::new(2, CovarianceType::Spherical)).unwrap();
        model.train(&small_samples()).unwrap();
        let before = model.predict(&[0.0, 0.0]).unwrap();

        let wrong_means = DMatrix::zeros(3, 2);
        let err = model
            .train_e(&small_samples(), InitialParams::from_means(wrong_means))
            .unwrap_err();
        assert!(matches!(err, EmError::DimensionMismatch { .. }));
        assert_eq!(model.predict(&[0.0, 0.0]).unwrap(), before);
    }

    #[test]
    fn train_m_rejects_wrong_responsibility_shape() {
        let mut model = GaussianMixture::new(EmConfig::new(2, CovarianceType::Diagonal)).unwrap();
        let probs = DMatrix::from_element(7, 2, 0.5);
        assert!(matches!(
            model.train_m(&small_samples(), &probs),
            Err(EmError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn predict_rejects_wrong_dimension() {
        let mut model = GaussianMixture::new(EmConfig::new(2, CovarianceType::Diagonal)).unwrap();
        model.train(&small_samples()).unwrap();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(EmError::DimensionMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn clear_returns_to_untrained() {
        let mut model = GaussianMixture::new(EmConfig::new(2, CovarianceType::Generic)).unwrap();
        model.train(&small_samples()).unwrap();
        assert!(model.is_trained());
        assert_eq!(model.n_features(), Some(2));
        model.clear();
        assert!(!model.is_trained());
        assert!(model.weights().is_none());
    }

    #[test]
    fn accepts_integer_and_single_precision_samples() {
        let ints = DMatrix::from_row_slice(6, 1, &[0i32, 1, 0, 20, 21, 20]);
        let mut model = GaussianMixture::new(EmConfig::new(2, CovarianceType::Diagonal)).unwrap();
        let out = model.train(&ints).unwrap();
        assert_eq!(out.labels[0], out.labels[1]);
        assert_ne!(out.labels[0], out.labels[3]);

        let prediction = model.predict(&[20.5f32]).unwrap();
        assert_eq!(prediction.label, out.labels[3]);
    }

    #[test]
    fn single_iteration_budget_runs_one_e_step() {
        let config = EmConfig::new(2, CovarianceType::Spherical).with_max_iters(1);
        let mut model = GaussianMixture::new(config).unwrap();
        let out = model.train(&small_samples()).unwrap();
        assert_eq!(out.iterations, 1);
        assert_abs_diff_eq!(model.weights().unwrap().sum(), 1.0, epsilon = 1e-12);
        // Spherical covariances are rebuilt as scaled identities.
        for cov in model.covs().unwrap() {
            assert_eq!(cov[(0, 1)], 0.0);
            assert_eq!(cov[(0, 0)], cov[(1, 1)]);
        }
    }

    #[test]
    fn from_json_rejects_inconsistent_documents() {
        let json = r#"{
            "n_clusters": 2,
            "covariance_type": "diagonal",
            "n_features": 1,
            "weights": [1.0],
            "means": [[0.0]],
            "covs": [[[1.0]]]
        }"#;
        assert!(matches!(
            GaussianMixture::from_json_str(json),
            Err(EmError::InvalidModelFormat(_))
        ));
    }

    #[test]
    fn from_json_infers_missing_feature_count() {
        let json = r#"{
            "n_clusters": 1,
            "covariance_type": "spherical",
            "n_features": 0,
            "weights": [1.0],
            "means": [[1.0, 2.0]],
            "covs": [[[4.0, 0.0], [0.0, 4.0]]]
        }"#;
        let model = GaussianMixture::from_json_str(json).unwrap();
        assert_eq!(model.n_features(), Some(2));
        assert_abs_diff_eq!(model.eigenvalues(0).unwrap()[0], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn from_json_accepts_absent_feature_count() {
        let json = r#"{
            "n_clusters": 1,
            "covariance_type": "diagonal",
            "weights": [1.0],
            "means": [[0.0, 0.0, 0.0]],
            "covs": [[[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 3.0]]]
        }"#;
        let model = GaussianMixture::from_json_str(json).unwrap();
        assert_eq!(model.n_features(), Some(3));
        assert_eq!(model.eigenvalues(0).unwrap().as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = GaussianMixture::load_from_json("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, EmError::ModelFileNotFound(_)));
    }
}
