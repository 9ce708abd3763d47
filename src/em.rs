//! Expectation-maximization over a fixed sample matrix.
//!
//! For sample i and cluster k:
//!
//! ```text
//! L_ik  = log(w_k) - 0.5 * log|Σ_k| - 0.5 * (x_i - μ_k)ᵀ Σ_k⁻¹ (x_i - μ_k)
//! q     = argmax_k L_ik
//! p_ik  = exp(L_ik - L_iq) / Σ_j exp(L_ij - L_iq)
//! ll_i  = log Σ_j exp(L_ij - L_iq) + L_iq - 0.5 * D * log(2π)
//! ```

use crate::config::{CovarianceType, EmConfig};
use crate::covariance::{self, ClusterEigen};
use crate::error::EmError;
use crate::utils::{self, LOG_2PI};
use nalgebra::{DMatrix, DVector};

/// Aggregate log-likelihoods at or below this value mean training broke down.
pub(crate) const DIVERGED_LOG_LIKELIHOOD: f64 = -f64::MAX / 10000.0;

/// Trained (or in-training) mixture parameters plus their derived caches.
#[derive(Debug, Clone)]
pub(crate) struct Mixture {
    pub weights: DVector<f64>,
    pub means: DMatrix<f64>,
    pub covs: Vec<DMatrix<f64>>,
    pub eigen: Vec<ClusterEigen>,
    /// log(w_k) - 0.5 * log|Σ_k|
    pub log_weight_div_det: DVector<f64>,
}

/// Result of evaluating one sample against the mixture.
#[derive(Debug, Clone)]
pub(crate) struct Evaluation {
    pub log_likelihood: f64,
    pub label: usize,
    pub probs: DVector<f64>,
    pub cluster_log_likelihoods: DVector<f64>,
}

/// Per-call training buffers; dropped once training returns.
#[derive(Debug)]
pub(crate) struct TrainingState {
    pub samples: DMatrix<f64>,
    pub probs: DMatrix<f64>,
    pub labels: Vec<usize>,
    pub log_likelihoods: DVector<f64>,
}

impl TrainingState {
    pub fn new(samples: DMatrix<f64>, n_clusters: usize) -> Self {
        let n = samples.nrows();
        Self {
            samples,
            probs: DMatrix::zeros(n, n_clusters),
            labels: vec![0; n],
            log_likelihoods: DVector::zeros(n),
        }
    }

    pub fn with_probs(samples: DMatrix<f64>, probs: DMatrix<f64>) -> Self {
        let n = samples.nrows();
        Self {
            samples,
            probs,
            labels: vec![0; n],
            log_likelihoods: DVector::zeros(n),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EmOutcome {
    pub iterations: usize,
    pub log_likelihood: f64,
}

impl Mixture {
    /// Assemble a mixture from full covariance matrices, decomposing each one.
    pub fn from_covs(
        weights: DVector<f64>,
        means: DMatrix<f64>,
        covs: Vec<DMatrix<f64>>,
        config: &EmConfig,
    ) -> Result<Self, EmError> {
        let eigen = covs
            .iter()
            .enumerate()
            .map(|(k, cov)| {
                covariance::decompose(cov, config.covariance_type, config.min_eigen_value, k)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let n_clusters = weights.len();
        let mut mixture = Self {
            weights,
            means,
            covs,
            eigen,
            log_weight_div_det: DVector::zeros(n_clusters),
        };
        mixture.compute_log_weight_div_det();
        Ok(mixture)
    }

    pub fn n_clusters(&self) -> usize {
        self.weights.len()
    }

    pub fn dim(&self) -> usize {
        self.means.ncols()
    }

    pub fn compute_log_weight_div_det(&mut self) {
        let dim = self.dim();
        self.log_weight_div_det = DVector::from_iterator(
            self.n_clusters(),
            self.weights
                .iter()
                .zip(self.eigen.iter())
                .map(|(&w, eig)| w.max(f64::MIN_POSITIVE).ln() - 0.5 * eig.log_det(dim)),
        );
    }

    /// Rebuild the covariance matrices of diagonal and spherical clusters
    /// from their eigenvalues.
    pub fn sync_covs_with_eigen(&mut self, covariance_type: CovarianceType) {
        if covariance_type == CovarianceType::Generic {
            return;
        }
        let dim = self.dim();
        self.covs = self.eigen.iter().map(|eig| eig.reconstruct(dim)).collect();
    }

    /// Evaluate `sample` (length D) against every cluster.
    pub fn evaluate(&self, sample: &DVector<f64>) -> Evaluation {
        let dim = self.dim();
        let scores: Vec<f64> = (0..self.n_clusters())
            .map(|k| {
                let centered = sample - self.means.row(k).transpose();
                self.log_weight_div_det[k] - 0.5 * self.eigen[k].mahalanobis_sq(&centered)
            })
            .collect();

        let label = utils::argmax(&scores);
        let log_norm = utils::log_sum_exp(&scores);
        let half_log_2pi = 0.5 * dim as f64 * LOG_2PI;

        // Every cluster underflowed: put all mass on the label.
        let probs = if log_norm.is_finite() {
            DVector::from_iterator(scores.len(), scores.iter().map(|&l| (l - log_norm).exp()))
        } else {
            DVector::from_fn(scores.len(), |k, _| if k == label { 1.0 } else { 0.0 })
        };

        Evaluation {
            log_likelihood: log_norm - half_log_2pi,
            label,
            probs,
            cluster_log_likelihoods: DVector::from_iterator(
                scores.len(),
                scores.iter().map(|&l| l - half_log_2pi),
            ),
        }
    }

    /// E-step: responsibilities, labels and log-likelihoods for every sample.
    pub fn e_step(&mut self, state: &mut TrainingState) {
        self.compute_log_weight_div_det();
        for i in 0..state.samples.nrows() {
            let sample = state.samples.row(i).transpose();
            let eval = self.evaluate(&sample);
            state.probs.set_row(i, &eval.probs.transpose());
            state.labels[i] = eval.label;
            state.log_likelihoods[i] = eval.log_likelihood;
        }
    }

    /// M-step: re-estimate weights, means and covariances from the
    /// responsibilities in `state`.
    ///
    /// A cluster whose unnormalized weight is at or below `N * f64::EPSILON`
    /// is not re-estimated. It receives a copy of the mean and covariance of
    /// the surviving cluster with the smallest weight; among equal weights the
    /// lowest index wins. All starved clusters of one step copy the same source.
    pub fn m_step(&mut self, state: &TrainingState, config: &EmConfig) -> Result<(), EmError> {
        let samples = &state.samples;
        let probs = &state.probs;
        let n = samples.nrows();
        let dim = samples.ncols();
        let k_total = probs.ncols();

        let mut weights = DVector::zeros(k_total);
        for i in 0..n {
            for k in 0..k_total {
                weights[k] += probs[(i, k)];
            }
        }

        let min_pos_weight = n as f64 * f64::EPSILON;
        let mut smallest: Option<usize> = None;
        for k in 0..k_total {
            if weights[k] <= min_pos_weight {
                continue;
            }
            if smallest.map_or(true, |s| weights[k] < weights[s]) {
                smallest = Some(k);
            }
        }
        let source = smallest.ok_or(EmError::TrainingDiverged {
            log_likelihood: f64::NEG_INFINITY,
        })?;

        let mut means = DMatrix::zeros(k_total, dim);
        let mut covs: Vec<Option<DMatrix<f64>>> = vec![None; k_total];
        let mut eigen: Vec<Option<ClusterEigen>> = vec![None; k_total];

        for k in 0..k_total {
            let weight = weights[k];
            if weight <= min_pos_weight {
                continue;
            }

            let mut mean = DVector::zeros(dim);
            for i in 0..n {
                mean.axpy(probs[(i, k)], &samples.row(i).transpose(), 1.0);
            }
            mean /= weight;

            let cluster_eigen = match config.covariance_type {
                CovarianceType::Generic => {
                    let mut cov = DMatrix::zeros(dim, dim);
                    for i in 0..n {
                        let centered = samples.row(i).transpose() - &mean;
                        cov.ger(probs[(i, k)], &centered, &centered, 1.0);
                    }
                    cov /= weight;
                    let eig = covariance::decompose(
                        &cov,
                        CovarianceType::Generic,
                        config.min_eigen_value,
                        k,
                    )?;
                    covs[k] = Some(cov);
                    eig
                }
                CovarianceType::Diagonal => {
                    let mut values = DVector::zeros(dim);
                    for i in 0..n {
                        let p = probs[(i, k)];
                        for d in 0..dim {
                            let v = samples[(i, d)] - mean[d];
                            values[d] += p * v * v;
                        }
                    }
                    values /= weight;
                    ClusterEigen::from_values(values, None, config.min_eigen_value)
                }
                CovarianceType::Spherical => {
                    let mut variance = 0.0;
                    for i in 0..n {
                        let p = probs[(i, k)];
                        for d in 0..dim {
                            let v = samples[(i, d)] - mean[d];
                            variance += p * v * v;
                        }
                    }
                    variance /= dim as f64 * weight;
                    ClusterEigen::from_values(
                        DVector::from_element(1, variance),
                        None,
                        config.min_eigen_value,
                    )
                }
            };
            if covs[k].is_none() {
                covs[k] = Some(cluster_eigen.reconstruct(dim));
            }
            means.set_row(k, &mean.transpose());
            eigen[k] = Some(cluster_eigen);
        }

        for k in 0..k_total {
            if weights[k] > min_pos_weight {
                continue;
            }
            log::warn!(
                "cluster {} collapsed (weight {:e}), re-seeding from cluster {}",
                k,
                weights[k],
                source
            );
            let mean = means.row(source).clone_owned();
            means.set_row(k, &mean);
            covs[k] = covs[source].clone();
            eigen[k] = eigen[source].clone();
        }

        self.covs = covs
            .into_iter()
            .enumerate()
            .map(|(k, c)| c.ok_or(EmError::Decomposition { cluster: k }))
            .collect::<Result<_, _>>()?;
        self.eigen = eigen
            .into_iter()
            .enumerate()
            .map(|(k, e)| e.ok_or(EmError::Decomposition { cluster: k }))
            .collect::<Result<_, _>>()?;
        self.means = means;
        self.weights = weights / n as f64;
        Ok(())
    }
}

/// Alternate E- and M-steps until convergence or the iteration budget runs out.
///
/// The loop always ends right after an E-step, so the responsibilities in
/// `state` describe the returned parameters. With `start_with_m_step` the
/// responsibilities already in `state` seed the first M-step.
pub(crate) fn run(
    mixture: &mut Mixture,
    state: &mut TrainingState,
    config: &EmConfig,
    start_with_m_step: bool,
) -> Result<EmOutcome, EmError> {
    if start_with_m_step {
        mixture.m_step(state, config)?;
    }

    let mut log_likelihood;
    let mut prev_log_likelihood = 0.0;
    let mut iter = 0;
    loop {
        mixture.e_step(state);
        log_likelihood = state.log_likelihoods.iter().sum::<f64>();
        log::trace!(
            "EM iteration {}: log-likelihood {:.6} (delta {:.6})",
            iter,
            log_likelihood,
            log_likelihood - prev_log_likelihood
        );

        // Stop before an M-step can feed non-finite values into the decomposition.
        if log_likelihood.is_nan() || log_likelihood == f64::NEG_INFINITY {
            return Err(EmError::TrainingDiverged { log_likelihood });
        }

        if iter + 1 >= config.max_iters {
            break;
        }

        let delta = log_likelihood - prev_log_likelihood;
        if iter != 0 && (delta < -f64::EPSILON || delta < config.epsilon * log_likelihood.abs()) {
            break;
        }

        mixture.m_step(state, config)?;
        prev_log_likelihood = log_likelihood;
        iter += 1;
    }

    if log_likelihood <= DIVERGED_LOG_LIKELIHOOD {
        return Err(EmError::TrainingDiverged { log_likelihood });
    }

    mixture.sync_covs_with_eigen(config.covariance_type);
    Ok(EmOutcome {
        iterations: iter + 1,
        log_likelihood,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit_mixture(covariance_type: CovarianceType) -> (Mixture, EmConfig) {
        let config = EmConfig::new(2, covariance_type);
        let mixture = Mixture::from_covs(
            DVector::from_vec(vec![0.5, 0.5]),
            DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 5.0, 5.0]),
            vec![DMatrix::identity(2, 2), DMatrix::identity(2, 2)],
            &config,
        )
        .unwrap();
        (mixture, config)
    }

    #[test]
    fn evaluation_posteriors_sum_to_one() {
        let (mixture, _) = unit_mixture(CovarianceType::Generic);
        let eval = mixture.evaluate(&DVector::from_vec(vec![1.0, 1.0]));
        assert_eq!(eval.label, 0);
        assert_abs_diff_eq!(eval.probs.sum(), 1.0, epsilon = 1e-12);
        assert!(eval.probs[0] > eval.probs[1]);
    }

    #[test]
    fn evaluation_survives_far_away_samples() {
        let (mixture, _) = unit_mixture(CovarianceType::Diagonal);
        let eval = mixture.evaluate(&DVector::from_vec(vec![1e6, 1e6]));
        assert_eq!(eval.label, 1);
        assert!(eval.log_likelihood.is_finite());
        assert!(eval.probs.iter().all(|p| p.is_finite()));
        assert_abs_diff_eq!(eval.probs.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn evaluation_of_overflowing_sample_has_defined_posteriors() {
        let (mixture, _) = unit_mixture(CovarianceType::Generic);
        let eval = mixture.evaluate(&DVector::from_vec(vec![1e200, 1e200]));
        assert_eq!(eval.log_likelihood, f64::NEG_INFINITY);
        assert_eq!(eval.label, 0);
        assert_eq!(eval.probs.as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn far_but_finite_start_recovers_after_one_m_step() {
        let config = EmConfig::new(1, CovarianceType::Diagonal);
        let mut mixture = Mixture::from_covs(
            DVector::from_element(1, 1.0),
            DMatrix::from_element(1, 1, 1e152),
            vec![DMatrix::identity(1, 1)],
            &config,
        )
        .unwrap();
        let samples = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let mut state = TrainingState::new(samples, 1);
        let outcome = run(&mut mixture, &mut state, &config, false).unwrap();

        assert!(outcome.log_likelihood.is_finite());
        assert!(outcome.log_likelihood > DIVERGED_LOG_LIKELIHOOD);
        assert_abs_diff_eq!(mixture.means[(0, 0)], 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(mixture.covs[0][(0, 0)], 1.25, epsilon = 1e-12);
    }

    #[test]
    fn m_step_recovers_hard_assignment_statistics() {
        let (mut mixture, config) = unit_mixture(CovarianceType::Diagonal);
        let samples = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 2.0, 0.0, 10.0, 10.0, 10.0, 12.0]);
        let probs = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0]);
        let state = TrainingState::with_probs(samples, probs);
        mixture.m_step(&state, &config).unwrap();

        assert_abs_diff_eq!(mixture.weights[0], 0.5);
        assert_abs_diff_eq!(mixture.means[(0, 0)], 1.0);
        assert_abs_diff_eq!(mixture.means[(1, 1)], 11.0);
        assert_abs_diff_eq!(mixture.eigen[0].values[0], 1.0);
        assert_abs_diff_eq!(mixture.eigen[0].values[1], f64::EPSILON);
        assert_abs_diff_eq!(mixture.eigen[1].values[1], 1.0);
    }

    #[test]
    fn spherical_m_step_averages_over_dimensions() {
        let (mut mixture, config) = unit_mixture(CovarianceType::Spherical);
        let samples = DMatrix::from_row_slice(2, 2, &[-1.0, -3.0, 1.0, 3.0]);
        let probs = DMatrix::from_row_slice(2, 2, &[0.5, 0.5, 0.5, 0.5]);
        let state = TrainingState::with_probs(samples, probs);
        mixture.m_step(&state, &config).unwrap();
        // Variance: (1 + 9) / 2 dimensions = 5.
        assert_abs_diff_eq!(mixture.eigen[0].values[0], 5.0, epsilon = 1e-12);
        assert_eq!(mixture.eigen[0].values.len(), 1);
    }

    #[test]
    fn starved_clusters_copy_the_smallest_survivor() {
        let config = EmConfig::new(4, CovarianceType::Generic);
        let mut mixture = Mixture::from_covs(
            DVector::from_element(4, 0.25),
            DMatrix::zeros(4, 1),
            vec![DMatrix::identity(1, 1); 4],
            &config,
        )
        .unwrap();
        let samples = DMatrix::from_row_slice(5, 1, &[0.0, 0.1, 5.0, 5.1, 5.2]);
        let probs = DMatrix::from_row_slice(
            5,
            4,
            &[
                0.0, 1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, //
                0.0, 0.0, 0.0, 1.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        );
        let state = TrainingState::with_probs(samples, probs);
        mixture.m_step(&state, &config).unwrap();

        // Cluster 1 holds two samples, cluster 3 holds three: cluster 1 is the source.
        for starved in [0, 2] {
            assert_eq!(mixture.means.row(starved), mixture.means.row(1));
            assert_eq!(mixture.covs[starved], mixture.covs[1]);
            assert_eq!(mixture.eigen[starved], mixture.eigen[1]);
            assert_eq!(mixture.weights[starved], 0.0);
        }
        assert_abs_diff_eq!(mixture.weights.sum(), 1.0, epsilon = 1e-12);
    }
}
