//! Per-cell subject/object classifiers.
//!
//! A grid cell is classified either by a Gaussian mixture fitted to subject
//! descriptors (thresholding the standardized log-likelihood) or by a plain
//! threshold rule on the raw descriptor values. Both sit behind the
//! [`Predictor`] trait and the [`CellPredictor`] enum.

use crate::config::EmConfig;
use crate::error::EmError;
use crate::model::GaussianMixture;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Which classification rule a predictor applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorKind {
    GaussianMixture,
    ThresholdBased,
}

/// Outcome of classifying one descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPrediction {
    /// `true` for "subject", `false` for "object".
    pub subject: bool,
    /// Score compared against the decision threshold.
    pub score: f64,
    /// Signed distance from the score to the decision threshold
    /// (`threshold - score`); negative on the subject side.
    pub distance_to_margin: f64,
}

pub trait Predictor {
    fn kind(&self) -> PredictorKind;

    /// Fit the predictor to subject descriptors, one per row.
    fn train(&mut self, samples: &DMatrix<f64>) -> Result<(), EmError>;

    fn predict(&self, sample: &[f64]) -> Result<CellPrediction, EmError>;

    fn predict_batch(&self, samples: &DMatrix<f64>) -> Result<Vec<CellPrediction>, EmError> {
        samples
            .row_iter()
            .map(|row| {
                let values: Vec<f64> = row.iter().copied().collect();
                self.predict(&values)
            })
            .collect()
    }
}

/// Mixture-based rule: a sample is "subject" when its log-likelihood,
/// standardized by the training log-likelihoods, exceeds the threshold.
///
/// The mean and deviation come from training, not from the batch being
/// scored, so a single sample gets the same score alone or in a batch.
#[derive(Debug, Clone)]
pub struct MixturePredictor {
    model: GaussianMixture,
    log_likelihood_threshold: f64,
    train_mean: f64,
    train_std: f64,
}

impl MixturePredictor {
    pub fn new(config: EmConfig, log_likelihood_threshold: f64) -> Result<Self, EmError> {
        Ok(Self {
            model: GaussianMixture::new(config)?,
            log_likelihood_threshold,
            train_mean: 0.0,
            train_std: 1.0,
        })
    }

    pub fn model(&self) -> &GaussianMixture {
        &self.model
    }

    pub fn log_likelihood_threshold(&self) -> f64 {
        self.log_likelihood_threshold
    }

    /// Map a raw log-likelihood onto the training distribution.
    pub fn standardize(&self, log_likelihood: f64) -> f64 {
        (log_likelihood - self.train_mean) / self.train_std
    }
}

impl Predictor for MixturePredictor {
    fn kind(&self) -> PredictorKind {
        PredictorKind::GaussianMixture
    }

    fn train(&mut self, samples: &DMatrix<f64>) -> Result<(), EmError> {
        let output = self.model.train(samples)?;
        let lls = &output.log_likelihoods;
        let n = lls.len() as f64;
        let mean = lls.sum() / n;
        let variance = lls.iter().map(|&ll| (ll - mean) * (ll - mean)).sum::<f64>() / n;
        let std = variance.sqrt();

        self.train_mean = mean;
        // Constant log-likelihoods: fall back to a plain offset.
        self.train_std = if std > f64::EPSILON { std } else { 1.0 };
        log::debug!(
            "mixture predictor: training log-likelihood mean {:.4}, std {:.4}",
            self.train_mean,
            self.train_std
        );
        Ok(())
    }

    fn predict(&self, sample: &[f64]) -> Result<CellPrediction, EmError> {
        let prediction = self.model.predict(sample)?;
        let score = self.standardize(prediction.log_likelihood);
        Ok(CellPrediction {
            subject: score > self.log_likelihood_threshold,
            score,
            distance_to_margin: self.log_likelihood_threshold - score,
        })
    }
}

/// Threshold rule: the fraction of descriptor values above `score_threshold`
/// must exceed `positive_ratio` for a "subject" decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPredictor {
    pub score_threshold: f64,
    pub positive_ratio: f64,
}

impl ThresholdPredictor {
    pub fn new(score_threshold: f64, positive_ratio: f64) -> Self {
        Self {
            score_threshold,
            positive_ratio,
        }
    }
}

impl Predictor for ThresholdPredictor {
    fn kind(&self) -> PredictorKind {
        PredictorKind::ThresholdBased
    }

    /// Nothing to fit; the thresholds are fixed at construction.
    fn train(&mut self, samples: &DMatrix<f64>) -> Result<(), EmError> {
        if samples.nrows() == 0 || samples.ncols() == 0 {
            return Err(EmError::EmptySamples);
        }
        Ok(())
    }

    fn predict(&self, sample: &[f64]) -> Result<CellPrediction, EmError> {
        if sample.is_empty() {
            return Err(EmError::EmptySamples);
        }
        let active = sample.iter().filter(|&&v| v > self.score_threshold).count();
        let fraction = active as f64 / sample.len() as f64;
        Ok(CellPrediction {
            subject: fraction > self.positive_ratio,
            score: fraction,
            distance_to_margin: self.positive_ratio - fraction,
        })
    }
}

/// Closed set of per-cell predictors.
#[derive(Debug, Clone)]
pub enum CellPredictor {
    GaussianMixture(MixturePredictor),
    ThresholdBased(ThresholdPredictor),
}

impl From<MixturePredictor> for CellPredictor {
    fn from(p: MixturePredictor) -> Self {
        CellPredictor::GaussianMixture(p)
    }
}

impl From<ThresholdPredictor> for CellPredictor {
    fn from(p: ThresholdPredictor) -> Self {
        CellPredictor::ThresholdBased(p)
    }
}

impl Predictor for CellPredictor {
    fn kind(&self) -> PredictorKind {
        match self {
            CellPredictor::GaussianMixture(p) => p.kind(),
            CellPredictor::ThresholdBased(p) => p.kind(),
        }
    }

    fn train(&mut self, samples: &DMatrix<f64>) -> Result<(), EmError> {
        match self {
            CellPredictor::GaussianMixture(p) => p.train(samples),
            CellPredictor::ThresholdBased(p) => p.train(samples),
        }
    }

    fn predict(&self, sample: &[f64]) -> Result<CellPrediction, EmError> {
        match self {
            CellPredictor::GaussianMixture(p) => p.predict(sample),
            CellPredictor::ThresholdBased(p) => p.predict(sample),
        }
    }
}
