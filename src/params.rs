//! Controller parameters
//!
//! Both controllers are configured once, at construction. Values are
//! validated up front; a controller never runs with out-of-bounds options.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::randomization::ThresholdRandomization;
use crate::AlError;

/// Parameters of the adaptive-threshold self-labeler
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfLabelingParams {
    /// Budget as a fraction of processed points
    #[serde_as(as = "DefaultOnNull")]
    pub budget: f64,
    /// Initial querying threshold
    #[serde_as(as = "DefaultOnNull")]
    pub threshold: f64,
    /// Minimum max-posterior for self-labeling
    #[serde_as(as = "DefaultOnNull")]
    pub confidence: f64,
    /// Multiplicative threshold adjustment step
    #[serde_as(as = "DefaultOnNull")]
    pub step: f64,
    /// Points always queried before threshold logic applies
    #[serde_as(as = "DefaultOnNull")]
    pub num_init_instances: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub randomization: ThresholdRandomization,
    #[serde_as(as = "DefaultOnNull")]
    pub seed: u64,
}

impl Default for SelfLabelingParams {
    fn default() -> Self {
        Self {
            budget: 0.1,
            threshold: 1.0,
            confidence: 0.9,
            step: 0.01,
            num_init_instances: 0,
            randomization: ThresholdRandomization::Beta,
            seed: 42,
        }
    }
}

impl SelfLabelingParams {
    pub fn validate(&self) -> Result<(), AlError> {
        check_unit("budget", self.budget)?;

        if !(self.threshold.is_finite() && self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(AlError::InvalidConfig(format!(
                "threshold must lie in (0, 1], got {}",
                self.threshold
            )));
        }

        if !(self.step.is_finite() && (0.0..1.0).contains(&self.step)) {
            return Err(AlError::InvalidConfig(format!(
                "step must lie in [0, 1), got {}",
                self.step
            )));
        }

        if !(self.confidence.is_finite() && (0.0..=1.1).contains(&self.confidence)) {
            return Err(AlError::InvalidConfig(format!(
                "confidence must lie in [0, 1.1], got {}",
                self.confidence
            )));
        }

        if let ThresholdRandomization::Fixed { multiplier } = self.randomization {
            if !(multiplier.is_finite() && multiplier > 0.0) {
                return Err(AlError::InvalidConfig(format!(
                    "fixed multiplier must be finite and positive, got {multiplier}"
                )));
            }
        }

        Ok(())
    }

    /// Parse parameters from JSON and validate them.
    pub fn from_json_str(json: &str) -> Result<Self, AlError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }
}

/// Parameters of the chunked time-decayed ensemble
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleParams {
    /// Budget as a fraction of processed points
    #[serde_as(as = "DefaultOnNull")]
    pub budget: f64,
    /// Probability of labeling a point by random sampling
    #[serde_as(as = "DefaultOnNull")]
    pub random_threshold: f64,
    /// Maximum number of rotating classifiers
    #[serde_as(as = "DefaultOnNull")]
    pub max_classifiers: usize,
    /// Points per chunk
    #[serde_as(as = "DefaultOnNull")]
    pub chunk_size: u64,
    /// Fixed weight of the stable classifier
    #[serde_as(as = "DefaultOnNull")]
    pub stable_weight: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub seed: u64,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            budget: 0.1,
            random_threshold: 0.25,
            max_classifiers: 10,
            chunk_size: 500,
            stable_weight: 1.0,
            seed: 42,
        }
    }
}

impl EnsembleParams {
    pub fn validate(&self) -> Result<(), AlError> {
        check_unit("budget", self.budget)?;
        check_unit("random_threshold", self.random_threshold)?;

        if self.max_classifiers == 0 {
            return Err(AlError::InvalidConfig(
                "max_classifiers must be greater than zero".to_string(),
            ));
        }

        // index % 1 == 1 never holds, so a chunk of one point would never start
        if self.chunk_size < 2 {
            return Err(AlError::InvalidConfig(format!(
                "chunk_size must be at least 2, got {}",
                self.chunk_size
            )));
        }

        if !(self.stable_weight.is_finite() && self.stable_weight >= 0.0) {
            return Err(AlError::InvalidConfig(format!(
                "stable_weight must be finite and non-negative, got {}",
                self.stable_weight
            )));
        }

        Ok(())
    }

    /// Parse parameters from JSON and validate them.
    pub fn from_json_str(json: &str) -> Result<Self, AlError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), AlError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AlError::InvalidConfig(format!(
            "{name} must lie in [0, 1], got {value}"
        )))
    }
}
