//! Threshold randomization
//!
//! The self-labeler scales its querying threshold by a random multiplier on
//! every decision. Each variant guarantees a strictly positive multiplier.

use rand::Rng;
use rand_distr::{Beta, Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::AlError;

/// Distribution the threshold multiplier is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ThresholdRandomization {
    /// Beta(2, 2) shifted by 0.5, so the multiplier lies in (0.5, 1.5)
    #[default]
    Beta,
    /// Normal(1, 1) truncated to positive values
    Normal,
    /// Uniform(0, 1) truncated to positive values
    Uniform,
    /// Constant multiplier, for reproducible runs
    Fixed { multiplier: f64 },
}

impl ThresholdRandomization {
    /// Numeric code reported in diagnostics
    pub fn code(&self) -> f64 {
        match self {
            ThresholdRandomization::Beta => 0.0,
            ThresholdRandomization::Normal => 1.0,
            ThresholdRandomization::Uniform => 2.0,
            ThresholdRandomization::Fixed { .. } => 3.0,
        }
    }
}

/// Prepared sampler for one [`ThresholdRandomization`].
#[derive(Debug, Clone)]
pub enum MultiplierSampler {
    Beta(Beta<f64>),
    Normal(Normal<f64>),
    Uniform,
    Fixed(f64),
}

impl MultiplierSampler {
    pub fn new(kind: ThresholdRandomization) -> Result<Self, AlError> {
        Ok(match kind {
            ThresholdRandomization::Beta => MultiplierSampler::Beta(
                Beta::new(2.0, 2.0).map_err(|e| AlError::Distribution(e.to_string()))?,
            ),
            ThresholdRandomization::Normal => MultiplierSampler::Normal(
                Normal::new(1.0, 1.0).map_err(|e| AlError::Distribution(e.to_string()))?,
            ),
            ThresholdRandomization::Uniform => MultiplierSampler::Uniform,
            ThresholdRandomization::Fixed { multiplier } => {
                if !(multiplier.is_finite() && multiplier > 0.0) {
                    return Err(AlError::InvalidConfig(format!(
                        "fixed multiplier must be finite and positive, got {multiplier}"
                    )));
                }
                MultiplierSampler::Fixed(multiplier)
            }
        })
    }

    /// Draw a multiplier, redrawing until it is strictly positive.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            MultiplierSampler::Beta(beta) => beta.sample(rng) + 0.5,
            MultiplierSampler::Normal(normal) => loop {
                let m = normal.sample(rng);
                if m > 0.0 {
                    break m;
                }
            },
            MultiplierSampler::Uniform => loop {
                let m: f64 = rng.gen();
                if m > 0.0 {
                    break m;
                }
            },
            MultiplierSampler::Fixed(m) => *m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn draws(kind: ThresholdRandomization) -> Vec<f64> {
        let sampler = MultiplierSampler::new(kind).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        (0..2000).map(|_| sampler.sample(&mut rng)).collect()
    }

    #[test]
    fn test_beta_range() {
        for m in draws(ThresholdRandomization::Beta) {
            assert!(m > 0.5 && m < 1.5, "beta multiplier {m} out of range");
        }
    }

    #[test]
    fn test_truncated_draws_positive() {
        for kind in [ThresholdRandomization::Normal, ThresholdRandomization::Uniform] {
            assert!(draws(kind).iter().all(|&m| m > 0.0));
        }
    }

    #[test]
    fn test_fixed() {
        assert!(draws(ThresholdRandomization::Fixed { multiplier: 1.0 })
            .iter()
            .all(|&m| m == 1.0));
        assert!(MultiplierSampler::new(ThresholdRandomization::Fixed { multiplier: 0.0 }).is_err());
    }
}
