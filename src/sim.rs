//! Simulation harness
//!
//! Generates a synthetic drifting stream and runs an active learner on it
//! prequentially: every point is first predicted, then handed to the learner.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::classifier::{DataPoint, StreamClassifier};
use crate::learner::{ActiveLearner, Decision};
use crate::measurement::Measurement;
use crate::probability::max_index;
use crate::AlError;

/// Baseline learner for simulations: running class means, posterior from
/// inverse distance to each mean.
#[derive(Debug, Clone)]
pub struct CentroidClassifier {
    num_classes: usize,
    sums: Vec<Vec<f64>>,
    counts: Vec<u64>,
}

impl CentroidClassifier {
    pub fn new(num_classes: usize, dims: usize) -> Self {
        Self {
            num_classes,
            sums: vec![vec![0.0; dims]; num_classes],
            counts: vec![0; num_classes],
        }
    }

    fn trained_points(&self) -> u64 {
        self.counts.iter().sum()
    }
}

impl StreamClassifier for CentroidClassifier {
    fn reset(&mut self) {
        for s in self.sums.iter_mut() {
            s.iter_mut().for_each(|x| *x = 0.0);
        }
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    fn train(&mut self, point: &DataPoint) {
        let Some(label) = point.label else { return };
        if label >= self.num_classes {
            return;
        }
        for (s, &x) in self.sums[label].iter_mut().zip(point.features.iter()) {
            *s += x;
        }
        self.counts[label] += 1;
    }

    fn predict_posterior(&self, point: &DataPoint) -> Vec<f64> {
        if self.trained_points() == 0 {
            return vec![1.0; self.num_classes];
        }
        self.sums
            .iter()
            .zip(self.counts.iter())
            .map(|(sum, &count)| {
                if count == 0 {
                    return 0.0;
                }
                let dist_sq: f64 = sum
                    .iter()
                    .zip(point.features.iter())
                    .map(|(&s, &x)| {
                        let d = x - s / count as f64;
                        d * d
                    })
                    .sum();
                1.0 / (1e-6 + dist_sq)
            })
            .collect()
    }

    fn fresh_copy(&self) -> Box<dyn StreamClassifier> {
        Box::new(CentroidClassifier::new(
            self.num_classes,
            self.sums.first().map_or(0, Vec::len),
        ))
    }

    fn measurements(&self) -> Vec<Measurement> {
        vec![Measurement::new(
            "centroidTrainedPoints",
            self.trained_points() as f64,
        )]
    }
}

/// Synthetic stream configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub steps: usize,
    pub num_classes: usize,
    pub dims: usize,
    pub sigma_noise: f64,
    /// Step at which class centers are permuted (abrupt concept drift)
    pub drift_at: usize,
    pub seed: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            steps: 2000,
            num_classes: 3,
            dims: 2,
            sigma_noise: 0.5,
            drift_at: 1000,
            seed: 42,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), AlError> {
        if self.num_classes < 2 {
            return Err(AlError::InvalidConfig(
                "num_classes must be at least 2".to_string(),
            ));
        }
        if self.dims < 2 {
            return Err(AlError::InvalidConfig("dims must be at least 2".to_string()));
        }
        if !(self.sigma_noise.is_finite() && self.sigma_noise > 0.0) {
            return Err(AlError::InvalidConfig(
                "sigma_noise must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Center of `class`, on a circle of radius 2 in the first two dimensions.
/// After drift every class takes over its successor's center.
pub fn class_center(class: usize, config: &StreamConfig, drifted: bool) -> Vec<f64> {
    let slot = if drifted {
        (class + 1) % config.num_classes
    } else {
        class
    };
    let angle = std::f64::consts::TAU * slot as f64 / config.num_classes as f64;
    let mut center = vec![0.0; config.dims];
    center[0] = 2.0 * angle.cos();
    center[1] = 2.0 * angle.sin();
    center
}

/// Generate the labeled stream described by `config`.
pub fn generate_stream(config: &StreamConfig) -> Result<Vec<DataPoint>, AlError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.sigma_noise)
        .map_err(|e| AlError::Distribution(e.to_string()))?;

    let stream = (0..config.steps)
        .map(|t| {
            let class = rng.gen_range(0..config.num_classes);
            let features = class_center(class, config, t >= config.drift_at)
                .into_iter()
                .map(|c| c + noise.sample(&mut rng))
                .collect();
            DataPoint::new(features, class)
        })
        .collect();
    Ok(stream)
}

/// Record of one simulated step
#[derive(Debug, Clone, Serialize)]
pub struct StreamStep {
    pub t: usize,
    pub true_label: usize,
    pub predicted: Option<usize>,
    pub correct: bool,
    pub decision: Decision,
    pub labels_acquired: u64,
    pub spent_fraction: f64,
}

/// Run `learner` prequentially over the stream described by `config`.
pub fn run_simulation<L: ActiveLearner + ?Sized>(
    learner: &mut L,
    config: &StreamConfig,
) -> Result<Vec<StreamStep>, AlError> {
    let stream = generate_stream(config)?;
    let mut results = Vec::with_capacity(stream.len());

    for (t, mut point) in stream.into_iter().enumerate() {
        let true_label = point
            .label
            .ok_or(AlError::MissingLabel { point: t as u64 + 1 })?;
        let predicted = max_index(&learner.votes(&point));
        let decision = learner.process(&mut point)?;
        let budget = learner.budget();

        results.push(StreamStep {
            t,
            true_label,
            predicted,
            correct: predicted == Some(true_label),
            decision,
            labels_acquired: budget.labels_acquired,
            spent_fraction: budget.spent_fraction(),
        });
    }

    Ok(results)
}

/// Fraction of correct predictions
pub fn accuracy(steps: &[StreamStep]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    steps.iter().filter(|s| s.correct).count() as f64 / steps.len() as f64
}

/// Accuracy over steps `start..end`, clamped to the recorded range
pub fn accuracy_between(steps: &[StreamStep], start: usize, end: usize) -> f64 {
    let end = end.min(steps.len());
    let start = start.min(end);
    accuracy(&steps[start..end])
}

/// Fraction of steps whose label was acquired
pub fn label_rate(steps: &[StreamStep]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    steps.iter().filter(|s| s.decision.acquired_label()).count() as f64 / steps.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SelfLabelingParams;
    use crate::AdaptiveThresholdSelfLabeler;

    #[test]
    fn test_stream_generation() {
        let config = StreamConfig {
            steps: 200,
            ..Default::default()
        };
        let stream = generate_stream(&config).unwrap();
        assert_eq!(stream.len(), 200);
        assert!(stream
            .iter()
            .all(|p| p.features.len() == 2 && p.label.unwrap() < 3));
        assert_eq!(stream, generate_stream(&config).unwrap());
    }

    #[test]
    fn test_centroid_classifier_separates_classes() {
        let config = StreamConfig::default();
        let mut c = CentroidClassifier::new(3, 2);
        assert_eq!(c.predict_posterior(&DataPoint::unlabeled(vec![0.0, 0.0])), vec![1.0; 3]);

        for class in 0..3 {
            c.train(&DataPoint::new(class_center(class, &config, false), class));
        }
        for class in 0..3 {
            let probe = DataPoint::unlabeled(class_center(class, &config, false));
            assert_eq!(max_index(&c.predict_posterior(&probe)), Some(class));
        }

        c.reset();
        assert_eq!(c.measurements()[0].value, 0.0);
    }

    #[test]
    fn test_simulation_runs() {
        let config = StreamConfig {
            steps: 300,
            drift_at: 150,
            ..Default::default()
        };
        let params = SelfLabelingParams {
            budget: 0.2,
            num_init_instances: 10,
            ..Default::default()
        };
        let mut learner =
            AdaptiveThresholdSelfLabeler::new(params, Box::new(CentroidClassifier::new(3, 2)))
                .unwrap();
        let steps = run_simulation(&mut learner, &config).unwrap();
        assert_eq!(steps.len(), 300);
        assert!(steps.iter().all(|s| s.labels_acquired <= s.t as u64 + 1));
        assert!(label_rate(&steps) > 0.0);
        assert!(accuracy_between(&steps, 50, 150) > 0.5);
    }

    #[test]
    fn test_invalid_stream_config() {
        let config = StreamConfig {
            num_classes: 1,
            ..Default::default()
        };
        assert!(generate_stream(&config).is_err());
    }
}
