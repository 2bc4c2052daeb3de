//! Adaptive-threshold self-labeling
//!
//! Wraps one classifier. Each point after warm-up is either queried (max
//! posterior below a randomized threshold, budget permitting), self-labeled
//! (max posterior at least `confidence`), or dropped. The threshold shrinks
//! after every query and grows after every declined query, which steers the
//! long-run query rate toward the budget under drift.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::budget::BudgetState;
use crate::classifier::{DataPoint, StreamClassifier};
use crate::learner::{oracle_label, ActiveLearner, Decision};
use crate::measurement::Measurement;
use crate::params::SelfLabelingParams;
use crate::probability::{arg_max_confidence, max_index};
use crate::randomization::MultiplierSampler;
use crate::AlError;

/// Active learner combining threshold querying with self-labeling
pub struct AdaptiveThresholdSelfLabeler {
    params: SelfLabelingParams,
    classifier: Box<dyn StreamClassifier>,
    sampler: MultiplierSampler,
    rng: StdRng,
    budget: BudgetState,
    num_self_labeled: u64,
    threshold: f64,
    randomized_threshold: f64,
    multiplier: f64,
    current_spent: f64,
    arg_max: f64,
}

impl AdaptiveThresholdSelfLabeler {
    /// Create a self-labeler around `classifier`, which is reset first.
    pub fn new(
        params: SelfLabelingParams,
        mut classifier: Box<dyn StreamClassifier>,
    ) -> Result<Self, AlError> {
        params.validate()?;
        let sampler = MultiplierSampler::new(params.randomization)?;
        classifier.reset();
        Ok(Self {
            params,
            classifier,
            sampler,
            rng: StdRng::seed_from_u64(params.seed),
            budget: BudgetState::new(),
            num_self_labeled: 0,
            threshold: params.threshold,
            randomized_threshold: 0.0,
            multiplier: 0.0,
            current_spent: 0.0,
            arg_max: 0.0,
        })
    }

    /// Current (unrandomized) querying threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Threshold used by the most recent query decision
    pub fn randomized_threshold(&self) -> f64 {
        self.randomized_threshold
    }

    /// Multiplier drawn for the most recent query decision
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Max posterior of the most recent decided point
    pub fn arg_max(&self) -> f64 {
        self.arg_max
    }

    pub fn num_self_labeled(&self) -> u64 {
        self.num_self_labeled
    }

    pub fn params(&self) -> &SelfLabelingParams {
        &self.params
    }

    /// Draw the randomized threshold and adjust the base threshold.
    ///
    /// Returns true when `arg_max` falls below the randomized threshold.
    fn query_decision(&mut self, arg_max: f64) -> bool {
        self.multiplier = self.sampler.sample(&mut self.rng);
        self.randomized_threshold = self.threshold * self.multiplier;

        if arg_max < self.randomized_threshold {
            self.threshold *= 1.0 - self.params.step;
            true
        } else {
            self.threshold *= 1.0 + self.params.step;
            false
        }
    }
}

impl ActiveLearner for AdaptiveThresholdSelfLabeler {
    fn process(&mut self, point: &mut DataPoint) -> Result<Decision, AlError> {
        let index = self.budget.record_point();

        if index <= self.params.num_init_instances {
            oracle_label(point, index)?;
            self.classifier.train(point);
            self.budget.record_unreported_label();
            trace!("point {index}: warm-up");
            return Ok(Decision::Warmup);
        }

        self.current_spent = self.budget.spent_fraction();
        let posterior = self.classifier.predict_posterior(point);
        self.arg_max = arg_max_confidence(&posterior);

        if self.current_spent < self.params.budget && self.query_decision(self.arg_max) {
            oracle_label(point, index)?;
            self.classifier.train(point);
            self.budget.record_label();
            trace!(
                "point {index}: queried (argmax {:.4} < {:.4})",
                self.arg_max,
                self.randomized_threshold
            );
            return Ok(Decision::Queried);
        }

        if self.arg_max >= self.params.confidence {
            if let Some(predicted) = max_index(&posterior) {
                point.label = Some(predicted);
                self.classifier.train(point);
                self.num_self_labeled += 1;
                trace!("point {index}: self-labeled as {predicted}");
                return Ok(Decision::SelfLabeled);
            }
        }

        Ok(if self.current_spent < self.params.budget {
            Decision::Skipped
        } else {
            Decision::InsufficientBudget
        })
    }

    fn votes(&self, point: &DataPoint) -> Vec<f64> {
        self.classifier.predict_posterior(point)
    }

    fn budget(&self) -> &BudgetState {
        &self.budget
    }

    fn report_and_reset_query_count(&mut self) -> u64 {
        self.budget.report_and_reset()
    }

    fn measurements(&self) -> Vec<Measurement> {
        let mut out = vec![
            Measurement::new("labelAcquired", self.budget.labels_acquired as f64),
            Measurement::new("numSelfLabeled", self.num_self_labeled as f64),
            Measurement::new("threshold", self.threshold),
            Measurement::new("thresholdR", self.randomized_threshold),
            Measurement::new("randomMultiplier", self.multiplier),
            Measurement::new("currentSpent", self.current_spent),
            Measurement::new("argMax", self.arg_max),
        ];
        out.extend(self.classifier.measurements());
        out
    }

    fn reset(&mut self) {
        debug!("resetting self-labeler (seed {})", self.params.seed);
        self.classifier.reset();
        self.rng = StdRng::seed_from_u64(self.params.seed);
        self.budget = BudgetState::new();
        self.num_self_labeled = 0;
        self.threshold = self.params.threshold;
        self.randomized_threshold = 0.0;
        self.multiplier = 0.0;
        self.current_spent = 0.0;
        self.arg_max = 0.0;
    }
}
