//! Chunked, time-decayed ensemble active learner
//!
//! The stream is cut into chunks of `chunk_size` points. Every chunk spawns
//! a fresh rotating classifier (evicting the oldest once the bank is full),
//! labels the chunk's first point unconditionally and decays older weights.
//! Inside a chunk, points are labeled by uncertainty sampling on the
//! ensemble margin, falling back to random sampling, as long as the budget
//! allows.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bank::SlotBank;
use crate::budget::BudgetState;
use crate::classifier::{DataPoint, StreamClassifier};
use crate::learner::{oracle_label, ActiveLearner, Decision};
use crate::measurement::Measurement;
use crate::params::EnsembleParams;
use crate::probability::top_margin;
use crate::AlError;

/// Numerator of the uncertainty bound `margin < UNCERTAINTY_MARGIN / classes`
pub const UNCERTAINTY_MARGIN: f64 = 0.3;

/// Result of the uncertainty check on one point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UncertaintyOutcome {
    /// Margin small enough, label acquired
    Applied,
    /// Single-class posterior, label acquired without a margin
    Forced,
    Declined,
}

/// Ensemble of a stable classifier and rotating per-chunk classifiers
pub struct ChunkedEnsembleActiveLearner {
    params: EnsembleParams,
    prototype: Box<dyn StreamClassifier>,
    bank: SlotBank,
    budget: BudgetState,
    rng: StdRng,
    chunks: u64,
    forced_labels: u64,
    certainty: f64,
    last_decision: Option<Decision>,
}

impl ChunkedEnsembleActiveLearner {
    /// Create an ensemble whose slots are fresh copies of `prototype`.
    pub fn new(
        params: EnsembleParams,
        prototype: Box<dyn StreamClassifier>,
    ) -> Result<Self, AlError> {
        params.validate()?;
        let bank = SlotBank::new(
            prototype.fresh_copy(),
            params.stable_weight,
            params.max_classifiers,
        );
        Ok(Self {
            params,
            prototype,
            bank,
            budget: BudgetState::new(),
            rng: StdRng::seed_from_u64(params.seed),
            chunks: 0,
            forced_labels: 0,
            certainty: -1.0,
            last_decision: None,
        })
    }

    pub fn bank(&self) -> &SlotBank {
        &self.bank
    }

    pub fn params(&self) -> &EnsembleParams {
        &self.params
    }

    /// Chunks started so far
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Margin computed for the last uncertainty check, -1 if none ran
    pub fn certainty(&self) -> f64 {
        self.certainty
    }

    pub fn last_decision(&self) -> Option<Decision> {
        self.last_decision
    }

    /// Diagnostic code of the last decision
    pub fn strategy_code(&self) -> f64 {
        match self.last_decision {
            None | Some(Decision::InsufficientBudget) => -1.0,
            Some(Decision::Uncertainty) => 1.0,
            Some(Decision::Random) => 2.0,
            Some(Decision::ChunkStart) => 3.0,
            Some(_) => 0.0,
        }
    }

    fn within_budget(&self) -> bool {
        self.params.budget > self.budget.prospective_fraction()
    }

    fn label_point(&mut self, point: &DataPoint, index: u64) -> Result<usize, AlError> {
        let label = oracle_label(point, index)?;
        self.bank.train_stable_and_newest(point);
        self.budget.record_label();
        Ok(label)
    }

    fn start_chunk(&mut self, point: &DataPoint, index: u64) -> Result<(), AlError> {
        oracle_label(point, index)?;
        self.chunks += 1;

        if self.bank.is_full() {
            self.bank.evict_oldest();
            debug!(
                "chunk {}: evicted oldest rotating classifier, {} remain",
                self.chunks,
                self.bank.rotating_len()
            );
        }
        self.bank.push_rotating(self.prototype.fresh_copy());

        self.label_point(point, index)?;
        let rotating = self.bank.rotating_len();
        let newest = self.bank.newest_mut();
        newest.first_labeled = self.budget.labels_acquired;
        newest.weight = 1.0 / rotating as f64;

        self.bank.apply_age_decay();
        self.bank.normalize_rotating();

        debug!(
            "chunk {} started at point {index}: {} rotating classifiers, weights {:?}",
            self.chunks,
            rotating,
            self.bank.weights()
        );
        Ok(())
    }

    fn uncertainty_sampling(
        &mut self,
        point: &DataPoint,
        index: u64,
    ) -> Result<UncertaintyOutcome, AlError> {
        let posterior = self.bank.votes(point);

        if posterior.len() <= 1 {
            self.label_point(point, index)?;
            self.forced_labels += 1;
            self.certainty = 1.0;
            return Ok(UncertaintyOutcome::Forced);
        }

        self.certainty = top_margin(&posterior);
        if self.certainty < UNCERTAINTY_MARGIN / posterior.len() as f64 {
            self.label_point(point, index)?;
            return Ok(UncertaintyOutcome::Applied);
        }
        Ok(UncertaintyOutcome::Declined)
    }

    fn random_sampling(&mut self, point: &DataPoint, index: u64) -> Result<bool, AlError> {
        let draw: f64 = self.rng.gen();
        if draw >= self.params.random_threshold {
            return Ok(false);
        }
        let label = self.label_point(point, index)?;
        self.bank.reweight_by_prediction(point, label);
        self.bank.normalize_rotating();
        Ok(true)
    }
}

impl ActiveLearner for ChunkedEnsembleActiveLearner {
    fn process(&mut self, point: &mut DataPoint) -> Result<Decision, AlError> {
        let index = self.budget.record_point();
        self.certainty = -1.0;

        let decision = if index % self.params.chunk_size == 1 {
            self.start_chunk(point, index)?;
            Decision::ChunkStart
        } else if !self.within_budget() {
            Decision::InsufficientBudget
        } else {
            match self.uncertainty_sampling(point, index)? {
                UncertaintyOutcome::Applied => Decision::Uncertainty,
                outcome => {
                    if self.random_sampling(point, index)? {
                        Decision::Random
                    } else if outcome == UncertaintyOutcome::Forced {
                        Decision::Forced
                    } else {
                        Decision::Skipped
                    }
                }
            }
        };

        trace!("point {index}: {decision:?} (certainty {:.4})", self.certainty);
        self.last_decision = Some(decision);
        Ok(decision)
    }

    fn votes(&self, point: &DataPoint) -> Vec<f64> {
        self.bank.votes(point)
    }

    fn budget(&self) -> &BudgetState {
        &self.budget
    }

    fn report_and_reset_query_count(&mut self) -> u64 {
        self.budget.report_and_reset()
    }

    fn measurements(&self) -> Vec<Measurement> {
        let slots = self.bank.slots();
        let last_chunk_labels = if slots.len() >= 2 {
            slots[slots.len() - 1]
                .first_labeled
                .saturating_sub(slots[slots.len() - 2].first_labeled)
        } else {
            0
        };

        let mut out = vec![
            Measurement::new("chunks", self.chunks as f64),
            Measurement::new("labeledInstancesOfLastCompletedChunk", last_chunk_labels as f64),
            Measurement::new("strategyApplied", self.strategy_code()),
            Measurement::new("certainty", self.certainty),
            Measurement::new("noOfClassifiers", self.bank.len() as f64),
            Measurement::new("labelAcquired", self.budget.labels_acquired as f64),
            Measurement::new("forcedLabels", self.forced_labels as f64),
            Measurement::new("currentSpent", self.budget.spent_fraction()),
        ];
        for i in 0..=self.params.max_classifiers {
            let weight = slots.get(i).map_or(0.0, |s| s.weight);
            out.push(Measurement::new(format!("weight{i}"), weight));
        }
        out
    }

    fn reset(&mut self) {
        debug!("resetting ensemble (seed {})", self.params.seed);
        self.bank.reset(self.params.stable_weight);
        self.budget = BudgetState::new();
        self.rng = StdRng::seed_from_u64(self.params.seed);
        self.chunks = 0;
        self.forced_labels = 0;
        self.certainty = -1.0;
        self.last_decision = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::find;
    use approx::assert_relative_eq;

    /// Returns the same scores for every point.
    struct Scores(Vec<f64>);

    impl StreamClassifier for Scores {
        fn reset(&mut self) {}
        fn train(&mut self, _point: &DataPoint) {}
        fn predict_posterior(&self, _point: &DataPoint) -> Vec<f64> {
            self.0.clone()
        }
        fn fresh_copy(&self) -> Box<dyn StreamClassifier> {
            Box::new(Scores(self.0.clone()))
        }
    }

    fn ensemble(params: EnsembleParams, scores: Vec<f64>) -> ChunkedEnsembleActiveLearner {
        ChunkedEnsembleActiveLearner::new(params, Box::new(Scores(scores))).unwrap()
    }

    fn params(budget: f64, random_threshold: f64) -> EnsembleParams {
        EnsembleParams {
            budget,
            random_threshold,
            max_classifiers: 3,
            chunk_size: 10,
            ..Default::default()
        }
    }

    fn point() -> DataPoint {
        DataPoint::new(vec![0.0], 0)
    }

    #[test]
    fn test_first_point_starts_chunk() {
        let mut e = ensemble(params(0.5, 0.0), vec![1.0, 0.0]);
        assert_eq!(e.process(&mut point()).unwrap(), Decision::ChunkStart);
        assert_eq!(e.chunks(), 1);
        assert_eq!(e.bank().rotating_len(), 1);
        assert_relative_eq!(e.bank().rotating_weight_sum(), 1.0, epsilon = 1e-12);
        assert_eq!(e.budget().labels_acquired, 1);
        assert_eq!(e.bank().newest().first_labeled, 1);
        assert_eq!(e.strategy_code(), 3.0);
    }

    #[test]
    fn test_confident_points_skipped_or_out_of_budget() {
        let mut e = ensemble(params(1.0, 0.0), vec![1.0, 0.0]);
        e.process(&mut point()).unwrap();
        assert_eq!(e.process(&mut point()).unwrap(), Decision::InsufficientBudget);
        // (1 + 1) / 3 < 1
        assert_eq!(e.process(&mut point()).unwrap(), Decision::Skipped);
        assert_eq!(e.certainty(), 1.0);
        assert_eq!(e.strategy_code(), 0.0);

        let mut e = ensemble(params(0.0, 1.0), vec![1.0, 0.0]);
        e.process(&mut point()).unwrap();
        assert_eq!(e.process(&mut point()).unwrap(), Decision::InsufficientBudget);
        assert_eq!(e.strategy_code(), -1.0);
    }

    #[test]
    fn test_random_sampling_keeps_weights_normalized() {
        let mut e = ensemble(params(1.0, 1.0), vec![1.0, 0.0]);
        for _ in 0..25 {
            e.process(&mut point()).unwrap();
            assert_relative_eq!(e.bank().rotating_weight_sum(), 1.0, epsilon = 1e-9);
        }
        assert_eq!(e.last_decision(), Some(Decision::Random));
        assert!(e.budget().labels_acquired <= e.budget().points_seen);
    }

    #[test]
    fn test_uniform_posterior_triggers_uncertainty() {
        let mut e = ensemble(params(1.0, 0.0), vec![1.0, 1.0]);
        e.process(&mut point()).unwrap();
        e.process(&mut point()).unwrap();
        assert_eq!(e.process(&mut point()).unwrap(), Decision::Uncertainty);
        assert_eq!(e.certainty(), 0.0);
        assert_eq!(e.report_and_reset_query_count(), 2);
    }

    #[test]
    fn test_single_class_posterior_forces_label() {
        let mut e = ensemble(params(1.0, 0.0), vec![1.0]);
        e.process(&mut point()).unwrap();
        e.process(&mut point()).unwrap();
        assert_eq!(e.process(&mut point()).unwrap(), Decision::Forced);
        assert_eq!(find(&e.measurements(), "forcedLabels"), Some(1.0));
        assert_eq!(e.budget().labels_acquired, 2);
    }

    #[test]
    fn test_missing_label_at_chunk_start() {
        let mut e = ensemble(params(1.0, 0.0), vec![1.0, 0.0]);
        let err = e.process(&mut DataPoint::unlabeled(vec![0.0])).unwrap_err();
        assert!(matches!(err, AlError::MissingLabel { point: 1 }));
        assert_eq!(e.chunks(), 0);
        assert_eq!(e.bank().rotating_len(), 0);
    }

    #[test]
    fn test_measurements_cover_every_slot_position() {
        let mut e = ensemble(params(0.5, 0.0), vec![1.0, 0.0]);
        for _ in 0..21 {
            e.process(&mut point()).unwrap();
        }
        let ms = e.measurements();
        assert_eq!(find(&ms, "chunks"), Some(3.0));
        assert_eq!(find(&ms, "noOfClassifiers"), Some(4.0));
        assert_eq!(find(&ms, "weight0"), Some(1.0));
        assert!(find(&ms, "weight3").is_some());
        assert!(find(&ms, "weight4").is_none());
        assert_eq!(find(&ms, "labeledInstancesOfLastCompletedChunk"), Some(1.0));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut e = ensemble(params(1.0, 1.0), vec![1.0, 0.0]);
        for _ in 0..15 {
            e.process(&mut point()).unwrap();
        }
        e.reset();
        assert_eq!(e.bank().len(), 1);
        assert_eq!(e.budget().points_seen, 0);
        assert_eq!(e.chunks(), 0);
        assert_eq!(e.process(&mut point()).unwrap(), Decision::ChunkStart);
    }
}
