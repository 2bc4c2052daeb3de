//! Common surface of the active learning controllers

use serde::Serialize;

use crate::budget::BudgetState;
use crate::classifier::DataPoint;
use crate::measurement::Measurement;
use crate::AlError;

/// What a controller did with one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    /// Warm-up point, label acquired unconditionally
    Warmup,
    /// Uncertain under the randomized threshold, label acquired
    Queried,
    /// Confident enough to train on the predicted class
    SelfLabeled,
    /// First point of a new ensemble chunk, label acquired
    ChunkStart,
    /// Ensemble margin below the uncertainty bound, label acquired
    Uncertainty,
    /// Picked by random sampling, label acquired
    Random,
    /// Single-class posterior forced an acquisition; random sampling did not fire
    Forced,
    /// Budget was available but nothing fired
    Skipped,
    /// Budget exhausted
    InsufficientBudget,
}

impl Decision {
    /// Whether the oracle was consulted for this point.
    pub fn acquired_label(&self) -> bool {
        matches!(
            self,
            Decision::Warmup
                | Decision::Queried
                | Decision::ChunkStart
                | Decision::Uncertainty
                | Decision::Random
                | Decision::Forced
        )
    }

    /// Whether any classifier was trained on this point.
    pub fn trained(&self) -> bool {
        self.acquired_label() || *self == Decision::SelfLabeled
    }
}

/// A budget-constrained label acquisition policy over a stream.
///
/// Processing is single-writer: one point is fully decided and trained on
/// before the next call. Independent streams need independent instances.
pub trait ActiveLearner {
    /// Decide on one point, acquiring its label and training as needed.
    fn process(&mut self, point: &mut DataPoint) -> Result<Decision, AlError>;

    /// Class scores for `point`.
    fn votes(&self, point: &DataPoint) -> Vec<f64>;

    /// Budget counters.
    fn budget(&self) -> &BudgetState;

    /// Labels acquired since the previous call; resets the count.
    fn report_and_reset_query_count(&mut self) -> u64;

    /// Current diagnostics. Does not mutate state.
    fn measurements(&self) -> Vec<Measurement>;

    /// Return to the freshly constructed state.
    fn reset(&mut self);
}

/// Label revealed by the oracle for the `index`-th point.
pub(crate) fn oracle_label(point: &DataPoint, index: u64) -> Result<usize, AlError> {
    point.label.ok_or(AlError::MissingLabel { point: index })
}
