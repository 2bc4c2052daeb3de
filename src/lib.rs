//! alstream - budget-constrained active learning for data streams
//!
//! Two independent controllers decide, one point at a time, whether to pay
//! for a point's true label, train on an inferred label, or skip it:
//! - [`AdaptiveThresholdSelfLabeler`] queries under a randomized, self-tuning
//!   confidence threshold and self-labels confident points.
//! - [`ChunkedEnsembleActiveLearner`] rotates a bank of per-chunk classifiers
//!   with time-decayed weights and mixes uncertainty with random sampling.
//!
//! Both wrap any [`StreamClassifier`] and never implement a learner of their own.

pub mod bank;
pub mod budget;
pub mod classifier;
pub mod ensemble;
pub mod error;
pub mod learner;
pub mod measurement;
pub mod params;
pub mod probability;
pub mod randomization;
pub mod self_labeling;
pub mod sim;

// Re-export main types
pub use budget::BudgetState;
pub use classifier::{DataPoint, StreamClassifier};
pub use ensemble::ChunkedEnsembleActiveLearner;
pub use error::AlError;
pub use learner::{ActiveLearner, Decision};
pub use measurement::Measurement;
pub use params::{EnsembleParams, SelfLabelingParams};
pub use randomization::ThresholdRandomization;
pub use self_labeling::AdaptiveThresholdSelfLabeler;
