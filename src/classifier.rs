//! Classifier capability wrapped by the controllers
//!
//! Controllers never implement a learning algorithm themselves. They only
//! need something that can be reset, trained one point at a time, asked for a
//! posterior, and cloned into a fresh untrained copy.

use crate::measurement::Measurement;

/// One point of the stream.
///
/// `label` doubles as the oracle: it holds the true class when the stream
/// can reveal it, and is overwritten with the predicted class on
/// self-labeling.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Feature vector
    pub features: Vec<f64>,
    /// Class index, if known
    pub label: Option<usize>,
}

impl DataPoint {
    /// Create a labeled point
    pub fn new(features: Vec<f64>, label: usize) -> Self {
        Self {
            features,
            label: Some(label),
        }
    }

    /// Create a point whose label is unknown
    pub fn unlabeled(features: Vec<f64>) -> Self {
        Self {
            features,
            label: None,
        }
    }
}

/// Trainable classifier as seen by an active learning controller.
pub trait StreamClassifier {
    /// Return to the untrained state.
    fn reset(&mut self);

    /// Incorporate one labeled point. Points without a label are ignored.
    fn train(&mut self, point: &DataPoint);

    /// Current class scores for `point`, one non-negative entry per class.
    ///
    /// Must be callable before any training; a degenerate or uniform answer
    /// is fine.
    fn predict_posterior(&self, point: &DataPoint) -> Vec<f64>;

    /// Identically configured, untrained clone.
    fn fresh_copy(&self) -> Box<dyn StreamClassifier>;

    /// Diagnostics exposed by the classifier itself.
    fn measurements(&self) -> Vec<Measurement> {
        Vec::new()
    }
}
