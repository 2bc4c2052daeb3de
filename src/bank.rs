//! Classifier bank for the chunked ensemble
//!
//! Slot 0 holds the permanent stable classifier with a fixed weight. Slots
//! 1.. hold rotating classifiers, oldest first, whose weights are kept
//! normalized among themselves. Evicting the oldest rotating slot shifts the
//! younger ones left by one.

use log::warn;

use crate::classifier::{DataPoint, StreamClassifier};
use crate::probability::{accumulate_weighted, max_index, normalize_in_place};

/// One classifier of the bank with its weight.
pub struct Slot {
    pub classifier: Box<dyn StreamClassifier>,
    pub weight: f64,
    /// Labels acquired when this slot's chunk started
    pub first_labeled: u64,
}

/// Stable slot followed by at most `max_rotating` rotating slots
pub struct SlotBank {
    slots: Vec<Slot>,
    max_rotating: usize,
}

/// Age decay factor of slot `index` in a bank of `total` slots.
///
/// The newest slot (`index == total - 1`) keeps its weight; older slots lose
/// more. For `1 <= index < total` the log term stays below `ln 2`, so the
/// factor stays positive.
pub fn age_decay_factor(total: usize, index: usize) -> f64 {
    let total_f = total as f64;
    let age = total_f - 1.0 - index as f64;
    1.0 - (1.0 + age / total_f).ln()
}

/// Multiplicative boost applied to a rotating slot that predicted correctly.
pub fn boost_factor(total: usize) -> f64 {
    let rotating = total.saturating_sub(1).max(1) as f64;
    1.0 + (1.0 + 1.0 / rotating).ln()
}

/// Normalize weights to sum to one.
///
/// Falls back to uniform weights when the total is not a positive finite
/// number. Returns true when the fallback was used.
pub fn normalize_weights(weights: &mut [f64]) -> bool {
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for w in weights.iter_mut() {
            *w /= sum;
        }
        false
    } else {
        let uniform = 1.0 / weights.len().max(1) as f64;
        for w in weights.iter_mut() {
            *w = uniform;
        }
        true
    }
}

impl SlotBank {
    /// Create a bank holding only the stable classifier, which is reset.
    pub fn new(
        mut stable: Box<dyn StreamClassifier>,
        stable_weight: f64,
        max_rotating: usize,
    ) -> Self {
        stable.reset();
        let mut slots = Vec::with_capacity(max_rotating + 1);
        slots.push(Slot {
            classifier: stable,
            weight: stable_weight,
            first_labeled: 0,
        });
        Self {
            slots,
            max_rotating,
        }
    }

    /// Number of slots including the stable one
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Never true: the stable slot is permanent
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn rotating_len(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn max_rotating(&self) -> usize {
        self.max_rotating
    }

    /// Whether a new rotating slot needs an eviction first
    pub fn is_full(&self) -> bool {
        self.rotating_len() >= self.max_rotating
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Weight of every slot, stable first
    pub fn weights(&self) -> Vec<f64> {
        self.slots.iter().map(|s| s.weight).collect()
    }

    pub fn rotating_weight_sum(&self) -> f64 {
        self.slots[1..].iter().map(|s| s.weight).sum()
    }

    /// Drop the oldest rotating slot. Returns false if there is none.
    pub fn evict_oldest(&mut self) -> bool {
        if self.rotating_len() == 0 {
            return false;
        }
        self.slots.remove(1);
        true
    }

    /// Append a fresh rotating slot with weight `1 / (len + 1)`.
    ///
    /// Callers evict first when the bank [`is_full`](Self::is_full).
    pub fn push_rotating(&mut self, mut classifier: Box<dyn StreamClassifier>) {
        debug_assert!(!self.is_full(), "rotating capacity exceeded");
        classifier.reset();
        let weight = 1.0 / (self.slots.len() + 1) as f64;
        self.slots.push(Slot {
            classifier,
            weight,
            first_labeled: 0,
        });
    }

    /// Newest slot, or the stable one when no rotating slot exists
    pub fn newest_mut(&mut self) -> &mut Slot {
        let last = self.slots.len() - 1;
        &mut self.slots[last]
    }

    pub fn newest(&self) -> &Slot {
        &self.slots[self.slots.len() - 1]
    }

    /// Train the stable classifier and the newest rotating one.
    pub fn train_stable_and_newest(&mut self, point: &DataPoint) {
        self.slots[0].classifier.train(point);
        if self.rotating_len() > 0 {
            self.newest_mut().classifier.train(point);
        }
    }

    /// Decay every rotating weight by its age.
    pub fn apply_age_decay(&mut self) {
        let total = self.slots.len();
        for (i, slot) in self.slots.iter_mut().enumerate().skip(1) {
            slot.weight *= age_decay_factor(total, i);
        }
    }

    /// Boost rotating slots whose own prediction matched `label`, penalize
    /// the rest by the reciprocal factor.
    pub fn reweight_by_prediction(&mut self, point: &DataPoint, label: usize) {
        let boost = boost_factor(self.slots.len());
        for slot in self.slots.iter_mut().skip(1) {
            let predicted = max_index(&slot.classifier.predict_posterior(point));
            if predicted == Some(label) {
                slot.weight *= boost;
            } else {
                slot.weight /= boost;
            }
        }
    }

    /// Renormalize rotating weights, leaving the stable weight untouched.
    pub fn normalize_rotating(&mut self) {
        if self.rotating_len() == 0 {
            return;
        }
        let mut weights: Vec<f64> = self.slots[1..].iter().map(|s| s.weight).collect();
        if normalize_weights(&mut weights) {
            warn!(
                "rotating weights degenerated, falling back to uniform over {} slots",
                weights.len()
            );
        }
        for (slot, w) in self.slots[1..].iter_mut().zip(weights) {
            slot.weight = w;
        }
    }

    /// Weighted sum of every slot's posterior, normalized.
    pub fn votes(&self, point: &DataPoint) -> Vec<f64> {
        let mut acc = Vec::new();
        for slot in &self.slots {
            accumulate_weighted(&mut acc, &slot.classifier.predict_posterior(point), slot.weight);
        }
        normalize_in_place(&mut acc);
        acc
    }

    /// Drop every rotating slot and reset the stable classifier.
    pub fn reset(&mut self, stable_weight: f64) {
        self.slots.truncate(1);
        let stable = &mut self.slots[0];
        stable.classifier.reset();
        stable.weight = stable_weight;
        stable.first_labeled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Predicts a fixed class with full confidence.
    struct Constant {
        class: usize,
        classes: usize,
    }

    impl StreamClassifier for Constant {
        fn reset(&mut self) {}
        fn train(&mut self, _point: &DataPoint) {}
        fn predict_posterior(&self, _point: &DataPoint) -> Vec<f64> {
            let mut p = vec![0.0; self.classes];
            p[self.class] = 1.0;
            p
        }
        fn fresh_copy(&self) -> Box<dyn StreamClassifier> {
            Box::new(Constant {
                class: self.class,
                classes: self.classes,
            })
        }
    }

    fn constant(class: usize) -> Box<dyn StreamClassifier> {
        Box::new(Constant { class, classes: 2 })
    }

    #[test]
    fn test_push_and_evict_shift_left() {
        let mut bank = SlotBank::new(constant(0), 1.0, 2);
        bank.push_rotating(constant(0));
        bank.newest_mut().first_labeled = 1;
        bank.push_rotating(constant(1));
        bank.newest_mut().first_labeled = 2;
        assert!(bank.is_full());

        assert!(bank.evict_oldest());
        assert_eq!(bank.rotating_len(), 1);
        assert_eq!(bank.slots()[1].first_labeled, 2);
        assert_eq!(bank.slots()[0].weight, 1.0);
    }

    #[test]
    fn test_push_weight() {
        let mut bank = SlotBank::new(constant(0), 1.0, 3);
        bank.push_rotating(constant(0));
        assert_relative_eq!(bank.newest().weight, 0.5);
        bank.push_rotating(constant(0));
        assert_relative_eq!(bank.newest().weight, 1.0 / 3.0);
    }

    #[test]
    fn test_age_decay_newest_untouched_and_positive() {
        for total in 2..500 {
            assert_relative_eq!(age_decay_factor(total, total - 1), 1.0);
            for i in 1..total {
                let f = age_decay_factor(total, i);
                assert!(f > 0.0 && f <= 1.0, "factor {f} for total {total} slot {i}");
            }
        }
    }

    #[test]
    fn test_normalize_rotating_excludes_stable() {
        let mut bank = SlotBank::new(constant(0), 3.0, 3);
        bank.push_rotating(constant(0));
        bank.push_rotating(constant(1));
        bank.normalize_rotating();
        assert_relative_eq!(bank.rotating_weight_sum(), 1.0, epsilon = 1e-12);
        assert_eq!(bank.slots()[0].weight, 3.0);
    }

    #[test]
    fn test_normalize_fallback_to_uniform() {
        let mut weights = vec![0.0, 0.0, 0.0, 0.0];
        assert!(normalize_weights(&mut weights));
        assert_eq!(weights, vec![0.25; 4]);

        let mut weights = vec![f64::INFINITY, 1.0];
        assert!(normalize_weights(&mut weights));
        assert_eq!(weights, vec![0.5, 0.5]);
    }

    #[test]
    fn test_reweight_by_prediction() {
        let mut bank = SlotBank::new(constant(0), 1.0, 2);
        bank.push_rotating(constant(0));
        bank.push_rotating(constant(1));
        for slot in bank.slots.iter_mut().skip(1) {
            slot.weight = 0.5;
        }
        let point = DataPoint::new(vec![], 1);
        bank.reweight_by_prediction(&point, 1);
        let boost = boost_factor(3);
        assert_relative_eq!(bank.slots()[1].weight, 0.5 / boost);
        assert_relative_eq!(bank.slots()[2].weight, 0.5 * boost);
        bank.normalize_rotating();
        assert!(bank.slots()[2].weight > bank.slots()[1].weight);
        assert_relative_eq!(bank.rotating_weight_sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_votes_weighted_and_normalized() {
        let mut bank = SlotBank::new(constant(0), 1.0, 2);
        bank.push_rotating(constant(1));
        bank.newest_mut().weight = 3.0;
        let votes = bank.votes(&DataPoint::unlabeled(vec![]));
        assert_relative_eq!(votes[0], 0.25);
        assert_relative_eq!(votes[1], 0.75);
    }

    #[test]
    fn test_reset_keeps_only_stable() {
        let mut bank = SlotBank::new(constant(0), 1.0, 2);
        bank.push_rotating(constant(1));
        bank.reset(2.0);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.weights(), vec![2.0]);
    }
}
