//! Posterior vector helpers
//!
//! Raw class scores coming out of a classifier are non-negative but sum to an
//! arbitrary total. These helpers turn them into a distribution and extract
//! the confidence figures both controllers decide on.

/// Normalize scores so that they sum to one.
///
/// An all-zero vector is returned unchanged.
pub fn normalize(scores: &[f64]) -> Vec<f64> {
    let mut out = scores.to_vec();
    normalize_in_place(&mut out);
    out
}

/// In-place variant of [`normalize`].
pub fn normalize_in_place(scores: &mut [f64]) {
    let sum: f64 = scores.iter().sum();
    if sum > 0.0 {
        for s in scores.iter_mut() {
            *s /= sum;
        }
    }
}

/// Posterior probability of the winning class.
///
/// Vectors of length <= 1 carry no class information and yield 0.
pub fn arg_max_confidence(scores: &[f64]) -> f64 {
    if scores.len() <= 1 {
        return 0.0;
    }
    normalize(scores).into_iter().fold(0.0f64, f64::max)
}

/// Difference between the best and second best normalized posterior.
///
/// Callers must special-case vectors shorter than two entries; a single class
/// is treated as certain and yields a margin of 1.
pub fn top_margin(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return 1.0;
    }
    let mut sorted = normalize(scores);
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted[0] - sorted[1]
}

/// Index of the largest score. Ties resolve to the lowest index.
pub fn max_index(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

/// Add `weight * scores` into `acc`, growing `acc` when `scores` is longer.
pub fn accumulate_weighted(acc: &mut Vec<f64>, scores: &[f64], weight: f64) {
    if acc.len() < scores.len() {
        acc.resize(scores.len(), 0.0);
    }
    for (a, &s) in acc.iter_mut().zip(scores.iter()) {
        *a += weight * s;
    }
}
