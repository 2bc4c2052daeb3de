//! Label budget accounting

use serde::Serialize;

/// Counters tracking how much of the label budget has been spent.
///
/// `labels_acquired <= points_seen` holds as long as each processed point
/// acquires at most one label more than its own budget check allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BudgetState {
    /// Points consumed from the stream
    pub points_seen: u64,
    /// True labels requested from the oracle
    pub labels_acquired: u64,
    /// Labels acquired since the last rate report
    since_report: u64,
}

impl BudgetState {
    /// Create empty counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one incoming point. Must run before [`Self::spent_fraction`].
    pub fn record_point(&mut self) -> u64 {
        self.points_seen += 1;
        self.points_seen
    }

    /// Count one acquired label, including it in the next rate report.
    pub fn record_label(&mut self) {
        self.labels_acquired += 1;
        self.since_report += 1;
    }

    /// Count one acquired label without touching the rate report.
    pub fn record_unreported_label(&mut self) {
        self.labels_acquired += 1;
    }

    /// Fraction of seen points whose label was acquired.
    pub fn spent_fraction(&self) -> f64 {
        if self.points_seen == 0 {
            return 0.0;
        }
        self.labels_acquired as f64 / self.points_seen as f64
    }

    /// Spent fraction if one more label were acquired now.
    pub fn prospective_fraction(&self) -> f64 {
        if self.points_seen == 0 {
            return f64::INFINITY;
        }
        (self.labels_acquired + 1) as f64 / self.points_seen as f64
    }

    /// Labels acquired since the previous call.
    pub fn report_and_reset(&mut self) -> u64 {
        std::mem::take(&mut self.since_report)
    }

    /// Peek at the unreported label count.
    pub fn since_report(&self) -> u64 {
        self.since_report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spent_fraction() {
        let mut b = BudgetState::new();
        assert_eq!(b.spent_fraction(), 0.0);
        b.record_point();
        b.record_point();
        b.record_label();
        assert_eq!(b.spent_fraction(), 0.5);
        assert_eq!(b.prospective_fraction(), 1.0);
    }

    #[test]
    fn test_report_resets_only_since_report() {
        let mut b = BudgetState::new();
        b.record_point();
        b.record_label();
        b.record_unreported_label();
        assert_eq!(b.report_and_reset(), 1);
        assert_eq!(b.report_and_reset(), 0);
        assert_eq!(b.labels_acquired, 2);
    }
}
