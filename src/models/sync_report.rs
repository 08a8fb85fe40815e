use super::action::QueryKey;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Aggregate outcome of one drain.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport {
    /// Rows in the snapshot taken when the drain started.
    pub attempted: usize,
    pub synced: usize,
    /// Dropped after exhausting the retry budget.
    pub failed: usize,
    /// Failed but still queued for the next drain.
    pub retained: usize,
    /// Left untouched because the row no longer matches the dispatch table.
    pub skipped: usize,
    pub invalidated: BTreeSet<QueryKey>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DrainReport {
    pub fn begin(attempted: usize) -> Self {
        let now = Utc::now();
        Self {
            attempted,
            synced: 0,
            failed: 0,
            retained: 0,
            skipped: 0,
            invalidated: BTreeSet::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.retained == 0 && self.skipped == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_is_empty_and_clean() {
        let r = DrainReport::begin(0);
        assert!(r.is_empty());
        assert!(r.is_clean());
        assert_eq!(r.started_at, r.finished_at);
    }

    #[test]
    fn retained_actions_make_the_report_unclean() {
        let mut r = DrainReport::begin(2);
        r.synced = 1;
        r.retained = 1;
        assert!(!r.is_empty());
        assert!(!r.is_clean());
    }

    #[test]
    fn skipped_rows_make_the_report_unclean() {
        let mut r = DrainReport::begin(1);
        r.skipped = 1;
        assert!(!r.is_clean());
    }
}
