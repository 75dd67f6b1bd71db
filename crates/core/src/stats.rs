//! Dashboard counters.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Violation, ViolationStatus};

/// Per-status totals shown on the dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationStats {
    pub total: usize,
    pub pending: usize,
    pub acknowledged: usize,
    pub correcting: usize,
    pub corrected: usize,
    pub verified: usize,
    pub overdue: usize,
}

impl ViolationStats {
    /// Count `records` as of `today`.
    #[must_use]
    pub fn collect(records: &[Violation], today: NaiveDate) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            stats.total += 1;
            match record.status {
                ViolationStatus::Pending => stats.pending += 1,
                ViolationStatus::Acknowledged => stats.acknowledged += 1,
                ViolationStatus::Correcting => stats.correcting += 1,
                ViolationStatus::Corrected => stats.corrected += 1,
                ViolationStatus::Verified => stats.verified += 1,
            }
            if record.is_overdue(today) {
                stats.overdue += 1;
            }
            stats
        })
    }
}
