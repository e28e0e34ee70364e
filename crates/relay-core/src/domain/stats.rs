use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::RunId;

/// Counters for one poll-loop invocation.
///
/// Created when the loop starts, reported when it stops, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub run_id: RunId,
    /// Messages dispatched without error (including unroutable ones).
    pub processed: u64,
    /// Messages that hit a `DispatchError`.
    pub failed: u64,
    /// Non-empty batches received.
    pub batches: u64,
    /// Entries the backend accepted for deletion.
    pub acknowledged: u64,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStats {
    pub fn new(run_id: RunId, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            processed: 0,
            failed: 0,
            batches: 0,
            acknowledged: 0,
            started_at,
            finished_at: None,
        }
    }

    pub fn record_processed(&mut self) {
        self.processed += 1;
    }

    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub fn record_batch(&mut self) {
        self.batches += 1;
    }

    pub fn record_acknowledged(&mut self, count: usize) {
        self.acknowledged += count as u64;
    }

    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.finished_at = Some(at);
    }

    /// Total messages attempted.
    pub fn attempted(&self) -> u64 {
        self.processed + self.failed
    }
}
