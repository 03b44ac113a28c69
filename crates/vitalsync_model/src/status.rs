//! Live sync status and persisted sync metadata.

use crate::error::SyncErrorEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Live status of the sync orchestrator, published on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// True while a sync run is in flight.
    pub is_running: bool,
    /// Completion time of the most recent run, successful or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Records stored by the most recent run.
    pub items_synced: u64,
    /// Records the storage adapter rejected in the most recent run.
    pub items_failed: u64,
    /// Errors observed by the most recent run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SyncErrorEntry>,
    /// Advisory progress, 0-100. Not a precise contract.
    pub progress: u8,
}

impl SyncStatus {
    /// Returns true if the last run recorded any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// One completed (or failed) sync run, kept in bounded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistoryEntry {
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
    /// Records stored by the run.
    pub items_synced: u64,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
    /// Whether the run succeeded.
    pub success: bool,
    /// Terminating error message for failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncHistoryEntry {
    /// Creates an entry for a successful run.
    pub fn success(completed_at: DateTime<Utc>, items_synced: u64, duration_ms: u64) -> Self {
        Self {
            completed_at,
            items_synced,
            duration_ms,
            success: true,
            error: None,
        }
    }

    /// Creates an entry for a failed run.
    pub fn failure(
        completed_at: DateTime<Utc>,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            completed_at,
            items_synced: 0,
            duration_ms,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregate sync metadata persisted alongside the watermark.
///
/// History is ordered most-recent-first and capped; the oldest entry is
/// evicted on overflow. Totals only grow on successful runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// Completion time of the most recent successful run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    /// Running total of records stored across all successful runs.
    pub total_items_synced: u64,
    /// Bounded run history, most recent first.
    #[serde(default)]
    pub history: Vec<SyncHistoryEntry>,
}

impl SyncMetadata {
    /// Records a finished run, updating totals and bounded history.
    pub fn record_run(&mut self, entry: SyncHistoryEntry, history_cap: usize) {
        if entry.success {
            self.last_sync_timestamp = Some(entry.completed_at);
            self.total_items_synced += entry.items_synced;
        }
        self.history.insert(0, entry);
        self.history.truncate(history_cap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn default_status_is_idle() {
        let status = SyncStatus::default();
        assert!(!status.is_running);
        assert_eq!(status.items_synced, 0);
        assert!(!status.has_errors());
        assert_eq!(status.progress, 0);
    }

    #[test]
    fn successful_run_updates_totals() {
        let mut metadata = SyncMetadata::default();
        metadata.record_run(SyncHistoryEntry::success(at(100), 40, 1200), 10);
        metadata.record_run(SyncHistoryEntry::success(at(200), 2, 300), 10);

        assert_eq!(metadata.total_items_synced, 42);
        assert_eq!(metadata.last_sync_timestamp, Some(at(200)));
        assert_eq!(metadata.history.len(), 2);
        // Most recent first.
        assert_eq!(metadata.history[0].completed_at, at(200));
    }

    #[test]
    fn failed_run_leaves_totals_untouched() {
        let mut metadata = SyncMetadata::default();
        metadata.record_run(SyncHistoryEntry::success(at(100), 10, 500), 10);
        metadata.record_run(SyncHistoryEntry::failure(at(200), 80, "offline"), 10);

        assert_eq!(metadata.total_items_synced, 10);
        assert_eq!(metadata.last_sync_timestamp, Some(at(100)));
        assert_eq!(metadata.history.len(), 2);
        assert!(!metadata.history[0].success);
    }

    #[test]
    fn history_is_bounded_and_evicts_oldest() {
        let mut metadata = SyncMetadata::default();
        for i in 0..6 {
            metadata.record_run(SyncHistoryEntry::success(at(i * 100), 1, 10), 4);
        }

        assert_eq!(metadata.history.len(), 4);
        // Newest entry is first, oldest surviving entry is last.
        assert_eq!(metadata.history[0].completed_at, at(500));
        assert_eq!(metadata.history[3].completed_at, at(200));
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let mut metadata = SyncMetadata::default();
        metadata.record_run(SyncHistoryEntry::success(at(100), 7, 450), 10);

        let blob = serde_json::to_string(&metadata).unwrap();
        let back: SyncMetadata = serde_json::from_str(&blob).unwrap();
        assert_eq!(back, metadata);
    }
}
