//! The record-persistence seam.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use vitalsync_model::{HealthRecord, SyncResult};

/// A failure storing one record; the rest of the batch is unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStoreError {
    /// Identifier of the record that failed.
    pub record_id: String,
    /// What went wrong.
    pub message: String,
}

/// Result of delivering a batch to the storage adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOutcome {
    /// Records newly stored.
    pub stored: u64,
    /// Records skipped because they were already present.
    pub duplicates: u64,
    /// Per-record failures.
    pub errors: Vec<RecordStoreError>,
}

/// Persists normalized records into the local database.
///
/// Implementations must be idempotent under re-delivery: the same record
/// delivered twice is counted as a duplicate, never double-stored. That
/// property is what makes watermark-based resumption safe.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Stores a batch of records, reporting the per-record outcome.
    async fn store_batch(&self, records: &[HealthRecord]) -> SyncResult<StoreOutcome>;
}

/// An in-memory storage adapter, idempotent by record id.
#[derive(Debug, Default)]
pub struct MemoryStorageAdapter {
    records: RwLock<HashMap<String, HealthRecord>>,
}

impl MemoryStorageAdapter {
    /// Creates an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct records stored.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns true if a record with this id has been stored.
    pub fn contains(&self, record_id: &str) -> bool {
        self.records.read().contains_key(record_id)
    }

    /// All stored records, in no particular order.
    pub fn records(&self) -> Vec<HealthRecord> {
        self.records.read().values().cloned().collect()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorageAdapter {
    async fn store_batch(&self, records: &[HealthRecord]) -> SyncResult<StoreOutcome> {
        let mut outcome = StoreOutcome::default();
        let mut stored = self.records.write();

        for record in records {
            if stored.contains_key(&record.id) {
                outcome.duplicates += 1;
            } else {
                stored.insert(record.id.clone(), record.clone());
                outcome.stored += 1;
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: &str) -> HealthRecord {
        HealthRecord::new(
            id,
            "steps",
            Utc.timestamp_opt(1000, 0).unwrap(),
            serde_json::json!({"count": 1}),
        )
    }

    #[tokio::test]
    async fn stores_new_records() {
        let adapter = MemoryStorageAdapter::new();
        let outcome = adapter
            .store_batch(&[record("a"), record("b")])
            .await
            .unwrap();

        assert_eq!(outcome.stored, 2);
        assert_eq!(outcome.duplicates, 0);
        assert!(outcome.errors.is_empty());
        assert_eq!(adapter.len(), 2);
    }

    #[tokio::test]
    async fn redelivery_counts_duplicates_not_double_stores() {
        let adapter = MemoryStorageAdapter::new();
        adapter.store_batch(&[record("a")]).await.unwrap();

        let outcome = adapter
            .store_batch(&[record("a"), record("b")])
            .await
            .unwrap();

        assert_eq!(outcome.stored, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(adapter.len(), 2);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let adapter = MemoryStorageAdapter::new();
        let outcome = adapter.store_batch(&[]).await.unwrap();
        assert_eq!(outcome, StoreOutcome::default());
        assert!(adapter.is_empty());
    }
}
