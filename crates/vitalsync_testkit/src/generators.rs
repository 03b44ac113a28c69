//! Property-based test generators using proptest.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use vitalsync_model::{HealthRecord, SyncWindow};

/// Entity kinds that appear in generated records.
pub const RECORD_KINDS: &[&str] = &["steps", "heart_rate", "sleep", "weight", "blood_pressure"];

/// Strategy producing a single health record.
pub fn record_strategy() -> impl Strategy<Value = HealthRecord> {
    (
        "[a-f0-9]{12}",
        0i64..2_000_000_000,
        prop::sample::select(RECORD_KINDS),
        0u32..100_000,
    )
        .prop_map(|(id, secs, kind, value)| {
            HealthRecord::new(
                id,
                kind,
                Utc.timestamp_opt(secs, 0).unwrap(),
                serde_json::json!({ "value": value }),
            )
        })
}

/// Strategy producing up to `max` records with unique ids.
pub fn record_batch_strategy(max: usize) -> impl Strategy<Value = Vec<HealthRecord>> {
    prop::collection::vec(record_strategy(), 0..=max).prop_map(|mut records| {
        for (index, record) in records.iter_mut().enumerate() {
            record.id = format!("{}-{index}", record.id);
        }
        records
    })
}

/// Strategy producing a non-empty sync window.
pub fn window_strategy() -> impl Strategy<Value = SyncWindow> {
    (0i64..1_000_000_000, 1i64..1_000_000_000).prop_map(|(since, span)| {
        SyncWindow::new(
            Utc.timestamp_opt(since, 0).unwrap(),
            Utc.timestamp_opt(since + span, 0).unwrap(),
        )
    })
}
