//! Health records and the query types that drive fetching.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single time-series health record as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    /// Stable record identifier assigned by the remote service.
    pub id: String,
    /// Entity type of the record (e.g. "heart_rate", "steps", "sleep").
    pub kind: String,
    /// When the measurement was taken.
    pub recorded_at: DateTime<Utc>,
    /// Normalized measurement payload.
    pub payload: serde_json::Value,
    /// Device or integration that produced the record, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl HealthRecord {
    /// Creates a new record.
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        recorded_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            recorded_at,
            payload,
            source: None,
        }
    }

    /// Sets the source device.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A half-open sync window `[since, until)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    /// Inclusive lower bound.
    pub since: DateTime<Utc>,
    /// Exclusive upper bound.
    pub until: DateTime<Utc>,
}

impl SyncWindow {
    /// Creates a window from explicit bounds.
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since, until }
    }

    /// Window for an incremental run: everything after the watermark.
    pub fn from_watermark(watermark: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            since: watermark,
            until: now,
        }
    }

    /// Window for the very first run: the trailing `days` before `now`.
    pub fn initial(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            since: now - Duration::days(days),
            until: now,
        }
    }

    /// Returns true if the instant falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.since && at < self.until
    }

    /// Returns true if the window spans no time at all.
    pub fn is_empty(&self) -> bool {
        self.until <= self.since
    }
}

/// Query parameters for one page of the remote time-series endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// Entity types to fetch; empty means all types.
    pub types: Vec<String>,
    /// Time window being synchronized.
    pub window: SyncWindow,
    /// Requested page size.
    pub limit: u32,
    /// Offset of the first record in this page.
    pub offset: u64,
}

impl PageQuery {
    /// Creates the query for the first page of a window.
    pub fn first(types: Vec<String>, window: SyncWindow, limit: u32) -> Self {
        Self {
            types,
            window,
            limit,
            offset: 0,
        }
    }

    /// The query for the page following this one.
    pub fn next_page(&self) -> Self {
        let mut next = self.clone();
        next.offset += u64::from(self.limit);
        next
    }

    /// Comma-joined type filter as the wire expects it, if any types are set.
    pub fn types_param(&self) -> Option<String> {
        if self.types.is_empty() {
            None
        } else {
            Some(self.types.join(","))
        }
    }
}

/// Options controlling a single sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    /// When true, the window starts at the persisted watermark.
    pub incremental: bool,
    /// Explicit lower bound overriding the watermark, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    /// Explicit upper bound overriding "now", if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Entity types to fetch; empty means all types.
    #[serde(default)]
    pub types: Vec<String>,
    /// Page size for the paginated fetch.
    pub batch_size: u32,
}

impl SyncOptions {
    /// Restricts the run to the given entity types.
    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    /// Sets the page size.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets an explicit window, disabling incremental watermark use.
    pub fn with_window(mut self, window: SyncWindow) -> Self {
        self.incremental = false;
        self.start = Some(window.since);
        self.end = Some(window.until);
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            incremental: true,
            start: None,
            end: None,
            types: Vec::new(),
            batch_size: 100,
        }
    }
}
