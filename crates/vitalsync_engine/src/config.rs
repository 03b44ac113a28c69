//! Configuration for the sync orchestrator.

use vitalsync_client::RetryConfig;

/// Configuration for sync runs.
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// Window length in days for the very first sync (no watermark yet).
    pub default_initial_days: i64,
    /// Default page size for the paginated fetch.
    pub batch_size: u32,
    /// Entity types synchronized by default; empty means all types.
    pub default_types: Vec<String>,
    /// Maximum history entries retained in sync metadata.
    pub history_cap: usize,
    /// Maximum pages fetched in one window.
    pub max_pages: u32,
    /// Per-request retry configuration.
    pub retry: RetryConfig,
}

impl SyncEngineConfig {
    /// Creates a configuration with production defaults.
    pub fn new() -> Self {
        Self {
            default_initial_days: 30,
            batch_size: 100,
            default_types: Vec::new(),
            history_cap: 50,
            max_pages: 100,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the initial window length in days.
    pub fn with_initial_days(mut self, days: i64) -> Self {
        self.default_initial_days = days;
        self
    }

    /// Sets the default page size.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the entity types synchronized by default.
    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.default_types = types;
        self
    }

    /// Sets the history cap.
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    /// Sets the page cap per window.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the per-request retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
