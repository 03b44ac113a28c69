//! Key/value persistence and the watermark store.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use vitalsync_model::{SyncError, SyncHistoryEntry, SyncMetadata, SyncResult};

/// Fixed key under which the watermark is persisted.
pub const WATERMARK_KEY: &str = "sync/watermark";

/// Fixed key under which serialized sync metadata is persisted.
pub const METADATA_KEY: &str = "sync/metadata";

/// A persistent string key/value store.
///
/// The engine keeps only two keys in it: the watermark and the metadata
/// blob. Implementations must be safe for concurrent use.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, if present.
    fn get(&self, key: &str) -> SyncResult<Option<String>>;

    /// Sets `key` to `value`.
    fn set(&self, key: &str, value: &str) -> SyncResult<()>;

    /// Removes `key` if present.
    fn remove(&self, key: &str) -> SyncResult<()>;
}

/// An in-memory key/value store for testing and ephemeral embedders.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        self.entries.write().insert(key.into(), value.into());
        Ok(())
    }

    fn remove(&self, key: &str) -> SyncResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// A key/value store persisted as a single JSON file.
///
/// The whole map is rewritten on every mutation; with two small keys this
/// stays cheap and keeps the on-disk format trivially inspectable.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileKeyValueStore {
    /// Opens the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                SyncError::storage(path.display().to_string(), format!("corrupt store: {e}"))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(SyncError::storage(
                    path.display().to_string(),
                    e.to_string(),
                ))
            }
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> SyncResult<()> {
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| SyncError::storage(self.path.display().to_string(), e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SyncError::storage(self.path.display().to_string(), e.to_string())
                })?;
            }
        }
        std::fs::write(&self.path, contents)
            .map_err(|e| SyncError::storage(self.path.display().to_string(), e.to_string()))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        let mut entries = self.entries.write();
        entries.insert(key.into(), value.into());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> SyncResult<()> {
        let mut entries = self.entries.write();
        entries.remove(key);
        self.persist(&entries)
    }
}

/// Persists the sync watermark and aggregate metadata under fixed keys.
///
/// The watermark is the exclusive upper bound of previously synchronized
/// data, stored as an RFC 3339 string. It is created on the first
/// successful sync, only ever moves forward, and is removed only by an
/// explicit [`reset`](WatermarkStore::reset).
pub struct WatermarkStore {
    store: Arc<dyn KeyValueStore>,
    history_cap: usize,
}

impl WatermarkStore {
    /// Creates a watermark store over the given backend.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            history_cap: 50,
        }
    }

    /// Sets the number of history entries retained in metadata.
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    /// Returns the current watermark, if one has been recorded.
    ///
    /// An unparseable stored value is treated as absent; the next run
    /// then falls back to the initial window and rewrites it.
    pub fn watermark(&self) -> SyncResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get(WATERMARK_KEY)? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(parsed) => Ok(Some(parsed.with_timezone(&Utc))),
            Err(e) => {
                warn!(raw, %e, "ignoring unparseable watermark");
                Ok(None)
            }
        }
    }

    /// Advances the watermark to `candidate` if that moves it forward.
    ///
    /// A candidate at or before the current watermark is ignored, so a
    /// remote that returns out-of-order records cannot regress the window.
    pub fn advance(&self, candidate: DateTime<Utc>) -> SyncResult<()> {
        if let Some(current) = self.watermark()? {
            if candidate <= current {
                return Ok(());
            }
        }
        self.store.set(WATERMARK_KEY, &candidate.to_rfc3339())
    }

    /// Removes the watermark and metadata entirely.
    pub fn reset(&self) -> SyncResult<()> {
        self.store.remove(WATERMARK_KEY)?;
        self.store.remove(METADATA_KEY)
    }

    /// Loads the aggregate metadata, defaulting to empty when absent.
    pub fn metadata(&self) -> SyncResult<SyncMetadata> {
        let Some(raw) = self.store.get(METADATA_KEY)? else {
            return Ok(SyncMetadata::default());
        };
        match serde_json::from_str(&raw) {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                warn!(%e, "ignoring corrupt sync metadata");
                Ok(SyncMetadata::default())
            }
        }
    }

    /// Records a finished run in the bounded history and persists it.
    pub fn record_run(&self, entry: SyncHistoryEntry) -> SyncResult<SyncMetadata> {
        let mut metadata = self.metadata()?;
        metadata.record_run(entry, self.history_cap);
        let blob = serde_json::to_string(&metadata)
            .map_err(|e| SyncError::storage(METADATA_KEY, e.to_string()))?;
        self.store.set(METADATA_KEY, &blob)?;
        Ok(metadata)
    }
}
