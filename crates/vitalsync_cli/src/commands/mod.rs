//! Command implementations and the collaborators they wire up.

pub mod refresh;
pub mod reset;
pub mod status;
pub mod sync;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vitalsync_client::{
    AuthProvider, ConnectivityProvider, HttpRecordsApi, RecordsApi,
};
use vitalsync_engine::{
    FileKeyValueStore, KeyValueStore, RecordStoreError, StorageAdapter, StoreOutcome,
    SyncEngineConfig, SyncOrchestrator,
};
use vitalsync_model::{HealthRecord, SyncError, SyncResult};

/// Environment variable the bearer token is read from.
pub const TOKEN_ENV: &str = "VITALSYNC_TOKEN";

/// Bearer credential sourced from the environment on every request.
struct EnvTokenAuth;

#[async_trait]
impl AuthProvider for EnvTokenAuth {
    async fn access_token(&self) -> SyncResult<Option<String>> {
        Ok(std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()))
    }
}

/// The CLI has no platform connectivity signal; it assumes online and
/// lets request failures surface through the normal error path.
struct AssumeOnline;

#[async_trait]
impl ConnectivityProvider for AssumeOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

/// Stores records in a JSON file keyed by record id, idempotently.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Creates an adapter writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> SyncResult<serde_json::Map<String, serde_json::Value>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                SyncError::storage(self.path.display().to_string(), format!("corrupt output: {e}"))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(serde_json::Map::new()),
            Err(e) => Err(SyncError::storage(
                self.path.display().to_string(),
                e.to_string(),
            )),
        }
    }
}

#[async_trait]
impl StorageAdapter for JsonFileStorage {
    async fn store_batch(&self, records: &[HealthRecord]) -> SyncResult<StoreOutcome> {
        let mut stored = self.load()?;
        let mut outcome = StoreOutcome::default();

        for record in records {
            if stored.contains_key(&record.id) {
                outcome.duplicates += 1;
                continue;
            }
            match serde_json::to_value(record) {
                Ok(value) => {
                    stored.insert(record.id.clone(), value);
                    outcome.stored += 1;
                }
                Err(e) => outcome.errors.push(RecordStoreError {
                    record_id: record.id.clone(),
                    message: e.to_string(),
                }),
            }
        }

        let contents = serde_json::to_string_pretty(&stored)
            .map_err(|e| SyncError::storage(self.path.display().to_string(), e.to_string()))?;
        std::fs::write(&self.path, contents)
            .map_err(|e| SyncError::storage(self.path.display().to_string(), e.to_string()))?;

        Ok(outcome)
    }
}

/// Wires an orchestrator against a live HTTP endpoint and local files.
pub fn build_orchestrator(
    state: &Path,
    server: &str,
    types: Option<&str>,
    batch_size: u32,
    output: &Path,
) -> Result<SyncOrchestrator, Box<dyn std::error::Error>> {
    let store = Arc::new(FileKeyValueStore::open(state)?);
    let api = Arc::new(HttpRecordsApi::new(server)?);

    let types: Vec<String> = types
        .map(|t| {
            t.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let config = SyncEngineConfig::new()
        .with_batch_size(batch_size)
        .with_types(types);

    Ok(SyncOrchestrator::new(
        config,
        api as Arc<dyn RecordsApi>,
        Arc::new(EnvTokenAuth),
        Arc::new(AssumeOnline),
        Arc::new(JsonFileStorage::new(output)),
        store as Arc<dyn KeyValueStore>,
    ))
}
