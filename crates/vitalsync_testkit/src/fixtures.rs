//! Provider doubles and a prewired orchestrator harness.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use vitalsync_client::{AuthProvider, ConnectivityProvider, MockRecordsApi, RecordsApi};
use vitalsync_engine::{
    KeyValueStore, MemoryKeyValueStore, MemoryStorageAdapter, StorageAdapter, SyncEngineConfig,
    SyncOrchestrator,
};
use vitalsync_model::{HealthRecord, PageQuery, SyncError, SyncResult};
use vitalsync_workflow::AvailabilityProvider;

/// Auth provider that always returns the same token (or none).
pub struct StaticAuth(Option<String>);

impl StaticAuth {
    /// Provider returning the given token.
    pub fn token(token: impl Into<String>) -> Arc<Self> {
        Arc::new(Self(Some(token.into())))
    }

    /// Provider with no credential available.
    pub fn missing() -> Arc<Self> {
        Arc::new(Self(None))
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn access_token(&self) -> SyncResult<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Connectivity provider with a fixed (but switchable) signal.
pub struct StaticConnectivity {
    online: RwLock<bool>,
}

impl StaticConnectivity {
    /// Provider reporting the device online.
    pub fn online() -> Arc<Self> {
        Arc::new(Self {
            online: RwLock::new(true),
        })
    }

    /// Provider reporting the device offline.
    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            online: RwLock::new(false),
        })
    }

    /// Flips the connectivity signal.
    pub fn set_online(&self, online: bool) {
        *self.online.write() = online;
    }
}

#[async_trait]
impl ConnectivityProvider for StaticConnectivity {
    async fn is_online(&self) -> bool {
        *self.online.read()
    }
}

/// Availability provider with an explicit down-list.
#[derive(Default)]
pub struct StaticAvailability {
    down: RwLock<HashSet<String>>,
}

impl StaticAvailability {
    /// Provider with every service healthy.
    pub fn all_up() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Provider with the given services down.
    pub fn with_down(services: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            down: RwLock::new(services.iter().map(|s| s.to_string()).collect()),
        })
    }

    /// Marks a service down.
    pub fn take_down(&self, service: &str) {
        self.down.write().insert(service.to_string());
    }

    /// Marks a service healthy again.
    pub fn bring_up(&self, service: &str) {
        self.down.write().remove(service);
    }
}

#[async_trait]
impl AvailabilityProvider for StaticAvailability {
    async fn is_available(&self, service: &str) -> bool {
        !self.down.read().contains(service)
    }
}

/// Records API that fails a fixed number of times before delegating to
/// an inner [`MockRecordsApi`].
pub struct FlakyRecordsApi {
    failures_remaining: AtomicU32,
    /// The mock serving pages once the failures are exhausted.
    pub inner: MockRecordsApi,
}

impl FlakyRecordsApi {
    /// Fails the first `failures` calls with a retryable 503.
    pub fn failing(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures_remaining: AtomicU32::new(failures),
            inner: MockRecordsApi::new(),
        })
    }
}

#[async_trait]
impl RecordsApi for FlakyRecordsApi {
    async fn fetch_page(&self, token: &str, query: &PageQuery) -> SyncResult<Vec<HealthRecord>> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::network_retryable("injected failure", Some(503)));
        }
        self.inner.fetch_page(token, query).await
    }
}

/// A record with a deterministic timestamp, for concise test setup.
pub fn record(id: &str, secs: i64) -> HealthRecord {
    HealthRecord::new(
        id,
        "steps",
        timestamp(secs),
        serde_json::json!({ "count": 1 }),
    )
}

/// UTC timestamp at the given epoch second.
pub fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// An orchestrator wired entirely to in-memory doubles.
pub struct TestOrchestrator {
    /// The mock API pages are queued on.
    pub api: Arc<MockRecordsApi>,
    /// The in-memory storage adapter records land in.
    pub storage: Arc<MemoryStorageAdapter>,
    /// The connectivity double.
    pub connectivity: Arc<StaticConnectivity>,
    /// The key/value store holding watermark and metadata.
    pub store: Arc<MemoryKeyValueStore>,
    /// The orchestrator under test.
    pub orchestrator: SyncOrchestrator,
}

impl TestOrchestrator {
    /// Creates an online harness with default engine configuration.
    pub fn online() -> Self {
        Self::with_config(SyncEngineConfig::new())
    }

    /// Creates an offline harness.
    pub fn offline() -> Self {
        let harness = Self::online();
        harness.connectivity.set_online(false);
        harness
    }

    /// Creates an online harness with a custom configuration.
    pub fn with_config(config: SyncEngineConfig) -> Self {
        let api = Arc::new(MockRecordsApi::new());
        let storage = Arc::new(MemoryStorageAdapter::new());
        let connectivity = StaticConnectivity::online();
        let store = Arc::new(MemoryKeyValueStore::new());

        let orchestrator = SyncOrchestrator::new(
            config,
            Arc::clone(&api) as Arc<dyn RecordsApi>,
            StaticAuth::token("test-token"),
            Arc::clone(&connectivity) as Arc<dyn ConnectivityProvider>,
            Arc::clone(&storage) as Arc<dyn StorageAdapter>,
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
        );

        Self {
            api,
            storage,
            connectivity,
            store,
            orchestrator,
        }
    }
}
