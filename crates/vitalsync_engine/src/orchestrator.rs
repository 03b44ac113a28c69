//! The incremental sync pipeline.

use crate::config::SyncEngineConfig;
use crate::storage::StorageAdapter;
use crate::store::{KeyValueStore, WatermarkStore};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use vitalsync_client::{AuthProvider, ConnectivityProvider, PaginatedFetcher, RecordsApi};
use vitalsync_model::{
    StatusChannel, StatusReceiver, SyncError, SyncErrorEntry, SyncHistoryEntry, SyncOptions,
    SyncResult, SyncStatus, SyncWindow,
};

const PROGRESS_ONLINE: u8 = 10;
const PROGRESS_FETCHED: u8 = 50;
const PROGRESS_STORED: u8 = 80;
const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Default)]
struct RunReport {
    stored: u64,
    duplicates: u64,
    failed: Vec<SyncErrorEntry>,
}

/// Drives one incremental sync run end to end.
///
/// The pipeline is: connectivity check, window computation from the
/// watermark, paginated fetch, storage hand-off, watermark advance,
/// history append, status publish. `perform_sync` never returns an error:
/// every failure is captured into the returned [`SyncStatus`].
///
/// Only one run can be in flight at a time; a concurrent call observes
/// the current status instead of starting a duplicate.
pub struct SyncOrchestrator {
    config: SyncEngineConfig,
    fetcher: PaginatedFetcher,
    connectivity: Arc<dyn ConnectivityProvider>,
    storage: Arc<dyn StorageAdapter>,
    watermarks: WatermarkStore,
    status: StatusChannel<SyncStatus>,
    running: AtomicBool,
    cancelled: AtomicBool,
}

impl SyncOrchestrator {
    /// Creates an orchestrator wired to its collaborators.
    pub fn new(
        config: SyncEngineConfig,
        api: Arc<dyn RecordsApi>,
        auth: Arc<dyn AuthProvider>,
        connectivity: Arc<dyn ConnectivityProvider>,
        storage: Arc<dyn StorageAdapter>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let fetcher = PaginatedFetcher::new(api, auth)
            .with_retry(config.retry.clone())
            .with_max_pages(config.max_pages);
        let watermarks = WatermarkStore::new(store).with_history_cap(config.history_cap);

        Self {
            config,
            fetcher,
            connectivity,
            storage,
            watermarks,
            status: StatusChannel::new(SyncStatus::default()),
            running: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    /// The latest published status.
    pub fn status(&self) -> SyncStatus {
        self.status.latest()
    }

    /// Subscribes to live status updates; the latest value is replayed.
    pub fn subscribe(&self) -> StatusReceiver<SyncStatus> {
        self.status.subscribe()
    }

    /// The watermark and metadata store, for inspection and reset.
    pub fn watermark_store(&self) -> &WatermarkStore {
        &self.watermarks
    }

    /// Requests cancellation of the run currently in flight.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_progress(&self, progress: u8) {
        self.status.update(|status| status.progress = progress);
    }

    /// Runs one sync with the configured defaults.
    pub async fn perform_sync(&self) -> SyncStatus {
        let options = SyncOptions::default()
            .with_types(self.config.default_types.clone())
            .with_batch_size(self.config.batch_size);
        self.sync_with_options(options).await
    }

    /// Runs one sync with explicit options.
    pub async fn sync_with_options(&self, options: SyncOptions) -> SyncStatus {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync already in flight; returning current status");
            return self.status.latest();
        }

        self.cancelled.store(false, Ordering::SeqCst);
        let started = Instant::now();

        self.status.update(|status| {
            status.is_running = true;
            status.items_synced = 0;
            status.items_failed = 0;
            status.errors.clear();
            status.progress = 0;
        });

        let outcome = self.run_pipeline(&options).await;
        let finished_at = Utc::now();
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(report) => {
                let entry = SyncHistoryEntry::success(finished_at, report.stored, duration_ms);
                if let Err(e) = self.watermarks.record_run(entry) {
                    warn!(error = %e, "failed to record sync history");
                }
                info!(
                    stored = report.stored,
                    duplicates = report.duplicates,
                    failed = report.failed.len(),
                    "sync completed"
                );
                self.status.update(|status| {
                    status.is_running = false;
                    status.last_sync_time = Some(finished_at);
                    status.items_synced = report.stored;
                    status.items_failed = report.failed.len() as u64;
                    status.errors = report.failed;
                    status.progress = PROGRESS_DONE;
                });
            }
            Err(error) => {
                warn!(error = %error, "sync failed");
                let entry = SyncHistoryEntry::failure(finished_at, duration_ms, error.to_string());
                if let Err(e) = self.watermarks.record_run(entry) {
                    warn!(error = %e, "failed to record sync history");
                }
                self.status.update(|status| {
                    status.is_running = false;
                    status.last_sync_time = Some(finished_at);
                    status.errors.push(SyncErrorEntry::from(&error));
                });
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.status.latest()
    }

    async fn run_pipeline(&self, options: &SyncOptions) -> SyncResult<RunReport> {
        self.check_cancelled()?;
        if !self.connectivity.is_online().await {
            return Err(SyncError::network_retryable("device is offline", None));
        }
        self.set_progress(PROGRESS_ONLINE);

        let window = self.compute_window(options)?;
        debug!(since = %window.since, until = %window.until, "computed sync window");

        self.check_cancelled()?;
        let batch_size = if options.batch_size > 0 {
            options.batch_size
        } else {
            self.config.batch_size
        };
        let records = self
            .fetcher
            .fetch_window(window, &options.types, batch_size)
            .await?;
        self.set_progress(PROGRESS_FETCHED);

        self.check_cancelled()?;
        let outcome = self.storage.store_batch(&records).await?;
        self.set_progress(PROGRESS_STORED);

        // Advance to the newest record actually observed, never to
        // wall-clock now; an interrupted run resumes without gaps.
        if let Some(newest) = records.iter().map(|r| r.recorded_at).max() {
            self.watermarks.advance(newest)?;
        }

        Ok(RunReport {
            stored: outcome.stored,
            duplicates: outcome.duplicates,
            failed: outcome
                .errors
                .iter()
                .map(|e| SyncErrorEntry::from(&SyncError::storage(&e.record_id, &e.message)))
                .collect(),
        })
    }

    fn compute_window(&self, options: &SyncOptions) -> SyncResult<SyncWindow> {
        let now = Utc::now();

        if let Some(start) = options.start {
            return Ok(SyncWindow::new(start, options.end.unwrap_or(now)));
        }

        if options.incremental {
            if let Some(watermark) = self.watermarks.watermark()? {
                return Ok(SyncWindow::from_watermark(watermark, now));
            }
        }

        Ok(SyncWindow::initial(now, self.config.default_initial_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorageAdapter, RecordStoreError, StoreOutcome};
    use crate::store::MemoryKeyValueStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
    use std::time::Duration;
    use vitalsync_client::MockRecordsApi;
    use vitalsync_model::{HealthRecord, PageQuery, SyncErrorKind};

    struct StaticAuth(Option<String>);

    #[async_trait]
    impl AuthProvider for StaticAuth {
        async fn access_token(&self) -> SyncResult<Option<String>> {
            Ok(self.0.clone())
        }
    }

    struct StaticConnectivity(bool);

    #[async_trait]
    impl ConnectivityProvider for StaticConnectivity {
        async fn is_online(&self) -> bool {
            self.0
        }
    }

    /// Serves one empty page per call, slowly.
    struct SlowApi {
        delay: Duration,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl RecordsApi for SlowApi {
        async fn fetch_page(
            &self,
            _token: &str,
            _query: &PageQuery,
        ) -> SyncResult<Vec<HealthRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(vec![])
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(id: &str, secs: i64) -> HealthRecord {
        HealthRecord::new(id, "steps", at(secs), serde_json::json!({"count": 1}))
    }

    struct Harness {
        api: Arc<MockRecordsApi>,
        storage: Arc<MemoryStorageAdapter>,
        orchestrator: SyncOrchestrator,
    }

    fn harness(online: bool) -> Harness {
        let api = Arc::new(MockRecordsApi::new());
        let storage = Arc::new(MemoryStorageAdapter::new());
        let orchestrator = SyncOrchestrator::new(
            SyncEngineConfig::new().with_batch_size(5),
            Arc::clone(&api) as Arc<dyn RecordsApi>,
            Arc::new(StaticAuth(Some("token".into()))),
            Arc::new(StaticConnectivity(online)),
            Arc::clone(&storage) as Arc<dyn StorageAdapter>,
            Arc::new(MemoryKeyValueStore::new()),
        );
        Harness {
            api,
            storage,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn first_sync_uses_initial_window() {
        let h = harness(true);
        h.api.push_page(vec![]);

        h.orchestrator.perform_sync().await;

        let query = &h.api.queries()[0];
        let span = query.window.until - query.window.since;
        assert_eq!(span, ChronoDuration::days(30));
    }

    #[tokio::test]
    async fn successful_sync_stores_and_advances_watermark() {
        let h = harness(true);
        h.api
            .push_page(vec![record("a", 1000), record("b", 5000), record("c", 3000)]);

        let status = h.orchestrator.perform_sync().await;

        assert!(!status.is_running);
        assert_eq!(status.items_synced, 3);
        assert_eq!(status.items_failed, 0);
        assert_eq!(status.progress, 100);
        assert!(status.last_sync_time.is_some());
        assert_eq!(h.storage.len(), 3);

        // Watermark is the newest record timestamp, not wall-clock now.
        let watermark = h.orchestrator.watermark_store().watermark().unwrap();
        assert_eq!(watermark.unwrap(), at(5000));

        let metadata = h.orchestrator.watermark_store().metadata().unwrap();
        assert_eq!(metadata.total_items_synced, 3);
        assert!(metadata.history[0].success);
    }

    #[tokio::test]
    async fn rerun_with_no_new_data_is_idempotent() {
        let h = harness(true);
        h.api.push_page(vec![record("a", 7000)]);
        h.orchestrator.perform_sync().await;

        h.api.push_page(vec![]);
        let status = h.orchestrator.perform_sync().await;

        assert_eq!(status.items_synced, 0);
        assert!(!status.has_errors());
        let watermark = h.orchestrator.watermark_store().watermark().unwrap();
        assert_eq!(watermark.unwrap(), at(7000));

        // Second window starts exactly at the watermark.
        let second_query = &h.api.queries()[1];
        assert_eq!(second_query.window.since, at(7000));
    }

    #[tokio::test]
    async fn offline_fails_fast_without_touching_watermark() {
        let h = harness(false);

        let status = h.orchestrator.perform_sync().await;

        assert!(!status.is_running);
        assert_eq!(status.errors.len(), 1);
        assert_eq!(status.errors[0].kind, SyncErrorKind::Network);
        assert!(status.errors[0].retryable);
        assert_eq!(h.api.call_count(), 0);
        assert!(h
            .orchestrator
            .watermark_store()
            .watermark()
            .unwrap()
            .is_none());

        let metadata = h.orchestrator.watermark_store().metadata().unwrap();
        assert_eq!(metadata.total_items_synced, 0);
        assert!(!metadata.history[0].success);
    }

    #[tokio::test]
    async fn fetch_failure_is_captured_into_status() {
        let h = harness(true);
        h.api
            .push_error(SyncError::network_fatal("bad request", Some(400)));

        let status = h.orchestrator.perform_sync().await;

        assert!(!status.is_running);
        assert_eq!(status.errors.len(), 1);
        assert_eq!(status.errors[0].status, Some(400));
        assert_eq!(status.items_synced, 0);
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn missing_credential_surfaces_auth_error() {
        let api = Arc::new(MockRecordsApi::new());
        let orchestrator = SyncOrchestrator::new(
            SyncEngineConfig::new(),
            Arc::clone(&api) as Arc<dyn RecordsApi>,
            Arc::new(StaticAuth(None)),
            Arc::new(StaticConnectivity(true)),
            Arc::new(MemoryStorageAdapter::new()),
            Arc::new(MemoryKeyValueStore::new()),
        );

        let status = orchestrator.perform_sync().await;
        assert_eq!(status.errors.len(), 1);
        assert_eq!(status.errors[0].kind, SyncErrorKind::Auth);
        assert!(!status.errors[0].retryable);
    }

    #[tokio::test]
    async fn storage_rejections_are_record_scoped() {
        /// Rejects records whose id starts with "bad".
        struct PickyStorage;

        #[async_trait]
        impl StorageAdapter for PickyStorage {
            async fn store_batch(
                &self,
                records: &[HealthRecord],
            ) -> SyncResult<StoreOutcome> {
                let mut outcome = StoreOutcome::default();
                for record in records {
                    if record.id.starts_with("bad") {
                        outcome.errors.push(RecordStoreError {
                            record_id: record.id.clone(),
                            message: "schema mismatch".into(),
                        });
                    } else {
                        outcome.stored += 1;
                    }
                }
                Ok(outcome)
            }
        }

        let api = Arc::new(MockRecordsApi::new());
        api.push_page(vec![record("good-1", 100), record("bad-1", 200)]);

        let orchestrator = SyncOrchestrator::new(
            SyncEngineConfig::new(),
            Arc::clone(&api) as Arc<dyn RecordsApi>,
            Arc::new(StaticAuth(Some("token".into()))),
            Arc::new(StaticConnectivity(true)),
            Arc::new(PickyStorage),
            Arc::new(MemoryKeyValueStore::new()),
        );

        let status = orchestrator.perform_sync().await;

        // The batch is not aborted: the run succeeds, failures are scoped.
        assert_eq!(status.items_synced, 1);
        assert_eq!(status.items_failed, 1);
        assert_eq!(status.errors.len(), 1);
        assert_eq!(status.errors[0].kind, SyncErrorKind::Storage);

        let metadata = orchestrator.watermark_store().metadata().unwrap();
        assert!(metadata.history[0].success);
    }

    #[tokio::test]
    async fn concurrent_sync_is_single_flight() {
        let api = Arc::new(SlowApi {
            delay: Duration::from_millis(50),
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let orchestrator = Arc::new(SyncOrchestrator::new(
            SyncEngineConfig::new(),
            Arc::clone(&api) as Arc<dyn RecordsApi>,
            Arc::new(StaticAuth(Some("token".into()))),
            Arc::new(StaticConnectivity(true)),
            Arc::new(MemoryStorageAdapter::new()),
            Arc::new(MemoryKeyValueStore::new()),
        ));

        let first = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.perform_sync().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The overlapping call observes the in-flight status unchanged.
        let overlapping = orchestrator.perform_sync().await;
        assert!(overlapping.is_running);

        let finished = first.await.unwrap();
        assert!(!finished.is_running);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_run_is_reported_as_failure() {
        let api = Arc::new(SlowApi {
            delay: Duration::from_millis(100),
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let orchestrator = Arc::new(SyncOrchestrator::new(
            SyncEngineConfig::new(),
            Arc::clone(&api) as Arc<dyn RecordsApi>,
            Arc::new(StaticAuth(Some("token".into()))),
            Arc::new(StaticConnectivity(true)),
            Arc::new(MemoryStorageAdapter::new()),
            Arc::new(MemoryKeyValueStore::new()),
        ));

        let run = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.perform_sync().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        orchestrator.cancel();

        let status = run.await.unwrap();
        assert!(!status.is_running);
        assert_eq!(status.errors.len(), 1);
        assert!(status.errors[0].message.contains("cancelled"));
    }

    #[tokio::test]
    async fn subscribers_observe_progress_and_completion() {
        let h = harness(true);
        h.api.push_page(vec![record("a", 100)]);

        let rx = h.orchestrator.subscribe();
        let status = h.orchestrator.perform_sync().await;

        assert_eq!(status.progress, 100);
        // Late read of the channel sees the final state too.
        assert_eq!(rx.borrow().progress, 100);
        assert!(!rx.borrow().is_running);
    }

    #[tokio::test]
    async fn explicit_window_overrides_watermark() {
        let h = harness(true);
        h.api.push_page(vec![]);

        let options = SyncOptions::default()
            .with_batch_size(5)
            .with_window(SyncWindow::new(at(100), at(200)));
        h.orchestrator.sync_with_options(options).await;

        let query = &h.api.queries()[0];
        assert_eq!(query.window.since, at(100));
        assert_eq!(query.window.until, at(200));
    }
}
