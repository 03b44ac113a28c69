//! Paginated fetching with per-request retry.

use crate::api::RecordsApi;
use crate::providers::AuthProvider;
use crate::retry::{retry_request, RetryConfig};
use std::sync::Arc;
use tracing::{debug, warn};
use vitalsync_model::{HealthRecord, PageQuery, SyncError, SyncResult, SyncWindow};

const DEFAULT_MAX_PAGES: u32 = 100;

/// Fetches every record in a window by walking offset pages.
///
/// Each underlying request obtains a fresh bearer credential and is
/// wrapped in retry-with-backoff. Pagination stops when a page comes back
/// shorter than the requested batch size; a hard page cap guards against
/// a misbehaving server that never returns a short page.
pub struct PaginatedFetcher {
    api: Arc<dyn RecordsApi>,
    auth: Arc<dyn AuthProvider>,
    retry: RetryConfig,
    max_pages: u32,
}

impl PaginatedFetcher {
    /// Creates a fetcher with default retry and page-cap settings.
    pub fn new(api: Arc<dyn RecordsApi>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            api,
            auth,
            retry: RetryConfig::default(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Sets the per-request retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the maximum number of pages fetched in one window.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetches all records in `window` matching `types`.
    ///
    /// Page N+1 is requested only after page N's outcome is known, and the
    /// returned vector preserves request order. If the page cap is reached
    /// the accumulated records are returned; the next incremental run
    /// resumes from the watermark, so nothing is lost.
    pub async fn fetch_window(
        &self,
        window: SyncWindow,
        types: &[String],
        batch_size: u32,
    ) -> SyncResult<Vec<HealthRecord>> {
        if batch_size == 0 {
            return Err(SyncError::unknown("batch size must be non-zero"));
        }

        let mut records = Vec::new();
        let mut query = PageQuery::first(types.to_vec(), window, batch_size);

        for page in 0..self.max_pages {
            let page_records = self.fetch_page_with_retry(&query).await?;
            let page_len = page_records.len();
            records.extend(page_records);

            debug!(page, page_len, total = records.len(), "fetched page");

            if page_len < batch_size as usize {
                return Ok(records);
            }
            query = query.next_page();
        }

        warn!(
            max_pages = self.max_pages,
            total = records.len(),
            "page cap reached before exhaustion; truncating fetch"
        );
        Ok(records)
    }

    async fn fetch_page_with_retry(&self, query: &PageQuery) -> SyncResult<Vec<HealthRecord>> {
        retry_request(&self.retry, |_attempt| {
            let api = Arc::clone(&self.api);
            let auth = Arc::clone(&self.auth);
            let query = query.clone();
            async move {
                let token = auth
                    .access_token()
                    .await?
                    .ok_or_else(|| SyncError::auth("no access token available"))?;
                api.fetch_page(&token, &query).await
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockRecordsApi;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    struct StaticAuth(Option<String>);

    #[async_trait]
    impl AuthProvider for StaticAuth {
        async fn access_token(&self) -> SyncResult<Option<String>> {
            Ok(self.0.clone())
        }
    }

    fn window() -> SyncWindow {
        SyncWindow::new(
            Utc.timestamp_opt(0, 0).unwrap(),
            Utc.timestamp_opt(100_000, 0).unwrap(),
        )
    }

    fn records(prefix: &str, count: usize) -> Vec<HealthRecord> {
        (0..count)
            .map(|i| {
                HealthRecord::new(
                    format!("{prefix}-{i}"),
                    "steps",
                    Utc.timestamp_opt(1000 + i as i64, 0).unwrap(),
                    serde_json::json!({ "count": i }),
                )
            })
            .collect()
    }

    fn fetcher(api: Arc<MockRecordsApi>) -> PaginatedFetcher {
        PaginatedFetcher::new(api, Arc::new(StaticAuth(Some("token".into()))))
            .with_retry(RetryConfig::new(3).with_initial_delay(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn full_page_triggers_another_request() {
        let api = Arc::new(MockRecordsApi::new());
        api.push_page(records("a", 5));
        api.push_page(records("b", 2));

        let result = fetcher(Arc::clone(&api))
            .fetch_window(window(), &[], 5)
            .await
            .unwrap();

        assert_eq!(result.len(), 7);
        assert_eq!(api.call_count(), 2);
        assert_eq!(api.queries()[0].offset, 0);
        assert_eq!(api.queries()[1].offset, 5);
    }

    #[tokio::test]
    async fn short_page_stops_pagination() {
        let api = Arc::new(MockRecordsApi::new());
        api.push_page(records("a", 3));

        let result = fetcher(Arc::clone(&api))
            .fetch_window(window(), &[], 5)
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn page_count_is_ceil_of_total_over_batch() {
        // 12 records at batch size 5 -> pages of 5, 5, 2 -> 3 requests.
        let api = Arc::new(MockRecordsApi::new());
        api.push_page(records("a", 5));
        api.push_page(records("b", 5));
        api.push_page(records("c", 2));

        let result = fetcher(Arc::clone(&api))
            .fetch_window(window(), &[], 5)
            .await
            .unwrap();

        assert_eq!(result.len(), 12);
        assert_eq!(api.call_count(), 3);

        // Concatenation preserves request order.
        assert_eq!(result[0].id, "a-0");
        assert_eq!(result[5].id, "b-0");
        assert_eq!(result[11].id, "c-1");
    }

    #[tokio::test]
    async fn missing_credential_is_auth_error_without_api_call() {
        let api = Arc::new(MockRecordsApi::new());
        let fetcher = PaginatedFetcher::new(
            Arc::clone(&api) as Arc<dyn RecordsApi>,
            Arc::new(StaticAuth(None)),
        );

        let result = fetcher.fetch_window(window(), &[], 5).await;
        assert!(matches!(result, Err(SyncError::Auth(_))));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn fatal_error_propagates_without_retry() {
        let api = Arc::new(MockRecordsApi::new());
        api.push_error(SyncError::network_fatal("bad request", Some(400)));

        let result = fetcher(Arc::clone(&api)).fetch_window(window(), &[], 5).await;
        assert!(result.is_err());
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn transient_error_is_retried_then_succeeds() {
        let api = Arc::new(MockRecordsApi::new());
        api.push_error(SyncError::network_retryable("flaky", Some(503)));
        api.push_page(records("a", 1));

        let result = fetcher(Arc::clone(&api))
            .fetch_window(window(), &[], 5)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn page_cap_bounds_a_misbehaving_server() {
        let api = Arc::new(MockRecordsApi::new());
        for i in 0..10 {
            api.push_page(records(&format!("p{i}"), 5));
        }

        let result = fetcher(Arc::clone(&api))
            .with_max_pages(3)
            .fetch_window(window(), &[], 5)
            .await
            .unwrap();

        assert_eq!(api.call_count(), 3);
        assert_eq!(result.len(), 15);
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected() {
        let api = Arc::new(MockRecordsApi::new());
        let result = fetcher(api).fetch_window(window(), &[], 0).await;
        assert!(result.is_err());
    }
}
