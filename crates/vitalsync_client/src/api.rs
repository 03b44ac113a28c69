//! Transport seam for the remote time-series endpoint.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use vitalsync_model::{HealthRecord, PageQuery, SyncError, SyncResult};

/// A records API handles one page request against the remote endpoint.
///
/// This trait abstracts the wire so the fetcher and orchestrator can be
/// exercised without a network (mock for testing, HTTP in production).
#[async_trait]
pub trait RecordsApi: Send + Sync {
    /// Fetches one page of records matching the query.
    ///
    /// A returned page shorter than `query.limit` signals exhaustion.
    async fn fetch_page(&self, token: &str, query: &PageQuery) -> SyncResult<Vec<HealthRecord>>;
}

/// A mock records API for testing.
///
/// Responses are queued in order; each `fetch_page` call consumes one.
/// Every query and token passed in is recorded for assertions.
#[derive(Default)]
pub struct MockRecordsApi {
    responses: Mutex<VecDeque<SyncResult<Vec<HealthRecord>>>>,
    queries: Mutex<Vec<PageQuery>>,
    tokens: Mutex<Vec<String>>,
}

impl MockRecordsApi {
    /// Creates a mock with an empty response queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful page.
    pub fn push_page(&self, records: Vec<HealthRecord>) {
        self.responses.lock().push_back(Ok(records));
    }

    /// Queues a failure.
    pub fn push_error(&self, error: SyncError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Queries received so far, in call order.
    pub fn queries(&self) -> Vec<PageQuery> {
        self.queries.lock().clone()
    }

    /// Bearer tokens received so far, in call order.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().clone()
    }

    /// Number of `fetch_page` calls made.
    pub fn call_count(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl RecordsApi for MockRecordsApi {
    async fn fetch_page(&self, token: &str, query: &PageQuery) -> SyncResult<Vec<HealthRecord>> {
        self.queries.lock().push(query.clone());
        self.tokens.lock().push(token.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::unknown("no mock page queued")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vitalsync_model::SyncWindow;

    fn query() -> PageQuery {
        let window = SyncWindow::new(
            Utc.timestamp_opt(0, 0).unwrap(),
            Utc.timestamp_opt(1000, 0).unwrap(),
        );
        PageQuery::first(vec!["steps".into()], window, 10)
    }

    #[tokio::test]
    async fn mock_serves_queued_responses_in_order() {
        let api = MockRecordsApi::new();
        api.push_page(vec![]);
        api.push_error(SyncError::network_retryable("boom", Some(503)));

        assert!(api.fetch_page("t", &query()).await.is_ok());
        assert!(api.fetch_page("t", &query()).await.is_err());
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn mock_errors_when_queue_is_empty() {
        let api = MockRecordsApi::new();
        let result = api.fetch_page("t", &query()).await;
        assert!(matches!(result, Err(SyncError::Unknown(_))));
    }

    #[tokio::test]
    async fn mock_records_queries_and_tokens() {
        let api = MockRecordsApi::new();
        api.push_page(vec![]);
        api.fetch_page("secret", &query()).await.unwrap();

        assert_eq!(api.queries()[0].limit, 10);
        assert_eq!(api.tokens(), ["secret"]);
    }
}
