//! HTTP implementation of the records API.

use crate::api::RecordsApi;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use vitalsync_model::{HealthRecord, PageQuery, SyncError, SyncResult};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Records API backed by an authenticated HTTP GET endpoint.
///
/// Requests carry the bearer token, the comma-joined type filter, the
/// window bounds as RFC 3339 timestamps, and limit/offset pagination
/// parameters. The response body is a JSON array of records.
#[derive(Debug)]
pub struct HttpRecordsApi {
    client: reqwest::Client,
    records_url: String,
    request_timeout: Duration,
}

impl HttpRecordsApi {
    /// Creates a client for the given base URL (e.g. `https://api.example.com`).
    pub fn new(base_url: impl Into<String>) -> SyncResult<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client with a custom per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::unknown(format!("failed to build HTTP client: {e}")))?;

        let base = base_url.into();
        Ok(Self {
            client,
            records_url: format!("{}/records", base.trim_end_matches('/')),
            request_timeout: timeout,
        })
    }

    /// The full records endpoint URL.
    pub fn records_url(&self) -> &str {
        &self.records_url
    }

    fn map_transport_error(&self, error: &reqwest::Error) -> SyncError {
        if error.is_timeout() {
            SyncError::Timeout(self.request_timeout)
        } else {
            SyncError::network_retryable(error.to_string(), None)
        }
    }
}

/// Classifies a non-success HTTP status into the error taxonomy.
///
/// 401/403 are authentication failures, other 4xx are fatal rejections,
/// 429 and 5xx are retryable server-side conditions.
fn classify_status(status: u16, body: String) -> SyncError {
    match status {
        401 | 403 => SyncError::auth(body),
        429 => SyncError::network_retryable(body, Some(status)),
        400..=499 => SyncError::network_fatal(body, Some(status)),
        _ => SyncError::network_retryable(body, Some(status)),
    }
}

#[async_trait]
impl RecordsApi for HttpRecordsApi {
    async fn fetch_page(&self, token: &str, query: &PageQuery) -> SyncResult<Vec<HealthRecord>> {
        let mut request = self
            .client
            .get(&self.records_url)
            .bearer_auth(token)
            .query(&[
                ("startDate", query.window.since.to_rfc3339()),
                ("endDate", query.window.until.to_rfc3339()),
                ("limit", query.limit.to_string()),
                ("offset", query.offset.to_string()),
            ]);

        if let Some(types) = query.types_param() {
            request = request.query(&[("types", types)]);
        }

        debug!(offset = query.offset, limit = query.limit, "requesting page");

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), body));
        }

        response
            .json::<Vec<HealthRecord>>()
            .await
            .map_err(|e| SyncError::unknown(format!("failed to decode records page: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_map_to_auth_errors() {
        assert!(matches!(
            classify_status(401, "unauthorized".into()),
            SyncError::Auth(_)
        ));
        assert!(matches!(
            classify_status(403, "forbidden".into()),
            SyncError::Auth(_)
        ));
    }

    #[test]
    fn client_errors_are_fatal() {
        let error = classify_status(404, "not found".into());
        assert!(!error.is_retryable());
        assert_eq!(error.status_code(), Some(404));
    }

    #[test]
    fn throttling_and_server_errors_are_retryable() {
        assert!(classify_status(429, "slow down".into()).is_retryable());
        assert!(classify_status(500, "oops".into()).is_retryable());
        assert!(classify_status(503, "unavailable".into()).is_retryable());
    }

    #[test]
    fn records_url_is_normalized() {
        let api = HttpRecordsApi::new("https://api.example.com/").unwrap();
        assert_eq!(api.records_url(), "https://api.example.com/records");
    }
}
