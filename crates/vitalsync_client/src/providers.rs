//! Collaborator contracts supplied by the embedding application.

use async_trait::async_trait;
use vitalsync_model::SyncResult;

/// Supplies the bearer credential for remote API requests.
///
/// The fetcher calls this before every underlying request, so a provider
/// that refreshes tokens transparently will always be consulted. Returning
/// `Ok(None)` means no credential is available, which the fetcher treats
/// as a non-retryable authentication failure.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the current access token, refreshing it if necessary.
    async fn access_token(&self) -> SyncResult<Option<String>>;
}

/// Reports whether the device currently has network connectivity.
///
/// Polled by the orchestrator before each sync attempt; the detection
/// mechanism is the embedder's concern.
#[async_trait]
pub trait ConnectivityProvider: Send + Sync {
    /// Returns true if the device is online.
    async fn is_online(&self) -> bool;
}
