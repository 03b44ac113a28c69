//! Error taxonomy shared by the sync pipeline and the workflow engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Coarse error classification surfaced to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncErrorKind {
    /// Credential missing or rejected; retrying cannot fix it.
    #[serde(rename = "AUTH_ERROR")]
    Auth,
    /// Connectivity or server-side failure.
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    /// Failure scoped to storing a single record.
    #[serde(rename = "STORAGE_ERROR")]
    Storage,
    /// A request or step exceeded its deadline.
    #[serde(rename = "TIMEOUT")]
    Timeout,
    /// Fallback for anything unclassified.
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

/// Errors that can occur during sync and workflow operations.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Authentication failed or no credential was available.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network or remote-server error.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
        /// HTTP status code, if the request reached the server.
        status: Option<u16>,
        /// Whether the request can be retried.
        retryable: bool,
    },

    /// Failure storing one record; does not abort the batch.
    #[error("storage error for record {record_id}: {message}")]
    Storage {
        /// Identifier of the offending record.
        record_id: String,
        /// Error message.
        message: String,
    },

    /// The operation exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Anything that does not fit the taxonomy.
    #[error("{0}")]
    Unknown(String),
}

impl SyncError {
    /// Creates an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a retryable network error (connectivity loss, 5xx).
    pub fn network_retryable(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Network {
            message: message.into(),
            status,
            retryable: true,
        }
    }

    /// Creates a non-retryable network error (4xx rejection).
    pub fn network_fatal(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Network {
            message: message.into(),
            status,
            retryable: false,
        }
    }

    /// Creates a record-scoped storage error.
    pub fn storage(record_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            record_id: record_id.into(),
            message: message.into(),
        }
    }

    /// Creates an unclassified error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Auth(_) => SyncErrorKind::Auth,
            SyncError::Network { .. } => SyncErrorKind::Network,
            SyncError::Storage { .. } => SyncErrorKind::Storage,
            SyncError::Timeout(_) => SyncErrorKind::Timeout,
            SyncError::Cancelled | SyncError::Unknown(_) => SyncErrorKind::Unknown,
        }
    }

    /// Returns true if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network { retryable, .. } => *retryable,
            SyncError::Timeout(_) => true,
            SyncError::Auth(_)
            | SyncError::Storage { .. }
            | SyncError::Cancelled
            | SyncError::Unknown(_) => false,
        }
    }

    /// HTTP status code carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SyncError::Network { status, .. } => *status,
            _ => None,
        }
    }
}

/// A timestamped, serializable projection of a [`SyncError`] kept in
/// status and history lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncErrorEntry {
    /// When the error occurred.
    pub at: DateTime<Utc>,
    /// Human-readable message.
    pub message: String,
    /// Taxonomy bucket.
    pub kind: SyncErrorKind,
    /// Whether retrying may succeed.
    pub retryable: bool,
    /// HTTP status code, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl SyncErrorEntry {
    /// Attaches structured detail to the entry.
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl From<&SyncError> for SyncErrorEntry {
    fn from(error: &SyncError) -> Self {
        Self {
            at: Utc::now(),
            message: error.to_string(),
            kind: error.kind(),
            retryable: error.is_retryable(),
            status: error.status_code(),
            detail: None,
        }
    }
}
