//! # Vitalsync Client
//!
//! Remote records API client and paginated fetcher.
//!
//! This crate provides:
//! - `RecordsApi`, the transport seam for the remote time-series endpoint,
//!   with HTTP and mock implementations
//! - `AuthProvider` and `ConnectivityProvider` collaborator contracts
//! - Retry with exponential backoff for retryable failures
//! - `PaginatedFetcher`, which accumulates pages until exhaustion
//!
//! The engine never talks HTTP directly; it drives `PaginatedFetcher`,
//! which in turn drives whatever `RecordsApi` implementation it was built
//! with. Tests use `MockRecordsApi`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod fetcher;
mod http;
mod providers;
mod retry;

pub use api::{MockRecordsApi, RecordsApi};
pub use fetcher::PaginatedFetcher;
pub use http::HttpRecordsApi;
pub use providers::{AuthProvider, ConnectivityProvider};
pub use retry::{retry_request, RetryConfig};
