//! # Vitalsync Model
//!
//! Core data model for the vitalsync sync and orchestration engine.
//!
//! This crate provides:
//! - `HealthRecord` and the query types that drive paginated fetching
//! - The sync error taxonomy (`SyncError`, `SyncErrorKind`)
//! - Live status and history types (`SyncStatus`, `SyncMetadata`)
//! - Workflow state types (`WorkflowState`, `WorkflowStepState`)
//! - `StatusChannel`, a single-writer broadcast with replay of the
//!   latest value to late subscribers
//!
//! This is a pure model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod error;
mod record;
mod status;
mod workflow;

pub use channel::{StatusChannel, StatusReceiver};
pub use error::{SyncError, SyncErrorEntry, SyncErrorKind, SyncResult};
pub use record::{HealthRecord, PageQuery, SyncOptions, SyncWindow};
pub use status::{SyncHistoryEntry, SyncMetadata, SyncStatus};
pub use workflow::{StepStatus, WorkflowState, WorkflowStatus, WorkflowStepState};
