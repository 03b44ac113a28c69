//! # Vitalsync Engine
//!
//! Incremental sync orchestration for vitalsync.
//!
//! This crate provides:
//! - `KeyValueStore` seam with memory and JSON-file backends
//! - `WatermarkStore` for the sync watermark and aggregate metadata
//! - `StorageAdapter`, the idempotent record-persistence seam
//! - `SyncOrchestrator`, which drives one incremental sync run:
//!   connectivity check, window computation, paginated fetch, storage,
//!   watermark advance, history, and live status publication
//!
//! ## Key invariants
//!
//! - At most one sync run is in flight per orchestrator (single-flight)
//! - The watermark only ever moves forward, and only to timestamps
//!   actually observed on fetched records
//! - A run with no new remote data stores nothing and leaves the
//!   watermark untouched
//! - `perform_sync` never raises past its contract: every failure is
//!   captured into the returned `SyncStatus`

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod orchestrator;
mod storage;
mod store;

pub use config::SyncEngineConfig;
pub use orchestrator::SyncOrchestrator;
pub use storage::{MemoryStorageAdapter, RecordStoreError, StorageAdapter, StoreOutcome};
pub use store::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, WatermarkStore, METADATA_KEY,
    WATERMARK_KEY,
};
