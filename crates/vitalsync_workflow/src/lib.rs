//! # Vitalsync Workflow
//!
//! Saga-style workflow engine for multi-service operations.
//!
//! This crate provides:
//! - `WorkflowStep`, a declarative step with a service dependency, an
//!   action, an optional compensating action, retryability, criticality,
//!   and a timeout
//! - `WorkflowEngine`, which executes steps strictly sequentially with
//!   per-step availability checks and retry-with-backoff, and rolls back
//!   completed steps in reverse order when a critical step fails
//! - `WorkflowRegistry`, an owned registry of in-flight workflows with a
//!   bounded history and per-id live status channels
//!
//! ## Key invariants
//!
//! - Steps never run in parallel within one workflow
//! - Compensation runs exactly over the steps that completed, in the
//!   exact reverse of their completion order, best-effort
//! - Workflow states never regress from a terminal state
//! - Non-critical failures never fail the workflow

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod registry;
mod step;

pub use config::WorkflowConfig;
pub use engine::{AvailabilityProvider, WorkflowEngine, WorkflowOutcome};
pub use error::{WorkflowError, WorkflowResult};
pub use registry::WorkflowRegistry;
pub use step::{step_fn, StepAction, StepContext, StepFuture, WorkflowStep};
