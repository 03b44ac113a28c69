//! Workflow-level errors.

use thiserror::Error;
use vitalsync_model::SyncError;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that terminate a workflow.
///
/// Non-critical step failures are absorbed into the step state and never
/// surface here; these are the conditions that trigger compensation.
#[derive(Error, Debug, Clone)]
pub enum WorkflowError {
    /// A critical step's declared service was unavailable.
    #[error("service {0} is unavailable")]
    ServiceUnavailable(String),

    /// A critical step exhausted its attempts.
    #[error("step {step} failed after {attempts} attempt(s): {source}")]
    StepFailed {
        /// Name of the failing step.
        step: String,
        /// Attempts made before giving up.
        attempts: u32,
        /// The last attempt's error.
        #[source]
        source: SyncError,
    },

    /// The workflow was cancelled between steps.
    #[error("workflow cancelled")]
    Cancelled,
}
