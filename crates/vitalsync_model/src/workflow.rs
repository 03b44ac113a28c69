//! Workflow and step state types for the saga engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a workflow invocation.
///
/// Transitions are forward-only: `pending -> running -> completed` when no
/// critical step fails, or `running -> compensating -> failed` when one
/// does. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    /// Created but not yet started.
    Pending,
    /// Steps are executing.
    Running,
    /// All critical steps succeeded.
    Completed,
    /// A critical step failed and compensation has finished.
    Failed,
    /// Completed steps are being rolled back.
    Compensating,
}

impl WorkflowStatus {
    /// Returns true for terminal states that never regress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }

    /// Returns true if moving to `next` is a valid forward transition.
    pub fn can_transition(&self, next: WorkflowStatus) -> bool {
        matches!(
            (self, next),
            (WorkflowStatus::Pending, WorkflowStatus::Running)
                | (WorkflowStatus::Running, WorkflowStatus::Completed)
                | (WorkflowStatus::Running, WorkflowStatus::Compensating)
                | (WorkflowStatus::Compensating, WorkflowStatus::Failed)
        )
    }
}

/// Status of a single step within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not yet reached.
    Pending,
    /// An attempt is in flight.
    Running,
    /// The action succeeded.
    Completed,
    /// All attempts were exhausted.
    Failed,
    /// Skipped because a non-critical dependency was unavailable.
    Skipped,
}

/// Recorded state of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepState {
    /// Step name, unique within the workflow.
    pub name: String,
    /// Current status.
    pub status: StepStatus,
    /// When the first attempt started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the step reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Result recorded on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error message recorded on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of attempts beyond the first.
    pub retry_count: u32,
}

impl WorkflowStepState {
    /// Creates a pending step state.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
            retry_count: 0,
        }
    }
}

/// Full state of one workflow invocation, published on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    /// Unique invocation identifier.
    pub id: Uuid,
    /// Workflow type (e.g. "onboarding", "full_sync").
    pub kind: String,
    /// Current status.
    pub status: WorkflowStatus,
    /// Per-step states, in execution order.
    pub steps: Vec<WorkflowStepState>,
    /// When execution started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the workflow reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Terminating error, if the workflow failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Aggregated step results, if the workflow completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl WorkflowState {
    /// Creates a pending workflow state with the given step names.
    pub fn new(id: Uuid, kind: impl Into<String>, step_names: &[&str]) -> Self {
        Self {
            id,
            kind: kind.into(),
            status: WorkflowStatus::Pending,
            steps: step_names
                .iter()
                .map(|name| WorkflowStepState::pending(*name))
                .collect(),
            started_at: None,
            finished_at: None,
            error: None,
            result: None,
        }
    }

    /// Moves to `next` if that is a valid forward transition.
    ///
    /// Returns false (leaving the state untouched) otherwise.
    pub fn transition(&mut self, next: WorkflowStatus) -> bool {
        if self.status.can_transition(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Names of steps currently in the given status, in execution order.
    pub fn steps_with_status(&self, status: StepStatus) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|step| step.status == status)
            .map(|step| step.name.as_str())
            .collect()
    }
}
