//! Sequential saga execution with compensation.

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::registry::WorkflowRegistry;
use crate::step::{StepContext, WorkflowStep};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vitalsync_model::{StepStatus, SyncError, SyncResult, WorkflowState, WorkflowStatus};

/// Reports whether a named service is currently healthy.
///
/// Consulted before every step; the health-check mechanism is the
/// embedder's concern.
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    /// Returns true if the named service can be called right now.
    async fn is_available(&self, service: &str) -> bool;
}

/// Result of one workflow invocation.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    /// True unless a critical step failed.
    pub success: bool,
    /// Aggregated step results, present on success.
    pub result: Option<serde_json::Value>,
    /// Terminating error description, present on failure.
    pub error: Option<String>,
    /// Final recorded state.
    pub state: WorkflowState,
}

/// Executes workflows as sequential sagas.
///
/// Steps run strictly one after another: later steps may depend on the
/// side effects of earlier ones, and compensation ordering must stay
/// deterministic. Distinct invocations may interleave freely; each is
/// tracked under its own id in the engine's registry.
///
/// A step attempt is bounded by its timeout; on expiry the attempt's
/// future is dropped, so an abandoned attempt cannot mutate engine state
/// afterwards. The remote side of a timed-out call is not cancelled.
pub struct WorkflowEngine {
    availability: Arc<dyn AvailabilityProvider>,
    config: WorkflowConfig,
    registry: Arc<WorkflowRegistry>,
    cancelled: AtomicBool,
}

impl WorkflowEngine {
    /// Creates an engine with its own registry.
    pub fn new(availability: Arc<dyn AvailabilityProvider>, config: WorkflowConfig) -> Self {
        let registry = Arc::new(WorkflowRegistry::new(config.history_cap));
        Self {
            availability,
            config,
            registry,
            cancelled: AtomicBool::new(false),
        }
    }

    /// The registry tracking in-flight and finished workflows.
    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    /// Requests cancellation; every in-flight workflow aborts before its
    /// next step and compensates what already completed.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clears a previous cancellation request.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Executes the given steps in order as one workflow invocation.
    pub async fn execute(&self, kind: &str, steps: Vec<WorkflowStep>) -> WorkflowOutcome {
        let id = Uuid::new_v4();
        let step_names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
        let mut state = WorkflowState::new(id, kind, &step_names);
        let channel = self.registry.register(state.clone());

        info!(%id, kind, steps = steps.len(), "starting workflow");

        state.transition(WorkflowStatus::Running);
        state.started_at = Some(Utc::now());
        channel.publish(state.clone());

        let ctx = StepContext::new(id);
        let mut completed: Vec<usize> = Vec::new();
        let mut failure: Option<WorkflowError> = None;

        for (index, step) in steps.iter().enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                failure = Some(WorkflowError::Cancelled);
                break;
            }

            if !self.availability.is_available(&step.service).await {
                if step.critical {
                    warn!(
                        step = %step.name,
                        service = %step.service,
                        "critical dependency unavailable; aborting workflow"
                    );
                    let error = WorkflowError::ServiceUnavailable(step.service.clone());
                    let step_state = &mut state.steps[index];
                    step_state.status = StepStatus::Failed;
                    step_state.error = Some(error.to_string());
                    step_state.finished_at = Some(Utc::now());
                    channel.publish(state.clone());
                    failure = Some(error);
                    break;
                }

                debug!(
                    step = %step.name,
                    service = %step.service,
                    "dependency unavailable; skipping non-critical step"
                );
                let step_state = &mut state.steps[index];
                step_state.status = StepStatus::Skipped;
                step_state.finished_at = Some(Utc::now());
                channel.publish(state.clone());
                continue;
            }

            {
                let step_state = &mut state.steps[index];
                step_state.status = StepStatus::Running;
                step_state.started_at = Some(Utc::now());
            }
            channel.publish(state.clone());

            let (outcome, attempts) = self.run_step(step, ctx.clone()).await;
            let step_state = &mut state.steps[index];
            step_state.retry_count = attempts.saturating_sub(1);
            step_state.finished_at = Some(Utc::now());

            match outcome {
                Ok(value) => {
                    step_state.status = StepStatus::Completed;
                    step_state.result = Some(value.clone());
                    ctx.record_result(&step.name, value);
                    completed.push(index);
                    channel.publish(state.clone());
                }
                Err(error) => {
                    step_state.status = StepStatus::Failed;
                    step_state.error = Some(error.to_string());
                    channel.publish(state.clone());

                    if step.critical {
                        failure = Some(WorkflowError::StepFailed {
                            step: step.name.clone(),
                            attempts,
                            source: error,
                        });
                        break;
                    }
                    debug!(step = %step.name, "non-critical step failed; continuing");
                }
            }
        }

        let outcome = match failure {
            None => {
                state.transition(WorkflowStatus::Completed);
                state.finished_at = Some(Utc::now());
                state.result = Some(serde_json::Value::Object(ctx.results()));
                channel.publish(state.clone());
                info!(%id, "workflow completed");
                WorkflowOutcome {
                    success: true,
                    result: state.result.clone(),
                    error: None,
                    state: state.clone(),
                }
            }
            Some(error) => {
                state.transition(WorkflowStatus::Compensating);
                channel.publish(state.clone());
                self.compensate(&steps, &completed, &ctx).await;

                state.transition(WorkflowStatus::Failed);
                state.error = Some(error.to_string());
                state.finished_at = Some(Utc::now());
                channel.publish(state.clone());
                warn!(%id, error = %error, "workflow failed");
                WorkflowOutcome {
                    success: false,
                    result: None,
                    error: Some(error.to_string()),
                    state: state.clone(),
                }
            }
        };

        self.registry.complete(state);
        outcome
    }

    /// Runs one step to a terminal per-step outcome.
    ///
    /// Returns the final result and the number of attempts made. A timed
    /// out attempt counts as a failed attempt.
    async fn run_step(
        &self,
        step: &WorkflowStep,
        ctx: StepContext,
    ) -> (SyncResult<serde_json::Value>, u32) {
        let max_attempts = if step.retryable {
            self.config.max_attempts
        } else {
            1
        };
        let timeout = step.timeout.unwrap_or(self.config.default_timeout);
        let mut last_error = SyncError::unknown("step was never attempted");

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.config.backoff_delay(attempt);
                debug!(step = %step.name, attempt, ?delay, "retrying step after backoff");
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(timeout, step.action.run(ctx.clone())).await {
                Ok(Ok(value)) => return (Ok(value), attempt),
                Ok(Err(error)) => {
                    warn!(step = %step.name, attempt, error = %error, "step attempt failed");
                    last_error = error;
                }
                Err(_) => {
                    warn!(step = %step.name, attempt, ?timeout, "step attempt timed out");
                    last_error = SyncError::Timeout(timeout);
                }
            }
        }

        (Err(last_error), max_attempts)
    }

    /// Rolls back completed steps in exact reverse completion order.
    ///
    /// A failing compensation is logged and does not stop the rollback of
    /// earlier steps.
    async fn compensate(&self, steps: &[WorkflowStep], completed: &[usize], ctx: &StepContext) {
        for &index in completed.iter().rev() {
            let step = &steps[index];
            let Some(compensation) = &step.compensation else {
                continue;
            };

            info!(step = %step.name, "compensating completed step");
            if let Err(error) = compensation.run(ctx.clone()).await {
                warn!(
                    step = %step.name,
                    error = %error,
                    "compensation failed; continuing rollback"
                );
            }
        }
    }
}
