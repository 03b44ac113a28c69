//! The workflow step model.

use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use vitalsync_model::SyncResult;

/// Boxed future returned by step closures.
pub type StepFuture = Pin<Box<dyn Future<Output = SyncResult<serde_json::Value>> + Send>>;

/// Shared context passed to every action in one workflow invocation.
///
/// Carries the invocation id and the results of previously completed
/// steps, keyed by step name. Cloning is cheap; all clones observe the
/// same result map. Nothing else is implicitly captured, so concurrent
/// workflow invocations cannot leak state into each other.
#[derive(Clone)]
pub struct StepContext {
    workflow_id: Uuid,
    results: Arc<RwLock<serde_json::Map<String, serde_json::Value>>>,
}

impl StepContext {
    /// Creates an empty context for a workflow invocation.
    pub fn new(workflow_id: Uuid) -> Self {
        Self {
            workflow_id,
            results: Arc::new(RwLock::new(serde_json::Map::new())),
        }
    }

    /// The invocation this context belongs to.
    pub fn workflow_id(&self) -> Uuid {
        self.workflow_id
    }

    /// The recorded result of an earlier step, if it completed.
    pub fn result(&self, step_name: &str) -> Option<serde_json::Value> {
        self.results.read().get(step_name).cloned()
    }

    /// Snapshot of all recorded results.
    pub fn results(&self) -> serde_json::Map<String, serde_json::Value> {
        self.results.read().clone()
    }

    pub(crate) fn record_result(&self, step_name: &str, value: serde_json::Value) {
        self.results.write().insert(step_name.to_string(), value);
    }
}

/// A capability an action or compensation implements.
#[async_trait::async_trait]
pub trait StepAction: Send + Sync {
    /// Runs the action against the shared context.
    async fn run(&self, ctx: StepContext) -> SyncResult<serde_json::Value>;
}

struct FnAction<F>(F);

#[async_trait::async_trait]
impl<F> StepAction for FnAction<F>
where
    F: Fn(StepContext) -> StepFuture + Send + Sync,
{
    async fn run(&self, ctx: StepContext) -> SyncResult<serde_json::Value> {
        (self.0)(ctx).await
    }
}

/// Builds a step action from a closure returning a boxed future.
///
/// ```ignore
/// let action = step_fn(|_ctx| Box::pin(async { Ok(serde_json::json!({"ok": true})) }));
/// ```
pub fn step_fn<F>(f: F) -> Arc<dyn StepAction>
where
    F: Fn(StepContext) -> StepFuture + Send + Sync + 'static,
{
    Arc::new(FnAction(f))
}

/// One declarative step in a workflow.
#[derive(Clone)]
pub struct WorkflowStep {
    /// Step name, unique within the workflow.
    pub name: String,
    /// Named service this step depends on.
    pub service: String,
    /// The primary action.
    pub action: Arc<dyn StepAction>,
    /// Optional compensating action, run during rollback.
    pub compensation: Option<Arc<dyn StepAction>>,
    /// Whether failed attempts may be retried.
    pub retryable: bool,
    /// Whether exhausted attempts abort the whole workflow.
    pub critical: bool,
    /// Per-attempt deadline; the engine default applies when unset.
    pub timeout: Option<Duration>,
}

impl WorkflowStep {
    /// Creates a critical, non-retryable step with no compensation.
    pub fn new(
        name: impl Into<String>,
        service: impl Into<String>,
        action: Arc<dyn StepAction>,
    ) -> Self {
        Self {
            name: name.into(),
            service: service.into(),
            action,
            compensation: None,
            retryable: false,
            critical: true,
            timeout: None,
        }
    }

    /// Attaches a compensating action.
    pub fn with_compensation(mut self, compensation: Arc<dyn StepAction>) -> Self {
        self.compensation = Some(compensation);
        self
    }

    /// Marks the step retryable or not.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Marks the step critical or not.
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// Sets a per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStep")
            .field("name", &self.name)
            .field("service", &self.service)
            .field("has_compensation", &self.compensation.is_some())
            .field("retryable", &self.retryable)
            .field("critical", &self.critical)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn step_fn_runs_the_closure() {
        let action = step_fn(|_ctx| Box::pin(async { Ok(serde_json::json!(7)) }));
        let result = action.run(StepContext::new(Uuid::new_v4())).await.unwrap();
        assert_eq!(result, serde_json::json!(7));
    }

    #[tokio::test]
    async fn context_shares_results_across_clones() {
        let ctx = StepContext::new(Uuid::new_v4());
        let clone = ctx.clone();

        ctx.record_result("reserve", serde_json::json!({"slot": 3}));
        assert_eq!(clone.result("reserve").unwrap()["slot"], 3);
        assert!(clone.result("missing").is_none());
    }

    #[tokio::test]
    async fn actions_can_read_prior_results() {
        let ctx = StepContext::new(Uuid::new_v4());
        ctx.record_result("first", serde_json::json!(2));

        let action = step_fn(|ctx| {
            Box::pin(async move {
                let prior = ctx.result("first").and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(serde_json::json!(prior * 2))
            })
        });

        assert_eq!(action.run(ctx).await.unwrap(), serde_json::json!(4));
    }

    #[test]
    fn builder_defaults_are_critical_and_non_retryable() {
        let step = WorkflowStep::new("a", "svc", step_fn(|_| Box::pin(async { Ok(0.into()) })));
        assert!(step.critical);
        assert!(!step.retryable);
        assert!(step.compensation.is_none());
        assert!(step.timeout.is_none());

        let step = step
            .with_retryable(true)
            .with_critical(false)
            .with_timeout(Duration::from_secs(5));
        assert!(step.retryable);
        assert!(!step.critical);
        assert_eq!(step.timeout, Some(Duration::from_secs(5)));
    }
}
