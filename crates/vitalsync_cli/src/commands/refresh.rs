//! Refresh command: watermark reset plus resync as a compensable workflow.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use vitalsync_engine::SyncOrchestrator;
use vitalsync_model::SyncError;
use vitalsync_workflow::{
    step_fn, AvailabilityProvider, WorkflowConfig, WorkflowEngine, WorkflowStep,
};

/// The CLI treats every named service as reachable; real health signals
/// belong to the embedding application.
struct AssumeAvailable;

#[async_trait]
impl AvailabilityProvider for AssumeAvailable {
    async fn is_available(&self, _service: &str) -> bool {
        true
    }
}

/// Resets the watermark and resyncs from scratch.
///
/// Runs as a two-step workflow so a failed resync rolls the watermark
/// back to where it was instead of leaving the store empty.
pub async fn run(
    state: &Path,
    server: &str,
    batch_size: u32,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = Arc::new(super::build_orchestrator(
        state, server, None, batch_size, output,
    )?);

    let reset_step = {
        let orchestrator = Arc::clone(&orchestrator);
        let restore = Arc::clone(&orchestrator);
        WorkflowStep::new(
            "reset-watermark",
            "local-store",
            step_fn(move |_| {
                let orchestrator = Arc::clone(&orchestrator);
                Box::pin(async move {
                    let store = orchestrator.watermark_store();
                    let previous = store.watermark()?.map(|w| w.to_rfc3339());
                    store.reset()?;
                    Ok(serde_json::json!({ "previous": previous }))
                })
            }),
        )
        .with_compensation(step_fn(move |ctx| {
            let orchestrator = Arc::clone(&restore);
            Box::pin(async move {
                let previous = ctx
                    .result("reset-watermark")
                    .and_then(|v| v["previous"].as_str().map(String::from));
                if let Some(raw) = previous {
                    let parsed = chrono::DateTime::parse_from_rfc3339(&raw)
                        .map_err(|e| SyncError::unknown(e.to_string()))?;
                    orchestrator
                        .watermark_store()
                        .advance(parsed.with_timezone(&chrono::Utc))?;
                }
                Ok(serde_json::Value::Null)
            })
        }))
    };

    let sync_step = {
        let orchestrator = Arc::clone(&orchestrator);
        WorkflowStep::new(
            "full-sync",
            "records-api",
            step_fn(move |_| {
                let orchestrator = Arc::clone(&orchestrator);
                Box::pin(async move {
                    let status = orchestrator.perform_sync().await;
                    if status.has_errors() && status.items_synced == 0 {
                        let message = status
                            .errors
                            .first()
                            .map(|e| e.message.clone())
                            .unwrap_or_else(|| "sync failed".into());
                        return Err(SyncError::unknown(message));
                    }
                    Ok(serde_json::json!({ "itemsSynced": status.items_synced }))
                })
            }),
        )
    };

    let engine = WorkflowEngine::new(Arc::new(AssumeAvailable), WorkflowConfig::new());

    info!("starting full refresh against {server}");
    let outcome = engine
        .execute("full_refresh", vec![reset_step, sync_step])
        .await;

    if outcome.success {
        let synced = outcome
            .result
            .as_ref()
            .and_then(|r| r["full-sync"]["itemsSynced"].as_u64())
            .unwrap_or_default();
        println!("Refresh complete: {synced} records synced");
        Ok(())
    } else {
        let reason = outcome.error.unwrap_or_else(|| "unknown failure".into());
        Err(format!("refresh failed and was rolled back: {reason}").into())
    }
}
