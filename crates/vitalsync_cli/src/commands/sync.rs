//! Sync command implementation.

use std::path::Path;
use tracing::info;

/// Runs one incremental sync and prints the outcome.
pub async fn run(
    state: &Path,
    server: &str,
    types: Option<&str>,
    batch_size: u32,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = super::build_orchestrator(state, server, types, batch_size, output)?;

    info!("starting sync against {server}");
    let status = orchestrator.perform_sync().await;

    println!("Synced:     {}", status.items_synced);
    println!("Failed:     {}", status.items_failed);
    if let Some(at) = status.last_sync_time {
        println!("Finished:   {}", at.to_rfc3339());
    }

    for error in &status.errors {
        eprintln!("error [{:?}]: {}", error.kind, error.message);
    }

    if status.has_errors() && status.items_synced == 0 {
        return Err("sync failed; see errors above".into());
    }

    Ok(())
}
