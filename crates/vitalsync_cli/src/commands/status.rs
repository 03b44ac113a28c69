//! Status command implementation.

use std::path::Path;
use std::sync::Arc;
use vitalsync_engine::{FileKeyValueStore, WatermarkStore};

/// Prints the watermark, running totals, and recent history.
pub fn run(state: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileKeyValueStore::open(state)?);
    let watermarks = WatermarkStore::new(store);

    let watermark = watermarks.watermark()?;
    let metadata = watermarks.metadata()?;

    if format == "json" {
        let out = serde_json::json!({
            "watermark": watermark.map(|w| w.to_rfc3339()),
            "metadata": metadata,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match watermark {
        Some(w) => println!("Watermark:     {}", w.to_rfc3339()),
        None => println!("Watermark:     (none - next sync fetches the initial window)"),
    }
    println!("Total synced:  {}", metadata.total_items_synced);
    match metadata.last_sync_timestamp {
        Some(at) => println!("Last success:  {}", at.to_rfc3339()),
        None => println!("Last success:  (never)"),
    }

    if !metadata.history.is_empty() {
        println!("\nRecent runs (most recent first):");
        for entry in &metadata.history {
            let result = if entry.success { "ok" } else { "failed" };
            let detail = entry.error.as_deref().unwrap_or("");
            println!(
                "  {}  {:>6}  {:>5} items  {:>6}ms  {}",
                entry.completed_at.to_rfc3339(),
                result,
                entry.items_synced,
                entry.duration_ms,
                detail
            );
        }
    }

    Ok(())
}
