//! Reset command implementation.

use std::path::Path;
use std::sync::Arc;
use tracing::info;
use vitalsync_engine::{FileKeyValueStore, WatermarkStore};

/// Clears the watermark and metadata.
pub fn run(state: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileKeyValueStore::open(state)?);
    let watermarks = WatermarkStore::new(store);

    watermarks.reset()?;
    info!("cleared watermark and metadata in {:?}", state);
    println!("State reset; the next sync fetches the initial window.");

    Ok(())
}
