//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::{debug, warn};

/// Ensure the directory holding the counter record exists.
///
/// A bare file name (no parent component) needs nothing created.
pub async fn ensure_data_dir(record_path: &Path) -> anyhow::Result<()> {
    let Some(dir) = record_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        debug!(path = %record_path.display(), "record lives in working directory");
        return Ok(());
    };
    if tokio::fs::metadata(dir).await.is_err() {
        warn!(dir = %dir.display(), "data directory not found; creating it");
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    Ok(())
}
