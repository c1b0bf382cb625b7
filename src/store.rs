//! Loading and saving registry snapshot files.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use crate::registry::RegistrySnapshot;
use crate::runtime::Runtime;

/// Load a snapshot from `path`. A missing file is an empty snapshot.
#[tracing::instrument(skip(runtime))]
pub fn load_snapshot<R: Runtime>(runtime: &R, path: &Path) -> Result<RegistrySnapshot> {
    if !runtime.exists(path) {
        debug!("No snapshot at {}, treating as empty", path.display());
        return Ok(RegistrySnapshot::new());
    }

    let content = runtime.read_to_string(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

/// Write `snapshot` to `path` through a temporary file and a rename.
#[tracing::instrument(skip(runtime, snapshot))]
pub fn save_snapshot<R: Runtime>(
    runtime: &R,
    path: &Path,
    snapshot: &RegistrySnapshot,
) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !runtime.exists(parent)
    {
        runtime.create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    runtime.write(&tmp, content.as_bytes())?;
    runtime
        .rename(&tmp, path)
        .with_context(|| format!("Failed to save snapshot to {}", path.display()))?;

    debug!("Saved {} entries to {}", snapshot.len(), path.display());
    Ok(())
}
