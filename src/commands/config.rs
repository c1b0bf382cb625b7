use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Resolved locations of the install root and the two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub root: PathBuf,
    pub installed_path: PathBuf,
    pub available_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct UpgradeOptions {
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Keep the superseded versions installed
    pub keep_old: bool,
}

impl Config {
    /// Resolve paths from CLI values. `root` already carries `PKGSHIM_ROOT`
    /// when the flag is absent (clap reads it); otherwise the per-user data
    /// directory is used.
    pub fn new<R: Runtime>(
        runtime: &R,
        root: Option<PathBuf>,
        installed: Option<PathBuf>,
        available: Option<PathBuf>,
    ) -> Result<Self> {
        let root = match root {
            Some(path) => path,
            None => default_root(runtime)?,
        };
        debug!("Using install root {}", root.display());

        Ok(Self {
            installed_path: installed.unwrap_or_else(|| root.join("installed.json")),
            available_path: available.unwrap_or_else(|| root.join("archive-contents.json")),
            root,
        })
    }

    /// Directory holding one subdirectory per installed version.
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    #[cfg(test)]
    pub fn for_test(root: PathBuf) -> Self {
        Self {
            installed_path: root.join("installed.json"),
            available_path: root.join("archive-contents.json"),
            root,
        }
    }
}

fn default_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let data_dir = runtime
        .data_dir()
        .context("Could not find a data directory; pass --root or set PKGSHIM_ROOT")?;
    Ok(data_dir.join("pkgshim"))
}
