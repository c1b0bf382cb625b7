use anyhow::Result;
use log::debug;

use crate::descriptor::Package;
use crate::registry::{list_available, list_installed};
use crate::runtime::Runtime;
use crate::store::load_snapshot;

use super::config::Config;

/// List installed packages, or the archive's packages with `available`.
#[tracing::instrument(skip(runtime, config))]
pub fn list<R: Runtime>(runtime: &R, config: &Config, available: bool) -> Result<()> {
    let packages = if available {
        list_available(&load_snapshot(runtime, &config.available_path)?)?
    } else {
        list_installed(&load_snapshot(runtime, &config.installed_path)?)?
    };

    if packages.is_empty() {
        if available {
            println!("No packages available.");
        } else {
            println!("No packages installed.");
        }
        return Ok(());
    }

    debug!("Found {} package(s)", packages.len());
    for package in &packages {
        println!("{}", package_line(package));
    }
    Ok(())
}

/// `name version` followed by the summary when there is one.
pub(crate) fn package_line(package: &Package) -> String {
    match package.summary.as_deref() {
        Some(summary) if !summary.trim().is_empty() => {
            format!("{} {}  {}", package.name, package.version, summary)
        }
        _ => format!("{} {}", package.name, package.version),
    }
}
