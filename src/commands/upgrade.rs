use anyhow::{Context, Result};
use log::warn;

use crate::installer::{DirectoryInstaller, Installer};
use crate::registry::{
    RegistrySnapshot, UpgradeCandidate, apply_upgrades, filter_upgrades, is_installed,
};
use crate::runtime::Runtime;
use crate::store::load_snapshot;

use super::config::{Config, UpgradeOptions};
use super::outdated::{outstanding_upgrades, upgrade_line};

/// Upgrade installed packages (all of them, or only `names`).
#[tracing::instrument(skip(runtime, config, names, options))]
pub fn upgrade<R: Runtime>(
    runtime: &R,
    config: &Config,
    names: Vec<String>,
    options: UpgradeOptions,
) -> Result<()> {
    let installer = DirectoryInstaller::new(
        runtime,
        config.packages_dir(),
        config.installed_path.clone(),
    );
    run_upgrade(runtime, config, &installer, names, options)
}

fn run_upgrade<R: Runtime, I: Installer>(
    runtime: &R,
    config: &Config,
    installer: &I,
    names: Vec<String>,
    options: UpgradeOptions,
) -> Result<()> {
    let installed = load_snapshot(runtime, &config.installed_path)?;
    let available = load_snapshot(runtime, &config.available_path)?;

    let upgrades = pending_upgrades(&installed, &available, &names)?;
    if upgrades.is_empty() {
        println!("All packages are up to date.");
        return Ok(());
    }

    for upgrade in &upgrades {
        println!("   {}", upgrade_line(upgrade));
    }

    if !options.yes && !runtime.confirm(&format!("Upgrade {} package(s)?", upgrades.len()))? {
        println!("Upgrade cancelled.");
        return Ok(());
    }

    let applied = apply_upgrades(upgrades, installer, options.keep_old)
        .context("Upgrade stopped; packages upgraded before the failure stay upgraded")?;

    println!("\nUpgraded {} package(s).", applied.len());
    Ok(())
}

fn pending_upgrades(
    installed: &RegistrySnapshot,
    available: &RegistrySnapshot,
    names: &[String],
) -> Result<Vec<UpgradeCandidate>> {
    for name in names {
        if !is_installed(name.as_str(), installed)? {
            warn!("{} is not installed, skipping", name);
        }
    }
    Ok(filter_upgrades(
        outstanding_upgrades(installed, available)?,
        names,
    ))
}
