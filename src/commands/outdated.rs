use anyhow::Result;
use log::debug;

use crate::registry::{RegistrySnapshot, UpgradeCandidate, compute_upgrades, is_installed};
use crate::runtime::Runtime;
use crate::store::load_snapshot;

use super::config::Config;

/// Print installed packages that have a newer version available.
#[tracing::instrument(skip(runtime, config))]
pub fn outdated<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let installed = load_snapshot(runtime, &config.installed_path)?;
    let available = load_snapshot(runtime, &config.available_path)?;

    let upgrades = outstanding_upgrades(&installed, &available)?;
    if upgrades.is_empty() {
        println!("All packages are up to date.");
        return Ok(());
    }

    for upgrade in &upgrades {
        println!("{}", upgrade_line(upgrade));
    }
    Ok(())
}

/// Upgrades whose target version is not installed yet.
///
/// After `upgrade --keep-old` both the old and the new version are recorded,
/// and the old one still pairs with the newest available version.
pub(crate) fn outstanding_upgrades(
    installed: &RegistrySnapshot,
    available: &RegistrySnapshot,
) -> Result<Vec<UpgradeCandidate>> {
    let mut upgrades = Vec::new();
    for upgrade in compute_upgrades(None, installed, available)? {
        if is_installed(&upgrade.available, installed)? {
            debug!(
                "{} is already installed, skipping",
                upgrade.available.full_name()
            );
            continue;
        }
        upgrades.push(upgrade);
    }
    Ok(upgrades)
}

pub(crate) fn upgrade_line(upgrade: &UpgradeCandidate) -> String {
    format!(
        "{} {} -> {}",
        upgrade.installed.name, upgrade.installed.version, upgrade.available.version
    )
}
