use anyhow::{Result, bail};

use crate::descriptor::Package;
use crate::registry::{find_available, find_installed};
use crate::runtime::Runtime;
use crate::store::load_snapshot;

use super::config::Config;

/// Show installed and available versions of one package.
#[tracing::instrument(skip(runtime, config))]
pub fn show<R: Runtime>(runtime: &R, config: &Config, name: &str) -> Result<()> {
    let installed = load_snapshot(runtime, &config.installed_path)?;
    let available = load_snapshot(runtime, &config.available_path)?;

    let current = find_installed(name, &installed)?;
    let offers = find_available(name, &available)?;
    if current.is_none() && offers.is_empty() {
        bail!("Package {} is neither installed nor available", name);
    }

    print!("{}", render_details(name, current.as_ref(), &offers));
    Ok(())
}

fn render_details(name: &str, current: Option<&Package>, offers: &[Package]) -> String {
    let mut out = format!("Package: {}\n", name);

    let newest = offers.first();
    let status = match (current, newest) {
        (Some(c), Some(n)) if c.version < n.version => {
            format!("installed {} (upgrade available: {})", c.version, n.version)
        }
        (Some(c), _) => format!("installed {}", c.version),
        (None, _) => "not installed".to_string(),
    };
    out.push_str(&format!("Status: {}\n", status));

    // Prefer the installed descriptor; fall back to the newest offer.
    let Some(described) = current.or(newest) else {
        return out;
    };
    if let Some(summary) = &described.summary {
        out.push_str(&format!("Summary: {}\n", summary));
    }
    if let Some(dir) = current.and_then(|c| c.install_dir.as_ref()) {
        out.push_str(&format!("Directory: {}\n", dir.display()));
    }
    if !described.requirements.is_empty() {
        let reqs: Vec<String> = described.requirements.iter().map(|r| r.to_string()).collect();
        out.push_str(&format!("Requires: {}\n", reqs.join(", ")));
    }
    if !offers.is_empty() {
        let versions: Vec<String> = offers
            .iter()
            .map(|p| match &p.archive {
                Some(archive) => format!("{} ({})", p.version, archive),
                None => p.version.to_string(),
            })
            .collect();
        out.push_str(&format!("Available: {}\n", versions.join(", ")));
    }
    out
}
