//! Installer collaborator used by [`apply_upgrades`](crate::registry::apply_upgrades).
//!
//! [`DirectoryInstaller`] keeps one directory per installed version under
//! `<root>/packages/<name>-<version>/`, writes the package's descriptor there
//! as `<name>-pkg.json`, and records it in the installed snapshot. Fetching
//! package contents is left to whatever populates the directory afterwards.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::descriptor::{Package, StructuredDescriptor};
use crate::registry::parse_registry_entry;
use crate::runtime::Runtime;
use crate::store::{load_snapshot, save_snapshot};

#[cfg_attr(test, mockall::automock)]
pub trait Installer {
    /// Install `package`. With `force`, an existing installation of the same
    /// version is replaced instead of rejected.
    fn install(&self, package: &Package, force: bool) -> Result<()>;

    /// Remove an installed `package`.
    fn delete(&self, package: &Package) -> Result<()>;
}

pub struct DirectoryInstaller<'a, R: Runtime> {
    runtime: &'a R,
    packages_dir: PathBuf,
    installed_path: PathBuf,
}

impl<'a, R: Runtime> DirectoryInstaller<'a, R> {
    pub fn new(runtime: &'a R, packages_dir: PathBuf, installed_path: PathBuf) -> Self {
        Self {
            runtime,
            packages_dir,
            installed_path,
        }
    }

    /// `<packages_dir>/<name>-<version>`
    pub fn package_dir(&self, package: &Package) -> PathBuf {
        self.packages_dir.join(package.full_name())
    }

    fn descriptor_path(dir: &Path, package: &Package) -> PathBuf {
        dir.join(format!("{}-pkg.json", package.name))
    }

    /// Directory of an installed version equal to `package`'s. Equal versions
    /// may be spelled differently (`1` and `1.0`), so this can differ from
    /// [`package_dir`](Self::package_dir).
    fn recorded_dir(&self, package: &Package) -> Result<Option<PathBuf>> {
        let snapshot = load_snapshot(self.runtime, &self.installed_path)?;
        let Some(raw) = snapshot.entry(&package.name) else {
            return Ok(None);
        };
        Ok(parse_registry_entry(&package.name, raw)?
            .into_iter()
            .find(|p| p.version == package.version)
            .map(|p| p.install_dir.clone().unwrap_or_else(|| self.package_dir(&p))))
    }

    /// Installed versions of `name` after `edit`, written back as structured
    /// descriptors (newest first). The entry is dropped when none remain.
    fn update_entry<F>(&self, name: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Package>) -> Result<()>,
    {
        let mut snapshot = load_snapshot(self.runtime, &self.installed_path)?;
        let mut versions = match snapshot.entry(name) {
            Some(raw) => parse_registry_entry(name, raw)?,
            None => vec![],
        };

        edit(&mut versions)?;

        if versions.is_empty() {
            snapshot.remove_entry(name);
        } else {
            versions.sort_by(|a, b| b.version.cmp(&a.version));
            let entry = versions
                .iter()
                .map(|p| serde_json::to_value(StructuredDescriptor::from(p)))
                .collect::<serde_json::Result<Vec<Value>>>()?;
            snapshot.set_entry(name, Value::Array(entry));
        }

        save_snapshot(self.runtime, &self.installed_path, &snapshot)
    }
}

impl<R: Runtime> Installer for DirectoryInstaller<'_, R> {
    #[tracing::instrument(skip(self, package), fields(package = %package.full_name()))]
    fn install(&self, package: &Package, force: bool) -> Result<()> {
        let dir = self.package_dir(package);

        if self.runtime.exists(&dir) {
            if !force {
                bail!(
                    "{} is already installed in {}",
                    package.full_name(),
                    dir.display()
                );
            }
            debug!("Replacing existing installation at {}", dir.display());
            self.runtime.remove_dir_all(&dir)?;
        }

        if let Some(previous) = self.recorded_dir(package)?
            && previous != dir
            && self.runtime.is_dir(&previous)
        {
            if !force {
                bail!(
                    "{} is already installed in {}",
                    package.full_name(),
                    previous.display()
                );
            }
            debug!("Replacing existing installation at {}", previous.display());
            self.runtime.remove_dir_all(&previous)?;
        }

        self.runtime.create_dir_all(&dir)?;

        let installed = Package {
            install_dir: Some(dir.clone()),
            ..package.clone()
        };
        let descriptor = serde_json::to_string_pretty(&StructuredDescriptor::from(&installed))?;
        self.runtime
            .write(&Self::descriptor_path(&dir, package), descriptor.as_bytes())
            .with_context(|| format!("Failed to write descriptor for {}", package.full_name()))?;

        self.update_entry(&package.name, |versions| {
            versions.retain(|p| p.version != installed.version);
            versions.push(installed.clone());
            Ok(())
        })?;

        info!("Installed {} into {}", package.full_name(), dir.display());
        Ok(())
    }

    #[tracing::instrument(skip(self, package), fields(package = %package.full_name()))]
    fn delete(&self, package: &Package) -> Result<()> {
        let mut removed = None;
        self.update_entry(&package.name, |versions| {
            let index = versions
                .iter()
                .position(|p| p.version == package.version)
                .with_context(|| format!("{} is not installed", package.full_name()))?;
            removed = Some(versions.remove(index));
            Ok(())
        })?;

        let dir = removed
            .and_then(|p| p.install_dir)
            .unwrap_or_else(|| self.package_dir(package));
        if self.runtime.is_dir(&dir) {
            self.runtime.remove_dir_all(&dir)?;
        }

        info!("Deleted {}", package.full_name());
        Ok(())
    }
}
