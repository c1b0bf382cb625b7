//! Registry snapshots, package queries and upgrade computation.
//!
//! Every function takes the snapshots it reads explicitly; nothing here keeps
//! state between calls. Packages are re-parsed from the raw entries on each
//! query.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::descriptor::{Package, parse_named_descriptor};
use crate::error::{Operation, PackageError, Result};
use crate::installer::Installer;

/// Raw package entries keyed by name, in insertion order.
///
/// Used both for the locally installed set and for an archive's contents.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct RegistrySnapshot {
    entries: Map<String, Value>,
}

impl RegistrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry for `name`, if present.
    pub fn entry(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Replace the raw entry for `name`. A new name goes to the end.
    pub fn set_entry(&mut self, name: &str, entry: Value) {
        self.entries.insert(name.to_string(), entry);
    }

    /// Drop the entry for `name`, keeping the order of the others.
    pub fn remove_entry(&mut self, name: &str) -> Option<Value> {
        self.entries.shift_remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Map<String, Value>> for RegistrySnapshot {
    fn from(entries: Map<String, Value>) -> Self {
        RegistrySnapshot { entries }
    }
}

/// An installed package paired with a strictly newer available one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeCandidate {
    pub installed: Package,
    pub available: Package,
}

/// What to look for in [`is_installed`].
#[derive(Debug, Clone, Copy)]
pub enum PackageQuery<'a> {
    /// Any installed version of this name.
    Name(&'a str),
    /// An installed version of this package's name at least as new as it.
    Package(&'a Package),
}

impl<'a> From<&'a str> for PackageQuery<'a> {
    fn from(name: &'a str) -> Self {
        PackageQuery::Name(name)
    }
}

impl<'a> From<&'a Package> for PackageQuery<'a> {
    fn from(package: &'a Package) -> Self {
        PackageQuery::Package(package)
    }
}

/// Parse one registry entry into packages, newest first.
///
/// The entry is either a single descriptor or an array of descriptors. An
/// array is first tried as a single (positional or legacy) descriptor.
pub fn parse_registry_entry(name: &str, raw: &Value) -> Result<Vec<Package>> {
    let mut packages = match parse_named_descriptor(Some(name), raw) {
        Ok(package) => vec![package],
        Err(single_err) => match raw {
            Value::Array(items) if items.iter().all(|i| i.is_array() || i.is_object()) => items
                .iter()
                .map(|item| parse_named_descriptor(Some(name), item))
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(single_err),
        },
    };

    packages.sort_by(|a, b| b.version.cmp(&a.version));
    Ok(packages)
}

fn list_snapshot(snapshot: &RegistrySnapshot) -> Result<Vec<Package>> {
    let mut packages = Vec::new();
    for (name, raw) in &snapshot.entries {
        packages.extend(parse_registry_entry(name, raw)?);
    }
    debug!("Parsed {} package(s) from {} entries", packages.len(), snapshot.len());
    Ok(packages)
}

/// Every installed package, grouped by name in snapshot order.
pub fn list_installed(installed: &RegistrySnapshot) -> Result<Vec<Package>> {
    list_snapshot(installed)
}

/// Every package an archive offers, grouped by name in snapshot order.
pub fn list_available(available: &RegistrySnapshot) -> Result<Vec<Package>> {
    list_snapshot(available)
}

fn find_all(name: &str, snapshot: &RegistrySnapshot) -> Result<Vec<Package>> {
    match snapshot.entry(name) {
        Some(raw) => Ok(parse_registry_entry(name, raw)?
            .into_iter()
            .filter(|p| p.name == name)
            .collect()),
        None => Ok(vec![]),
    }
}

/// Highest installed version of `name`.
pub fn find_installed(name: &str, installed: &RegistrySnapshot) -> Result<Option<Package>> {
    Ok(find_all(name, installed)?.into_iter().next())
}

/// All available versions of `name`, newest first.
pub fn find_available(name: &str, available: &RegistrySnapshot) -> Result<Vec<Package>> {
    find_all(name, available)
}

/// Whether the installed set has `query`.
///
/// For a [`PackageQuery::Package`] an installed version equal to or newer
/// than the package's version already satisfies it.
pub fn is_installed<'a>(
    query: impl Into<PackageQuery<'a>>,
    installed: &RegistrySnapshot,
) -> Result<bool> {
    match query.into() {
        PackageQuery::Name(name) => Ok(find_installed(name, installed)?.is_some()),
        PackageQuery::Package(package) => Ok(find_installed(&package.name, installed)?
            .is_some_and(|found| found.version >= package.version)),
    }
}

/// Pair each candidate with the newest available version when that version
/// is strictly greater. `None` means every installed package.
///
/// Output follows candidate order.
pub fn compute_upgrades(
    candidates: Option<&[Package]>,
    installed: &RegistrySnapshot,
    available: &RegistrySnapshot,
) -> Result<Vec<UpgradeCandidate>> {
    let all_installed;
    let candidates = match candidates {
        Some(c) => c,
        None => {
            all_installed = list_installed(installed)?;
            &all_installed
        }
    };

    let mut upgrades = Vec::new();
    for candidate in candidates {
        let newest = find_available(&candidate.name, available)?.into_iter().next();
        match newest {
            Some(newest) if candidate.version < newest.version => {
                debug!("{} can be upgraded to {}", candidate.full_name(), newest.version);
                upgrades.push(UpgradeCandidate {
                    installed: candidate.clone(),
                    available: newest,
                });
            }
            _ => {}
        }
    }
    Ok(upgrades)
}

/// Keep only upgrades whose package name is in `names`. Empty `names` keeps all.
pub fn filter_upgrades(upgrades: Vec<UpgradeCandidate>, names: &[String]) -> Vec<UpgradeCandidate> {
    if names.is_empty() {
        return upgrades;
    }
    upgrades
        .into_iter()
        .filter(|u| names.iter().any(|n| *n == u.installed.name))
        .collect()
}

/// Install each upgrade's new version, then delete the old one unless
/// `preserve_obsolete` is set.
///
/// Runs strictly in order and stops at the first installer failure. Work
/// already done is not rolled back. Returns the upgrades as given.
pub fn apply_upgrades<I: Installer + ?Sized>(
    upgrades: Vec<UpgradeCandidate>,
    installer: &I,
    preserve_obsolete: bool,
) -> Result<Vec<UpgradeCandidate>> {
    for upgrade in &upgrades {
        installer
            .install(&upgrade.available, true)
            .map_err(|source| PackageError::InstallerFailure {
                package: upgrade.available.full_name(),
                operation: Operation::Install,
                source,
            })?;

        if !preserve_obsolete {
            installer
                .delete(&upgrade.installed)
                .map_err(|source| PackageError::InstallerFailure {
                    package: upgrade.installed.full_name(),
                    operation: Operation::Delete,
                    source,
                })?;
        }
    }
    Ok(upgrades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::MockInstaller;
    use crate::version::Version;
    use mockall::Sequence;
    use serde_json::json;

    fn snapshot(value: Value) -> RegistrySnapshot {
        serde_json::from_value(value).unwrap()
    }

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn versions(packages: &[Package]) -> Vec<String> {
        packages.iter().map(|p| p.version.to_string()).collect()
    }

    #[test]
    fn test_parse_registry_entry_multiple_sorted_descending() {
        let raw = json!([
            {"version": [1, 0]},
            {"version": [1, 10]},
            [[1, 2], [], "positional"],
        ]);
        let packages = parse_registry_entry("foo", &raw).unwrap();

        assert_eq!(versions(&packages), ["1.10", "1.2", "1.0"]);
        assert!(packages.iter().all(|p| p.name == "foo"));
        for pair in packages.windows(2) {
            assert!(pair[1].version < pair[0].version);
        }
    }

    #[test]
    fn test_parse_registry_entry_single_legacy() {
        let raw = json!(["bar", [["baz", "2.0"]], "desc", "1.5", "notes"]);
        let packages = parse_registry_entry("bar", &raw).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].version, v("1.5"));
    }

    #[test]
    fn test_parse_registry_entry_single_positional_is_not_a_sequence() {
        let raw = json!([[2, 0], [["baz", [1]]], "desc"]);
        let packages = parse_registry_entry("foo", &raw).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].requirements[0].name, "baz");
    }

    #[test]
    fn test_parse_registry_entry_empty_sequence() {
        assert!(parse_registry_entry("foo", &json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_registry_entry_unrecognized() {
        for raw in [json!(3), json!("foo"), json!([1, 2, 3]), json!([{"version": []}])] {
            let err = parse_registry_entry("foo", &raw).unwrap_err();
            assert!(matches!(err, PackageError::UnrecognizedFormat { .. }), "{}", raw);
        }
    }

    #[test]
    fn test_list_preserves_snapshot_order() {
        let installed = snapshot(json!({
            "zeta": [{"version": [1]}, {"version": [2]}],
            "alpha": {"version": [3]},
            "mid": [[0, 1], [], "m"],
        }));
        let packages = list_installed(&installed).unwrap();
        let names: Vec<String> = packages.iter().map(Package::full_name).collect();
        assert_eq!(names, ["zeta-2", "zeta-1", "alpha-3", "mid-0.1"]);
    }

    #[test]
    fn test_list_available_propagates_parse_errors() {
        let available = snapshot(json!({"ok": {"version": [1]}, "bad": 17}));
        assert!(list_available(&available).is_err());
    }

    #[test]
    fn test_find_installed_highest_version() {
        let installed = snapshot(json!({"foo": [{"version": "1.0"}, {"version": "1.3"}]}));
        let found = find_installed("foo", &installed).unwrap().unwrap();
        assert_eq!(found.version, v("1.3"));
        assert!(find_installed("bar", &installed).unwrap().is_none());
    }

    #[test]
    fn test_find_available_descending_or_empty() {
        let available = snapshot(json!({"foo": [[[1], [], ""], [[3], [], ""], [[2], [], ""]]}));
        assert_eq!(versions(&find_available("foo", &available).unwrap()), ["3", "2", "1"]);
        assert!(find_available("nope", &available).unwrap().is_empty());
    }

    #[test]
    fn test_is_installed_by_name_and_package() {
        let installed = snapshot(json!({"foo": {"version": [1, 2]}}));
        let older = Package {
            name: "foo".into(),
            version: v("1.1"),
            summary: None,
            requirements: vec![],
            install_dir: None,
            archive: None,
        };
        let same = Package {
            version: v("1.2.0"),
            ..older.clone()
        };
        let newer = Package {
            version: v("1.3"),
            ..older.clone()
        };

        assert!(is_installed("foo", &installed).unwrap());
        assert!(!is_installed("bar", &installed).unwrap());
        assert!(is_installed(&older, &installed).unwrap());
        assert!(is_installed(&same, &installed).unwrap());
        assert!(!is_installed(&newer, &installed).unwrap());
    }

    #[test]
    fn test_compute_upgrades_equal_versions() {
        let installed = snapshot(json!({"foo": {"version": [1, 0]}}));
        let available = snapshot(json!({"foo": [[[1, 0], [], ""]]}));
        assert!(compute_upgrades(None, &installed, &available).unwrap().is_empty());
    }

    #[test]
    fn test_compute_upgrades_newer_available() {
        let installed = snapshot(json!({"foo": {"version": [1, 0]}}));
        let available = snapshot(json!({"foo": [[[1, 2, 0], [], ""]]}));

        let upgrades = compute_upgrades(None, &installed, &available).unwrap();
        assert_eq!(upgrades.len(), 1);
        assert_eq!(upgrades[0].installed.full_name(), "foo-1.0");
        assert_eq!(upgrades[0].available.full_name(), "foo-1.2.0");
    }

    #[test]
    fn test_compute_upgrades_only_strictly_greater_and_ordered() {
        let installed = snapshot(json!({
            "a": {"version": "2.0"},
            "b": {"version": "1.0"},
            "c": {"version": "1.0"},
            "d": {"version": "5"},
        }));
        let available = snapshot(json!({
            "d": [[[6], [], ""]],
            "a": [[[1, 9], [], ""]],
            "b": [[[1, 0, 0], [], ""]],
            "c": [[[1, 0, 1], [], ""], [[0, 1], [], ""]],
        }));

        let upgrades = compute_upgrades(None, &installed, &available).unwrap();
        let names: Vec<&str> = upgrades.iter().map(|u| u.installed.name.as_str()).collect();
        assert_eq!(names, ["c", "d"]);
        for u in &upgrades {
            assert!(u.installed.version < u.available.version);
        }
        assert_eq!(upgrades[0].available.version, v("1.0.1"));
    }

    #[test]
    fn test_compute_upgrades_is_idempotent() {
        let installed = snapshot(json!({"foo": {"version": [1]}, "bar": {"version": [2]}}));
        let available = snapshot(json!({"foo": [[[2], [], ""]], "bar": [[[3], [], ""]]}));

        let first = compute_upgrades(None, &installed, &available).unwrap();
        let second = compute_upgrades(None, &installed, &available).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_compute_upgrades_with_explicit_candidates() {
        let installed = snapshot(json!({"foo": {"version": [1]}, "bar": {"version": [1]}}));
        let available = snapshot(json!({"foo": [[[2], [], ""]], "bar": [[[2], [], ""]]}));
        let candidates = vec![find_installed("bar", &installed).unwrap().unwrap()];

        let upgrades = compute_upgrades(Some(&candidates), &installed, &available).unwrap();
        assert_eq!(upgrades.len(), 1);
        assert_eq!(upgrades[0].installed.name, "bar");
    }

    #[test]
    fn test_filter_upgrades() {
        let installed = snapshot(json!({"foo": {"version": [1]}, "bar": {"version": [1]}}));
        let available = snapshot(json!({"foo": [[[2], [], ""]], "bar": [[[2], [], ""]]}));
        let upgrades = compute_upgrades(None, &installed, &available).unwrap();

        assert_eq!(filter_upgrades(upgrades.clone(), &[]).len(), 2);
        let only_bar = filter_upgrades(upgrades, &["bar".to_string()]);
        assert_eq!(only_bar.len(), 1);
        assert_eq!(only_bar[0].installed.name, "bar");
    }

    fn three_upgrades() -> Vec<UpgradeCandidate> {
        let installed = snapshot(json!({
            "one": {"version": [1]},
            "two": {"version": [1]},
            "three": {"version": [1]},
        }));
        let available = snapshot(json!({
            "one": [[[2], [], ""]],
            "two": [[[2], [], ""]],
            "three": [[[2], [], ""]],
        }));
        compute_upgrades(None, &installed, &available).unwrap()
    }

    #[test]
    fn test_apply_upgrades_installs_then_deletes_in_order() {
        let upgrades = three_upgrades();
        let mut installer = MockInstaller::new();
        let mut seq = Sequence::new();

        for name in ["one", "two", "three"] {
            installer
                .expect_install()
                .withf(move |p, force| p.full_name() == format!("{}-2", name) && *force)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
            installer
                .expect_delete()
                .withf(move |p| p.full_name() == format!("{}-1", name))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }

        let applied = apply_upgrades(upgrades.clone(), &installer, false).unwrap();
        assert_eq!(applied, upgrades);
    }

    #[test]
    fn test_apply_upgrades_preserve_obsolete_skips_delete() {
        let mut installer = MockInstaller::new();
        installer.expect_install().times(3).returning(|_, _| Ok(()));
        installer.expect_delete().never();

        apply_upgrades(three_upgrades(), &installer, true).unwrap();
    }

    #[test]
    fn test_apply_upgrades_fails_fast_on_second_install() {
        let mut installer = MockInstaller::new();
        let mut seq = Sequence::new();

        installer
            .expect_install()
            .withf(|p, _| p.name == "one")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        installer
            .expect_delete()
            .withf(|p| p.name == "one")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        installer
            .expect_install()
            .withf(|p, _| p.name == "two")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));
        installer.expect_delete().withf(|p| p.name != "one").never();
        installer.expect_install().withf(|p, _| p.name == "three").never();

        let err = apply_upgrades(three_upgrades(), &installer, false).unwrap_err();
        match err {
            PackageError::InstallerFailure {
                package,
                operation,
                source,
            } => {
                assert_eq!(package, "two-2");
                assert_eq!(operation, Operation::Install);
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_apply_upgrades_delete_failure_stops() {
        let mut installer = MockInstaller::new();
        installer.expect_install().times(1).returning(|_, _| Ok(()));
        installer
            .expect_delete()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("busy")));

        let err = apply_upgrades(three_upgrades(), &installer, false).unwrap_err();
        assert!(matches!(
            err,
            PackageError::InstallerFailure {
                operation: Operation::Delete,
                ..
            }
        ));
    }

    #[test]
    fn test_snapshot_entry_editing_keeps_order() {
        let mut snap = snapshot(json!({"a": 1, "b": 2, "c": 3}));
        snap.remove_entry("b");
        snap.set_entry("d", json!(4));
        snap.set_entry("a", json!(5));
        let names: Vec<&str> = snap.names().collect();
        assert_eq!(names, ["a", "c", "d"]);
        assert_eq!(snap.entry("a"), Some(&json!(5)));
    }
}
