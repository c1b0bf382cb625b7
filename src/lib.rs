//! Normalization of package descriptors from an editor package archive.
//!
//! Raw descriptor records come in several historical shapes. This crate
//! parses them into a uniform [`Package`], answers installed/available
//! queries over explicit [`RegistrySnapshot`]s and computes and applies
//! upgrades through an [`Installer`].

pub mod commands;
pub mod descriptor;
pub mod error;
pub mod installer;
pub mod registry;
pub mod runtime;
pub mod store;
pub mod version;

pub use descriptor::{Descriptor, Package, Requirement, parse_descriptor, parse_named_descriptor};
pub use error::{Operation, PackageError, Result};
pub use installer::{DirectoryInstaller, Installer};
pub use registry::{
    PackageQuery, RegistrySnapshot, UpgradeCandidate, apply_upgrades, compute_upgrades,
    filter_upgrades, find_available, find_installed, is_installed, list_available,
    list_installed, parse_registry_entry,
};
pub use version::{Version, version_less};
