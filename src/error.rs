//! Error types for descriptor parsing and upgrade application.
//!
//! Queries that find nothing are not errors: they return `None` or an empty
//! `Vec`. Only malformed input and installer failures surface as
//! [`PackageError`].

use std::fmt;

use thiserror::Error;

/// Installer step that failed during an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install => f.write_str("install"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PackageError {
    /// A raw descriptor or registry entry matched none of the known shapes.
    #[error("unrecognized package format ({reason}): {raw}")]
    UnrecognizedFormat {
        raw: serde_json::Value,
        reason: String,
    },

    /// The installer collaborator failed; upgrade processing stopped here.
    #[error("failed to {operation} {package}")]
    InstallerFailure {
        /// Full name (`name-version`) of the package being processed.
        package: String,
        operation: Operation,
        #[source]
        source: anyhow::Error,
    },
}

impl PackageError {
    pub(crate) fn unrecognized(raw: &serde_json::Value, reason: impl Into<String>) -> Self {
        PackageError::UnrecognizedFormat {
            raw: raw.clone(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;
