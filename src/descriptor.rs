//! Raw package descriptors and their normalization into [`Package`].
//!
//! Package databases have stored descriptors in several shapes over time:
//!
//! - **Structured**: an object with `name`, `version`, `summary`,
//!   `requirements`, and optionally `dir` and `archive`.
//! - **Positional**: `[version, requirements, summary, kind?, extras?]`, as
//!   found in archive contents. Carries no name; the registry key supplies it.
//! - **Legacy**: `[name, requirements, summary, version, commentary]`.
//!
//! [`Descriptor::classify`] matches a raw JSON value against these shapes in
//! that order, except that a 5-element array with a version in its fourth
//! slot is always legacy, and [`parse_named_descriptor`] turns the match into a `Package`.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PackageError, Result};
use crate::version::Version;

/// A dependency on another package at a minimum version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub version: Version,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} >= {}", self.name, self.version)
    }
}

/// Normalized package metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: Version,
    pub summary: Option<String>,
    pub requirements: Vec<Requirement>,
    /// Set only for installed packages.
    pub install_dir: Option<PathBuf>,
    /// Archive offering the package, e.g. `gnu`.
    pub archive: Option<String>,
}

impl Package {
    /// `<name>-<version>`, the directory name of an installation.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Version as written in a raw record: `[1, 2]` or `"1.2"`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawVersion {
    Components(Vec<u64>),
    Dotted(String),
}

impl RawVersion {
    fn to_version(&self) -> std::result::Result<Version, String> {
        match self {
            RawVersion::Components(components) => Version::new(components.clone()),
            RawVersion::Dotted(s) => s.parse(),
        }
    }
}

impl From<&Version> for RawVersion {
    fn from(v: &Version) -> Self {
        RawVersion::Components(v.components().to_vec())
    }
}

/// Requirement as written in a raw record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawRequirement {
    /// `["name", version]`
    Pair(String, RawVersion),
    /// `["name"]`, any version
    Bare((String,)),
    /// `{"name": ..., "version": ...}`
    Named {
        name: String,
        #[serde(default)]
        version: Option<RawVersion>,
    },
}

impl RawRequirement {
    fn to_requirement(&self) -> std::result::Result<Requirement, String> {
        let (name, version) = match self {
            RawRequirement::Pair(name, v) => (name, Some(v)),
            RawRequirement::Bare((name,)) => (name, None),
            RawRequirement::Named { name, version } => (name, version.as_ref()),
        };
        let version = match version {
            Some(v) => v
                .to_version()
                .map_err(|e| format!("requirement {}: {}", name, e))?,
            None => Version::new(vec![0])?,
        };
        Ok(Requirement {
            name: name.clone(),
            version,
        })
    }
}

impl From<&Requirement> for RawRequirement {
    fn from(r: &Requirement) -> Self {
        RawRequirement::Pair(r.name.clone(), (&r.version).into())
    }
}

/// The structured (object) descriptor shape. Also the shape this crate writes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StructuredDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub version: RawVersion,
    #[serde(default, alias = "desc", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, alias = "reqs", skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<RawRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
}

impl From<&Package> for StructuredDescriptor {
    fn from(p: &Package) -> Self {
        StructuredDescriptor {
            name: Some(p.name.clone()),
            version: (&p.version).into(),
            summary: p.summary.clone(),
            requirements: p.requirements.iter().map(RawRequirement::from).collect(),
            dir: p.install_dir.clone(),
            archive: p.archive.clone(),
        }
    }
}

/// A raw record matched to one of the known descriptor shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Structured(StructuredDescriptor),
    Positional {
        version: Version,
        requirements: Vec<RawRequirement>,
        summary: Option<String>,
    },
    Legacy {
        name: String,
        requirements: Vec<RawRequirement>,
        summary: Option<String>,
        version: Version,
    },
}

impl Descriptor {
    /// Match `raw` against the structured shape, then the positional shape,
    /// then the legacy five-field shape.
    pub fn classify(raw: &Value) -> Result<Self> {
        match raw {
            Value::Object(_) => serde_json::from_value::<StructuredDescriptor>(raw.clone())
                .map(Descriptor::Structured)
                .map_err(|e| PackageError::unrecognized(raw, format!("structured descriptor: {}", e))),
            Value::Array(items) => Self::classify_array(raw, items),
            _ => Err(PackageError::unrecognized(raw, "expected an object or an array")),
        }
    }

    fn classify_array(raw: &Value, items: &[Value]) -> Result<Self> {
        // A positional record keeps its kind (`tar`, `single`) at index 3,
        // never a version, so a 5-element array with a version there is legacy
        // even when its name looks like a version.
        if items.len() == 5
            && let Value::String(name) = &items[0]
            && let Some(version) = as_version(&items[3])
        {
            return Ok(Descriptor::Legacy {
                name: name.clone(),
                requirements: requirements_field(raw, &items[1])?,
                summary: summary_field(raw, &items[2])?,
                version,
            });
        }

        if (3..=5).contains(&items.len())
            && let Some(version) = as_version(&items[0])
        {
            return Ok(Descriptor::Positional {
                version,
                requirements: requirements_field(raw, &items[1])?,
                summary: summary_field(raw, &items[2])?,
            });
        }

        Err(PackageError::unrecognized(
            raw,
            format!("array of {} elements matches no descriptor layout", items.len()),
        ))
    }

    /// Name carried by the record itself, if its shape has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Descriptor::Structured(d) => d.name.as_deref(),
            Descriptor::Positional { .. } => None,
            Descriptor::Legacy { name, .. } => Some(name),
        }
    }
}

/// Parse a raw record that must name itself (structured with `name`, or legacy).
pub fn parse_descriptor(raw: &Value) -> Result<Package> {
    parse_named_descriptor(None, raw)
}

/// Parse a raw record, using `key` as the name when the record carries none.
pub fn parse_named_descriptor(key: Option<&str>, raw: &Value) -> Result<Package> {
    let descriptor = Descriptor::classify(raw)?;
    let name = descriptor
        .name()
        .or(key)
        .map(str::to_string)
        .ok_or_else(|| PackageError::unrecognized(raw, "descriptor carries no package name"))?;

    let (version, requirements, summary, install_dir, archive) = match descriptor {
        Descriptor::Structured(d) => {
            let version = d
                .version
                .to_version()
                .map_err(|e| PackageError::unrecognized(raw, e))?;
            (version, d.requirements, d.summary, d.dir, d.archive)
        }
        Descriptor::Positional {
            version,
            requirements,
            summary,
        } => (version, requirements, summary, None, None),
        Descriptor::Legacy {
            requirements,
            summary,
            version,
            ..
        } => (version, requirements, summary, None, None),
    };

    let requirements = requirements
        .iter()
        .map(RawRequirement::to_requirement)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| PackageError::unrecognized(raw, e))?;

    Ok(Package {
        name,
        version,
        summary,
        requirements,
        install_dir,
        archive,
    })
}

fn as_version(value: &Value) -> Option<Version> {
    serde_json::from_value::<RawVersion>(value.clone())
        .ok()
        .and_then(|v| v.to_version().ok())
}

fn requirements_field(raw: &Value, value: &Value) -> Result<Vec<RawRequirement>> {
    if value.is_null() {
        return Ok(vec![]);
    }
    serde_json::from_value(value.clone())
        .map_err(|e| PackageError::unrecognized(raw, format!("requirements: {}", e)))
}

fn summary_field(raw: &Value, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(PackageError::unrecognized(raw, "summary must be a string")),
    }
}
