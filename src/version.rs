//! Version vectors.
//!
//! A version is a non-empty list of non-negative integers compared component
//! by component, with missing trailing components read as zero. `1.0` and `1`
//! are therefore the same version, and `1.0 < 1.0.1`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An ordered list of version components, e.g. `[1, 2, 0]` for `1.2.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct Version(Vec<u64>);

impl Version {
    /// Build a version from its components. Fails on an empty list.
    pub fn new(components: Vec<u64>) -> Result<Self, String> {
        if components.is_empty() {
            return Err("version has no components".to_string());
        }
        Ok(Version(components))
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }

    /// Components with trailing zeros removed; the canonical form used for
    /// equality and hashing.
    fn significant(&self) -> &[u64] {
        let end = self
            .0
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |i| i + 1);
        &self.0[..end]
    }
}

/// `true` when `a` sorts strictly before `b`.
pub fn version_less(a: &Version, b: &Version) -> bool {
    a < b
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl TryFrom<Vec<u64>> for Version {
    type Error = String;

    fn try_from(components: Vec<u64>) -> Result<Self, Self::Error> {
        Version::new(components)
    }
}

impl From<Version> for Vec<u64> {
    fn from(v: Version) -> Self {
        v.0
    }
}

impl FromStr for Version {
    type Err = String;

    /// Parse a dotted version such as `1.2.0`; a leading `v` is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(format!("empty version string {:?}", s));
        }

        let components = digits
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| format!("invalid version component {:?} in {:?}", part, s))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Version::new(components)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}
