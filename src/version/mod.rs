//! Package version identifiers.
//!
//! A [`VersionIdentifier`] keeps the exact string the package database or the
//! package file reported, but compares using Debian ordering rules from
//! [`comparison`]. Two identifiers are equal when dpkg would consider them the
//! same version, so `1.2.3`, `0:1.2.3` and `1.02.3` are all equal even though
//! their text differs.
//!
//! [`InstalledVersion`] models the result of a package database query, where
//! absence is an ordinary value rather than an error.
//!
//! # Syntax
//!
//! ```text
//! [epoch:]upstream_version[-debian_revision]
//! ```
//!
//! - `epoch` is an unsigned integer, `0` when omitted
//! - `upstream_version` runs up to the last hyphen
//! - `debian_revision` is everything after the last hyphen, empty when omitted

pub mod comparison;

use crate::core::UpdaterError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// An ordered package version as understood by dpkg.
#[derive(Debug, Clone)]
pub struct VersionIdentifier {
    raw: String,
    epoch: u64,
    upstream: String,
    revision: String,
}

impl VersionIdentifier {
    /// Parse a version string.
    ///
    /// Surrounding whitespace is trimmed; internal whitespace is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::InvalidVersion`] for empty input, a non-numeric
    /// epoch, an empty upstream part or embedded whitespace.
    pub fn parse(input: &str) -> Result<Self, UpdaterError> {
        let raw = input.trim();
        let invalid = |reason: &str| UpdaterError::InvalidVersion {
            version: input.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("version string is empty"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(invalid("version string contains whitespace"));
        }

        let (epoch, rest) = match raw.split_once(':') {
            Some((epoch, rest)) => {
                let epoch = epoch.parse::<u64>().map_err(|_| invalid("epoch is not a number"))?;
                (epoch, rest)
            }
            None => (0, raw),
        };

        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((upstream, revision)) => (upstream, revision),
            None => (rest, ""),
        };

        if upstream.is_empty() {
            return Err(invalid("upstream version is empty"));
        }

        Ok(Self {
            raw: raw.to_string(),
            epoch,
            upstream: upstream.to_string(),
            revision: revision.to_string(),
        })
    }

    /// The version exactly as it was reported.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Epoch component, `0` when absent.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Upstream component.
    #[must_use]
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Debian revision component, empty when absent.
    #[must_use]
    pub fn revision(&self) -> &str {
        &self.revision
    }
}

impl Ord for VersionIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| comparison::compare_fragments(&self.upstream, &other.upstream))
            .then_with(|| comparison::compare_fragments(&self.revision, &other.revision))
    }
}

impl PartialOrd for VersionIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionIdentifier {}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for VersionIdentifier {
    type Err = UpdaterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for VersionIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Result of asking the package database which version is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "version", rename_all = "snake_case")]
pub enum InstalledVersion {
    /// The package is installed at this version.
    Installed(VersionIdentifier),
    /// The package is absent, removed, or only partially installed.
    NotInstalled,
}

impl InstalledVersion {
    /// The installed version, if any.
    #[must_use]
    pub const fn version(&self) -> Option<&VersionIdentifier> {
        match self {
            Self::Installed(version) => Some(version),
            Self::NotInstalled => None,
        }
    }

    /// Whether the package is installed at all.
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        matches!(self, Self::Installed(_))
    }
}

impl fmt::Display for InstalledVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed(version) => write!(f, "{version}"),
            Self::NotInstalled => f.write_str("not_installed"),
        }
    }
}

impl From<VersionIdentifier> for InstalledVersion {
    fn from(version: VersionIdentifier) -> Self {
        Self::Installed(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionIdentifier {
        VersionIdentifier::parse(s).unwrap()
    }

    #[test]
    fn test_parse_components() {
        let version = v("2:1.4.0-3ubuntu1");
        assert_eq!(version.epoch(), 2);
        assert_eq!(version.upstream(), "1.4.0");
        assert_eq!(version.revision(), "3ubuntu1");

        let version = v("0.0.51");
        assert_eq!(version.epoch(), 0);
        assert_eq!(version.upstream(), "0.0.51");
        assert_eq!(version.revision(), "");
    }

    #[test]
    fn test_upstream_may_contain_hyphens() {
        let version = v("1.0-beta-2");
        assert_eq!(version.upstream(), "1.0-beta");
        assert_eq!(version.revision(), "2");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(VersionIdentifier::parse("").is_err());
        assert!(VersionIdentifier::parse("   ").is_err());
        assert!(VersionIdentifier::parse("x:1.0").is_err());
        assert!(VersionIdentifier::parse("1:-2").is_err());
        assert!(VersionIdentifier::parse("1.0 beta").is_err());
    }

    #[test]
    fn test_equivalent_representations_are_equal() {
        assert_eq!(v("1.2.3"), v("0:1.2.3"));
        assert_eq!(v("1.02.3"), v("1.2.3"));
        assert_eq!(v(" 1.2.3\n"), v("1.2.3"));
        // The original text is still what gets displayed
        assert_eq!(v("0:1.2.3").to_string(), "0:1.2.3");
    }

    #[test]
    fn test_ordering() {
        assert!(v("0.0.51") > v("0.0.50"));
        assert!(v("1:0.1") > v("9.9"));
        assert!(v("1.0-2") > v("1.0-1"));
        assert!(v("1.0~rc1-1") < v("1.0-1"));
        assert!(v("1.0") < v("1.0-1"));
    }

    #[test]
    fn test_installed_version_display() {
        assert_eq!(InstalledVersion::NotInstalled.to_string(), "not_installed");
        assert_eq!(InstalledVersion::Installed(v("1.2.3")).to_string(), "1.2.3");
    }

    #[test]
    fn test_serde_uses_raw_string() {
        let json = serde_json::to_string(&v("1:2.0-1")).unwrap();
        assert_eq!(json, "\"1:2.0-1\"");

        let parsed: VersionIdentifier = serde_json::from_str("\"0.0.51\"").unwrap();
        assert_eq!(parsed, v("0.0.51"));

        assert!(serde_json::from_str::<VersionIdentifier>("\"\"").is_err());
    }
}
