//! Downloaded artifacts on their way to installation.
//!
//! A fetched [`UpdateCandidate`] only becomes a [`ValidatedCandidate`] by
//! passing validation, and only a validated candidate can be installed.

use crate::version::VersionIdentifier;
use std::path::{Path, PathBuf};

/// A downloaded package file that has not been validated yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    source: String,
    staging_path: PathBuf,
    size: u64,
}

impl UpdateCandidate {
    /// Candidate fetched from `source` into `staging_path`.
    pub fn new(source: impl Into<String>, staging_path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            source: source.into(),
            staging_path: staging_path.into(),
            size,
        }
    }

    /// URL the artifact was fetched from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Local path of the staged artifact.
    #[must_use]
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    /// Size of the staged artifact in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }
}

/// A candidate whose structure and package name have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCandidate {
    candidate: UpdateCandidate,
    package: String,
    version: VersionIdentifier,
}

impl ValidatedCandidate {
    pub(crate) const fn new(
        candidate: UpdateCandidate,
        package: String,
        version: VersionIdentifier,
    ) -> Self {
        Self {
            candidate,
            package,
            version,
        }
    }

    /// The underlying artifact.
    #[must_use]
    pub const fn candidate(&self) -> &UpdateCandidate {
        &self.candidate
    }

    /// Declared package name.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Declared version.
    #[must_use]
    pub const fn version(&self) -> &VersionIdentifier {
        &self.version
    }
}
