//! Package database and package manager access.
//!
//! The orchestrator talks to the system package tooling only through the
//! [`PackageManager`] trait. [`DpkgPackageManager`] is the production
//! implementation; tests substitute a fake.

pub mod command;
mod dpkg;

pub use dpkg::DpkgPackageManager;

use crate::core::UpdaterError;
use crate::version::{InstalledVersion, VersionIdentifier};
use std::path::Path;

/// Control fields read from a package file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// `Package:` field
    pub package: String,
    /// `Version:` field
    pub version: VersionIdentifier,
}

/// Query and modify installed packages.
#[allow(async_fn_in_trait)]
pub trait PackageManager {
    /// Installed version of `package`.
    ///
    /// Never fails: a missing package, a half-installed package and an
    /// unreachable package database all report [`InstalledVersion::NotInstalled`].
    async fn installed_version(&self, package: &str) -> InstalledVersion;

    /// Check that `artifact` is a well-formed package and read its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::ValidationError`] for a corrupt or incomplete
    /// package file, or a tool error if the inspector is unavailable.
    async fn inspect(&self, artifact: &Path) -> Result<PackageMetadata, UpdaterError>;

    /// Install the package file.
    ///
    /// # Errors
    ///
    /// Returns the underlying command error when installation fails.
    async fn install(&self, artifact: &Path) -> Result<(), UpdaterError>;

    /// Resolve missing or broken dependencies left by a failed install.
    ///
    /// # Errors
    ///
    /// Returns the underlying command error when the repair fails.
    async fn repair_dependencies(&self) -> Result<(), UpdaterError>;
}
