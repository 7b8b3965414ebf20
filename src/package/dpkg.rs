//! `dpkg` based package manager.

use super::command::PackageCommand;
use super::{PackageManager, PackageMetadata};
use crate::constants::INSTALL_TIMEOUT;
use crate::core::UpdaterError;
use crate::version::{InstalledVersion, VersionIdentifier};
use std::path::Path;
use tracing::debug;

/// Package manager backed by `dpkg-query`, `dpkg-deb`, `dpkg` and `apt-get`.
#[derive(Debug, Clone, Default)]
pub struct DpkgPackageManager {
    elevate_with: Option<String>,
}

impl DpkgPackageManager {
    /// Manager that runs modifying commands directly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix `dpkg -i` and `apt-get` with an elevation wrapper such as `sudo`.
    #[must_use]
    pub fn with_elevation(mut self, wrapper: Option<String>) -> Self {
        self.elevate_with = wrapper;
        self
    }

    fn privileged(&self, program: &str) -> PackageCommand {
        PackageCommand::new(program)
            .elevate_with(self.elevate_with.as_deref())
            .timeout(INSTALL_TIMEOUT)
    }
}

/// Interpret `dpkg-query -f '${db:Status-Status} ${Version}'` output.
///
/// Only a package in state `installed` counts; `config-files`,
/// `half-installed` and friends are reported as not installed.
pub(crate) fn parse_query_output(output: &str) -> InstalledVersion {
    let mut parts = output.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("installed"), Some(version)) => {
            VersionIdentifier::parse(version).map_or(InstalledVersion::NotInstalled, Into::into)
        }
        _ => InstalledVersion::NotInstalled,
    }
}

/// Read `Package` and `Version` from `dpkg-deb --field` output.
pub(crate) fn parse_control_fields(output: &str) -> Result<PackageMetadata, UpdaterError> {
    let mut package = None;
    let mut version = None;

    for line in output.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim();
            match key.trim() {
                "Package" if !value.is_empty() => package = Some(value.to_string()),
                "Version" if !value.is_empty() => version = Some(value.to_string()),
                _ => {}
            }
        }
    }

    let package = package.ok_or_else(|| UpdaterError::ValidationError {
        reason: "package file declares no Package field".to_string(),
    })?;
    let version = version.ok_or_else(|| UpdaterError::ValidationError {
        reason: "package file declares no Version field".to_string(),
    })?;
    let version = VersionIdentifier::parse(&version).map_err(|e| UpdaterError::ValidationError {
        reason: e.to_string(),
    })?;

    Ok(PackageMetadata {
        package,
        version,
    })
}

impl PackageManager for DpkgPackageManager {
    async fn installed_version(&self, package: &str) -> InstalledVersion {
        let result = PackageCommand::new("dpkg-query")
            .args(["-W", "-f", "${db:Status-Status} ${Version}", package])
            .with_context("Querying installed version")
            .execute_stdout()
            .await;

        match result {
            Ok(output) => parse_query_output(&output),
            Err(e) => {
                debug!(package, error = %e, "Package database reports no installed version");
                InstalledVersion::NotInstalled
            }
        }
    }

    async fn inspect(&self, artifact: &Path) -> Result<PackageMetadata, UpdaterError> {
        let path = artifact.display().to_string();

        PackageCommand::new("dpkg-deb")
            .args(["--info", path.as_str()])
            .with_context("Checking package structure")
            .execute()
            .await
            .map_err(|e| match e {
                UpdaterError::CommandFailed {
                    stderr, ..
                } => UpdaterError::ValidationError {
                    reason: format!("not a valid Debian package: {stderr}"),
                },
                other => other,
            })?;

        let fields = PackageCommand::new("dpkg-deb")
            .args(["--field", path.as_str(), "Package", "Version"])
            .with_context("Reading package control fields")
            .execute_stdout()
            .await
            .map_err(|e| match e {
                UpdaterError::CommandFailed {
                    stderr, ..
                } => UpdaterError::ValidationError {
                    reason: format!("cannot read control fields: {stderr}"),
                },
                other => other,
            })?;

        parse_control_fields(&fields)
    }

    async fn install(&self, artifact: &Path) -> Result<(), UpdaterError> {
        self.privileged("dpkg")
            .args(["-i".to_string(), artifact.display().to_string()])
            .with_context("Installing package")
            .execute()
            .await
            .map(|_| ())
    }

    async fn repair_dependencies(&self) -> Result<(), UpdaterError> {
        self.privileged("apt-get")
            .args(["install", "-f", "-y"])
            .with_context("Repairing dependencies")
            .execute()
            .await
            .map(|_| ())
    }
}
