//! Updater configuration file.
//!
//! Every key is optional; an absent key takes its built-in default and an
//! absent file is the same as an empty one.
//!
//! ```toml
//! auto_check = true
//! force_update = false
//! silent = false
//! backup_enabled = true
//! notify = true
//! package_name = "discord"
//! download_url = "https://discord.com/api/download?platform=linux&format=deb"
//! # expected_sha256 = "..."
//! staging_dir = "/var/cache/deb-updater/staging"
//! log_file = "/var/log/deb-updater.log"
//! lock_file = "/run/deb-updater.lock"
//! backup_file = "/var/lib/deb-updater/backup.json"
//! download_timeout_secs = 300
//! # elevate_with = "sudo"
//! ```

use crate::constants::{
    BINARY_NAME, CONFIG_PATH_ENV, DEFAULT_BACKUP_FILE, DEFAULT_CONFIG_PATH,
    DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_DOWNLOAD_URL, DEFAULT_LOCK_FILE, DEFAULT_LOG_FILE,
    DEFAULT_PACKAGE_NAME, DEFAULT_STAGING_DIR,
};
use crate::core::UpdaterError;
use crate::update::verification::ChecksumVerifier;
use crate::utils::platform::{is_root, resolve_path_buf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Settings for one updater invocation.
///
/// Built once at startup by [`UpdaterConfig::load_with_optional`] followed by
/// [`UpdaterConfig::apply_overrides`], then only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Allow timer-driven runs to check for updates
    #[serde(default = "default_true")]
    pub auto_check: bool,

    /// Reinstall even when the installed version matches
    #[serde(default)]
    pub force_update: bool,

    /// Suppress console output (the log file is still written)
    #[serde(default)]
    pub silent: bool,

    /// Record the previously installed version before installing
    #[serde(default = "default_true")]
    pub backup_enabled: bool,

    /// Send a desktop notification after a successful update
    #[serde(default = "default_true")]
    pub notify: bool,

    /// Expected `Package:` field of the downloaded file
    #[serde(default = "default_package_name")]
    pub package_name: String,

    /// Where the latest package is published
    #[serde(default = "default_download_url")]
    pub download_url: String,

    /// Optional SHA-256 of the expected artifact, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_sha256: Option<String>,

    /// Directory owned by a run for the downloaded candidate
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Durable log sink
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Host-wide run lock
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Where the pre-update version is recorded
    #[serde(default = "default_backup_file")]
    pub backup_file: PathBuf,

    /// Download timeout in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Wrapper used for `dpkg -i` and `apt-get` when not running as root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevate_with: Option<String>,
}

const fn default_true() -> bool {
    true
}

fn default_package_name() -> String {
    DEFAULT_PACKAGE_NAME.to_string()
}

fn default_download_url() -> String {
    DEFAULT_DOWNLOAD_URL.to_string()
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STAGING_DIR)
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_lock_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOCK_FILE)
}

fn default_backup_file() -> PathBuf {
    PathBuf::from(DEFAULT_BACKUP_FILE)
}

const fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            auto_check: true,
            force_update: false,
            silent: false,
            backup_enabled: true,
            notify: true,
            package_name: default_package_name(),
            download_url: default_download_url(),
            expected_sha256: None,
            staging_dir: default_staging_dir(),
            log_file: default_log_file(),
            lock_file: default_lock_file(),
            backup_file: default_backup_file(),
            download_timeout_secs: default_download_timeout_secs(),
            elevate_with: None,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--force`
    pub force: bool,
    /// `--silent`
    pub silent: bool,
    /// `--log-file`
    pub log_file: Option<PathBuf>,
}

impl UpdaterConfig {
    /// Config file location when `--config` is not given.
    ///
    /// Order: `DEB_UPDATER_CONFIG`, then the system file. A non-root user
    /// without a system file falls back to `deb-updater/config.toml` in their
    /// config directory when that file exists.
    #[must_use]
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }

        let system = PathBuf::from(DEFAULT_CONFIG_PATH);
        if system.exists() || is_root() {
            return system;
        }

        dirs::config_dir()
            .map(|dir| dir.join(BINARY_NAME).join("config.toml"))
            .filter(|user| user.exists())
            .unwrap_or(system)
    }

    /// Load from `path`, or from [`default_path`](Self::default_path) when
    /// `None`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read, parsed or validated.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(Self::default_path);
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            let mut config = Self::default();
            config.expand_paths()?;
            Ok(config)
        }
    }

    /// Load and validate the file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid TOML, references an
    /// unset variable in a path, or holds an invalid value.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.expand_paths()?;
        config.validate(path)?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }

        let body = toml::to_string_pretty(self).context("Failed to serialize config")?;
        let content = format!(
            "# {BINARY_NAME} configuration\n\
             # Every key is optional; removed keys fall back to their defaults.\n\n{body}"
        );

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Overlay command-line values and return the final configuration.
    ///
    /// # Errors
    ///
    /// Fails if an overriding path cannot be expanded.
    pub fn apply_overrides(mut self, overrides: CliOverrides) -> Result<Self> {
        self.force_update |= overrides.force;
        self.silent |= overrides.silent;
        if let Some(log_file) = overrides.log_file {
            self.log_file = resolve_path_buf(&log_file)?;
        }
        Ok(self)
    }

    /// Download timeout as a [`Duration`].
    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    fn expand_paths(&mut self) -> Result<()> {
        self.staging_dir = resolve_path_buf(&self.staging_dir)?;
        self.log_file = resolve_path_buf(&self.log_file)?;
        self.lock_file = resolve_path_buf(&self.lock_file)?;
        self.backup_file = resolve_path_buf(&self.backup_file)?;
        Ok(())
    }

    fn validate(&self, file: &Path) -> Result<(), UpdaterError> {
        let invalid = |reason: String| UpdaterError::ConfigError {
            file: file.display().to_string(),
            reason,
        };

        if self.package_name.trim().is_empty() {
            return Err(invalid("package_name must not be empty".to_string()));
        }
        if !(self.download_url.starts_with("https://") || self.download_url.starts_with("http://"))
        {
            return Err(invalid(format!(
                "download_url must be an http(s) URL, got '{}'",
                self.download_url
            )));
        }
        if self.download_timeout_secs == 0 {
            return Err(invalid("download_timeout_secs must be greater than zero".to_string()));
        }
        if let Some(expected) = &self.expected_sha256 {
            if !ChecksumVerifier::is_valid_digest(expected) {
                return Err(invalid(format!(
                    "expected_sha256 must be 64 hex characters, got '{expected}'"
                )));
            }
        }
        if self.staging_dir.as_os_str().is_empty() {
            return Err(invalid("staging_dir must not be empty".to_string()));
        }
        Ok(())
    }
}
