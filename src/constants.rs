//! Constants used across deb-updater.
//!
//! Default paths and timeouts live here so the config defaults, the systemd
//! unit templates and the tests agree on them.

use std::time::Duration;

/// Name of the binary, used in unit files and notification titles.
pub const BINARY_NAME: &str = "deb-updater";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "DEB_UPDATER_CONFIG";

/// System-wide config file used when neither `--config` nor the env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/deb-updater/config.toml";

/// Package tracked when the config does not name one.
pub const DEFAULT_PACKAGE_NAME: &str = "discord";

/// Where the latest `.deb` for [`DEFAULT_PACKAGE_NAME`] is published.
pub const DEFAULT_DOWNLOAD_URL: &str = "https://discord.com/api/download?platform=linux&format=deb";

/// Staging directory for downloaded candidates.
pub const DEFAULT_STAGING_DIR: &str = "/var/cache/deb-updater/staging";

/// Durable log sink.
pub const DEFAULT_LOG_FILE: &str = "/var/log/deb-updater.log";

/// Host-wide run lock.
pub const DEFAULT_LOCK_FILE: &str = "/run/deb-updater.lock";

/// Record of the version that was installed before the last update.
pub const DEFAULT_BACKUP_FILE: &str = "/var/lib/deb-updater/backup.json";

/// Directory that receives the systemd service and timer units.
pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";

/// Default download timeout in seconds (5 minutes).
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Timeout for read-only package database queries (30 seconds).
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for `dpkg -i` and `apt-get install -f` (15 minutes).
///
/// apt may need to fetch dependencies over a slow mirror.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(900);

/// Window for systemd's `RandomizedDelaySec` on the daily timer.
pub const TIMER_RANDOMIZED_DELAY: &str = "1h";
