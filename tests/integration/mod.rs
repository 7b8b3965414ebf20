//! Integration test suite for deb-updater
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **orchestrator**: full runs over the real file lock and HTTP fetcher with
//!   a scripted package manager
//! - **cli**: the binary's flags, subcommands and exit codes

mod cli;
mod orchestrator;

use deb_updater::config::UpdaterConfig;
use std::path::Path;

/// Config whose every path lives under `root`.
pub fn isolated_config(root: &Path) -> UpdaterConfig {
    UpdaterConfig {
        staging_dir: root.join("staging"),
        log_file: root.join("log").join("deb-updater.log"),
        lock_file: root.join("run").join("deb-updater.lock"),
        backup_file: root.join("state").join("backup.json"),
        notify: false,
        ..UpdaterConfig::default()
    }
}

/// Whether `dir` is absent or has no entries.
pub fn is_empty_dir(dir: &Path) -> bool {
    !dir.exists() || std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(false)
}
