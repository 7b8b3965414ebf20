//! `installed`: print the installed version.

use crate::config::UpdaterConfig;
use crate::package::{DpkgPackageManager, PackageManager};
use crate::update::backup::BackupRecorder;
use anyhow::Result;
use clap::Args;

/// Arguments for `deb-updater installed`.
#[derive(Args, Debug, Default)]
pub struct InstalledCommand {
    /// Also print the version recorded before the last update
    #[arg(long)]
    backup: bool,
}

impl InstalledCommand {
    /// Print the installed version, or `not_installed`.
    ///
    /// This output is the command's result, so it is printed even in silent
    /// mode.
    ///
    /// # Errors
    ///
    /// Fails only when `--backup` is given and the record is unreadable.
    pub async fn execute(self, config: &UpdaterConfig) -> Result<()> {
        let installed = DpkgPackageManager::new().installed_version(&config.package_name).await;
        println!("{installed}");

        if self.backup {
            match BackupRecorder::new(&config.backup_file).load().await? {
                Some(record) => println!(
                    "previous: {} (recorded {})",
                    record.version,
                    record.recorded_at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                None => println!("previous: none recorded"),
            }
        }
        Ok(())
    }
}
