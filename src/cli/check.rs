//! `check`: report whether an update is available.

use crate::config::UpdaterConfig;
use crate::update::UpdateOrchestrator;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Arguments for `deb-updater check`.
#[derive(Args, Debug, Default)]
pub struct CheckCommand {}

impl CheckCommand {
    /// Download and validate the latest package, then compare versions.
    ///
    /// Succeeds whether or not an update is available.
    ///
    /// # Errors
    ///
    /// Lock contention, download and validation failures.
    pub async fn execute(self, config: &UpdaterConfig) -> Result<()> {
        let orchestrator = UpdateOrchestrator::for_system(config)?;
        let report = orchestrator.check().await?;

        tracing::info!(
            installed = %report.installed,
            candidate = %report.candidate,
            update_available = report.update_available(),
            "Check complete"
        );

        if !config.silent {
            if report.update_available() {
                println!(
                    "{} {} -> {}",
                    "Update available:".yellow().bold(),
                    report.installed,
                    report.candidate.to_string().green()
                );
                println!("Run `deb-updater run` to install it");
            } else {
                println!(
                    "{}",
                    format!("{} is up to date ({})", config.package_name, report.candidate).green()
                );
            }
        }
        Ok(())
    }
}
