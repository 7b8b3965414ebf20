//! `run`: one full update attempt.

use crate::config::UpdaterConfig;
use crate::notify::{DesktopNotifier, notify_outcome};
use crate::update::{RunTrigger, UpdateOrchestrator, UpdateOutcome};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Arguments for `deb-updater run`.
#[derive(Args, Debug, Default)]
pub struct RunCommand {
    /// Reinstall even when the installed version matches the download
    #[arg(short, long)]
    pub force: bool,

    /// Mark the run as started by the timer.
    ///
    /// Scheduled runs are skipped when `auto_check = false`.
    #[arg(long)]
    pub scheduled: bool,
}

impl RunCommand {
    /// Run the orchestrator and report its outcome.
    ///
    /// # Errors
    ///
    /// Returns the error of a failed outcome so the process exits non-zero.
    pub async fn execute(self, config: &UpdaterConfig) -> Result<()> {
        let trigger = if self.scheduled {
            RunTrigger::Scheduled
        } else {
            RunTrigger::Manual
        };
        let orchestrator = UpdateOrchestrator::for_system(config)?.with_trigger(trigger);

        if !config.silent {
            println!("{}", format!("Checking {} for updates...", config.package_name).cyan());
        }
        let outcome = orchestrator.run().await;

        if !config.silent {
            print_outcome(&config.package_name, &outcome);
        }
        if config.notify {
            notify_outcome(&DesktopNotifier::new(), &config.package_name, &outcome).await;
        }

        match outcome {
            UpdateOutcome::Failed(error) => Err(error.into()),
            UpdateOutcome::UpToDate { .. }
            | UpdateOutcome::Updated { .. }
            | UpdateOutcome::Skipped { .. } => Ok(()),
        }
    }
}

fn print_outcome(package: &str, outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::UpToDate {
            version,
        } => println!("{}", format!("{package} is up to date ({version})").green()),
        UpdateOutcome::Updated {
            from,
            to,
        } => println!("{}", format!("Updated {package}: {from} -> {to}").green().bold()),
        UpdateOutcome::Skipped {
            reason,
        } => println!("{}", format!("Skipped: {reason}").yellow()),
        // Printed by the error display in main
        UpdateOutcome::Failed(_) => {}
    }
}
