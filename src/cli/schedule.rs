//! `schedule`: install the daily systemd timer.

use crate::config::UpdaterConfig;
use crate::constants::DEFAULT_UNIT_DIR;
use crate::schedule::{ScheduleUnits, render_units};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Arguments for `deb-updater schedule`.
#[derive(Args, Debug)]
pub struct ScheduleCommand {
    /// Print the units instead of writing them
    #[arg(long)]
    print: bool,

    /// Directory that receives the unit files
    #[arg(long, value_name = "DIR", default_value = DEFAULT_UNIT_DIR)]
    unit_dir: PathBuf,
}

impl ScheduleCommand {
    /// Render the units for the running binary and print or write them.
    ///
    /// # Errors
    ///
    /// Fails if the executable path cannot be determined or the units cannot
    /// be written.
    pub async fn execute(self, config: &UpdaterConfig, config_path: Option<&Path>) -> Result<()> {
        let executable =
            std::env::current_exe().context("Failed to determine the path of this executable")?;
        let config_path = config_path
            .map(std::path::absolute)
            .transpose()
            .context("Failed to resolve the config path")?;
        let units = render_units(&executable, config_path.as_deref())?;

        if self.print {
            println!("# {}\n{}", ScheduleUnits::service_name(), units.service);
            println!("# {}\n{}", ScheduleUnits::timer_name(), units.timer);
            return Ok(());
        }

        let written = units.write_to(&self.unit_dir).await?;
        if !config.silent {
            for path in &written {
                println!("{} {}", "Wrote".green(), path.display());
            }
            println!(
                "Enable with: systemctl daemon-reload && systemctl enable --now {}",
                ScheduleUnits::timer_name()
            );
        }
        Ok(())
    }
}
