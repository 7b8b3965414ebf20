//! `config`: show or create the configuration file.

use crate::config::UpdaterConfig;
use crate::core::UpdaterError;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

/// Arguments for `deb-updater config`.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration (file plus flags) as TOML
    Show,

    /// Write a configuration file with every default filled in
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Whether this is `config init`.
    pub(crate) const fn is_init(&self) -> bool {
        matches!(self.action, ConfigAction::Init { .. })
    }

    /// Execute the action.
    ///
    /// # Errors
    ///
    /// `init` refuses to overwrite an existing file without `--force`.
    pub async fn execute(self, config: &UpdaterConfig, config_path: Option<PathBuf>) -> Result<()> {
        match self.action {
            ConfigAction::Show => {
                let rendered =
                    toml::to_string_pretty(config).context("Failed to serialize configuration")?;
                print!("{rendered}");
                Ok(())
            }
            ConfigAction::Init {
                force,
            } => {
                let path = config_path.unwrap_or_else(UpdaterConfig::default_path);
                if path.exists() && !force {
                    return Err(UpdaterError::ConfigError {
                        file: path.display().to_string(),
                        reason: "file already exists (use --force to overwrite)".to_string(),
                    }
                    .into());
                }

                UpdaterConfig::default().save_to(&path).await?;
                if !config.silent {
                    println!("{} {}", "Wrote default configuration to".green(), path.display());
                }
                Ok(())
            }
        }
    }
}
