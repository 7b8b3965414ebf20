//! Command-line interface.
//!
//! ```bash
//! deb-updater                       # same as `deb-updater run`
//! deb-updater run --force           # reinstall even if up to date
//! deb-updater --silent run --scheduled
//! deb-updater check                 # report, never install
//! deb-updater installed             # print installed version
//! deb-updater schedule --print      # show the systemd units
//! deb-updater config init           # write a default config file
//! ```
//!
//! Parsing produces an [`Invocation`]: the final, immutable
//! [`UpdaterConfig`] (file overlaid with flags) together with the command to
//! run. Logging is set up while preparing the invocation, so every command
//! runs with its sinks in place.
//!
//! Exit codes: `0` when the package is up to date, was updated, or the run was
//! skipped; `1` on any failure.

mod check;
mod config;
mod installed;
mod run;
mod schedule;

use crate::config::{CliOverrides, UpdaterConfig};
use crate::constants::DEFAULT_LOG_FILE;
use crate::utils::logging::{LoggingOptions, init_logging};
use crate::utils::platform::resolve_path_buf;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keep a Debian-packaged desktop application up to date.
#[derive(Parser, Debug)]
#[command(
    name = "deb-updater",
    about = "Keep a Debian-packaged desktop application up to date",
    version,
    long_about = "Checks whether the tracked package is outdated, downloads the latest .deb, \
                  verifies it and installs it with dpkg. Designed to run from a daily systemd timer."
)]
pub struct Cli {
    /// Command to execute; `run` when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the configuration file.
    ///
    /// Defaults to `$DEB_UPDATER_CONFIG`, then `/etc/deb-updater/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the durable log to this file instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log debug details of every step
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print nothing to the console; the log file is still written
    #[arg(short, long, global = true)]
    silent: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check for an update and install it (default).
    Run(run::RunCommand),

    /// Report whether an update is available without installing it.
    Check(check::CheckCommand),

    /// Print the installed version of the tracked package.
    Installed(installed::InstalledCommand),

    /// Install the daily systemd timer.
    Schedule(schedule::ScheduleCommand),

    /// Show or create the configuration file.
    Config(config::ConfigCommand),
}

impl Commands {
    /// Whether the command performs an update attempt worth a durable log.
    const fn writes_durable_log(&self) -> bool {
        matches!(self, Self::Run(_) | Self::Check(_))
    }
}

/// A parsed command with its final configuration.
#[derive(Debug)]
pub struct Invocation {
    config: UpdaterConfig,
    config_path: Option<PathBuf>,
    command: Commands,
}

impl Cli {
    /// Logging for a failure that happens before the configuration is loaded.
    ///
    /// Built from the flags alone. The durable sink is `--log-file`, else the
    /// default log path.
    #[must_use]
    pub fn startup_logging(&self) -> LoggingOptions {
        let durable = self.command.as_ref().is_none_or(Commands::writes_durable_log);
        let log_file = match &self.log_file {
            Some(path) => resolve_path_buf(path).unwrap_or_else(|_| path.clone()),
            None => PathBuf::from(DEFAULT_LOG_FILE),
        };
        LoggingOptions {
            log_file: durable.then_some(log_file),
            silent: self.silent,
            verbose: self.verbose,
        }
    }

    /// Load configuration, apply flags and start logging.
    ///
    /// # Errors
    ///
    /// Fails if the configuration file cannot be loaded.
    pub async fn prepare(self) -> Result<Invocation> {
        let command = self.command.unwrap_or_else(|| Commands::Run(run::RunCommand::default()));

        let file_config = if matches!(&command, Commands::Config(cmd) if cmd.is_init()) {
            // A broken file must not stop `config init --force` from replacing it
            UpdaterConfig::default()
        } else {
            UpdaterConfig::load_with_optional(self.config.clone()).await?
        };

        let force = matches!(&command, Commands::Run(cmd) if cmd.force);
        let config = file_config.apply_overrides(CliOverrides {
            force,
            silent: self.silent,
            log_file: self.log_file,
        })?;

        let options = LoggingOptions {
            log_file: command.writes_durable_log().then(|| config.log_file.clone()),
            silent: config.silent,
            verbose: self.verbose,
        };
        if let Err(e) = init_logging(&options) {
            // Only fails when a subscriber already exists, e.g. under a test harness
            tracing::debug!("Logging already initialized: {e:#}");
        }

        Ok(Invocation {
            config,
            config_path: self.config,
            command,
        })
    }
}

impl Invocation {
    /// Whether console output is suppressed.
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        self.config.silent
    }

    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns the failure of the command; for `run` this includes a failed
    /// update outcome.
    pub async fn execute(self) -> Result<()> {
        let Self {
            config,
            config_path,
            command,
        } = self;

        match command {
            Commands::Run(cmd) => cmd.execute(&config).await,
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Installed(cmd) => cmd.execute(&config).await,
            Commands::Schedule(cmd) => cmd.execute(&config, config_path.as_deref()).await,
            Commands::Config(cmd) => cmd.execute(&config, config_path).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::parse_from(["deb-updater", "--silent"]);
        assert!(cli.command.is_none());
        assert!(cli.silent);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "deb-updater",
            "run",
            "--force",
            "--scheduled",
            "-v",
            "--log-file",
            "/tmp/u.log",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/u.log")));
        match cli.command {
            Some(Commands::Run(cmd)) => {
                assert!(cmd.force);
                assert!(cmd.scheduled);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["deb-updater", "run", "--frobnicate"]).is_err());
    }

    #[test]
    fn test_only_update_attempts_write_durable_log() {
        assert!(Commands::Run(run::RunCommand::default()).writes_durable_log());
        let cli = Cli::parse_from(["deb-updater", "installed"]);
        assert!(!cli.command.unwrap().writes_durable_log());
    }

    #[test]
    fn test_startup_logging_uses_flags() {
        let cli = Cli::parse_from(["deb-updater", "--silent", "--log-file", "/tmp/u.log", "run"]);
        let options = cli.startup_logging();
        assert!(options.silent);
        assert_eq!(options.log_file, Some(PathBuf::from("/tmp/u.log")));

        let cli = Cli::parse_from(["deb-updater"]);
        assert_eq!(cli.startup_logging().log_file, Some(PathBuf::from(DEFAULT_LOG_FILE)));

        let cli = Cli::parse_from(["deb-updater", "config", "show"]);
        assert_eq!(cli.startup_logging().log_file, None);
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
