//! Logging setup.
//!
//! Two sinks share one filter:
//!
//! - the **durable sink**, an append-only log file with timestamps and no
//!   ANSI codes, always active when the file can be opened;
//! - the **console sink** on stderr, dropped entirely in silent mode.
//!
//! Silent mode therefore never loses a record; it only stops echoing it.
//!
//! The filter defaults to `info` (`debug` with `--verbose`) and yields to
//! `RUST_LOG` when that is set.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// What to log and where.
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Durable log file; `None` disables the file sink
    pub log_file: Option<PathBuf>,
    /// Suppress the console sink
    pub silent: bool,
    /// Lower the default level to `debug`
    pub verbose: bool,
}

/// Result of logging initialization.
#[derive(Debug, Default)]
pub struct LoggingStatus {
    /// Why the file sink is unavailable, if it is
    pub file_sink_error: Option<String>,
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

fn build_filter(verbose: bool) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("deb_updater=debug,info")
    } else {
        EnvFilter::new("info")
    }
}

/// Install the global tracing subscriber.
///
/// A log file that cannot be opened does not stop the run: the console sink
/// still works and the reason is returned in [`LoggingStatus`] (and logged as
/// a warning once the subscriber is up).
///
/// # Errors
///
/// Fails only if a global subscriber is already installed.
pub fn init_logging(options: &LoggingOptions) -> Result<LoggingStatus> {
    let mut status = LoggingStatus::default();

    let file = match options.log_file.as_deref().map(open_log_file).transpose() {
        Ok(file) => file,
        Err(e) => {
            status.file_sink_error = Some(format!("{e:#}"));
            None
        }
    };

    let file_layer = file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
    });

    let console_layer = (!options.silent).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
    });

    tracing_subscriber::registry()
        .with(build_filter(options.verbose))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    if let Some(reason) = &status.file_sink_error {
        tracing::warn!("Durable log sink unavailable, logging to console only: {reason}");
    }

    Ok(status)
}
