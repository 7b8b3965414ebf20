//! Error handling for deb-updater
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** so the orchestrator can tell a lock conflict
//!    from a broken download or a failed install.
//! 2. **User-friendly messages** with actionable suggestions when the CLI
//!    reports a failure on the console.
//!
//! # Architecture
//!
//! - [`UpdaterError`] - every failure mode of an update run
//! - [`ErrorContext`] - wraps an error with details and a suggestion for display
//!
//! Use [`user_friendly_error`] to turn any [`anyhow::Error`] into an
//! [`ErrorContext`] before showing it to the user.
//!
//! # Fatal vs. non-fatal
//!
//! | Variant | Effect on the run |
//! |---------|-------------------|
//! | `AlreadyRunning` | aborts before any side effect |
//! | `DownloadError` | fatal, lock released, staging wiped |
//! | `ValidationError` | fatal, candidate discarded |
//! | `InstallError` | fatal after one repair pass |
//! | `BackupError` | logged only |
//!
//! # Examples
//!
//! ```rust,no_run
//! use deb_updater::core::{ErrorContext, UpdaterError, user_friendly_error};
//!
//! let error = UpdaterError::ValidationError {
//!     reason: "package name mismatch".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for update runs.
///
/// Variants carry owned strings rather than source errors so an error can be
/// cloned into an [`UpdateOutcome`](crate::update::UpdateOutcome) and still be
/// logged or displayed afterwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdaterError {
    /// Another process holds the run lock.
    ///
    /// `holder` is the process id recorded in the lock file, or `0` when the
    /// record could not be read.
    #[error("Another update run is already in progress (pid {holder})")]
    AlreadyRunning {
        /// Process id of the live holder
        holder: u32,
    },

    /// The run lock could not be created, read or written.
    #[error("Run lock error at {path}: {reason}")]
    LockError {
        /// Lock file path
        path: String,
        /// What went wrong
        reason: String,
    },

    /// Downloading the candidate package failed or produced an empty file.
    #[error("Failed to download {url}: {reason}")]
    DownloadError {
        /// Source URL of the candidate
        url: String,
        /// Transport or filesystem failure
        reason: String,
    },

    /// The staged artifact is not an installable package for the target.
    #[error("Candidate package failed validation: {reason}")]
    ValidationError {
        /// Why the candidate was rejected
        reason: String,
    },

    /// The package manager could not install the candidate, even after the
    /// dependency repair pass.
    #[error("Installation of {package} failed: {reason}")]
    InstallError {
        /// Package being installed
        package: String,
        /// Package manager failure
        reason: String,
    },

    /// Recording the previously installed version failed.
    #[error("Failed to record backup at {path}: {reason}")]
    BackupError {
        /// Backup record path
        path: String,
        /// What went wrong
        reason: String,
    },

    /// A required system tool is missing from `PATH`.
    #[error("Required tool '{tool}' was not found in PATH")]
    ToolNotFound {
        /// Executable name
        tool: String,
    },

    /// An external command exited unsuccessfully.
    #[error("Command '{command}' failed: {stderr}")]
    CommandFailed {
        /// Command line that was run
        command: String,
        /// Captured error output
        stderr: String,
    },

    /// An external command did not finish in time.
    #[error("Command '{command}' timed out after {seconds} seconds")]
    CommandTimeout {
        /// Command line that was run
        command: String,
        /// Timeout that elapsed
        seconds: u64,
    },

    /// The configuration file could not be parsed.
    #[error("Invalid configuration in {file}: {reason}")]
    ConfigError {
        /// Config file path
        file: String,
        /// Parse failure
        reason: String,
    },

    /// A version string does not follow Debian version syntax.
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// Offending input
        version: String,
        /// Syntax rule that was violated
        reason: String,
    },

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl UpdaterError {
    /// Whether this error means another instance is already doing the work.
    ///
    /// Lock contention ends the run but is not a problem with the host.
    #[must_use]
    pub const fn is_lock_contention(&self) -> bool {
        matches!(self, Self::AlreadyRunning { .. })
    }

    /// Short machine-friendly name of the variant, used in log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyRunning { .. } => "AlreadyRunning",
            Self::LockError { .. } => "LockError",
            Self::DownloadError { .. } => "DownloadError",
            Self::ValidationError { .. } => "ValidationError",
            Self::InstallError { .. } => "InstallError",
            Self::BackupError { .. } => "BackupError",
            Self::ToolNotFound { .. } => "ToolNotFound",
            Self::CommandFailed { .. } => "CommandFailed",
            Self::CommandTimeout { .. } => "CommandTimeout",
            Self::ConfigError { .. } => "ConfigError",
            Self::InvalidVersion { .. } => "InvalidVersion",
            Self::Other { .. } => "Other",
        }
    }
}

/// Error wrapper that adds details and a suggestion for the console.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdaterError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context without details or suggestion.
    #[must_use]
    pub const fn new(error: UpdaterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(updater_error) = error.downcast_ref::<UpdaterError>() {
        return create_error_context(updater_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(UpdaterError::Other {
                message: error.to_string(),
            })
            .with_suggestion("Run as root or via sudo, or point the paths in the config file at writable locations");
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(UpdaterError::ConfigError {
            file: "config.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the config file, or regenerate it with `deb-updater config init --force`");
    }

    // Keep the full anyhow chain so the context messages are not lost
    ErrorContext::new(UpdaterError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: UpdaterError) -> ErrorContext {
    match &error {
        UpdaterError::AlreadyRunning { holder } => {
            let details = format!("Process {holder} holds the run lock");
            ErrorContext::new(error)
                .with_details(details)
                .with_suggestion("Wait for the other run to finish; a lock left by a dead process is reclaimed automatically")
        }
        UpdaterError::LockError { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the lock file directory exists and is writable (see `lock_file` in the config)"),
        UpdaterError::DownloadError { .. } => ErrorContext::new(error)
            .with_suggestion("Check your network connection and the `download_url` setting")
            .with_details("Downloads are attempted once per run; the next scheduled run will try again"),
        UpdaterError::ValidationError { .. } => ErrorContext::new(error)
            .with_suggestion("Verify that `download_url` serves a .deb for the configured `package_name`")
            .with_details("The downloaded file was discarded and nothing was installed"),
        UpdaterError::InstallError { .. } => ErrorContext::new(error)
            .with_suggestion("Run `sudo apt-get install -f` manually and inspect the dpkg output")
            .with_details("A dependency repair pass was already attempted"),
        UpdaterError::ToolNotFound { tool } => {
            let suggestion = format!("Install the package providing '{tool}' or fix your PATH");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        UpdaterError::CommandFailed { .. } | UpdaterError::CommandTimeout { .. } => {
            ErrorContext::new(error).with_suggestion("Re-run with --verbose to see the full command output")
        }
        UpdaterError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the config file or regenerate it with `deb-updater config init --force`"),
        UpdaterError::InvalidVersion { .. }
        | UpdaterError::BackupError { .. }
        | UpdaterError::Other { .. } => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = UpdaterError::AlreadyRunning {
            holder: 4242,
        };
        assert_eq!(error.to_string(), "Another update run is already in progress (pid 4242)");

        let error = UpdaterError::ValidationError {
            reason: "expected package 'discord', found 'slack'".to_string(),
        };
        assert!(error.to_string().contains("expected package 'discord'"));
    }

    #[test]
    fn test_lock_contention_classification() {
        assert!(
            UpdaterError::AlreadyRunning {
                holder: 1
            }
            .is_lock_contention()
        );
        assert!(
            !UpdaterError::DownloadError {
                url: "https://example.com".to_string(),
                reason: "timeout".to_string(),
            }
            .is_lock_contention()
        );
    }

    #[test]
    fn test_user_friendly_error_keeps_typed_error() {
        let error = anyhow::Error::from(UpdaterError::InstallError {
            package: "discord".to_string(),
            reason: "dependency problems".to_string(),
        });
        let ctx = user_friendly_error(error);

        assert!(matches!(ctx.error, UpdaterError::InstallError { .. }));
        assert!(ctx.suggestion.as_deref().unwrap().contains("apt-get install -f"));
    }

    #[test]
    fn test_user_friendly_error_preserves_anyhow_chain() {
        let error = anyhow::anyhow!("root cause").context("Failed to write unit file");
        let ctx = user_friendly_error(error);

        let message = ctx.to_string();
        assert!(message.contains("Failed to write unit file"));
        assert!(message.contains("root cause"));
    }

    #[test]
    fn test_error_context_formatting() {
        let ctx = ErrorContext::new(UpdaterError::Other {
            message: "boom".to_string(),
        })
        .with_details("some details")
        .with_suggestion("try again");

        assert_eq!(ctx.to_string(), "boom\nDetails: some details\nSuggestion: try again");
    }
}
