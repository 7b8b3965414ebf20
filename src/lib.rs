//! deb-updater: keep a Debian-packaged desktop application up to date.
//!
//! The tool checks whether the tracked package is outdated, downloads the
//! latest `.deb` from a fixed URL, validates it and installs it through
//! `dpkg`, optionally from a daily systemd timer.
//!
//! # Architecture
//!
//! [`update::UpdateOrchestrator`] runs one attempt end to end:
//!
//! ```text
//! acquire run lock -> resolve installed version -> fetch candidate
//!   -> validate candidate -> decide -> [backup -> install] -> release lock
//! ```
//!
//! Everything host-specific sits behind a trait so the orchestrator can be
//! exercised with fakes:
//!
//! | Concern | Trait | Production implementation |
//! |---|---|---|
//! | Single-instance guarantee | [`lock::RunLockProvider`] | [`lock::FileRunLock`] |
//! | Download | [`fetch::Fetcher`] | [`fetch::HttpFetcher`] |
//! | Package database and installs | [`package::PackageManager`] | [`package::DpkgPackageManager`] |
//! | Desktop notification | [`notify::Notifier`] | [`notify::DesktopNotifier`] |
//!
//! # Modules
//!
//! - [`cli`] - command-line parsing and subcommands
//! - [`config`] - TOML configuration with defaults and flag overrides
//! - [`constants`] - default paths and timeouts
//! - [`core`] - error types and user-facing error display
//! - [`fetch`] - artifact download
//! - [`lock`] - host-wide run lock
//! - [`notify`] - desktop notifications
//! - [`package`] - dpkg integration
//! - [`schedule`] - systemd timer units
//! - [`update`] - the orchestrator and its helpers
//! - [`utils`] - logging, paths and progress display
//! - [`version`] - Debian version parsing and ordering

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod fetch;
pub mod lock;
pub mod notify;
pub mod package;
pub mod schedule;
pub mod update;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
