//! Configuration loading.
//!
//! Configuration is read from a TOML file, overlaid with command-line flags
//! and then frozen for the rest of the run. See [`UpdaterConfig`] for keys and
//! defaults.

mod updater;

pub use updater::{CliOverrides, UpdaterConfig};
