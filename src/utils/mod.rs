//! Host utilities: logging setup, path expansion, tool lookup and progress
//! display.
//!
//! # Modules
//!
//! - [`logging`] - tracing subscriber with a durable file sink and a console sink
//! - [`platform`] - path expansion, `PATH` lookup and privilege checks
//! - [`progress`] - download progress bar

pub mod logging;
pub mod platform;
pub mod progress;

pub use logging::{LoggingOptions, LoggingStatus, init_logging};
pub use platform::{find_tool, is_root, resolve_path, resolve_path_buf, stderr_is_terminal};
pub use progress::DownloadProgress;
