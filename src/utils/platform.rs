//! Host helpers: path expansion, tool lookup and privilege checks.

use crate::core::UpdaterError;
use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Expand `~` and `$VAR`/`${VAR}` in a configured path.
///
/// # Errors
///
/// Fails when the path references an unset environment variable or the home
/// directory cannot be determined.
///
/// # Examples
///
/// ```rust,no_run
/// use deb_updater::utils::platform::resolve_path;
///
/// # fn example() -> anyhow::Result<()> {
/// let log = resolve_path("~/.local/state/deb-updater.log")?;
/// assert!(log.is_absolute());
/// # Ok(())
/// # }
/// ```
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Same as [`resolve_path`] for an already-typed path.
///
/// Non-UTF-8 paths are returned unchanged.
///
/// # Errors
///
/// See [`resolve_path`].
pub fn resolve_path_buf(path: &Path) -> Result<PathBuf> {
    match path.to_str() {
        Some(text) => resolve_path(text),
        None => Ok(path.to_path_buf()),
    }
}

/// Locate an executable on `PATH`.
///
/// # Errors
///
/// Returns [`UpdaterError::ToolNotFound`] if `tool` is not found.
pub fn find_tool(tool: &str) -> Result<PathBuf, UpdaterError> {
    which::which(tool).map_err(|_| UpdaterError::ToolNotFound {
        tool: tool.to_string(),
    })
}

/// Whether the process runs with root privileges.
#[must_use]
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail.
        #[allow(unsafe_code)]
        let euid = unsafe { libc::geteuid() };
        euid == 0
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// Whether stderr is attached to a terminal, used to decide on progress bars.
#[must_use]
pub fn stderr_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}
