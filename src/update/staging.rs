//! Run-owned staging directory.

use crate::core::UpdaterError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name given to the downloaded candidate inside the staging directory.
pub const CANDIDATE_FILE_NAME: &str = "candidate.deb";

/// Directory created under the configured `staging_dir` for a run's files.
///
/// Only this directory is ever cleared; anything else under `staging_dir`
/// is left alone.
pub const RUN_DIR_NAME: &str = "deb-updater-run";

/// Exclusive use of the run directory under `staging_dir` for one run.
///
/// Claiming removes whatever a previous (possibly killed) run left behind.
/// Dropping removes the run directory again, so every exit path leaves
/// `staging_dir` as it was before the run.
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Take over the run directory under `staging_dir`, starting it empty.
    ///
    /// Only call this while holding the run lock.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::DownloadError`] if the directory cannot be
    /// created or cleared, since nothing can be fetched without it.
    pub fn claim(staging_dir: &Path, url: &str) -> Result<Self, UpdaterError> {
        let area = Self {
            dir: staging_dir.join(RUN_DIR_NAME),
        };
        let staging_error = |e: io::Error| UpdaterError::DownloadError {
            url: url.to_string(),
            reason: format!("staging directory {} unusable: {e}", area.dir.display()),
        };

        area.remove().map_err(staging_error)?;
        fs::create_dir_all(&area.dir).map_err(staging_error)?;
        debug!(dir = %area.dir.display(), "Staging directory claimed");
        Ok(area)
    }

    /// The run directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the candidate is downloaded to.
    #[must_use]
    pub fn candidate_path(&self) -> PathBuf {
        self.dir.join(CANDIDATE_FILE_NAME)
    }

    /// Remove the run directory and everything in it.
    ///
    /// A symlink in its place is unlinked, never followed.
    ///
    /// # Errors
    ///
    /// Propagates the first removal failure.
    pub fn remove(&self) -> io::Result<()> {
        let meta = match fs::symlink_metadata(&self.dir) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if meta.is_dir() {
            fs::remove_dir_all(&self.dir)
        } else {
            fs::remove_file(&self.dir)
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        match self.remove() {
            Ok(()) => debug!(dir = %self.dir.display(), "Staging directory cleaned"),
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Failed to clean staging directory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn is_empty(dir: &Path) -> bool {
        fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_claim_wipes_leftovers() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        let run_dir = staging.join(RUN_DIR_NAME);
        fs::create_dir_all(run_dir.join("old")).unwrap();
        fs::write(run_dir.join("old").join("x"), "x").unwrap();
        fs::write(run_dir.join(CANDIDATE_FILE_NAME), "stale").unwrap();

        let area = StagingArea::claim(&staging, "https://example.com").unwrap();
        assert_eq!(area.dir(), run_dir);
        assert!(is_empty(area.dir()));
    }

    #[test]
    fn test_drop_removes_run_dir() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");

        {
            let area = StagingArea::claim(&staging, "https://example.com").unwrap();
            fs::write(area.candidate_path(), "package").unwrap();
        }

        assert!(staging.is_dir());
        assert!(is_empty(&staging));
    }

    #[test]
    fn test_unrelated_files_survive_claim_and_drop() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().to_path_buf();
        fs::write(staging.join("important.txt"), "keep").unwrap();
        fs::create_dir_all(staging.join("keep_dir")).unwrap();
        fs::write(staging.join("keep_dir").join("nested"), "keep").unwrap();

        {
            let area = StagingArea::claim(&staging, "https://example.com").unwrap();
            fs::write(area.candidate_path(), "package").unwrap();
        }

        assert_eq!(fs::read_to_string(staging.join("important.txt")).unwrap(), "keep");
        assert!(staging.join("keep_dir").join("nested").exists());
        assert!(!staging.join(RUN_DIR_NAME).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_run_dir_is_not_followed() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("elsewhere");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("precious"), "keep").unwrap();

        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        std::os::unix::fs::symlink(&target, staging.join(RUN_DIR_NAME)).unwrap();

        let area = StagingArea::claim(&staging, "https://example.com").unwrap();
        drop(area);

        assert!(target.join("precious").exists());
    }

    #[test]
    fn test_unusable_dir_is_download_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let err = StagingArea::claim(&blocker.join("staging"), "https://example.com").unwrap_err();
        assert!(matches!(err, UpdaterError::DownloadError { .. }));
    }
}
