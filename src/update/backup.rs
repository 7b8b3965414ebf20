//! Pre-update version record.
//!
//! Before installing, the version that was installed is written to a small
//! JSON file so an operator can see what to roll back to. The record is
//! written to a temporary sibling and renamed into place; a reader never sees
//! a half-written file.

use crate::core::UpdaterError;
use crate::version::InstalledVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// One backup record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Package the record is about
    pub package: String,
    /// Version installed before the update
    pub version: InstalledVersion,
    /// When the record was written
    pub recorded_at: DateTime<Utc>,
}

/// Writes and reads the backup record file.
#[derive(Debug, Clone)]
pub struct BackupRecorder {
    path: PathBuf,
}

impl BackupRecorder {
    /// Recorder for the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Location of the record file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_error(&self, reason: impl std::fmt::Display) -> UpdaterError {
        UpdaterError::BackupError {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Record `version` of `package` as the pre-update state.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::BackupError`] if the record cannot be written.
    /// Callers treat this as non-fatal.
    pub async fn record(
        &self,
        package: &str,
        version: &InstalledVersion,
    ) -> Result<BackupRecord, UpdaterError> {
        let record = BackupRecord {
            package: package.to_string(),
            version: version.clone(),
            recorded_at: Utc::now(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.backup_error(format_args!("cannot create directory: {e}")))?;
            }
        }

        let json = serde_json::to_string_pretty(&record).map_err(|e| self.backup_error(e))?;
        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        debug!("Writing backup record to {}", temp_path.display());
        fs::write(&temp_path, json.as_bytes())
            .await
            .map_err(|e| self.backup_error(format_args!("cannot write: {e}")))?;
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(self.backup_error(format_args!("cannot move into place: {e}")));
        }

        info!(package, version = %version, "Recorded pre-update version");
        Ok(record)
    }

    /// The last record written, if any.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::BackupError`] if the file exists but cannot be
    /// read or parsed.
    pub async fn load(&self) -> Result<Option<BackupRecord>, UpdaterError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| self.backup_error(format_args!("corrupt record: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.backup_error(format_args!("cannot read: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionIdentifier;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_record_and_load() {
        let temp = TempDir::new().unwrap();
        let recorder = BackupRecorder::new(temp.path().join("state").join("backup.json"));
        let installed = InstalledVersion::Installed(VersionIdentifier::parse("0.0.76").unwrap());

        let written = recorder.record("discord", &installed).await.unwrap();
        let loaded = recorder.load().await.unwrap().unwrap();

        assert_eq!(loaded, written);
        assert_eq!(loaded.version, installed);
        assert!(!temp.path().join("state").join("backup.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_record_overwrites_previous() {
        let temp = TempDir::new().unwrap();
        let recorder = BackupRecorder::new(temp.path().join("backup.json"));

        recorder.record("discord", &InstalledVersion::NotInstalled).await.unwrap();
        let newer = InstalledVersion::Installed(VersionIdentifier::parse("0.0.77").unwrap());
        recorder.record("discord", &newer).await.unwrap();

        assert_eq!(recorder.load().await.unwrap().unwrap().version, newer);
    }

    #[tokio::test]
    async fn test_load_without_record() {
        let temp = TempDir::new().unwrap();
        let recorder = BackupRecorder::new(temp.path().join("backup.json"));
        assert!(recorder.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unwritable_location_is_backup_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let recorder = BackupRecorder::new(blocker.join("backup.json"));
        let err = recorder.record("discord", &InstalledVersion::NotInstalled).await.unwrap_err();
        assert!(matches!(err, UpdaterError::BackupError { .. }));
    }
}
