//! File-backed run lock.
//!
//! Mutual exclusion comes from an OS advisory lock (`flock` on Unix, `LockFile`
//! on Windows, both through [`fs4`]) held on the lock file for the whole run.
//! The file's contents record the holder so a second invocation can report
//! who is running, and so a record left behind by a killed run can be told
//! apart from a live one.
//!
//! # Acquisition
//!
//! 1. Open (or create) the lock file without truncating it
//! 2. `try_lock_exclusive`; if another handle holds it, fail with `AlreadyRunning`
//! 3. Make sure the path still points at the inode we locked; if a releasing
//!    run unlinked it in between, reopen once
//! 4. If the existing record names a live process other than us, fail
//! 5. Otherwise (no record, or a stale one) write our own record
//!
//! The OS lock is released automatically when a process dies, which is what
//! makes a killed run's record reclaimable.

use super::process::is_pid_alive;
use super::{LockRecord, RunLock, RunLockProvider};
use crate::core::UpdaterError;
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

const LOCK_ATTEMPTS: usize = 2;

/// Run lock stored at a fixed path.
#[derive(Debug)]
pub struct FileRunLock {
    path: PathBuf,
    /// Locked handle while held; dropping it releases the OS lock
    handle: Mutex<Option<File>>,
}

impl FileRunLock {
    /// Lock backed by the file at `path`. Nothing is touched until `acquire`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            handle: Mutex::new(None),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record currently stored at the lock path, if any.
    #[must_use]
    pub fn current_record(&self) -> Option<LockRecord> {
        fs::read_to_string(&self.path).ok().and_then(|contents| LockRecord::parse(&contents))
    }

    fn lock_error(&self, reason: impl std::fmt::Display) -> UpdaterError {
        UpdaterError::LockError {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn open(&self) -> Result<File, UpdaterError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    self.lock_error(format_args!("cannot create {}: {e}", parent.display()))
                })?;
            }
        }

        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| self.lock_error(format_args!("cannot open lock file: {e}")))
    }

    /// Whether the lock path still refers to the file we hold open.
    ///
    /// A previous holder may have unlinked the path between our `open` and our
    /// `flock`; locking the orphaned inode would not exclude anyone.
    #[cfg(unix)]
    fn still_linked(&self, file: &File) -> bool {
        use std::os::unix::fs::MetadataExt;

        match (fs::metadata(&self.path), file.metadata()) {
            (Ok(on_disk), Ok(held)) => on_disk.dev() == held.dev() && on_disk.ino() == held.ino(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    fn still_linked(&self, _file: &File) -> bool {
        true
    }

    /// Open the lock path and take the OS lock on it.
    ///
    /// The path is reopened once if the file we locked was unlinked in the
    /// meantime.
    fn open_locked(&self) -> Result<File, UpdaterError> {
        for _ in 0..LOCK_ATTEMPTS {
            if let Some(file) = self.lock_opened(self.open()?)? {
                return Ok(file);
            }
            debug!(path = %self.path.display(), "Lock file replaced while locking, reopening");
        }
        Err(UpdaterError::AlreadyRunning {
            holder: self.current_record().map_or(0, |record| record.pid),
        })
    }

    /// Lock an opened handle. `None` when the handle no longer matches the path.
    fn lock_opened(&self, mut file: File) -> Result<Option<File>, UpdaterError> {
        match file.try_lock_exclusive() {
            Ok(true) => {}
            Ok(false) => {
                let holder = read_record(&mut file).ok().flatten().map_or(0, |record| record.pid);
                return Err(UpdaterError::AlreadyRunning {
                    holder,
                });
            }
            Err(e) => return Err(self.lock_error(format_args!("cannot lock: {e}"))),
        }

        if self.still_linked(&file) {
            Ok(Some(file))
        } else {
            let _ = FileExt::unlock(&file);
            Ok(None)
        }
    }
}

fn read_record(file: &mut File) -> io::Result<Option<LockRecord>> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(LockRecord::parse(&contents))
}

fn write_record(file: &mut File, record: &LockRecord) -> io::Result<()> {
    let json = serde_json::to_string(record).map_err(io::Error::other)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()
}

impl RunLockProvider for FileRunLock {
    fn acquire(&self) -> Result<RunLock, UpdaterError> {
        let mut held = self.handle.lock().map_err(|_| self.lock_error("lock state poisoned"))?;
        if held.is_some() {
            return Err(UpdaterError::AlreadyRunning {
                holder: std::process::id(),
            });
        }

        debug!(path = %self.path.display(), "Acquiring run lock");
        let mut file = self.open_locked()?;

        let previous = read_record(&mut file)
            .map_err(|e| self.lock_error(format_args!("cannot read lock file: {e}")))?;

        if let Some(previous) = previous {
            let own_pid = std::process::id();
            if previous.pid != own_pid && is_pid_alive(previous.pid) {
                // Holder is alive but not holding the OS lock; honour the record
                let _ = FileExt::unlock(&file);
                return Err(UpdaterError::AlreadyRunning {
                    holder: previous.pid,
                });
            }
            warn!(stale_pid = previous.pid, path = %self.path.display(), "Reclaiming stale run lock");
        }

        let lock = RunLock::for_current_process();
        write_record(&mut file, &lock.record())
            .map_err(|e| self.lock_error(format_args!("cannot write lock file: {e}")))?;

        *held = Some(file);
        info!(pid = lock.holder(), "Run lock acquired");
        Ok(lock)
    }

    fn release(&self, lock: &RunLock) -> Result<(), UpdaterError> {
        let mut held = self.handle.lock().map_err(|_| self.lock_error("lock state poisoned"))?;
        let Some(file) = held.take() else {
            debug!(path = %self.path.display(), "Run lock already released");
            return Ok(());
        };

        let result = match self.current_record() {
            Some(record) if record.names(lock) => match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(self.lock_error(format_args!("cannot remove lock file: {e}"))),
            },
            Some(record) => {
                warn!(
                    recorded_pid = record.pid,
                    our_pid = lock.holder(),
                    "Lock file names another holder; leaving it in place"
                );
                Ok(())
            }
            None => Ok(()),
        };

        if let Err(e) = FileExt::unlock(&file) {
            debug!(error = %e, "Explicit unlock failed; closing the handle releases it");
        }
        drop(file);

        result
    }
}
