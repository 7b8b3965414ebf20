//! Host-wide run lock.
//!
//! Only one update run may be active on a host. The lock is modelled as a
//! capability, [`RunLockProvider`], so the orchestrator does not care whether
//! it is backed by a file ([`FileRunLock`]) or by memory (the fake in
//! `test_utils`).
//!
//! # Lock semantics
//!
//! - A lock records its holder's process id and acquisition time.
//! - Acquiring fails with [`UpdaterError::AlreadyRunning`] while the recorded
//!   holder is alive.
//! - A record whose holder process no longer exists is stale and is
//!   overwritten by the next acquirer.
//! - Releasing is idempotent and only removes the record if it still names
//!   the releasing holder, so a run never deletes a lock a newer process has
//!   since taken over.
//!
//! [`LockGuard`] ties release to scope: the lock is released when the guard is
//! dropped, on every exit path of a run including early returns and panics.

mod file;
pub mod process;

pub use file::FileRunLock;

use crate::core::UpdaterError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Proof that the current process holds the run lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLock {
    holder: u32,
    acquired_at: DateTime<Utc>,
}

impl RunLock {
    /// A lock held by `holder`, acquired now.
    #[must_use]
    pub fn new(holder: u32) -> Self {
        Self {
            holder,
            acquired_at: Utc::now(),
        }
    }

    /// A lock held by the current process.
    #[must_use]
    pub fn for_current_process() -> Self {
        Self::new(std::process::id())
    }

    /// Process id of the holder.
    #[must_use]
    pub const fn holder(&self) -> u32 {
        self.holder
    }

    /// When the lock was acquired.
    #[must_use]
    pub const fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// The persisted form of this lock.
    #[must_use]
    pub const fn record(&self) -> LockRecord {
        LockRecord {
            pid: self.holder,
            acquired_at: Some(self.acquired_at),
        }
    }
}

/// Persisted lock state.
///
/// `acquired_at` is optional so a bare pid written by older tooling is still
/// understood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Holder process id
    pub pid: u32,
    /// Acquisition time, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired_at: Option<DateTime<Utc>>,
}

impl LockRecord {
    /// Parse lock file contents: JSON, or a plain pid.
    #[must_use]
    pub fn parse(contents: &str) -> Option<Self> {
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return None;
        }
        serde_json::from_str(trimmed).ok().or_else(|| {
            trimmed.parse::<u32>().ok().map(|pid| Self {
                pid,
                acquired_at: None,
            })
        })
    }

    /// Whether this record was written for `lock`.
    #[must_use]
    pub fn names(&self, lock: &RunLock) -> bool {
        self.pid == lock.holder && self.acquired_at == Some(lock.acquired_at)
    }
}

/// Capability to take and give back the host-wide run lock.
pub trait RunLockProvider {
    /// Take the lock for the current process.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::AlreadyRunning`] when a live process holds the lock
    /// - [`UpdaterError::LockError`] when lock state cannot be read or written
    fn acquire(&self) -> Result<RunLock, UpdaterError>;

    /// Give the lock back. Calling this more than once is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::LockError`] if persisted state could not be
    /// removed.
    fn release(&self, lock: &RunLock) -> Result<(), UpdaterError>;
}

impl<P: RunLockProvider + ?Sized> RunLockProvider for &P {
    fn acquire(&self) -> Result<RunLock, UpdaterError> {
        (**self).acquire()
    }

    fn release(&self, lock: &RunLock) -> Result<(), UpdaterError> {
        (**self).release(lock)
    }
}

/// Scoped ownership of the run lock; releases on drop.
pub struct LockGuard<'a, P: RunLockProvider + ?Sized> {
    provider: &'a P,
    lock: RunLock,
    released: bool,
}

impl<'a, P: RunLockProvider + ?Sized> LockGuard<'a, P> {
    /// Acquire the lock and wrap it in a guard.
    ///
    /// # Errors
    ///
    /// Propagates the provider's acquisition error; nothing is held in that case.
    pub fn acquire(provider: &'a P) -> Result<Self, UpdaterError> {
        let lock = provider.acquire()?;
        debug!(holder = lock.holder(), "Run lock acquired");
        Ok(Self {
            provider,
            lock,
            released: false,
        })
    }

    /// The held lock.
    #[must_use]
    pub const fn lock(&self) -> &RunLock {
        &self.lock
    }

    /// Release explicitly and report the result.
    ///
    /// # Errors
    ///
    /// Propagates the provider's release error.
    pub fn release(mut self) -> Result<(), UpdaterError> {
        self.released = true;
        self.provider.release(&self.lock)
    }
}

impl<P: RunLockProvider + ?Sized> Drop for LockGuard<'_, P> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.provider.release(&self.lock) {
            Ok(()) => debug!(holder = self.lock.holder(), "Run lock released"),
            Err(e) => warn!(error = %e, "Failed to release run lock"),
        }
    }
}
