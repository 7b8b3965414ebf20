//! Test doubles and helpers.
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite. The fakes implement the same traits as the production
//! collaborators and record how they were used.

use crate::core::UpdaterError;
use crate::fetch::Fetcher;
use crate::lock::{RunLock, RunLockProvider};
use crate::notify::Notifier;
use crate::package::{PackageManager, PackageMetadata};
use crate::version::{InstalledVersion, VersionIdentifier};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging once per process.
///
/// With `level` the given level is used; otherwise `RUST_LOG` decides, and
/// without either nothing is logged.
///
/// ```bash
/// RUST_LOG=deb_updater=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Shorthand for a version that is known to parse.
///
/// # Panics
///
/// Panics if `version` is not a valid version string.
#[must_use]
pub fn version(version: &str) -> VersionIdentifier {
    VersionIdentifier::parse(version).unwrap_or_else(|e| panic!("bad test version: {e}"))
}

/// Shorthand for `InstalledVersion::Installed`.
#[must_use]
pub fn installed(v: &str) -> InstalledVersion {
    InstalledVersion::Installed(version(v))
}

#[derive(Debug, Clone)]
struct HeldLock {
    lock: RunLock,
    alive: bool,
}

/// Run lock kept in memory.
///
/// A pre-existing holder can be planted with [`held_by_live`](Self::held_by_live)
/// or [`held_by_dead`](Self::held_by_dead) to exercise contention and stale
/// reclamation.
#[derive(Debug, Default)]
pub struct InMemoryRunLock {
    held: Mutex<Option<HeldLock>>,
    acquisitions: Mutex<u32>,
}

impl InMemoryRunLock {
    /// Unheld lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock already held by a live process `pid`.
    #[must_use]
    pub fn held_by_live(pid: u32) -> Self {
        let lock = Self::new();
        *locked(&lock.held) = Some(HeldLock {
            lock: RunLock::new(pid),
            alive: true,
        });
        lock
    }

    /// Lock whose recorded holder `pid` has died.
    #[must_use]
    pub fn held_by_dead(pid: u32) -> Self {
        let lock = Self::new();
        *locked(&lock.held) = Some(HeldLock {
            lock: RunLock::new(pid),
            alive: false,
        });
        lock
    }

    /// Recorded holder, if any.
    #[must_use]
    pub fn holder(&self) -> Option<u32> {
        locked(&self.held).as_ref().map(|h| h.lock.holder())
    }

    /// Whether any record is present.
    #[must_use]
    pub fn is_held(&self) -> bool {
        locked(&self.held).is_some()
    }

    /// Successful acquisitions so far.
    #[must_use]
    pub fn acquisitions(&self) -> u32 {
        *locked(&self.acquisitions)
    }
}

impl RunLockProvider for InMemoryRunLock {
    fn acquire(&self) -> Result<RunLock, UpdaterError> {
        let mut held = locked(&self.held);
        if let Some(existing) = held.as_ref().filter(|h| h.alive) {
            return Err(UpdaterError::AlreadyRunning {
                holder: existing.lock.holder(),
            });
        }

        let lock = RunLock::for_current_process();
        *held = Some(HeldLock {
            lock: lock.clone(),
            alive: true,
        });
        *locked(&self.acquisitions) += 1;
        Ok(lock)
    }

    fn release(&self, lock: &RunLock) -> Result<(), UpdaterError> {
        let mut held = locked(&self.held);
        if held.as_ref().is_some_and(|h| h.lock == *lock) {
            *held = None;
        }
        Ok(())
    }
}

/// Fetcher that writes canned bytes or fails.
#[derive(Debug)]
pub struct FakeFetcher {
    body: Result<Vec<u8>, String>,
    requests: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeFetcher {
    /// Fetcher that writes `body` to the destination.
    pub fn serving(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Ok(body.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fetcher that fails every request with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            body: Err(reason.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(url, destination)` of every request.
    #[must_use]
    pub fn requests(&self) -> Vec<(String, PathBuf)> {
        locked(&self.requests).clone()
    }
}

impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, UpdaterError> {
        locked(&self.requests).push((url.to_string(), destination.to_path_buf()));
        match &self.body {
            Ok(body) => {
                std::fs::write(destination, body).map_err(|e| UpdaterError::DownloadError {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(body.len() as u64)
            }
            Err(reason) => Err(UpdaterError::DownloadError {
                url: url.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

/// How [`FakePackageManager`] responds to an install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallBehavior {
    /// `install` succeeds and the artifact version becomes installed
    #[default]
    Succeed,
    /// `install` fails; the repair pass completes the installation
    FailThenRepair,
    /// Both `install` and the repair pass fail
    FailAlways,
    /// `install` reports success but nothing changes
    NoEffect,
}

/// Calls made to [`FakePackageManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageCall {
    /// `installed_version`
    Query,
    /// `inspect` of the given path
    Inspect(PathBuf),
    /// `install` of the given path
    Install(PathBuf),
    /// `repair_dependencies`
    Repair,
}

/// Scripted package manager.
#[derive(Debug)]
pub struct FakePackageManager {
    installed: Mutex<InstalledVersion>,
    artifact: Result<PackageMetadata, String>,
    behavior: InstallBehavior,
    calls: Mutex<Vec<PackageCall>>,
}

impl FakePackageManager {
    /// Host with `installed`, where any inspected artifact declares
    /// `package` at `version`.
    pub fn new(installed: InstalledVersion, package: &str, declared: &str) -> Self {
        Self {
            installed: Mutex::new(installed),
            artifact: Ok(PackageMetadata {
                package: package.to_string(),
                version: version(declared),
            }),
            behavior: InstallBehavior::Succeed,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `inspect` reject the artifact as corrupt.
    #[must_use]
    pub fn with_corrupt_artifact(mut self, reason: impl Into<String>) -> Self {
        self.artifact = Err(reason.into());
        self
    }

    /// Script the install behaviour.
    #[must_use]
    pub const fn with_install_behavior(mut self, behavior: InstallBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<PackageCall> {
        locked(&self.calls).clone()
    }

    /// Whether `install` was ever called.
    #[must_use]
    pub fn install_attempted(&self) -> bool {
        self.calls().iter().any(|c| matches!(c, PackageCall::Install(_)))
    }

    /// Currently installed version.
    #[must_use]
    pub fn installed_now(&self) -> InstalledVersion {
        locked(&self.installed).clone()
    }

    fn complete_install(&self) {
        if let Ok(meta) = &self.artifact {
            *locked(&self.installed) = InstalledVersion::Installed(meta.version.clone());
        }
    }
}

impl PackageManager for FakePackageManager {
    async fn installed_version(&self, _package: &str) -> InstalledVersion {
        locked(&self.calls).push(PackageCall::Query);
        self.installed_now()
    }

    async fn inspect(&self, artifact: &Path) -> Result<PackageMetadata, UpdaterError> {
        locked(&self.calls).push(PackageCall::Inspect(artifact.to_path_buf()));
        if !artifact.is_file() {
            return Err(UpdaterError::ValidationError {
                reason: format!("{} does not exist", artifact.display()),
            });
        }
        self.artifact.clone().map_err(|reason| UpdaterError::ValidationError {
            reason,
        })
    }

    async fn install(&self, artifact: &Path) -> Result<(), UpdaterError> {
        locked(&self.calls).push(PackageCall::Install(artifact.to_path_buf()));
        match self.behavior {
            InstallBehavior::Succeed => {
                self.complete_install();
                Ok(())
            }
            InstallBehavior::NoEffect => Ok(()),
            InstallBehavior::FailThenRepair | InstallBehavior::FailAlways => {
                Err(UpdaterError::CommandFailed {
                    command: format!("dpkg -i {}", artifact.display()),
                    stderr: "dependency problems prevent configuration".to_string(),
                })
            }
        }
    }

    async fn repair_dependencies(&self) -> Result<(), UpdaterError> {
        locked(&self.calls).push(PackageCall::Repair);
        match self.behavior {
            InstallBehavior::FailThenRepair => {
                self.complete_install();
                Ok(())
            }
            InstallBehavior::FailAlways => Err(UpdaterError::CommandFailed {
                command: "apt-get install -f -y".to_string(),
                stderr: "unmet dependencies".to_string(),
            }),
            InstallBehavior::Succeed | InstallBehavior::NoEffect => Ok(()),
        }
    }
}

/// Notifier that remembers what it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    fail: bool,
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// Notifier that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier that fails every message.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// `(title, body)` of every delivered message.
    #[must_use]
    pub fn messages(&self) -> Vec<(String, String)> {
        locked(&self.messages).clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), UpdaterError> {
        if self.fail {
            return Err(UpdaterError::ToolNotFound {
                tool: "notify-send".to_string(),
            });
        }
        locked(&self.messages).push((title.to_string(), body.to_string()));
        Ok(())
    }
}
