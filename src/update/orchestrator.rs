//! One update attempt from lock to outcome.

use super::backup::BackupRecorder;
use super::candidate::{UpdateCandidate, ValidatedCandidate};
use super::outcome::{CheckReport, Decision, RunState, UpdateOutcome, decide};
use super::staging::StagingArea;
use super::verification::ChecksumVerifier;
use crate::config::UpdaterConfig;
use crate::core::UpdaterError;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::lock::{FileRunLock, LockGuard, RunLock, RunLockProvider};
use crate::package::{DpkgPackageManager, PackageManager};
use crate::utils::platform::stderr_is_terminal;
use crate::version::InstalledVersion;
use std::cell::Cell;
use tracing::{debug, error, info, warn};

/// What started the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunTrigger {
    /// Started by a person or script
    #[default]
    Manual,
    /// Started by the periodic timer; honours `auto_check`
    Scheduled,
}

/// Drives a single update attempt.
///
/// The orchestrator owns the run lock and the staging directory for the
/// duration of [`run`](Self::run) or [`check`](Self::check) and releases both
/// on every exit path.
pub struct UpdateOrchestrator<'a, L, F, P> {
    config: &'a UpdaterConfig,
    lock: L,
    fetcher: F,
    packages: P,
    backups: BackupRecorder,
    trigger: RunTrigger,
    state: Cell<RunState>,
}

impl<'a> UpdateOrchestrator<'a, FileRunLock, HttpFetcher, DpkgPackageManager> {
    /// Orchestrator wired to the real lock file, HTTP and dpkg.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn for_system(config: &'a UpdaterConfig) -> Result<Self, UpdaterError> {
        let fetcher = HttpFetcher::new(config.download_timeout())?
            .with_progress(!config.silent && stderr_is_terminal());
        let packages = DpkgPackageManager::new().with_elevation(config.elevate_with.clone());
        Ok(Self::new(config, FileRunLock::new(&config.lock_file), fetcher, packages))
    }
}

impl<'a, L, F, P> UpdateOrchestrator<'a, L, F, P>
where
    L: RunLockProvider,
    F: Fetcher,
    P: PackageManager,
{
    /// Orchestrator over the given collaborators.
    pub fn new(config: &'a UpdaterConfig, lock: L, fetcher: F, packages: P) -> Self {
        Self {
            config,
            lock,
            fetcher,
            packages,
            backups: BackupRecorder::new(&config.backup_file),
            trigger: RunTrigger::Manual,
            state: Cell::new(RunState::Idle),
        }
    }

    /// Mark the run as manual or timer-driven.
    #[must_use]
    pub const fn with_trigger(mut self, trigger: RunTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// The lock provider.
    pub const fn lock_provider(&self) -> &L {
        &self.lock
    }

    /// The package manager.
    pub const fn packages(&self) -> &P {
        &self.packages
    }

    /// Last state the run reached.
    pub fn state(&self) -> RunState {
        self.state.get()
    }

    fn transition(&self, next: RunState) {
        let previous = self.state.replace(next);
        debug!(from = ?previous, to = ?next, "Run state transition");
    }

    /// Take the host-wide run lock. The lock is released when the guard drops.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::AlreadyRunning`] if a live process holds the lock.
    pub fn acquire_lock(&self) -> Result<LockGuard<'_, L>, UpdaterError> {
        let guard = LockGuard::acquire(&self.lock)?;
        self.transition(RunState::LockAcquired);
        Ok(guard)
    }

    /// Release a lock taken outside a guard. Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates the provider's release error.
    pub fn release_lock(&self, lock: &RunLock) -> Result<(), UpdaterError> {
        self.lock.release(lock)
    }

    /// Installed version of the configured package; never fails.
    pub async fn resolve_installed_version(&self) -> InstalledVersion {
        let installed = self.packages.installed_version(&self.config.package_name).await;
        info!(package = %self.config.package_name, installed = %installed, "Resolved installed version");
        self.transition(RunState::VersionResolved);
        installed
    }

    /// Download `url` into the staging area. Single attempt.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::DownloadError`] if the transfer fails or leaves no
    /// data behind.
    pub async fn fetch_candidate(
        &self,
        url: &str,
        staging: &StagingArea,
    ) -> Result<UpdateCandidate, UpdaterError> {
        let path = staging.candidate_path();
        self.fetcher.fetch(url, &path).await?;

        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) | Err(_) => {
                return Err(UpdaterError::DownloadError {
                    url: url.to_string(),
                    reason: "no file was staged".to_string(),
                });
            }
        };
        if size == 0 {
            return Err(UpdaterError::DownloadError {
                url: url.to_string(),
                reason: "downloaded file is empty".to_string(),
            });
        }

        self.transition(RunState::CandidateFetched);
        Ok(UpdateCandidate::new(url, path, size))
    }

    /// Check structure, package name and (when configured) checksum.
    ///
    /// A rejected candidate's file is removed immediately.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::ValidationError`] describing the first failed check.
    pub async fn validate_candidate(
        &self,
        candidate: UpdateCandidate,
    ) -> Result<ValidatedCandidate, UpdaterError> {
        match self.check_candidate(&candidate).await {
            Ok(validated) => {
                self.transition(RunState::CandidateValidated);
                Ok(validated)
            }
            Err(e) => {
                warn!(path = %candidate.staging_path().display(), "Discarding rejected candidate");
                let _ = tokio::fs::remove_file(candidate.staging_path()).await;
                Err(e)
            }
        }
    }

    async fn check_candidate(
        &self,
        candidate: &UpdateCandidate,
    ) -> Result<ValidatedCandidate, UpdaterError> {
        if let Some(expected) = &self.config.expected_sha256 {
            ChecksumVerifier::verify_checksum(candidate.staging_path(), expected).await?;
        }

        let meta = self.packages.inspect(candidate.staging_path()).await?;
        if meta.package != self.config.package_name {
            return Err(UpdaterError::ValidationError {
                reason: format!(
                    "package name mismatch: expected '{}', found '{}'",
                    self.config.package_name, meta.package
                ),
            });
        }

        info!(
            package = %meta.package,
            version = %meta.version,
            source = candidate.source(),
            size = candidate.size(),
            "Candidate validated"
        );
        Ok(ValidatedCandidate::new(candidate.clone(), meta.package, meta.version))
    }

    /// Record the pre-update version. Failures are logged and swallowed.
    pub async fn backup(&self, installed: &InstalledVersion) {
        if !self.config.backup_enabled {
            debug!("Backups disabled, not recording pre-update version");
            return;
        }
        if let Err(e) = self.backups.record(&self.config.package_name, installed).await {
            warn!(error = %e, "Backup failed, continuing with install");
        }
    }

    /// Install the candidate, with one dependency repair pass on failure.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::InstallError`] if installation and repair both fail,
    /// or the package database does not report the candidate version after.
    pub async fn install(&self, candidate: &ValidatedCandidate) -> Result<(), UpdaterError> {
        let package = candidate.package();
        let install_error = |reason: String| UpdaterError::InstallError {
            package: package.to_string(),
            reason,
        };

        info!(package, version = %candidate.version(), "Installing");
        if let Err(first) = self.packages.install(candidate.candidate().staging_path()).await {
            warn!(error = %first, "Install failed, attempting dependency repair");
            self.packages
                .repair_dependencies()
                .await
                .map_err(|e| install_error(format!("{first}; dependency repair failed: {e}")))?;
        }

        match self.packages.installed_version(package).await {
            InstalledVersion::Installed(now) if &now == candidate.version() => Ok(()),
            other => Err(install_error(format!(
                "package database reports {other} after install, expected {}",
                candidate.version()
            ))),
        }
    }

    /// Perform one full update attempt.
    pub async fn run(&self) -> UpdateOutcome {
        if self.trigger == RunTrigger::Scheduled && !self.config.auto_check {
            let outcome = UpdateOutcome::Skipped {
                reason: "automatic checks disabled".to_string(),
            };
            info!("Run {outcome}");
            return outcome;
        }

        let guard = match self.acquire_lock() {
            Ok(guard) => guard,
            Err(e) => {
                if e.is_lock_contention() {
                    info!("{e}");
                } else {
                    error!("{e}");
                }
                self.transition(RunState::Failed);
                return UpdateOutcome::Failed(e);
            }
        };

        let outcome = match self.run_locked().await {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(kind = e.kind(), "Run aborted");
                self.transition(RunState::Failed);
                UpdateOutcome::Failed(e)
            }
        };

        if let Err(e) = guard.release() {
            warn!(error = %e, "Failed to release run lock");
        }
        self.transition(RunState::LockReleased);

        match &outcome {
            UpdateOutcome::Failed(_) => error!("Run {outcome}"),
            _ => info!("Run {outcome}"),
        }
        outcome
    }

    async fn run_locked(&self) -> Result<UpdateOutcome, UpdaterError> {
        let url = self.config.download_url.as_str();
        let staging = StagingArea::claim(&self.config.staging_dir, url)?;

        let installed = self.resolve_installed_version().await;
        let candidate = self.fetch_candidate(url, &staging).await?;
        let candidate = self.validate_candidate(candidate).await?;

        match decide(&installed, candidate.version(), self.config.force_update) {
            Decision::SkipUpToDate => {
                self.transition(RunState::Skipped);
                Ok(UpdateOutcome::UpToDate {
                    version: candidate.version().clone(),
                })
            }
            Decision::Install => {
                self.backup(&installed).await;
                self.install(&candidate).await?;
                self.transition(RunState::Installed);
                Ok(UpdateOutcome::Updated {
                    from: installed,
                    to: candidate.version().clone(),
                })
            }
        }
    }

    /// Find out whether an update is available without installing it.
    ///
    /// # Errors
    ///
    /// Lock, download and validation errors as in [`run`](Self::run).
    pub async fn check(&self) -> Result<CheckReport, UpdaterError> {
        let guard = self.acquire_lock()?;
        let result = self.check_locked().await;
        if let Err(e) = guard.release() {
            warn!(error = %e, "Failed to release run lock");
        }
        self.transition(RunState::LockReleased);
        result
    }

    async fn check_locked(&self) -> Result<CheckReport, UpdaterError> {
        let url = self.config.download_url.as_str();
        let staging = StagingArea::claim(&self.config.staging_dir, url)?;

        let installed = self.resolve_installed_version().await;
        let candidate = self.fetch_candidate(url, &staging).await?;
        let candidate = self.validate_candidate(candidate).await?;
        let decision = decide(&installed, candidate.version(), false);

        Ok(CheckReport {
            installed,
            candidate: candidate.version().clone(),
            decision,
        })
    }
}
