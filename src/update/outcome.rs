//! Run results, install decisions and run states.

use crate::core::UpdaterError;
use crate::version::{InstalledVersion, VersionIdentifier};
use std::fmt;

/// Result of one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The installed version already matches the candidate.
    UpToDate {
        /// Installed (and candidate) version
        version: VersionIdentifier,
    },
    /// A new version was installed.
    Updated {
        /// Version before the update
        from: InstalledVersion,
        /// Version after the update
        to: VersionIdentifier,
    },
    /// The run stopped on an error.
    Failed(UpdaterError),
    /// The run did not attempt anything.
    Skipped {
        /// Why nothing was attempted
        reason: String,
    },
}

impl UpdateOutcome {
    /// Process exit code: `0` unless the run failed.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Failed(_) => 1,
            Self::UpToDate { .. } | Self::Updated { .. } | Self::Skipped { .. } => 0,
        }
    }

    /// Whether the run failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate {
                version,
            } => write!(f, "up to date ({version})"),
            Self::Updated {
                from,
                to,
            } => write!(f, "updated {from} -> {to}"),
            Self::Failed(error) => write!(f, "failed: {error}"),
            Self::Skipped {
                reason,
            } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Whether to install a validated candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Install the candidate
    Install,
    /// Leave the installed version alone
    SkipUpToDate,
}

/// Decide whether to install `candidate` over `installed`.
///
/// Installs when nothing is installed, when the versions differ under dpkg
/// ordering, or when `force` is set.
#[must_use]
pub fn decide(installed: &InstalledVersion, candidate: &VersionIdentifier, force: bool) -> Decision {
    if force {
        return Decision::Install;
    }
    match installed {
        InstalledVersion::NotInstalled => Decision::Install,
        InstalledVersion::Installed(current) if current == candidate => Decision::SkipUpToDate,
        InstalledVersion::Installed(_) => Decision::Install,
    }
}

/// Steps of a run, in order. Logged at debug level as the run moves through
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    Idle,
    LockAcquired,
    VersionResolved,
    CandidateFetched,
    CandidateValidated,
    Skipped,
    Installed,
    Failed,
    LockReleased,
}

/// What `check` found out without installing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Currently installed version
    pub installed: InstalledVersion,
    /// Version offered by the download URL
    pub candidate: VersionIdentifier,
    /// What a run would do (ignores `force_update`)
    pub decision: Decision,
}

impl CheckReport {
    /// Whether a run would install something.
    #[must_use]
    pub fn update_available(&self) -> bool {
        self.decision == Decision::Install
    }
}
