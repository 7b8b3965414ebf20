//! Update orchestration.
//!
//! One run moves through a fixed sequence of steps:
//!
//! ```text
//! Idle -> LockAcquired -> VersionResolved -> CandidateFetched
//!      -> CandidateValidated -> {Skipped | Installed | Failed} -> LockReleased
//! ```
//!
//! No step is repeated. Any failure jumps straight to `Failed`; the run lock
//! is released and the staging directory emptied on every path.
//!
//! # Components
//!
//! - [`UpdateOrchestrator`]: drives the run over injected collaborators
//! - [`StagingArea`]: the run-owned download directory
//! - [`backup::BackupRecorder`]: best-effort record of the pre-update version
//! - [`verification::ChecksumVerifier`]: optional SHA-256 check of the artifact
//! - [`decide`]: the install-or-skip rule
//!
//! # Install and repair
//!
//! A failed `dpkg -i` usually means missing dependencies. Exactly one
//! `apt-get install -f` pass follows, then a single check that the package
//! database reports the candidate version. There is no loop.

pub mod backup;
mod candidate;
mod orchestrator;
mod outcome;
mod staging;
pub mod verification;


pub use candidate::{UpdateCandidate, ValidatedCandidate};
pub use orchestrator::{RunTrigger, UpdateOrchestrator};
pub use outcome::{CheckReport, Decision, RunState, UpdateOutcome, decide};
pub use staging::{CANDIDATE_FILE_NAME, RUN_DIR_NAME, StagingArea};
