//! Core types shared by every part of deb-updater.
//!
//! Currently this is the error taxonomy and its console presentation; see
//! [`error`] for the mapping between failure modes and run outcomes.

pub mod error;

pub use error::{ErrorContext, UpdaterError, user_friendly_error};
