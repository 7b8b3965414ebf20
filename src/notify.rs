//! Desktop notifications after a successful update.
//!
//! Notifications are fire-and-forget: a missing `notify-send`, no session bus
//! or a slow notification daemon never affects the outcome of a run.
//!
//! `notify-send` talks to the session D-Bus of the calling user. The systemd
//! service written by `deb-updater schedule` runs as root outside any desktop
//! session, so timer-driven runs cannot reach a desktop and their
//! notifications are dropped (and logged at debug). Notifications are shown
//! for runs started from a desktop session, including through `sudo` when it
//! preserves `DBUS_SESSION_BUS_ADDRESS`.

use crate::core::UpdaterError;
use crate::update::UpdateOutcome;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Something that can show a short message to the user.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    /// Show `body` under `title`.
    ///
    /// # Errors
    ///
    /// Implementation specific; callers ignore failures.
    async fn notify(&self, title: &str, body: &str) -> Result<(), UpdaterError>;
}

/// Notifications through `notify-send`.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    timeout: Duration,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl DesktopNotifier {
    /// Notifier with a five second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), UpdaterError> {
        let program = crate::utils::platform::find_tool("notify-send")?;
        let line = format!("notify-send {title:?} {body:?}");

        let mut cmd = Command::new(program);
        cmd.args(["--app-name", crate::constants::BINARY_NAME, title, body])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| UpdaterError::CommandTimeout {
                command: line.clone(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| UpdaterError::CommandFailed {
                command: line.clone(),
                stderr: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(UpdaterError::CommandFailed {
                command: line,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Announce an `Updated` outcome; other outcomes are not announced.
///
/// Returns whether a notification was delivered.
pub async fn notify_outcome<N: Notifier>(notifier: &N, package: &str, outcome: &UpdateOutcome) -> bool {
    let UpdateOutcome::Updated {
        from,
        to,
    } = outcome
    else {
        return false;
    };

    let title = format!("{package} updated");
    let body = format!("{package} was updated from {from} to {to}");
    match notifier.notify(&title, &body).await {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Notification not delivered");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingNotifier;
    use crate::version::{InstalledVersion, VersionIdentifier};

    #[tokio::test]
    async fn test_only_updates_are_announced() {
        let notifier = RecordingNotifier::new();
        let version = VersionIdentifier::parse("0.0.77").unwrap();

        let up_to_date = UpdateOutcome::UpToDate {
            version: version.clone(),
        };
        assert!(!notify_outcome(&notifier, "discord", &up_to_date).await);

        let failed = UpdateOutcome::Failed(UpdaterError::AlreadyRunning {
            holder: 1,
        });
        assert!(!notify_outcome(&notifier, "discord", &failed).await);

        let updated = UpdateOutcome::Updated {
            from: InstalledVersion::NotInstalled,
            to: version,
        };
        assert!(notify_outcome(&notifier, "discord", &updated).await);

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "discord updated");
        assert_eq!(messages[0].1, "discord was updated from not_installed to 0.0.77");
    }

    #[tokio::test]
    async fn test_failing_notifier_is_ignored() {
        let notifier = RecordingNotifier::failing();
        let updated = UpdateOutcome::Updated {
            from: InstalledVersion::NotInstalled,
            to: VersionIdentifier::parse("1.0").unwrap(),
        };
        assert!(!notify_outcome(&notifier, "discord", &updated).await);
    }
}
