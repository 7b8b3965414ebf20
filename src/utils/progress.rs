//! Download progress display.
//!
//! Progress is only drawn for interactive, non-silent runs. Set
//! `DEB_UPDATER_NO_PROGRESS` to disable it regardless; everything then goes
//! through a hidden bar that ignores updates.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// Environment variable that disables progress bars.
pub const NO_PROGRESS_ENV: &str = "DEB_UPDATER_NO_PROGRESS";

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold.cyan} {spinner:.cyan} {bytes} ({bytes_per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Byte counter for a single download.
#[derive(Clone)]
pub struct DownloadProgress {
    inner: IndicatifBar,
}

impl DownloadProgress {
    /// Bar for a download of `total` bytes, or a spinner when the length is
    /// unknown. Hidden when `visible` is false or progress is disabled.
    #[must_use]
    pub fn new(total: Option<u64>, visible: bool) -> Self {
        if !visible || is_progress_disabled() {
            return Self::hidden();
        }
        let inner = match total {
            Some(len) => IndicatifBar::new(len).with_style(download_style()),
            None => IndicatifBar::new_spinner().with_style(spinner_style()),
        };
        inner.set_prefix("Downloading");
        Self {
            inner,
        }
    }

    /// A bar that draws nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Record `bytes` more received.
    pub fn advance(&self, bytes: u64) {
        self.inner.inc(bytes);
    }

    /// Bytes recorded so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Remove the bar from the terminal.
    pub fn finish(&self) {
        self.inner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_still_counts() {
        let progress = DownloadProgress::new(Some(100), false);
        progress.advance(40);
        progress.advance(2);
        assert_eq!(progress.position(), 42);
        progress.finish();
    }

    #[test]
    fn test_unknown_length_uses_spinner() {
        let progress = DownloadProgress::hidden();
        progress.advance(7);
        assert_eq!(progress.position(), 7);
    }
}
