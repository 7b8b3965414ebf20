//! Artifact download.
//!
//! [`Fetcher`] is a single-attempt download into a local file; retry policy
//! belongs to whoever schedules the next run. [`HttpFetcher`] streams the
//! response body to disk so large packages never sit in memory.

use crate::core::UpdaterError;
use crate::utils::progress::DownloadProgress;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Download a URL into a local file.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    /// Fetch `url` into `destination`, replacing any existing file.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::DownloadError`] on transport errors, non-success
    /// HTTP status or local write failures.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, UpdaterError>;
}

/// HTTP(S) fetcher built on `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl HttpFetcher {
    /// Fetcher whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed (TLS backend unavailable).
    pub fn new(timeout: Duration) -> Result<Self, UpdaterError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpdaterError::Other {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            show_progress: false,
        })
    }

    /// Draw a progress bar while downloading.
    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

fn download_error(url: &str, reason: impl std::fmt::Display) -> UpdaterError {
    UpdaterError::DownloadError {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, UpdaterError> {
        info!("Downloading {url}");

        let response = self.client.get(url).send().await.map_err(|e| download_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(download_error(url, format_args!("HTTP {status}")));
        }
        debug!(final_url = %response.url(), content_length = ?response.content_length(), "Response received");

        let progress = DownloadProgress::new(response.content_length(), self.show_progress);
        let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
            download_error(url, format_args!("cannot create {}: {e}", destination.display()))
        })?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| download_error(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| download_error(url, format_args!("write failed: {e}")))?;
            written += chunk.len() as u64;
            progress.advance(chunk.len() as u64);
        }
        file.flush().await.map_err(|e| download_error(url, format_args!("flush failed: {e}")))?;
        progress.finish();

        info!(bytes = written, path = %destination.display(), "Download complete");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/download")
            .with_status(200)
            .with_body(b"!<arch>\npackage-bytes")
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("candidate.deb");
        let fetcher = HttpFetcher::new(Duration::from_secs(10)).unwrap();

        let written = fetcher.fetch(&format!("{}/download", server.url()), &dest).await.unwrap();

        mock.assert_async().await;
        assert_eq!(written, 21);
        assert_eq!(std::fs::read(&dest).unwrap(), b"!<arch>\npackage-bytes");
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect() {
        let mut server = mockito::Server::new_async().await;
        let target = format!("{}/files/discord-0.0.77.deb", server.url());
        let _redirect = server
            .mock("GET", "/api/download")
            .with_status(302)
            .with_header("location", &target)
            .create_async()
            .await;
        let _file = server
            .mock("GET", "/files/discord-0.0.77.deb")
            .with_status(200)
            .with_body("deb")
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("candidate.deb");
        let fetcher = HttpFetcher::new(Duration::from_secs(10)).unwrap();

        let written = fetcher.fetch(&format!("{}/api/download", server.url()), &dest).await.unwrap();
        assert_eq!(written, 3);
    }

    #[tokio::test]
    async fn test_http_error_status_is_download_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/missing").with_status(404).create_async().await;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("candidate.deb");
        let fetcher = HttpFetcher::new(Duration::from_secs(10)).unwrap();

        let err = fetcher.fetch(&format!("{}/missing", server.url()), &dest).await.unwrap_err();
        match err {
            UpdaterError::DownloadError {
                reason, ..
            } => assert!(reason.contains("404")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_download_error() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("candidate.deb");
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();

        let err = fetcher.fetch("http://127.0.0.1:1/download", &dest).await.unwrap_err();
        assert!(matches!(err, UpdaterError::DownloadError { .. }));
    }
}
