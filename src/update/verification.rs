//! SHA-256 verification of staged artifacts.

use crate::core::UpdaterError;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Checksum helpers for downloaded packages.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Strip an optional `sha256:` prefix and lowercase the digest.
    #[must_use]
    pub fn normalize(digest: &str) -> String {
        let trimmed = digest.trim();
        trimmed.strip_prefix("sha256:").unwrap_or(trimmed).to_ascii_lowercase()
    }

    /// Whether `digest` is a plausible SHA-256 hex digest.
    #[must_use]
    pub fn is_valid_digest(digest: &str) -> bool {
        let normalized = Self::normalize(digest);
        normalized.len() == 64 && normalized.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Hex-encoded SHA-256 of the file.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::ValidationError`] if the file cannot be read.
    pub async fn compute_sha256(file_path: &Path) -> Result<String, UpdaterError> {
        debug!("Computing SHA256 checksum for: {}", file_path.display());

        let read_error = |e: std::io::Error| UpdaterError::ValidationError {
            reason: format!("cannot read {}: {e}", file_path.display()),
        };
        let mut file = tokio::fs::File::open(file_path).await.map_err(read_error)?;

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let read = file.read(&mut buffer).await.map_err(read_error)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Check the file against an expected digest, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::ValidationError`] on mismatch or read failure.
    pub async fn verify_checksum(file_path: &Path, expected: &str) -> Result<(), UpdaterError> {
        let actual = Self::compute_sha256(file_path).await?;
        let expected = Self::normalize(expected);

        if actual != expected {
            return Err(UpdaterError::ValidationError {
                reason: format!("checksum mismatch: expected {expected}, got {actual}"),
            });
        }

        info!("Checksum verification successful");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // sha256("hello world")
    const HELLO: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[tokio::test]
    async fn test_compute_sha256() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.deb");
        std::fs::write(&path, b"hello world").unwrap();

        assert_eq!(ChecksumVerifier::compute_sha256(&path).await.unwrap(), HELLO);
    }

    #[tokio::test]
    async fn test_verify_accepts_prefix_and_uppercase() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.deb");
        std::fs::write(&path, b"hello world").unwrap();

        let expected = format!("sha256:{}", HELLO.to_uppercase());
        ChecksumVerifier::verify_checksum(&path, &expected).await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_rejects_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.deb");
        std::fs::write(&path, b"hello world!").unwrap();

        let err = ChecksumVerifier::verify_checksum(&path, HELLO).await.unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_digest_shape() {
        assert!(ChecksumVerifier::is_valid_digest(HELLO));
        assert!(ChecksumVerifier::is_valid_digest(&format!("sha256:{HELLO}")));
        assert!(!ChecksumVerifier::is_valid_digest("abc"));
        assert!(!ChecksumVerifier::is_valid_digest(&"g".repeat(64)));
    }
}
