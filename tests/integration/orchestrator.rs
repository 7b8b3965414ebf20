use super::{is_empty_dir, isolated_config};
use anyhow::Result;
use deb_updater::core::UpdaterError;
use deb_updater::fetch::HttpFetcher;
use deb_updater::lock::{FileRunLock, RunLockProvider};
use deb_updater::test_utils::{
    FakeFetcher, FakePackageManager, InMemoryRunLock, init_test_logging, installed, version,
};
use deb_updater::update::{UpdateOrchestrator, UpdateOutcome};
use deb_updater::version::InstalledVersion;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_fresh_install_over_http() -> Result<()> {
    init_test_logging(None);
    let temp = TempDir::new()?;
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/download")
        .with_status(200)
        .with_body("!<arch>\ndebian-binary")
        .create_async()
        .await;

    let config = deb_updater::config::UpdaterConfig {
        download_url: format!("{}/api/download", server.url()),
        ..isolated_config(temp.path())
    };
    let orchestrator = UpdateOrchestrator::new(
        &config,
        FileRunLock::new(&config.lock_file),
        HttpFetcher::new(Duration::from_secs(10))?,
        FakePackageManager::new(InstalledVersion::NotInstalled, "discord", "1.2.3"),
    );

    let outcome = orchestrator.run().await;

    mock.assert_async().await;
    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            from: InstalledVersion::NotInstalled,
            to: version("1.2.3"),
        }
    );
    assert_eq!(outcome.exit_code(), 0);
    assert!(!config.lock_file.exists(), "lock file should be removed on release");
    assert!(is_empty_dir(&config.staging_dir));
    Ok(())
}

#[tokio::test]
async fn test_http_failure_releases_everything() -> Result<()> {
    let temp = TempDir::new()?;
    let mut server = mockito::Server::new_async().await;
    let _mock = server.mock("GET", "/api/download").with_status(503).create_async().await;

    let config = deb_updater::config::UpdaterConfig {
        download_url: format!("{}/api/download", server.url()),
        ..isolated_config(temp.path())
    };
    let lock = FileRunLock::new(&config.lock_file);
    let orchestrator = UpdateOrchestrator::new(
        &config,
        &lock,
        HttpFetcher::new(Duration::from_secs(10))?,
        FakePackageManager::new(installed("1.0"), "discord", "1.1"),
    );

    let outcome = orchestrator.run().await;

    assert!(matches!(outcome, UpdateOutcome::Failed(UpdaterError::DownloadError { .. })));
    assert_ne!(outcome.exit_code(), 0);
    assert!(is_empty_dir(&config.staging_dir));

    // The lock is free again
    let again = lock.acquire()?;
    lock.release(&again)?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() -> Result<()> {
    let temp = TempDir::new()?;
    let config = isolated_config(temp.path());

    let first = UpdateOrchestrator::new(
        &config,
        FileRunLock::new(&config.lock_file),
        FakeFetcher::serving("deb"),
        FakePackageManager::new(InstalledVersion::NotInstalled, "discord", "1.0"),
    );
    let second = UpdateOrchestrator::new(
        &config,
        FileRunLock::new(&config.lock_file),
        FakeFetcher::serving("deb"),
        FakePackageManager::new(InstalledVersion::NotInstalled, "discord", "1.0"),
    );

    let guard = first.acquire_lock()?;
    let outcome = second.run().await;

    match outcome {
        UpdateOutcome::Failed(UpdaterError::AlreadyRunning {
            holder,
        }) => assert_eq!(holder, std::process::id()),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(second.packages().calls().is_empty());
    assert!(!config.staging_dir.exists());

    drop(guard);
    assert!(matches!(second.run().await, UpdateOutcome::Updated { .. }));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_lock_left_by_killed_run_is_reclaimed() -> Result<()> {
    let temp = TempDir::new()?;
    let config = isolated_config(temp.path());

    let mut child = std::process::Command::new("true").spawn()?;
    let dead_pid = child.id();
    child.wait()?;
    std::fs::create_dir_all(config.lock_file.parent().unwrap())?;
    std::fs::write(&config.lock_file, format!("{{\"pid\":{dead_pid}}}"))?;

    let orchestrator = UpdateOrchestrator::new(
        &config,
        FileRunLock::new(&config.lock_file),
        FakeFetcher::serving("deb"),
        FakePackageManager::new(installed("1.0"), "discord", "1.0"),
    );

    let outcome = orchestrator.run().await;
    assert_eq!(
        outcome,
        UpdateOutcome::UpToDate {
            version: version("1.0")
        }
    );
    assert!(!config.lock_file.exists());
    Ok(())
}

#[tokio::test]
async fn test_repeated_runs_are_idempotent() -> Result<()> {
    let temp = TempDir::new()?;
    let config = isolated_config(temp.path());
    let orchestrator = UpdateOrchestrator::new(
        &config,
        InMemoryRunLock::new(),
        FakeFetcher::serving("deb"),
        FakePackageManager::new(installed("0.0.76"), "discord", "0.0.77"),
    );

    let first = orchestrator.run().await;
    let second = orchestrator.run().await;

    assert_eq!(
        first,
        UpdateOutcome::Updated {
            from: installed("0.0.76"),
            to: version("0.0.77"),
        }
    );
    assert_eq!(
        second,
        UpdateOutcome::UpToDate {
            version: version("0.0.77")
        }
    );
    assert_eq!(orchestrator.lock_provider().acquisitions(), 2);
    Ok(())
}
