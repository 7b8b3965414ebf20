use super::isolated_config;
use anyhow::Result;
use assert_cmd::Command;
use deb_updater::config::UpdaterConfig;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write an isolated config into `root` and return its path.
async fn write_config(root: &Path, adjust: impl FnOnce(&mut UpdaterConfig)) -> Result<PathBuf> {
    let mut config = isolated_config(root);
    config.package_name = "deb-updater-test-absent-package".to_string();
    adjust(&mut config);
    let path = root.join("config.toml");
    config.save_to(&path).await?;
    Ok(path)
}

fn deb_updater() -> Command {
    let mut cmd = Command::cargo_bin("deb-updater").unwrap();
    cmd.env_remove("DEB_UPDATER_CONFIG").env_remove("RUST_LOG").env("DEB_UPDATER_NO_PROGRESS", "1");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    deb_updater()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("installed"))
        .stdout(predicate::str::contains("schedule"));
}

#[test]
fn test_version_flag() {
    deb_updater()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_config_show_reflects_file_and_flags() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(temp.path(), |_| {}).await?;

    deb_updater()
        .args(["--config", config.to_str().unwrap(), "--silent", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("package_name = \"deb-updater-test-absent-package\""))
        .stdout(predicate::str::contains("silent = true"));
    Ok(())
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("etc").join("config.toml");
    let path_arg = path.to_str().unwrap();

    deb_updater().args(["--config", path_arg, "config", "init"]).assert().success();
    assert!(path.exists());

    deb_updater()
        .args(["--config", path_arg, "config", "init"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    deb_updater().args(["--config", path_arg, "config", "init", "--force"]).assert().success();
}

#[test]
fn test_malformed_config_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "auto_check = [").unwrap();

    deb_updater()
        .args(["--config", path.to_str().unwrap(), "installed"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_malformed_config_is_logged_but_not_echoed_when_silent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "auto_check = [").unwrap();
    let log = temp.path().join("log").join("u.log");

    deb_updater()
        .args([
            "--silent",
            "--log-file",
            log.to_str().unwrap(),
            "--config",
            path.to_str().unwrap(),
            "run",
        ])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("ERROR"), "log was: {contents}");
    assert!(contents.contains("Invalid configuration"), "log was: {contents}");
}

#[tokio::test]
async fn test_schedule_print() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(temp.path(), |_| {}).await?;

    deb_updater()
        .args(["--config", config.to_str().unwrap(), "schedule", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OnCalendar=daily"))
        .stdout(predicate::str::contains("RandomizedDelaySec=1h"))
        .stdout(predicate::str::contains("Persistent=true"))
        .stdout(predicate::str::contains("--silent run --scheduled"))
        .stdout(predicate::str::contains(format!("--config {}", config.display())));
    Ok(())
}

#[tokio::test]
async fn test_schedule_writes_units() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(temp.path(), |_| {}).await?;
    let unit_dir = temp.path().join("units");

    deb_updater()
        .args([
            "--config",
            config.to_str().unwrap(),
            "schedule",
            "--unit-dir",
            unit_dir.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(unit_dir.join("deb-updater.service").exists());
    assert!(unit_dir.join("deb-updater.timer").exists());
    Ok(())
}

#[tokio::test]
async fn test_installed_reports_absent_package() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(temp.path(), |_| {}).await?;

    deb_updater()
        .args(["--config", config.to_str().unwrap(), "installed"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("not_installed"));
    Ok(())
}

#[tokio::test]
async fn test_scheduled_run_skipped_when_auto_check_disabled() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(temp.path(), |c| c.auto_check = false).await?;

    deb_updater()
        .args(["--config", config.to_str().unwrap(), "run", "--scheduled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped: automatic checks disabled"));

    assert!(!temp.path().join("run").join("deb-updater.lock").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_while_locked_fails_silently_but_logs() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(temp.path(), |_| {}).await?;

    // A live process (this test) is recorded as the holder
    let lock_file = temp.path().join("run").join("deb-updater.lock");
    std::fs::create_dir_all(lock_file.parent().unwrap())?;
    std::fs::write(&lock_file, format!("{}\n", std::process::id()))?;

    deb_updater()
        .args(["--config", config.to_str().unwrap(), "--silent", "run"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());

    let log = std::fs::read_to_string(temp.path().join("log").join("deb-updater.log"))?;
    assert!(log.contains("already in progress"), "log was: {log}");
    assert_eq!(log.lines().filter(|line| line.contains("ERROR")).count(), 1, "log was: {log}");
    // The holder's record is untouched
    assert_eq!(std::fs::read_to_string(&lock_file)?.trim(), std::process::id().to_string());
    Ok(())
}

#[tokio::test]
async fn test_run_while_locked_reports_error() -> Result<()> {
    let temp = TempDir::new()?;
    let config = write_config(temp.path(), |_| {}).await?;

    let lock_file = temp.path().join("run").join("deb-updater.lock");
    std::fs::create_dir_all(lock_file.parent().unwrap())?;
    std::fs::write(&lock_file, format!("{}\n", std::process::id()))?;

    deb_updater()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already in progress"));
    Ok(())
}

#[test]
fn test_failed_download_is_logged_once_per_layer() {
    let temp = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let _mock = server.mock("GET", "/api/download").with_status(503).create();

    let mut config = isolated_config(temp.path());
    config.package_name = "deb-updater-test-absent-package".to_string();
    config.download_url = format!("{}/api/download", server.url());
    let path = temp.path().join("config.toml");
    std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

    deb_updater()
        .args(["--config", path.to_str().unwrap(), "--silent", "run"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty());

    let log = std::fs::read_to_string(&config.log_file).unwrap();
    let errors: Vec<&str> = log.lines().filter(|line| line.contains("ERROR")).collect();
    assert_eq!(errors.len(), 2, "log was: {log}");
    assert!(errors[0].contains("Run failed"), "log was: {log}");
    assert!(errors.iter().all(|line| line.contains("HTTP 503")), "log was: {log}");
    assert!(super::is_empty_dir(&config.staging_dir));
}
