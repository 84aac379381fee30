//! End-to-end tests for the repostore CLI

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let config_path = dir.path().join("config.yml");
    let db_path = dir.path().join("catalog.db");
    std::fs::write(&config_path, format!("db_path: {}\n", db_path.display())).unwrap();
    config_path
}

fn repostore(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("repostore").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
#[serial]
fn test_add_and_list() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    repostore(&config)
        .args(["add", "linux", "--interval", "300"])
        .assert()
        .success()
        .stdout(predicate::str::contains("linux"));

    repostore(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("linux").and(predicate::str::contains("300s")));
}

#[test]
#[serial]
fn test_list_empty_catalog() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    repostore(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No repositories"));
}

#[test]
#[serial]
fn test_signal_and_clear() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    repostore(&config).args(["add", "linux"]).assert().success();
    repostore(&config).args(["signal", "linux"]).assert().success();

    repostore(&config)
        .arg("signals")
        .assert()
        .success()
        .stdout(predicate::str::contains("linux"));

    repostore(&config).args(["clear", "linux"]).assert().success();

    repostore(&config)
        .arg("signals")
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending signals"));
}

#[test]
#[serial]
fn test_signal_unknown_repo_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    repostore(&config)
        .args(["signal", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}
