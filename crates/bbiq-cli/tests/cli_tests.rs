//! Command-line smoke tests for the `bbiq` binary

use assert_cmd::Command;
use predicates::prelude::*;

fn bbiq() -> Command {
    let mut cmd = Command::cargo_bin("bbiq").unwrap();
    // Keep a developer's environment out of the way
    cmd.env_remove("BBIQ_CONFIG")
        .env_remove("BBIQ_QUEUE_URL")
        .env_remove("BBIQ_PREFETCH_LIMIT");
    cmd
}

#[test]
fn test_help_lists_commands() {
    bbiq()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("consume"))
        .stdout(predicate::str::contains("info"))
        .stdout(predicate::str::contains("purge"))
        .stdout(predicate::str::contains("push"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_missing_command_prints_usage() {
    bbiq()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_push_requires_files() {
    bbiq().arg("push").assert().failure();
}

#[test]
fn test_invalid_config_exits_with_one() {
    bbiq()
        .args(["-q", "imports", "-f", "imports", "info"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_unreachable_broker_exits_with_one() {
    bbiq()
        .args(["-c", "amqp://127.0.0.1:1", "info"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Queue error"));
}

#[test]
fn test_missing_config_file_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    bbiq()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("info")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read config file"));
}
