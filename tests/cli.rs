// ABOUTME: Integration tests for the slipway CLI commands.
// ABOUTME: Validates --help output and init command behavior.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn slipway_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("slipway"))
}

#[test]
fn help_shows_commands() {
    slipway_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("cleanup"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("slipway.yml");

    slipway_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    assert!(config_path.exists(), "slipway.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("repository:"), "template should have a repository section");
    assert!(content.contains("app:"), "template should have an app section");
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("slipway.yml");

    fs::write(&config_path, "existing: config").unwrap();

    slipway_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_force_overwrites_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("slipway.yml");

    fs::write(&config_path, "existing: config").unwrap();

    slipway_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("repository:"));
}

#[test]
fn status_fails_without_config() {
    let temp_dir = tempfile::tempdir().unwrap();

    slipway_cmd()
        .current_dir(temp_dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn status_shows_resolved_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("slipway.yml"),
        r#"
repository:
  url: https://github.com/acme/demo.git
server: deploy@203.0.113.7
app:
  name: demo
  port: 3000
"#,
    )
    .unwrap();

    slipway_cmd()
        .current_dir(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("deploy@203.0.113.7:22"));
}
