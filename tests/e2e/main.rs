//! End-to-end tests of the rudder binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated config, state, and cache directories for one test
pub struct TestContext {
    pub temp: TempDir,
    pub config: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_string_lossy().replace('\\', "/");
        let config = temp.path().join("config.yaml");
        std::fs::write(
            &config,
            format!(
                "namespace: keel-system\ndriver: memory\nstate_dir: {root}/state\ndeploy_dir: {root}/releases\ncache_dir: {root}/cache\nrequest_timeout_secs: 2\n"
            ),
        )
        .unwrap();
        Self { temp, config }
    }

    pub fn rudder(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("rudder").unwrap();
        cmd.current_dir(self.temp.path())
            .env("HOME", self.temp.path())
            .env("XDG_CONFIG_HOME", self.temp.path().join("xdg-config"))
            .env("XDG_CACHE_HOME", self.temp.path().join("xdg-cache"))
            .env("XDG_DATA_HOME", self.temp.path().join("xdg-data"))
            .arg("--config")
            .arg(&self.config);
        cmd
    }
}

#[test]
fn test_help_lists_commands() {
    let ctx = TestContext::new();
    ctx.rudder()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("repo"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_repo_list_empty() {
    let ctx = TestContext::new();
    ctx.rudder()
        .args(["repo", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No repositories."));
    assert!(ctx.temp.path().join("state").exists());
}

#[test]
fn test_list_empty() {
    let ctx = TestContext::new();
    ctx.rudder()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No plugins installed."));
}

#[test]
fn test_repo_add_rejects_invalid_name() {
    let ctx = TestContext::new();
    ctx.rudder()
        .args(["repo", "add", "bad/name", "https://charts.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not contain"));
}

#[test]
fn test_search_unknown_repository() {
    let ctx = TestContext::new();
    ctx.rudder()
        .args(["search", "official"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_install_rejects_malformed_option() {
    let ctx = TestContext::new();
    ctx.rudder()
        .args(["install", "official", "echo", "--set", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key=value"));
}
