//! The `epsync` binary.

use crate::common::EpisodeHost;
use assert_cmd::Command;
use epsync::test_utils::{TestEnvironment, ZipFixture};
use predicates::prelude::*;

fn epsync(env: &TestEnvironment) -> Command {
    let mut cmd = Command::cargo_bin("epsync").unwrap();
    cmd.env("EPSYNC_HOME", &env.home)
        .env("EPSYNC_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let env = TestEnvironment::new().unwrap();
    epsync(&env)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("preserve"))
        .stdout(predicate::str::contains("backups"));
}

#[test]
fn test_commands_require_init() {
    let env = TestEnvironment::new().unwrap();
    epsync(&env)
        .arg("update")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("epsync init"));
}

#[test]
fn test_init_rejects_missing_directory() {
    let env = TestEnvironment::new().unwrap();
    let missing = env.path().join("does-not-exist");
    epsync(&env)
        .args(["init", "--episode-url", "https://example.com/ep.zip", "--episodes-dir"])
        .arg(&missing)
        .assert()
        .code(2);
    assert!(!env.paths().config_file().exists());
}

#[test]
fn test_init_rejects_non_http_url() {
    let env = TestEnvironment::new().unwrap();
    epsync(&env)
        .args(["init", "--episode-url", "ftp://example.com/ep.zip", "--episodes-dir"])
        .arg(&env.episodes_dir)
        .assert()
        .code(2);
}

#[test]
fn test_init_then_edit_configuration() {
    let env = TestEnvironment::new().unwrap();
    epsync(&env)
        .args(["init", "--episode-url", "https://example.com/ep.zip", "--episodes-dir"])
        .arg(&env.episodes_dir)
        .assert()
        .success();

    // A second init needs --force
    epsync(&env)
        .args(["init", "--episode-url", "https://example.com/other.zip", "--episodes-dir"])
        .arg(&env.episodes_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    epsync(&env).args(["preserve", "add", "saves/*.sav"]).assert().success();
    epsync(&env)
        .args(["preserve", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("saves/*.sav"))
        .stdout(predicate::str::contains("progress.json"));
    epsync(&env).args(["preserve", "add", "[unclosed"]).assert().code(2);
    epsync(&env).args(["preserve", "remove", "progress.json"]).assert().success();

    epsync(&env).args(["set-url", "https://example.com/v2.zip"]).assert().success();
    epsync(&env).args(["set-url", "not a url"]).assert().code(2);

    let output = epsync(&env).args(["show", "--json"]).output().unwrap();
    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["config"]["episode_url"], "https://example.com/v2.zip");
    assert!(document["state"].is_null());
    let globs = document["config"]["preserve_globs"].as_array().unwrap();
    assert!(globs.iter().any(|g| g == "saves/*.sav"));
    assert!(!globs.iter().any(|g| g == "progress.json"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_check_and_backups() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish(ZipFixture::episode("MyEpisode").to_bytes(), "\"v1\"").await;
    env.write_config(&host.url()).await.unwrap();

    let run = |args: &'static [&'static str]| {
        let mut cmd = epsync(&env);
        cmd.args(args);
        cmd
    };

    run(&["check"]).assert().success().stdout(predicate::str::contains("Update available"));
    run(&["update"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed"))
        .stdout(predicate::str::contains("MyEpisode"));
    assert_eq!(env.read_installed("MyEpisode", "level1.wld").unwrap(), "level one v1");

    run(&["update"]).assert().success().stdout(predicate::str::contains("up to date"));
    run(&["check"]).assert().success().stdout(predicate::str::contains("Up to date"));

    let output = run(&["show", "--json"]).output().unwrap();
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["state"]["episode_name"], "MyEpisode");
    assert_eq!(document["state"]["version"], "etag:\"v1\"");

    run(&["backups", "list"]).assert().success().stdout(predicate::str::contains("MyEpisode"));
    run(&["backups", "prune", "--keep", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 backup"));
    run(&["backups", "restore", "no-such-backup"]).assert().failure();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_failure_exit_codes() {
    let env = TestEnvironment::new().unwrap();
    let host = EpisodeHost::start().await;
    host.publish_html().await;
    env.write_config(&host.url()).await.unwrap();

    epsync(&env)
        .arg("update")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("direct download link"));

    let traversal = ZipFixture::episode("MyEpisode").file("../evil.txt", "x");
    host.publish(traversal.to_bytes(), "\"v1\"").await;
    epsync(&env).arg("update").assert().code(4);
}
