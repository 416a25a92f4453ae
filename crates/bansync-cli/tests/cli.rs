//! Binary-level checks of the `bansync` command.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bansync(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("bansync").unwrap();
    cmd.env("BANSYNC_CONFIG", config)
        .env_remove("WEBHOOK_URL")
        .env_remove("WEBHOOK_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn config_init_set_show() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    bansync(&path).args(["config", "init"]).assert().success();
    bansync(&path).args(["config", "init"]).assert().failure();

    bansync(&path)
        .args(["config", "set", "mass.threshold", "4"])
        .assert()
        .success();

    bansync(&path)
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"threshold\": 4"));
}

#[test]
fn config_show_applies_webhook_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    bansync(&path)
        .env("WEBHOOK_URL", "https://hooks.example/sync")
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://hooks.example/sync"));
}

#[test]
fn config_set_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    bansync(&dir.path().join("config.toml"))
        .args(["config", "set", "api_key", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn replay_prints_final_bans() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[mass]\nhold_singles = false\n").unwrap();

    let scenario = dir.path().join("scenario.json");
    std::fs::write(
        &scenario,
        r#"{
            "nodes": [{ "id": 1, "name": "A" }, { "id": 2, "name": "B" }],
            "users": [{ "id": 42, "name": "raider" }],
            "events": [{ "action": "ban", "user": 42, "node": 1 }]
        }"#,
    )
    .unwrap();

    bansync(&config)
        .args(["replay", "--dry-run"])
        .arg(&scenario)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ban Sync Result"))
        .stdout(predicate::str::contains("raider (`42`)"));

    bansync(&config)
        .args(["-o", "json", "replay"])
        .arg(&scenario)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"peer_calls\": 1"));
}
