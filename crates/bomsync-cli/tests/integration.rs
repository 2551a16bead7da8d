#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bomsync(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bomsync").unwrap();
    cmd.current_dir(dir.path())
        .env("BOMSYNC_CONFIG", dir.path().join("bomsync.yaml"))
        .env_remove("BOMSYNC_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    bomsync(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("config"));
}

// ---------------------------------------------------------------------------
// bomsync config
// ---------------------------------------------------------------------------

#[test]
fn config_show_without_file_prints_defaults() {
    let dir = TempDir::new().unwrap();
    bomsync(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mode: scheduled"))
        .stdout(predicate::str::contains("interval_seconds: 60"))
        .stdout(predicate::str::contains("http://127.0.0.1:8000"));
}

#[test]
fn config_show_applies_api_url_override() {
    let dir = TempDir::new().unwrap();
    let output = bomsync(&dir)
        .args(["--json", "config", "show", "--api-url", "http://erp-sync:9000"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["api_url"], "http://erp-sync:9000");
    assert_eq!(json["server"]["port"], 3141);
}

#[test]
fn config_init_writes_file_once() {
    let dir = TempDir::new().unwrap();
    bomsync(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let path = dir.path().join("bomsync.yaml");
    let content = std::fs::read_to_string(&path).unwrap();
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
    assert_eq!(yaml["log_capacity"].as_u64(), Some(101));
    assert_eq!(yaml["success_revert_ms"].as_u64(), Some(2000));

    bomsync(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    bomsync(&dir)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn config_show_reads_existing_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("bomsync.yaml"),
        "mode: live\ninterval_seconds: 120\n",
    )
    .unwrap();
    bomsync(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mode: live"))
        .stdout(predicate::str::contains("interval_seconds: 120"));
}

#[test]
fn malformed_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bomsync.yaml"), "mode: [1, 2]\n").unwrap();
    bomsync(&dir)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

// ---------------------------------------------------------------------------
// bomsync serve / sync
// ---------------------------------------------------------------------------

#[test]
fn serve_rejects_out_of_range_interval() {
    let dir = TempDir::new().unwrap();
    bomsync(&dir)
        .args(["serve", "--interval", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("interval"));
}

#[test]
fn serve_rejects_unknown_mode() {
    let dir = TempDir::new().unwrap();
    bomsync(&dir)
        .args(["serve", "--mode", "hourly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hourly"));
}

#[test]
fn sync_against_unreachable_api_fails() {
    let dir = TempDir::new().unwrap();
    bomsync(&dir)
        .args(["sync", "--api-url", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Sync failed"))
        .stderr(predicate::str::contains("error: sync endpoint unreachable"));
}
