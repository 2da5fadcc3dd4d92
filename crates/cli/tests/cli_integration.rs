//! CLI integration tests for the offline subcommands.
//!
//! Uses `assert_cmd` to spawn the `visaflow` binary and verify
//! exit codes, stdout content, and stderr content.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper: create a Command for the `visaflow` binary with a clean
/// configuration environment.
fn visaflow() -> Command {
    let mut cmd = cargo_bin_cmd!("visaflow");
    for var in [
        "VISAFLOW_PORT",
        "VISAFLOW_API_KEY",
        "VISAFLOW_LOG_LEVEL",
        "VISAFLOW_LOG_FORMAT",
        "VISAFLOW_UTC_OFFSET_HOURS",
        "VISAFLOW_TRANSITION_POLICY",
        "VISAFLOW_NOTIFICATIONS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    visaflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Study-abroad application workflow backend",
        ));
}

#[test]
fn version_exits_0() {
    visaflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("visaflow"));
}

#[test]
fn unknown_subcommand_fails() {
    visaflow().arg("frobnicate").assert().failure();
}

// ──────────────────────────────────────────────
// 2. allocate
// ──────────────────────────────────────────────

#[test]
fn allocate_sequential_identifiers_for_a_date() {
    visaflow()
        .args(["allocate", "application", "--date", "2024-09-26", "--count", "3"])
        .assert()
        .success()
        .stdout("AP-24092601\nAP-24092602\nAP-24092603\n");
}

#[test]
fn allocate_json_output() {
    let output = visaflow()
        .args(["--output", "json", "allocate", "ticket", "--date", "2025-01-02"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["category"], "ticket");
    assert_eq!(json["identifiers"][0], "TK-25010201");
}

#[test]
fn allocate_beyond_99_fails() {
    visaflow()
        .args(["allocate", "agent", "--date", "2024-09-26", "--count", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("AG-240926"));
}

#[test]
fn allocate_unknown_category_fails() {
    visaflow()
        .args(["allocate", "visa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown category 'visa'"));
}

#[test]
fn allocate_bad_date_fails() {
    visaflow()
        .args(["allocate", "agent", "--date", "2024-13-40"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --date"));
}

// ──────────────────────────────────────────────
// 3. statuses
// ──────────────────────────────────────────────

#[test]
fn statuses_lists_every_section() {
    visaflow()
        .arg("statuses")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "offerLetter (Offer Letter): under review, approved, rejected",
        ))
        .stdout(predicate::str::contains("gic (GIC): under review, success, reject"))
        .stdout(predicate::str::contains("pageStatus (Page Status)"))
        .stdout(predicate::str::contains("ticket (Ticket)"));
}

#[test]
fn statuses_json_for_one_section() {
    let output = visaflow()
        .args(["--output", "json", "statuses", "pageStatus"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let page = &json["pageStatus"];
    assert_eq!(page["type"], "Page Status");
    assert_eq!(page["initial"], "registering");
    assert_eq!(page["statuses"].as_array().map(Vec::len), Some(5));
    assert_eq!(page["terminal"], serde_json::json!(["completed", "rejected"]));
    assert!(json.get("gic").is_none());
}

#[test]
fn statuses_unknown_section_fails() {
    visaflow()
        .args(["statuses", "visa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown section 'visa'"));
}

// ──────────────────────────────────────────────
// 4. config
// ──────────────────────────────────────────────

#[test]
fn config_prints_defaults() {
    visaflow()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("port = 8080"))
        .stdout(predicate::str::contains("transition_policy = \"permissive\""));
}

#[test]
fn config_file_and_env_are_layered() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("visaflow.toml");
    fs::write(
        &path,
        "[server]\nport = 9000\napi_key = \"hunter2\"\n\n[workflow]\nnotifications = \"background\"\n",
    )
    .expect("write config");

    visaflow()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .env("VISAFLOW_TRANSITION_POLICY", "forward-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("port = 9000"))
        .stdout(predicate::str::contains("notifications = \"background\""))
        .stdout(predicate::str::contains("transition_policy = \"forward-only\""))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn invalid_config_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("visaflow.toml");
    fs::write(&path, "[calendar]\nutc_offset_hours = 20\n").expect("write config");

    visaflow()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("utc_offset_hours"));
}

#[test]
fn utc_offset_from_env_is_validated() {
    visaflow()
        .arg("config")
        .env("VISAFLOW_UTC_OFFSET_HOURS", "ten")
        .assert()
        .failure()
        .stderr(predicate::str::contains("VISAFLOW_UTC_OFFSET_HOURS"));
}
