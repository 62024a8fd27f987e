use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

fn feeder(name: &str) -> String {
    repo_path(&format!("test_data/feeders/{name}"))
        .to_str()
        .unwrap()
        .to_string()
}

fn curtail() -> Command {
    let mut cmd = Command::cargo_bin("curtail-cli").unwrap();
    cmd.args(["--log-level", "warn"]);
    cmd
}

#[test]
fn validate_accepts_a_good_feeder() {
    curtail()
        .args(["validate", &feeder("three_node_static.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid: 3 nodes, 2 branches"));
}

#[test]
fn validate_lists_every_issue() {
    curtail()
        .args(["validate", &feeder("invalid_feeder.json")])
        .assert()
        .failure()
        .stdout(predicate::str::contains("guaranteed_not_below_forecast"))
        .stdout(predicate::str::contains("negative_resistance"))
        .stdout(predicate::str::contains("missing_field"))
        .stderr(predicate::str::contains("failed validation"));
}

#[test]
fn formulate_writes_json_and_summary() {
    let tmp = tempdir().unwrap();
    let out = tmp.path().join("formulation.json");
    curtail()
        .args([
            "formulate",
            &feeder("three_node_static.json"),
            "--coupling",
            "diagonal_only",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Variables"))
        .stdout(predicate::str::contains("voltage_drop"));

    let json: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["keys"].as_array().unwrap().len(), 92);
    assert_eq!(json["program"]["rows"].as_array().unwrap().len(), 108);
    assert_eq!(json["keys"][0]["kind"], "status");
}

#[test]
fn formulate_is_deterministic() {
    let run = || {
        curtail()
            .args(["formulate", &feeder("three_node_static.json")])
            .output()
            .unwrap()
            .stdout
    };
    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
}

#[test]
fn run_reports_curtailment_as_plain_text() {
    curtail()
        .args([
            "run",
            &feeder("three_node_static.json"),
            "--coupling",
            "diagonal",
            "--solver",
            "microlp",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Objective: 2.0000"))
        .stdout(predicate::str::contains("|V| RECOVERED"))
        .stdout(predicate::str::contains("BRANCH"));
}

#[test]
fn run_with_config_handles_time_series() {
    let output = curtail()
        .args([
            "run",
            &feeder("three_node_time_series.json"),
            "--config",
            &feeder("study.toml"),
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!((report["objective"].as_f64().unwrap() - 1.0).abs() < 1e-6);
    assert_eq!(report["backend"], "microlp");
    let curtailments = report["curtailments"].as_array().unwrap();
    assert_eq!(curtailments.len(), 1);
    assert_eq!(curtailments[0]["step"], 1);
    assert_eq!(curtailments[0]["node"], "3");
    // 3 nodes × 3 phases × 2 steps
    assert_eq!(report["voltages"].as_array().unwrap().len(), 18);
}

#[test]
fn run_relaxed_on_microlp() {
    let output = curtail()
        .args([
            "run",
            &feeder("three_node_static.json"),
            "--relaxed",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!((report["objective"].as_f64().unwrap() - 16.0 / 15.0).abs() < 1e-6);
}

#[test]
fn run_rejects_profile_mismatch() {
    curtail()
        .args(["run", &feeder("three_node_time_series.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expects static loads"));
}

#[test]
fn run_rejects_unknown_solver() {
    curtail()
        .args([
            "run",
            &feeder("three_node_static.json"),
            "--solver",
            "gurobi",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gurobi"));
}

#[test]
fn missing_file_reports_the_path() {
    curtail()
        .args(["validate", "does/not/exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does/not/exist.json"));
}

#[test]
fn run_rejects_unrepresentable_time_limit() {
    curtail()
        .args([
            "run",
            &feeder("three_node_static.json"),
            "--time-limit",
            "1e20",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("time_limit_secs"));
}
