mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("terminal-insights").expect("binary exists");
    cmd.env("RUST_LOG", "off");
    cmd
}

fn fixture(name: &str) -> String {
    fixture_path(name).to_str().unwrap().to_string()
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is JSON")
}

#[test]
fn classify_prints_a_table() {
    bin()
        .args(["classify", "-i", &fixture("shipments.json")])
        .assert()
        .success()
        .stdout(contains("gate_in_time").and(contains("temporal")))
        .stdout(contains("weight_kg").and(contains("quantitative")));
}

#[test]
fn classify_json_reads_csv() {
    let value = stdout_json(bin().args(["classify", "-i", &fixture("carriers.csv"), "--format", "json"]));
    assert_eq!(value["types"]["teu"], "quantitative");
    assert_eq!(value["grouped"]["nominal"][0], "carrier");
}

#[test]
fn suggest_reports_line_for_time_series() {
    let value = stdout_json(bin().args(["suggest", "-i", &fixture("shipments.json"), "--format", "json"]));
    assert_eq!(value["chart"]["chartType"], "line");
    assert_eq!(value["fields"]["xField"], "gate_in_time");
}

#[test]
fn chart_writes_spec_file() {
    let workspace = TestWorkspace::new();
    let out = workspace.path().join("chart.json");
    bin()
        .args([
            "chart",
            "-i",
            &fixture("carriers.csv"),
            "--type",
            "pie",
            "--x",
            "region",
            "--question",
            "Carrier mix by region",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();
    let spec: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(spec["mark"], "arc");
    assert_eq!(spec["title"], "Carrier mix by region");
    assert_eq!(spec["encoding"]["color"]["field"], "region");
}

#[test]
fn chart_uses_query_echo_from_envelope() {
    let value = stdout_json(bin().args(["chart", "-i", &fixture("shipments.json")]));
    assert_eq!(value["mark"], "line");
    assert!(value["title"].as_str().unwrap().starts_with("SELECT * FROM shipments"));
}

#[test]
fn explore_reads_stdin() {
    let payload = fs::read_to_string(fixture_path("shipments.json")).unwrap();
    let value = stdout_json(bin().args(["explore", "-i", "-"]).write_stdin(payload));
    assert_eq!(value["fields"].as_array().unwrap().len(), 6);
    assert_eq!(value["dataSource"].as_array().unwrap().len(), 12);
}

#[test]
fn validate_flags_empty_results() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("empty.json", r#"{"results": []}"#);
    bin()
        .args(["validate", "-i", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Dataset is empty"));
}

#[test]
fn analyze_outputs_kpis() {
    bin()
        .args(["analyze", "-i", &fixture("shipments.json")])
        .assert()
        .success()
        .stdout(contains("on_time_percentage").and(contains("83.33")))
        .stdout(contains("CRITICAL"));

    let value = stdout_json(bin().args(["analyze", "-i", &fixture("shipments.json"), "--format", "json"]));
    assert_eq!(value["kpis"]["activeLanes"], 3);
    assert_eq!(value["stuckShipments"].as_array().unwrap().len(), 2);
}

#[test]
fn analyze_rejects_bad_config() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("bad.yml", "thresholds:\n  heavy_congestion: 2\n");
    bin()
        .args([
            "analyze",
            "-i",
            &fixture("shipments.json"),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("heavy_congestion")));
}

#[test]
fn generate_is_reproducible() {
    let run = || {
        stdout_json(bin().args([
            "generate",
            "--rows",
            "15",
            "--seed",
            "42",
            "--base-time",
            "2024-03-01T18:00:00Z",
        ]))
    };
    let first = run();
    assert_eq!(first.as_array().unwrap().len(), 15);
    assert_eq!(first, run());
}

#[test]
fn watch_runs_fixed_iterations_against_a_file() {
    bin()
        .args([
            "watch",
            "-i",
            &fixture("shipments.json"),
            "--iterations",
            "1",
        ])
        .assert()
        .success()
        .stdout(contains("[#1]").and(contains("12 record(s)")));
}

#[test]
fn watch_requires_a_source() {
    bin().arg("watch").assert().failure();
}

#[test]
fn missing_input_is_reported() {
    bin()
        .args(["classify", "-i", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(contains("does-not-exist.json"));
}
