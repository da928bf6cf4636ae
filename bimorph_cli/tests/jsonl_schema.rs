use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[timeouts]
timeout_s = 0.2
wait_interval_s = 0.0
poll_interval_s = 0.005

[simulator]
initial_voltage = 300.0
arm_latency_ms = 1
ramp_duration_ms = 5
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn last_json_line(out: &[u8]) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(out);
    let line = stdout
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or_else(|| panic!("no JSON line on stdout: {stdout}"));
    serde_json::from_str(line).expect("valid JSON")
}

/// Validate the JSON schema for a converged move.
#[rstest]
fn json_success_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("bimorph")
        .unwrap()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .args(["move", "--set", "12=350", "--set", "13=360"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = last_json_line(&out);

    assert_eq!(v["status"], "converged");
    assert_eq!(v["writes"].as_u64(), Some(2));
    assert!(v["ramps"].as_u64().is_some_and(|n| n >= 1));
    assert!(v["elapsed_ms"].as_u64().is_some());

    let channels = v["channels"].as_array().expect("channels array");
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0]["channel"], 12);
    assert_eq!(channels[1]["channel"], 13);
    for (c, target) in channels.iter().zip([350.0, 360.0]) {
        for key in ["current", "armed", "setpoint"] {
            let got = c[key].as_f64().expect("number");
            assert!((got - target).abs() <= 1.0, "{key}={got}");
        }
    }
}

/// Validate the JSON error object for an aborted move, including details.
#[rstest]
fn json_abort_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("bimorph")
        .unwrap()
        .env("BIMORPH_TEST_SIM_STUCK", "1")
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .args(["move", "--set", "7=310"])
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let v = last_json_line(&out);

    assert_eq!(v["reason"], "StepTimeout");
    assert_eq!(v["details"]["channel"], 7);
    assert_eq!(v["details"]["commanded"].as_f64(), Some(310.0));
    assert_eq!(v["details"]["last_observed"].as_f64(), Some(300.0));
    assert!(v["message"].as_str().is_some_and(|m| !m.is_empty()));
}
