use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Fast simulator and short deadlines so failures resolve in well under a second
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[motion]
tolerance = 1.0
max_distance = 500.0
step_limit = 400.0
max_iterations = 10

[timeouts]
timeout_s = 0.5
wait_interval_s = 0.0
poll_interval_s = 0.005

[limits]
min_voltage = -1000.0
max_voltage = 1000.0

[simulator]
initial_voltage = 300.0
arm_latency_ms = 2
ramp_duration_ms = 10
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["move", "--set", "12=350", "--set", "13=350"], 0, "move complete", "stdout")]
#[case(&["move", "--set", "12=900"], 5, "arm+ramp passes", "stderr")]
#[case(&["move", "--set", "3=5000"], 6, "Invalid move request", "stderr")]
#[case(&["move"], 6, "no channels requested", "stderr")]
#[case(&["move", "--set", "40=1"], 2, "out of range", "stderr")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("bimorph").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn move_request_csv_drives_the_listed_channels() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let csv = dir.path().join("request.csv");
    let mut f = fs::File::create(&csv).unwrap();
    writeln!(f, "channel,target").unwrap();
    writeln!(f, "13,350").unwrap();
    writeln!(f, "12,340").unwrap();

    Command::cargo_bin("bimorph")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("move")
        .arg("--request")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 channel(s)"))
        .stdout(predicate::str::contains("channel12"))
        .stdout(predicate::str::contains("340.000 V"));
}

#[rstest]
fn cli_reports_bad_request_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("request.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "chan,volts").unwrap();
    writeln!(f, "12,350").unwrap();

    Command::cargo_bin("bimorph")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("move")
        .arg("--request")
        .arg(&bad_csv)
        .assert()
        .code(6)
        .stderr(predicate::str::contains("'channel,target'"));
}

#[rstest]
fn invalid_config_is_explained() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[motion]\ntolerance = 0.0\n").unwrap();

    Command::cargo_bin("bimorph")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("motion.tolerance"));
}

#[rstest]
fn log_file_is_created_when_configured() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("bimorph.log");
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!(
            "[simulator]\narm_latency_ms = 0\nramp_duration_ms = 0\n\n[logging]\nfile = {:?}\nrotation = \"never\"\n",
            log.display().to_string()
        ),
    )
    .unwrap();

    Command::cargo_bin("bimorph")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .success();
    assert!(log.exists(), "expected {} to exist", log.display());
}
