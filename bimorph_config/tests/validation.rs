use bimorph_config::load_toml;
use rstest::rstest;

const FULL: &str = r#"
[motion]
tolerance = 1.0
max_distance = 500.0
step_limit = 400.0
max_iterations = 10

[timeouts]
timeout_s = 60.0
wait_interval_s = 0.5
poll_interval_s = 0.1

[limits]
min_voltage = -1000.0
max_voltage = 1000.0

[simulator]
initial_voltage = 300.0
arm_latency_ms = 20
ramp_duration_ms = 200

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.motion.max_iterations, 10);
    assert_eq!(cfg.simulator.initial_voltage, 300.0);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}

#[test]
fn empty_config_uses_defaults() {
    let cfg = load_toml("").expect("parse empty TOML");
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.motion.max_distance, 500.0);
    assert_eq!(cfg.timeouts.timeout_s, 60.0);
}

#[rstest]
#[case("[motion]\ntolerance = 0.0", "motion.tolerance must be > 0")]
#[case("[motion]\nmax_distance = -1.0", "motion.max_distance must be > 0")]
#[case("[motion]\nstep_limit = 0.0", "motion.step_limit must be > 0")]
#[case("[motion]\nmax_iterations = 0", "motion.max_iterations must be >= 1")]
#[case("[motion]\ntolerance = 600.0", "smaller than motion.max_distance")]
#[case("[timeouts]\ntimeout_s = 0.0", "timeouts.timeout_s must be > 0")]
#[case("[timeouts]\nwait_interval_s = -0.1", "timeouts.wait_interval_s must be >= 0")]
#[case("[timeouts]\npoll_interval_s = 0.0", "timeouts.poll_interval_s must be > 0")]
#[case("[timeouts]\npoll_interval_s = 1e-12", "timeouts.poll_interval_s is below 1 ns")]
#[case("[timeouts]\ntimeout_s = 1e-10\npoll_interval_s = 1e-10", "timeouts.timeout_s is below 1 ns")]
#[case("[limits]\nmin_voltage = 10.0\nmax_voltage = 10.0", "min_voltage must be <")]
#[case("[simulator]\ninitial_voltage = 5000.0", "initial_voltage must lie within")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("invalid config must be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle}"
    );
}

#[test]
fn rejects_unknown_types() {
    assert!(load_toml("[motion]\nmax_iterations = \"ten\"").is_err());
}
