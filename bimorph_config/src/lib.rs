#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and move-request parsing for the bimorph controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Move-request CSV loader enforces headers, channel range and uniqueness.
use serde::Deserialize;

/// Number of channels addressable in a move request.
pub const MAX_CHANNELS: u8 = 32;

/// Move-request CSV schema.
///
/// Expected headers:
/// channel,target
///
/// Example:
/// channel,target
/// 12,350.0
/// 13,350.0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct MoveRow {
    pub channel: u8,
    pub target: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Motion {
    /// Voltage match band for armed/current readbacks and convergence
    pub tolerance: f64,
    /// Hard limit on the voltage difference between adjacent channels
    pub max_distance: f64,
    /// Largest change one channel may make in a single pass
    pub step_limit: f64,
    /// Bound on arm+ramp passes before giving up
    pub max_iterations: u32,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            max_distance: 500.0,
            step_limit: 400.0,
            max_iterations: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Deadline for each arm or ramp wait (seconds)
    pub timeout_s: f64,
    /// Settle delay after arming and after each ramp (seconds)
    pub wait_interval_s: f64,
    /// Readback poll cadence (seconds)
    pub poll_interval_s: f64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            timeout_s: 60.0,
            wait_interval_s: 0.5,
            poll_interval_s: 0.1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub min_voltage: f64,
    pub max_voltage: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_voltage: -1000.0,
            max_voltage: 1000.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Simulator {
    /// Voltage every simulated channel starts at
    pub initial_voltage: f64,
    /// Delay before a write shows up in the armed readback
    pub arm_latency_ms: u64,
    /// Time for a ramp to move current onto armed
    pub ramp_duration_ms: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self {
            initial_voltage: 0.0,
            arm_latency_ms: 20,
            ramp_duration_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub motion: Motion,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub simulator: Simulator,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Load a move request from CSV with the exact header `channel,target`.
///
/// Rows are returned in file order; channel range and duplicates are checked
/// here so that a bad file fails before any hardware is touched.
pub fn load_move_request_csv(path: &std::path::Path) -> eyre::Result<Vec<MoveRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open move request CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["channel", "target"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "move request CSV must have headers 'channel,target', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<MoveRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<MoveRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if row.channel >= MAX_CHANNELS {
            eyre::bail!(
                "invalid CSV row {}: channel {} out of range 0..{}",
                idx + 2,
                row.channel,
                MAX_CHANNELS
            );
        }
        if !row.target.is_finite() {
            eyre::bail!("invalid CSV row {}: target must be finite", idx + 2);
        }
        if rows.iter().any(|r| r.channel == row.channel) {
            eyre::bail!("duplicate channel {} in move request CSV", row.channel);
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("move request CSV {:?} contains no rows", path);
    }
    Ok(rows)
}

fn positive_finite(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// Shortest wait that survives conversion to a `Duration` (1 ns).
const MIN_WAIT_S: f64 = 1e-9;

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Motion
        if !positive_finite(self.motion.tolerance) {
            eyre::bail!("motion.tolerance must be > 0");
        }
        if !positive_finite(self.motion.max_distance) {
            eyre::bail!("motion.max_distance must be > 0");
        }
        if !positive_finite(self.motion.step_limit) {
            eyre::bail!("motion.step_limit must be > 0");
        }
        if self.motion.tolerance >= self.motion.max_distance {
            eyre::bail!("motion.tolerance must be smaller than motion.max_distance");
        }
        if self.motion.max_iterations == 0 {
            eyre::bail!("motion.max_iterations must be >= 1");
        }

        // Timeouts
        if !positive_finite(self.timeouts.timeout_s) {
            eyre::bail!("timeouts.timeout_s must be > 0");
        }
        if !(self.timeouts.wait_interval_s.is_finite() && self.timeouts.wait_interval_s >= 0.0) {
            eyre::bail!("timeouts.wait_interval_s must be >= 0");
        }
        if !positive_finite(self.timeouts.poll_interval_s) {
            eyre::bail!("timeouts.poll_interval_s must be > 0");
        }
        if self.timeouts.timeout_s < MIN_WAIT_S {
            eyre::bail!("timeouts.timeout_s is below 1 ns");
        }
        if self.timeouts.poll_interval_s < MIN_WAIT_S {
            eyre::bail!("timeouts.poll_interval_s is below 1 ns");
        }
        if self.timeouts.timeout_s > 24.0 * 60.0 * 60.0 {
            eyre::bail!("timeouts.timeout_s is unreasonably large (>24h)");
        }

        // Limits
        if !(self.limits.min_voltage.is_finite() && self.limits.max_voltage.is_finite()) {
            eyre::bail!("limits must be finite");
        }
        if self.limits.min_voltage >= self.limits.max_voltage {
            eyre::bail!("limits.min_voltage must be < limits.max_voltage");
        }

        // Simulator
        if !(self.limits.min_voltage..=self.limits.max_voltage)
            .contains(&self.simulator.initial_voltage)
        {
            eyre::bail!("simulator.initial_voltage must lie within [limits]");
        }
        if self.simulator.ramp_duration_ms as f64 / 1000.0 > self.timeouts.timeout_s {
            eyre::bail!("simulator.ramp_duration_ms exceeds timeouts.timeout_s");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
