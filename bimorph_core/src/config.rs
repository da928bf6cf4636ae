//! Runtime configuration for the convergence controller.
//!
//! These are the structs the controller reads. They are separate from the
//! TOML-deserialized config in `bimorph_config`; see `conversions`.

use std::time::Duration;

use crate::error::BuildError;

/// Motion tunables for the arm-and-ramp loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCfg {
    /// Voltage match band for readbacks and for declaring a channel converged.
    pub tolerance: f64,
    /// Largest change one channel may make in a single pass.
    pub step_limit: f64,
    /// Arm-and-ramp passes allowed before `ConvergenceExceeded`.
    pub max_iterations: u32,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            step_limit: 400.0,
            max_iterations: 10,
        }
    }
}

/// Electromechanical safety limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyCfg {
    /// Hard limit on the voltage difference between adjacent channels.
    pub max_distance: f64,
    /// Lowest voltage a move request may ask for.
    pub min_voltage: f64,
    /// Highest voltage a move request may ask for.
    pub max_voltage: f64,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            max_distance: 500.0,
            min_voltage: -1000.0,
            max_voltage: 1000.0,
        }
    }
}

/// Waits and deadlines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    /// Deadline for each arm confirmation and each ramp.
    pub timeout: Duration,
    /// Settle delay after arming and after each ramp.
    pub wait_interval: Duration,
    /// Readback poll cadence.
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            wait_interval: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Everything one move needs, validated as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveSettings {
    pub motion: MotionCfg,
    pub safety: SafetyCfg,
    pub timeouts: Timeouts,
}

impl MoveSettings {
    pub fn validate(&self) -> Result<(), BuildError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !positive(self.motion.tolerance) {
            return Err(BuildError::InvalidConfig("tolerance must be > 0"));
        }
        if !positive(self.motion.step_limit) {
            return Err(BuildError::InvalidConfig("step_limit must be > 0"));
        }
        if self.motion.max_iterations == 0 {
            return Err(BuildError::InvalidConfig("max_iterations must be >= 1"));
        }
        if !positive(self.safety.max_distance) {
            return Err(BuildError::InvalidConfig("max_distance must be > 0"));
        }
        if self.motion.tolerance >= self.safety.max_distance {
            return Err(BuildError::InvalidConfig(
                "tolerance must be smaller than max_distance",
            ));
        }
        if !(self.safety.min_voltage.is_finite()
            && self.safety.max_voltage.is_finite()
            && self.safety.min_voltage < self.safety.max_voltage)
        {
            return Err(BuildError::InvalidConfig(
                "voltage limits must be finite with min < max",
            ));
        }
        if self.timeouts.timeout.is_zero() {
            return Err(BuildError::InvalidConfig("timeout must be > 0"));
        }
        if self.timeouts.poll_interval.is_zero() {
            return Err(BuildError::InvalidConfig("poll_interval must be > 0"));
        }
        Ok(())
    }
}
