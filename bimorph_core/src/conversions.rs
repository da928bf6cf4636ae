//! `From` implementations bridging `bimorph_config` types to `bimorph_core` types.

use crate::config::{MotionCfg, MoveSettings, SafetyCfg, Timeouts};
use crate::util::secs;

// ── MotionCfg ────────────────────────────────────────────────────────────────

impl From<&bimorph_config::Motion> for MotionCfg {
    fn from(c: &bimorph_config::Motion) -> Self {
        Self {
            tolerance: c.tolerance,
            step_limit: c.step_limit,
            max_iterations: c.max_iterations,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&bimorph_config::Timeouts> for Timeouts {
    fn from(c: &bimorph_config::Timeouts) -> Self {
        Self {
            timeout: secs(c.timeout_s),
            wait_interval: secs(c.wait_interval_s),
            poll_interval: secs(c.poll_interval_s),
        }
    }
}

// ── MoveSettings ─────────────────────────────────────────────────────────────

/// `max_distance` lives under `[motion]` in the file but is a safety limit here.
impl From<&bimorph_config::Config> for MoveSettings {
    fn from(c: &bimorph_config::Config) -> Self {
        Self {
            motion: (&c.motion).into(),
            safety: SafetyCfg {
                max_distance: c.motion.max_distance,
                min_voltage: c.limits.min_voltage,
                max_voltage: c.limits.max_voltage,
            },
            timeouts: (&c.timeouts).into(),
        }
    }
}
