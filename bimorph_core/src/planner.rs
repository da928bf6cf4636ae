//! Intermediate-step planning for channels whose direct target is unsafe.
//!
//! Each reference channel (the neighbors plus the channel itself) caps how
//! far the channel may travel toward its target this pass: moving up, the
//! channel may not rise above `reference + max_distance`; moving down, it may
//! not fall below `reference - max_distance`. The reference for a channel is
//! whichever of its current or armed voltage binds first in the direction of
//! travel.

use bimorph_traits::{Channel, Voltages};

use crate::constraint::is_safe;
use crate::topology::constrained_set;

/// Of a reference channel's current and armed voltage, the one that limits
/// travel in `direction` (the lower when rising, the higher when falling).
#[inline]
fn binding_reference(direction: f64, current: f64, armed: f64) -> f64 {
    if direction > 0.0 {
        current.min(armed)
    } else {
        current.max(armed)
    }
}

/// Largest safe step from `current_voltage` toward `target_voltage`.
///
/// - Never moves further than `step_limit` or past the target.
/// - Never moves away from the target.
/// - Returns `current_voltage` (hold) when no safe progress exists.
pub fn plan_step(
    channel: Channel,
    current_voltage: f64,
    target_voltage: f64,
    current: &Voltages,
    armed: &Voltages,
    max_distance: f64,
    step_limit: f64,
) -> f64 {
    let direction = if target_voltage > current_voltage {
        1.0
    } else {
        -1.0
    };
    let mut step = (target_voltage - current_voltage).abs().min(step_limit);

    for idx in constrained_set(channel) {
        let reference = binding_reference(direction, current[idx.index()], armed[idx.index()]);
        let allowed = max_distance + direction * (reference - current_voltage);
        step = step.min(allowed);
    }

    let candidate = current_voltage + direction * step.max(0.0);
    if is_safe(channel, candidate, current, armed, max_distance) {
        candidate
    } else {
        current_voltage
    }
}
