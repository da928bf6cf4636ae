//! Small numeric and time helpers shared by the arm and ramp phases.

use std::time::Duration;

/// Longest wait accepted from configuration (one day).
pub const MAX_WAIT_SECS: f64 = 24.0 * 60.0 * 60.0;

/// True if `a` and `b` agree to within `tolerance` volts.
#[inline]
pub fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Convert seconds from configuration into a `Duration`.
/// - Non-finite and negative values map to zero.
/// - Values beyond `MAX_WAIT_SECS` are clamped.
#[inline]
pub fn secs(s: f64) -> Duration {
    if !s.is_finite() || s <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(s.min(MAX_WAIT_SECS))
}
