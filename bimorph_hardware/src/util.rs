use std::time::Duration;

use bimorph_traits::{Clock, DeviceError};

use crate::error::{HwError, Result};

/// Poll `ready` until it reports true, or fail with `HwError::WaitTimeout` once
/// `timeout` has elapsed on `clock`. Sleeps `poll_interval` between probes.
///
/// The probe runs at least once, so a readback that is already in place
/// returns immediately even with a zero timeout.
pub fn wait_until_with_timeout<C: Clock + ?Sized>(
    clock: &C,
    mut ready: impl FnMut() -> std::result::Result<bool, DeviceError>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = clock.deadline(timeout);
    loop {
        if ready().map_err(|e| HwError::Device(e.to_string()))? {
            return Ok(());
        }
        if clock.expired(deadline) {
            return Err(HwError::WaitTimeout);
        }
        // never oversleep the deadline by a whole poll period
        clock.sleep(poll_interval.min(clock.remaining(deadline)).max(Duration::from_micros(1)));
    }
}
