//! Ramp coordination: armed → current for the whole array.

use std::time::Duration;

use bimorph_hardware::error::HwError;
use bimorph_hardware::util::wait_until_with_timeout;
use bimorph_traits::{BimorphDevice, Channel, Clock, Voltages};
use eyre::WrapErr;

use crate::error::{BimorphError, Result};
use crate::hw_error::map_hw_error;
use crate::util::within;

/// Channels among `channels` whose current voltage is still outside
/// `tolerance` of their setpoint.
pub fn pending_channels(
    current: &Voltages,
    setpoint: &Voltages,
    channels: &[Channel],
    tolerance: f64,
) -> Vec<Channel> {
    channels
        .iter()
        .copied()
        .filter(|c| !within(current[c.index()], setpoint[c.index()], tolerance))
        .collect()
}

pub(crate) fn start<D: BimorphDevice + ?Sized>(device: &mut D) -> Result<()> {
    device
        .start_ramp()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("start ramp")
}

/// One ramp probe: channels still travelling.
pub(crate) fn probe<D: BimorphDevice + ?Sized>(
    device: &mut D,
    channels: &[Channel],
    tolerance: f64,
) -> Result<Vec<Channel>> {
    let current = device
        .current_voltages()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("reading current voltages")?;
    let setpoint = device
        .setpoint_voltages()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("reading setpoint voltages")?;
    Ok(pending_channels(&current, &setpoint, channels, tolerance))
}

/// Start the hardware ramp and block until every channel in `channels` has
/// reached its setpoint, then let the mirror settle for `wait_interval`.
///
/// Fails with `BimorphError::RampTimeout` once `timeout` elapses.
pub fn ramp_and_wait<D, C>(
    device: &mut D,
    clock: &C,
    channels: &[Channel],
    timeout: Duration,
    wait_interval: Duration,
    tolerance: f64,
    poll_interval: Duration,
) -> Result<()>
where
    D: BimorphDevice + ?Sized,
    C: Clock + ?Sized,
{
    start(device)?;
    tracing::debug!(channels = channels.len(), "ramp started");

    let mut pending: Vec<Channel> = channels.to_vec();
    let waited = wait_until_with_timeout(
        clock,
        || {
            let current = device.current_voltages()?;
            let setpoint = device.setpoint_voltages()?;
            pending = pending_channels(&current, &setpoint, channels, tolerance);
            Ok(pending.is_empty())
        },
        timeout,
        poll_interval,
    );

    match waited {
        Ok(()) => {
            clock.sleep(wait_interval);
            tracing::debug!("ramp complete");
            Ok(())
        }
        Err(HwError::WaitTimeout) => {
            tracing::error!(pending = pending.len(), "ramp timed out");
            Err(eyre::Report::new(BimorphError::RampTimeout { pending }))
        }
        Err(other) => Err(eyre::Report::new(BimorphError::Hardware(other.to_string())))
            .wrap_err("waiting for ramp"),
    }
}
