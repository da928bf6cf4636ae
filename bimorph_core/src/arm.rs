//! Per-channel arm-and-confirm.
//!
//! A write only counts once the hardware's armed readback reflects it. The
//! blocking `arm_channel` waits for that here; `BimorphMove` performs the same
//! write and probe as separate state-machine steps.

use std::time::Duration;

use bimorph_hardware::error::HwError;
use bimorph_hardware::util::wait_until_with_timeout;
use bimorph_traits::{BimorphDevice, Channel, Clock, Voltages};
use eyre::WrapErr;

use crate::error::{BimorphError, Result};
use crate::hw_error::map_hw_error;
use crate::util::within;

/// Result of a successful `arm_channel`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArmOutcome {
    /// Channel already sat at the value; nothing was written.
    Skipped,
    /// Value written and confirmed; carries the armed readback.
    Armed { observed: f64 },
}

/// False when `channel` already rests at `value` (current and armed), in which
/// case writing again would only cost a redundant wait.
#[inline]
pub fn needs_write(
    channel: Channel,
    value: f64,
    current: &Voltages,
    armed: &Voltages,
    tolerance: f64,
) -> bool {
    let i = channel.index();
    !(within(current[i], value, tolerance) && within(armed[i], value, tolerance))
}

/// Issue the single hardware write for `channel`.
pub(crate) fn commit<D: BimorphDevice + ?Sized>(
    device: &mut D,
    channel: Channel,
    value: f64,
) -> Result<()> {
    device
        .set(channel, value)
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err_with(|| format!("set {channel}"))
}

/// Write `value` to `channel` and block until the armed readback is within
/// `tolerance` of it, polling every `poll_interval`.
///
/// Fails with `BimorphError::StepTimeout` once `timeout` elapses.
pub fn arm_channel<D, C>(
    device: &mut D,
    clock: &C,
    channel: Channel,
    value: f64,
    timeout: Duration,
    tolerance: f64,
    poll_interval: Duration,
) -> Result<ArmOutcome>
where
    D: BimorphDevice + ?Sized,
    C: Clock + ?Sized,
{
    let current = device
        .current_voltages()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("reading current voltages")?;
    let armed = device
        .armed_voltages()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("reading armed voltages")?;
    if !needs_write(channel, value, &current, &armed, tolerance) {
        tracing::debug!(%channel, value, "already armed, skipping write");
        return Ok(ArmOutcome::Skipped);
    }

    commit(device, channel, value)?;
    tracing::debug!(%channel, value, "armed write issued");

    let mut last_observed = armed[channel.index()];
    let waited = wait_until_with_timeout(
        clock,
        || {
            let armed = device.armed_voltages()?;
            last_observed = armed[channel.index()];
            Ok(within(last_observed, value, tolerance))
        },
        timeout,
        poll_interval,
    );

    match waited {
        Ok(()) => Ok(ArmOutcome::Armed {
            observed: last_observed,
        }),
        Err(HwError::WaitTimeout) => {
            tracing::error!(%channel, value, last_observed, "arm confirmation timed out");
            Err(eyre::Report::new(BimorphError::StepTimeout {
                channel,
                commanded: value,
                last_observed,
            }))
        }
        Err(other) => Err(eyre::Report::new(BimorphError::Hardware(other.to_string())))
            .wrap_err_with(|| format!("waiting for {channel} armed readback")),
    }
}
