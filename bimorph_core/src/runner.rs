//! Blocking drivers for `BimorphMove`.

use std::sync::Arc;

use bimorph_traits::{BimorphDevice, Clock};

use crate::config::MoveSettings;
use crate::error::{BimorphError, Report, Result};
use crate::machine::BimorphMove;
use crate::request::MoveRequest;
use crate::status::{MoveReport, MoveStatus};

/// Drive `mv` to a terminal state, sleeping on the move's clock at every
/// suspension point.
pub fn run<D>(mv: BimorphMove, device: &mut D) -> Result<MoveReport>
where
    D: BimorphDevice + ?Sized,
{
    run_until(mv, device, || false)
}

/// Like `run`, but checks `should_stop` before every step and returns
/// `BimorphError::Cancelled` once it reports true.
///
/// Cancellation only happens between steps, so an issued write is always
/// followed by at most its confirmation wait being abandoned.
pub fn run_until<D, F>(mut mv: BimorphMove, device: &mut D, should_stop: F) -> Result<MoveReport>
where
    D: BimorphDevice + ?Sized,
    F: Fn() -> bool,
{
    let clock = Arc::clone(mv.clock());
    tracing::info!(channels = mv.channels().len(), "move start");

    loop {
        if should_stop() {
            tracing::warn!(passes = mv.passes(), "move cancelled");
            return Err(Report::new(BimorphError::Cancelled {
                passes: mv.passes(),
            }));
        }
        match mv.step(device)? {
            MoveStatus::Suspended(s) => clock.sleep(s.resume_after()),
            MoveStatus::Converged(report) => return Ok(report),
            MoveStatus::Aborted(e) => {
                tracing::error!(error = %e, "move aborted");
                return Err(Report::new(e));
            }
        }
    }
}

/// Convenience wrapper: build a move for `request` and run it to completion.
pub fn arm_and_ramp<D>(
    request: &MoveRequest,
    device: &mut D,
    settings: MoveSettings,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<MoveReport>
where
    D: BimorphDevice + ?Sized,
{
    let mv = BimorphMove::new(request, settings, clock)?;
    run(mv, device)
}
