//! Per-scan-step hook: move the mirror, then take a reading.

use std::collections::HashMap;
use std::sync::Arc;

use bimorph_traits::{BimorphDevice, Channel, Clock};

use crate::config::MoveSettings;
use crate::error::Result;
use crate::machine::BimorphMove;
use crate::request::MoveRequest;
use crate::runner;

/// Last converged target per channel, shared with the scan framework.
pub type PositionCache = HashMap<Channel, f64>;

/// What a reading covers: the scan's detectors plus the moved channels.
#[derive(Debug)]
pub struct ReadSet<'a, Det> {
    pub detectors: &'a [Det],
    pub channels: Vec<Channel>,
}

impl<Det> ReadSet<'_, Det> {
    pub fn len(&self) -> usize {
        self.detectors.len() + self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty() && self.channels.is_empty()
    }
}

/// Drive `request` to convergence, then call `take_reading` over the
/// detectors and the requested channels and return its result.
///
/// A failed move returns before any reading is taken and leaves
/// `position_cache` untouched. On success every requested channel's target is
/// recorded in it.
pub fn one_bimorph_step<Det, D, R, F>(
    detectors: &[Det],
    request: &MoveRequest,
    position_cache: &mut PositionCache,
    take_reading: F,
    device: &mut D,
    settings: MoveSettings,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<R>
where
    D: BimorphDevice + ?Sized,
    F: FnOnce(ReadSet<'_, Det>, &mut D) -> Result<R>,
{
    one_bimorph_step_until(
        detectors,
        request,
        position_cache,
        take_reading,
        device,
        settings,
        clock,
        || false,
    )
}

/// `one_bimorph_step` that abandons the move between steps once
/// `should_stop` is true.
#[allow(clippy::too_many_arguments)]
pub fn one_bimorph_step_until<Det, D, R, F, S>(
    detectors: &[Det],
    request: &MoveRequest,
    position_cache: &mut PositionCache,
    take_reading: F,
    device: &mut D,
    settings: MoveSettings,
    clock: Arc<dyn Clock + Send + Sync>,
    should_stop: S,
) -> Result<R>
where
    D: BimorphDevice + ?Sized,
    F: FnOnce(ReadSet<'_, Det>, &mut D) -> Result<R>,
    S: Fn() -> bool,
{
    let mv = BimorphMove::new(request, settings, clock)?;
    let report = runner::run_until(mv, device, should_stop)?;
    tracing::debug!(passes = report.passes, "scan step converged, reading");

    position_cache.extend(request.iter());
    take_reading(
        ReadSet {
            detectors,
            channels: request.channels(),
        },
        device,
    )
}
