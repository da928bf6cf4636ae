//! `BimorphController` and its builder.
//!
//! The controller owns validated settings and a clock, never the device: every
//! operation takes the device as a parameter.

use std::sync::Arc;

use bimorph_traits::clock::{Clock, MonotonicClock};
use bimorph_traits::BimorphDevice;

use crate::config::{MotionCfg, MoveSettings, SafetyCfg, Timeouts};
use crate::error::{BuildError, Result};
use crate::machine::BimorphMove;
use crate::request::MoveRequest;
use crate::runner;
use crate::status::MoveReport;
use crate::step_hook::{self, PositionCache, ReadSet};

/// Validated move settings plus the clock every wait runs on.
#[derive(Clone)]
pub struct BimorphController {
    settings: MoveSettings,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for BimorphController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BimorphController")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BimorphController {
    /// Start building a controller. Unset sections fall back to defaults.
    pub fn builder() -> BimorphControllerBuilder {
        BimorphControllerBuilder::default()
    }

    pub fn settings(&self) -> &MoveSettings {
        &self.settings
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.clock)
    }

    /// Validate `request` and return the state machine for it, for hosts that
    /// drive `BimorphMove::step` themselves.
    pub fn plan_move(&self, request: &MoveRequest) -> Result<BimorphMove> {
        BimorphMove::new(request, self.settings, Arc::clone(&self.clock))
    }

    /// Drive `request` to convergence on `device`, blocking on the clock.
    pub fn arm_and_ramp<D>(&self, request: &MoveRequest, device: &mut D) -> Result<MoveReport>
    where
        D: BimorphDevice + ?Sized,
    {
        runner::run(self.plan_move(request)?, device)
    }

    /// `arm_and_ramp` that gives up between steps once `should_stop` is true.
    pub fn arm_and_ramp_until<D, F>(
        &self,
        request: &MoveRequest,
        device: &mut D,
        should_stop: F,
    ) -> Result<MoveReport>
    where
        D: BimorphDevice + ?Sized,
        F: Fn() -> bool,
    {
        runner::run_until(self.plan_move(request)?, device, should_stop)
    }

    /// Scan-step entry point; see `step_hook::one_bimorph_step`.
    pub fn one_bimorph_step<Det, D, R, F>(
        &self,
        detectors: &[Det],
        request: &MoveRequest,
        position_cache: &mut PositionCache,
        take_reading: F,
        device: &mut D,
    ) -> Result<R>
    where
        D: BimorphDevice + ?Sized,
        F: FnOnce(ReadSet<'_, Det>, &mut D) -> Result<R>,
    {
        step_hook::one_bimorph_step(
            detectors,
            request,
            position_cache,
            take_reading,
            device,
            self.settings,
            Arc::clone(&self.clock),
        )
    }

    /// `one_bimorph_step` that gives up between steps once `should_stop` is
    /// true.
    pub fn one_bimorph_step_until<Det, D, R, F, S>(
        &self,
        detectors: &[Det],
        request: &MoveRequest,
        position_cache: &mut PositionCache,
        take_reading: F,
        device: &mut D,
        should_stop: S,
    ) -> Result<R>
    where
        D: BimorphDevice + ?Sized,
        F: FnOnce(ReadSet<'_, Det>, &mut D) -> Result<R>,
        S: Fn() -> bool,
    {
        step_hook::one_bimorph_step_until(
            detectors,
            request,
            position_cache,
            take_reading,
            device,
            self.settings,
            Arc::clone(&self.clock),
            should_stop,
        )
    }
}

/// Builder for `BimorphController`. Everything is validated on `build()`.
#[derive(Default)]
pub struct BimorphControllerBuilder {
    motion: Option<MotionCfg>,
    safety: Option<SafetyCfg>,
    timeouts: Option<Timeouts>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl BimorphControllerBuilder {
    pub fn with_motion(mut self, motion: MotionCfg) -> Self {
        self.motion = Some(motion);
        self
    }

    pub fn with_safety(mut self, safety: SafetyCfg) -> Self {
        self.safety = Some(safety);
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Set all three sections at once.
    pub fn with_settings(self, settings: MoveSettings) -> Self {
        self.with_motion(settings.motion)
            .with_safety(settings.safety)
            .with_timeouts(settings.timeouts)
    }

    /// Inject a clock (tests use `TestClock`). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> std::result::Result<BimorphController, BuildError> {
        let settings = MoveSettings {
            motion: self.motion.unwrap_or_default(),
            safety: self.safety.unwrap_or_default(),
            timeouts: self.timeouts.unwrap_or_default(),
        };
        settings.validate()?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(BimorphController { settings, clock })
    }
}
