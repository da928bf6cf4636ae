//! The arm-and-ramp convergence loop as an explicit state machine.
//!
//! `BimorphMove::step` performs one non-blocking unit of work and returns at
//! every suspension point (arm confirmation, settle delay, ramp completion),
//! so any host scheduler can drive it. `runner::run` is the blocking driver.
//!
//! Each pass:
//! 1. snapshot current and armed voltages; stop if every requested channel is
//!    within tolerance of its target, fail if the pass budget is spent;
//! 2. for each requested channel in ascending order, arm the target if it is
//!    safe, otherwise the planner's intermediate step, and wait for the armed
//!    readback before looking at the next channel;
//! 3. settle, ramp all channels, wait for the requested ones, settle again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bimorph_traits::{BimorphDevice, Channel, Clock, Voltages};
use eyre::WrapErr;

use crate::arm::{self, needs_write};
use crate::config::MoveSettings;
use crate::constraint::is_safe;
use crate::error::{BimorphError, Result};
use crate::hw_error::map_hw_error;
use crate::planner::plan_step;
use crate::ramp;
use crate::request::MoveRequest;
use crate::status::{MoveReport, MoveStatus, Suspension};
use crate::util::within;

#[derive(Debug, Clone, Copy)]
enum Phase {
    Snapshot,
    Arm {
        cursor: usize,
    },
    ArmWait {
        cursor: usize,
        value: f64,
        deadline: Instant,
    },
    PreRampSettle {
        until: Instant,
    },
    RampWait {
        deadline: Instant,
    },
    PostRampSettle {
        until: Instant,
    },
    Finished,
}

#[derive(Debug, Clone, Copy)]
struct Planned {
    value: f64,
    intermediate: bool,
}

/// One move request being driven to convergence.
pub struct BimorphMove {
    targets: Vec<(Channel, f64)>,
    channels: Vec<Channel>,
    settings: MoveSettings,
    clock: Arc<dyn Clock + Send + Sync>,
    phase: Phase,
    passes: u32,
    current: Voltages,
    armed: Voltages,
    writes: usize,
    intermediate_steps: usize,
}

impl core::fmt::Debug for BimorphMove {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BimorphMove")
            .field("targets", &self.targets)
            .field("phase", &self.phase)
            .field("passes", &self.passes)
            .field("writes", &self.writes)
            .finish()
    }
}

fn read<D: BimorphDevice + ?Sized>(
    what: &'static str,
    f: impl FnOnce(&mut D) -> std::result::Result<Voltages, bimorph_traits::DeviceError>,
    device: &mut D,
) -> Result<Voltages> {
    f(device)
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err(what)
}

impl BimorphMove {
    /// Validate `request` against `settings` and prepare the first pass.
    pub fn new(
        request: &MoveRequest,
        settings: MoveSettings,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self> {
        settings.validate().map_err(eyre::Report::new)?;
        request
            .validate(&settings.safety)
            .map_err(eyre::Report::new)?;
        let targets: Vec<(Channel, f64)> = request.iter().collect();
        let channels = request.channels();
        Ok(Self {
            targets,
            channels,
            settings,
            clock,
            phase: Phase::Snapshot,
            passes: 0,
            current: [0.0; bimorph_traits::CHANNEL_COUNT],
            armed: [0.0; bimorph_traits::CHANNEL_COUNT],
            writes: 0,
            intermediate_steps: 0,
        })
    }

    /// Passes started so far.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Hardware writes issued so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    /// Requested channels in write order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Advance until the next suspension point or a terminal status.
    ///
    /// Device failures are returned as `Err`; timeouts and the pass budget
    /// surface as `MoveStatus::Aborted`. Either way no further step is
    /// accepted afterwards.
    pub fn step<D: BimorphDevice + ?Sized>(&mut self, device: &mut D) -> Result<MoveStatus> {
        let res = self.advance(device);
        if res.is_err() {
            self.phase = Phase::Finished;
        }
        res
    }

    fn advance<D: BimorphDevice + ?Sized>(&mut self, device: &mut D) -> Result<MoveStatus> {
        let tolerance = self.settings.motion.tolerance;
        let timeouts = self.settings.timeouts;
        loop {
            match self.phase {
                Phase::Finished => {
                    return Err(eyre::Report::new(BimorphError::State(
                        "move already finished".into(),
                    )));
                }
                Phase::Snapshot => {
                    self.current = read("reading current voltages", |d| d.current_voltages(), device)?;
                    self.armed = read("reading armed voltages", |d| d.armed_voltages(), device)?;
                    if self.converged() {
                        self.phase = Phase::Finished;
                        let report = self.report();
                        tracing::info!(
                            passes = report.passes,
                            writes = report.writes,
                            intermediate = report.intermediate_steps,
                            "move converged"
                        );
                        return Ok(MoveStatus::Converged(report));
                    }
                    if self.passes >= self.settings.motion.max_iterations {
                        self.phase = Phase::Finished;
                        tracing::error!(passes = self.passes, "iteration budget exhausted");
                        return Ok(MoveStatus::Aborted(BimorphError::ConvergenceExceeded {
                            iterations: self.passes,
                        }));
                    }
                    self.passes += 1;
                    tracing::debug!(pass = self.passes, "arm pass");
                    self.phase = Phase::Arm { cursor: 0 };
                }
                Phase::Arm { cursor } => {
                    let Some(&(channel, target)) = self.targets.get(cursor) else {
                        let until = self.clock.deadline(timeouts.wait_interval);
                        self.phase = Phase::PreRampSettle { until };
                        continue;
                    };
                    match self.plan(channel, target) {
                        Some(planned) => {
                            arm::commit(device, channel, planned.value)?;
                            self.writes += 1;
                            if planned.intermediate {
                                self.intermediate_steps += 1;
                            }
                            tracing::debug!(
                                %channel,
                                value = planned.value,
                                intermediate = planned.intermediate,
                                "armed write issued"
                            );
                            self.phase = Phase::ArmWait {
                                cursor,
                                value: planned.value,
                                deadline: self.clock.deadline(timeouts.timeout),
                            };
                        }
                        None => self.phase = Phase::Arm { cursor: cursor + 1 },
                    }
                }
                Phase::ArmWait {
                    cursor,
                    value,
                    deadline,
                } => {
                    let (channel, _) = self.targets[cursor];
                    let armed = read("reading armed voltages", |d| d.armed_voltages(), device)?;
                    let observed = armed[channel.index()];
                    if within(observed, value, tolerance) {
                        // later channels in this pass must see the new armed state
                        self.armed = armed;
                        self.phase = Phase::Arm { cursor: cursor + 1 };
                        continue;
                    }
                    if self.clock.expired(deadline) {
                        self.phase = Phase::Finished;
                        tracing::error!(%channel, value, observed, "arm confirmation timed out");
                        return Ok(MoveStatus::Aborted(BimorphError::StepTimeout {
                            channel,
                            commanded: value,
                            last_observed: observed,
                        }));
                    }
                    return Ok(MoveStatus::Suspended(Suspension::ArmWait {
                        channel,
                        resume_after: self.poll_before(deadline),
                    }));
                }
                Phase::PreRampSettle { until } => {
                    if !self.clock.expired(until) {
                        return Ok(MoveStatus::Suspended(Suspension::Settle {
                            resume_after: self.clock.remaining(until),
                        }));
                    }
                    ramp::start(device)?;
                    tracing::debug!(pass = self.passes, "ramp started");
                    self.phase = Phase::RampWait {
                        deadline: self.clock.deadline(timeouts.timeout),
                    };
                }
                Phase::RampWait { deadline } => {
                    let pending = ramp::probe(device, &self.channels, tolerance)?;
                    if pending.is_empty() {
                        let until = self.clock.deadline(timeouts.wait_interval);
                        self.phase = Phase::PostRampSettle { until };
                        continue;
                    }
                    if self.clock.expired(deadline) {
                        self.phase = Phase::Finished;
                        tracing::error!(pending = pending.len(), "ramp timed out");
                        return Ok(MoveStatus::Aborted(BimorphError::RampTimeout { pending }));
                    }
                    return Ok(MoveStatus::Suspended(Suspension::RampWait {
                        resume_after: self.poll_before(deadline),
                    }));
                }
                Phase::PostRampSettle { until } => {
                    if !self.clock.expired(until) {
                        return Ok(MoveStatus::Suspended(Suspension::Settle {
                            resume_after: self.clock.remaining(until),
                        }));
                    }
                    self.phase = Phase::Snapshot;
                }
            }
        }
    }

    fn poll_before(&self, deadline: Instant) -> Duration {
        self.settings
            .timeouts
            .poll_interval
            .min(self.clock.remaining(deadline))
    }

    fn converged(&self) -> bool {
        let tolerance = self.settings.motion.tolerance;
        self.targets
            .iter()
            .all(|(c, t)| within(self.current[c.index()], *t, tolerance))
    }

    /// What to write to `channel` this pass, `None` to leave it alone.
    fn plan(&self, channel: Channel, target: f64) -> Option<Planned> {
        let max_distance = self.settings.safety.max_distance;
        let tolerance = self.settings.motion.tolerance;
        let present = self.current[channel.index()];

        let planned = if is_safe(channel, target, &self.current, &self.armed, max_distance) {
            Planned {
                value: target,
                intermediate: false,
            }
        } else {
            let value = plan_step(
                channel,
                present,
                target,
                &self.current,
                &self.armed,
                max_distance,
                self.settings.motion.step_limit,
            );
            tracing::warn!(%channel, target, step = value, "direct move unsafe, stepping");
            Planned {
                value,
                intermediate: true,
            }
        };

        if !is_safe(channel, planned.value, &self.current, &self.armed, max_distance) {
            tracing::warn!(%channel, value = planned.value, "no safe step available, holding");
            return None;
        }
        needs_write(channel, planned.value, &self.current, &self.armed, tolerance)
            .then_some(planned)
    }

    fn report(&self) -> MoveReport {
        MoveReport {
            passes: self.passes,
            writes: self.writes,
            intermediate_steps: self.intermediate_steps,
            final_voltages: self
                .channels
                .iter()
                .map(|c| (*c, self.current[c.index()]))
                .collect(),
        }
    }
}
