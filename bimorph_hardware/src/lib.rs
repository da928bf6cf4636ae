//! Device backends for the bimorph controller.
//!
//! Only a simulated power supply lives here; the EPICS-backed device is an
//! external collaborator implementing `bimorph_traits::BimorphDevice`.

pub mod error;
pub mod util;

use std::time::{Duration, Instant};

use bimorph_traits::{BimorphDevice, CHANNEL_COUNT, Channel, Clock, DeviceError, Voltages};

use crate::error::HwError;

#[derive(Debug, Clone)]
struct Ramp {
    from: Voltages,
    to: Voltages,
    started: Instant,
}

/// Simulated bimorph power supply driven by an injected clock.
///
/// - `set` updates the setpoint at once; the armed readback follows after
///   `arm_latency` (never, when stuck).
/// - `start_ramp` moves every channel from current to armed over
///   `ramp_duration`. All channels share one interpolation fraction, so every
///   intermediate state lies between the start and end states.
pub struct SimulatedBimorph<C: Clock> {
    clock: C,
    setpoint: Voltages,
    armed: Voltages,
    pending: [Option<(f64, Instant)>; CHANNEL_COUNT],
    current: Voltages,
    ramp: Option<Ramp>,
    arm_latency: Duration,
    ramp_duration: Duration,
    stuck: bool,
    writes: Vec<(Channel, f64)>,
    ramps: usize,
}

impl<C: Clock> SimulatedBimorph<C> {
    /// All channels at 0 V, instant arm confirmation and instant ramps.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            setpoint: [0.0; CHANNEL_COUNT],
            armed: [0.0; CHANNEL_COUNT],
            pending: [None; CHANNEL_COUNT],
            current: [0.0; CHANNEL_COUNT],
            ramp: None,
            arm_latency: Duration::ZERO,
            ramp_duration: Duration::ZERO,
            stuck: false,
            writes: Vec::new(),
            ramps: 0,
        }
    }

    /// Put every channel at rest at `volts`.
    pub fn with_uniform(self, volts: f64) -> Self {
        self.with_voltages([volts; CHANNEL_COUNT])
    }

    /// Put every channel at rest at the given voltages.
    pub fn with_voltages(mut self, volts: Voltages) -> Self {
        self.setpoint = volts;
        self.armed = volts;
        self.current = volts;
        self
    }

    /// Put a single channel at rest at `volts`.
    pub fn with_channel(mut self, channel: Channel, volts: f64) -> Self {
        let i = channel.index();
        self.setpoint[i] = volts;
        self.armed[i] = volts;
        self.current[i] = volts;
        self
    }

    pub fn with_arm_latency(mut self, latency: Duration) -> Self {
        self.arm_latency = latency;
        self
    }

    pub fn with_ramp_duration(mut self, duration: Duration) -> Self {
        self.ramp_duration = duration;
        self
    }

    /// Freeze the armed readback: writes land in the setpoint but are never
    /// confirmed.
    pub fn stuck_armed(mut self, stuck: bool) -> Self {
        self.stuck = stuck;
        self
    }

    /// Every hardware write issued so far, in order.
    pub fn writes(&self) -> &[(Channel, f64)] {
        &self.writes
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Number of `start_ramp` calls.
    pub fn ramp_count(&self) -> usize {
        self.ramps
    }

    fn settle(&mut self) {
        let now = self.clock.now();
        if !self.stuck {
            for (armed, slot) in self.armed.iter_mut().zip(self.pending.iter_mut()) {
                if let Some((value, at)) = *slot
                    && now >= at
                {
                    *armed = value;
                    *slot = None;
                }
            }
        }
        if let Some(ramp) = &self.ramp {
            let elapsed = now.saturating_duration_since(ramp.started);
            if elapsed >= self.ramp_duration {
                self.current = ramp.to;
                self.ramp = None;
            }
        }
    }

    fn interpolated_current(&self) -> Voltages {
        let Some(ramp) = &self.ramp else {
            return self.current;
        };
        let elapsed = self.clock.now().saturating_duration_since(ramp.started);
        let frac = if self.ramp_duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.ramp_duration.as_secs_f64()).min(1.0)
        };
        let mut out = [0.0; CHANNEL_COUNT];
        for (i, v) in out.iter_mut().enumerate() {
            *v = ramp.from[i] + (ramp.to[i] - ramp.from[i]) * frac;
        }
        out
    }
}

impl<C: Clock> BimorphDevice for SimulatedBimorph<C> {
    fn current_voltages(&mut self) -> Result<Voltages, DeviceError> {
        self.settle();
        Ok(self.interpolated_current())
    }

    fn armed_voltages(&mut self) -> Result<Voltages, DeviceError> {
        self.settle();
        Ok(self.armed)
    }

    fn setpoint_voltages(&mut self) -> Result<Voltages, DeviceError> {
        Ok(self.setpoint)
    }

    fn set(&mut self, channel: Channel, value: f64) -> Result<(), DeviceError> {
        if !value.is_finite() {
            return Err(Box::new(HwError::NonFinite(value)));
        }
        self.settle();
        let i = channel.index();
        self.setpoint[i] = value;
        self.writes.push((channel, value));
        let at = self.clock.now() + self.arm_latency;
        self.pending[i] = Some((value, at));
        tracing::trace!(%channel, value, "sim set");
        self.settle();
        Ok(())
    }

    fn start_ramp(&mut self) -> Result<(), DeviceError> {
        self.settle();
        let from = self.interpolated_current();
        self.current = from;
        self.ramp = Some(Ramp {
            from,
            to: self.armed,
            started: self.clock.now(),
        });
        self.ramps += 1;
        tracing::trace!(ramps = self.ramps, "sim ramp started");
        self.settle();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimorph_traits::clock::test_clock::TestClock;

    fn ch(i: u8) -> Channel {
        Channel::new(i).unwrap()
    }

    #[test]
    fn armed_readback_follows_after_latency() {
        let clock = TestClock::new();
        let mut sim = SimulatedBimorph::new(clock.clone())
            .with_uniform(300.0)
            .with_arm_latency(Duration::from_millis(20));

        sim.set(ch(3), 350.0).unwrap();
        assert_eq!(sim.setpoint_voltages().unwrap()[3], 350.0);
        assert_eq!(sim.armed_voltages().unwrap()[3], 300.0);

        clock.advance(Duration::from_millis(20));
        assert_eq!(sim.armed_voltages().unwrap()[3], 350.0);
        assert_eq!(sim.current_voltages().unwrap()[3], 300.0);
        assert_eq!(sim.write_count(), 1);
    }

    #[test]
    fn ramp_interpolates_then_lands_on_armed() {
        let clock = TestClock::new();
        let mut sim = SimulatedBimorph::new(clock.clone())
            .with_uniform(100.0)
            .with_ramp_duration(Duration::from_millis(100));

        sim.set(ch(0), 200.0).unwrap();
        sim.start_ramp().unwrap();
        clock.advance(Duration::from_millis(50));
        let mid = sim.current_voltages().unwrap()[0];
        assert!((mid - 150.0).abs() < 1e-9, "mid-ramp value {mid}");

        clock.advance(Duration::from_millis(50));
        assert_eq!(sim.current_voltages().unwrap()[0], 200.0);
        assert_eq!(sim.ramp_count(), 1);
    }

    #[test]
    fn stuck_readback_never_confirms() {
        let clock = TestClock::new();
        let mut sim = SimulatedBimorph::new(clock.clone()).stuck_armed(true);
        sim.set(ch(1), 10.0).unwrap();
        clock.advance(Duration::from_secs(3600));
        assert_eq!(sim.armed_voltages().unwrap()[1], 0.0);
    }

    #[test]
    fn rejects_non_finite_writes() {
        let mut sim = SimulatedBimorph::new(TestClock::new());
        let err = sim.set(ch(1), f64::NAN).expect_err("NaN must be rejected");
        assert!(err.to_string().contains("non-finite"));
        assert_eq!(sim.write_count(), 0);
    }
}
