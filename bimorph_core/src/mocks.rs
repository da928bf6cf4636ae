//! Device wrappers for tests and dry runs.

use bimorph_traits::{BimorphDevice, Channel, DeviceError, Voltages};

use crate::constraint::invariant_violations;

/// Pass-through device that checks the adjacency invariant after every write,
/// at every ramp start and on every current-voltage readback (so a polled ramp
/// is audited mid-flight), and remembers each violation it sees.
#[derive(Debug)]
pub struct InvariantSpy<D> {
    inner: D,
    max_distance: f64,
    writes: usize,
    audits: usize,
    violations: Vec<(usize, Channel, Channel)>,
}

impl<D: BimorphDevice> InvariantSpy<D> {
    pub fn new(inner: D, max_distance: f64) -> Self {
        Self {
            inner,
            max_distance,
            writes: 0,
            audits: 0,
            violations: Vec::new(),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of invariant checks performed.
    pub fn audits(&self) -> usize {
        self.audits
    }

    /// `(write number, channel, offending neighbor)` per violation observed.
    /// A pair still violated at a later check of the same write is kept once.
    pub fn violations(&self) -> &[(usize, Channel, Channel)] {
        &self.violations
    }

    fn check(&mut self) -> Result<(), DeviceError> {
        let current = self.inner.current_voltages()?;
        self.audit(&current)
    }

    fn audit(&mut self, current: &Voltages) -> Result<(), DeviceError> {
        let setpoint = self.inner.setpoint_voltages()?;
        let armed = self.inner.armed_voltages()?;
        self.audits += 1;
        for (a, b) in invariant_violations(&setpoint, current, &armed, self.max_distance) {
            let seen = (self.writes, a, b);
            if !self.violations.contains(&seen) {
                tracing::error!(write = self.writes, %a, %b, "adjacency invariant violated");
                self.violations.push(seen);
            }
        }
        Ok(())
    }
}

impl<D: BimorphDevice> BimorphDevice for InvariantSpy<D> {
    fn current_voltages(&mut self) -> Result<Voltages, DeviceError> {
        let current = self.inner.current_voltages()?;
        self.audit(&current)?;
        Ok(current)
    }

    fn armed_voltages(&mut self) -> Result<Voltages, DeviceError> {
        self.inner.armed_voltages()
    }

    fn setpoint_voltages(&mut self) -> Result<Voltages, DeviceError> {
        self.inner.setpoint_voltages()
    }

    fn set(&mut self, channel: Channel, value: f64) -> Result<(), DeviceError> {
        self.inner.set(channel, value)?;
        self.writes += 1;
        self.check()
    }

    fn start_ramp(&mut self) -> Result<(), DeviceError> {
        self.inner.start_ramp()?;
        self.check()
    }
}
