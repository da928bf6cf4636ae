//! Status returned from each step of the convergence state machine.

use std::time::Duration;

use bimorph_traits::Channel;

use crate::error::BimorphError;

/// Why the state machine yielded control back to its host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Suspension {
    /// Waiting for `channel`'s armed readback to confirm a write.
    ArmWait {
        channel: Channel,
        resume_after: Duration,
    },
    /// Mechanical settle before or after a ramp.
    Settle { resume_after: Duration },
    /// Waiting for the ramp to bring current onto setpoint.
    RampWait { resume_after: Duration },
}

impl Suspension {
    /// How long the host should wait before calling `step` again.
    pub fn resume_after(&self) -> Duration {
        match *self {
            Suspension::ArmWait { resume_after, .. }
            | Suspension::Settle { resume_after }
            | Suspension::RampWait { resume_after } => resume_after,
        }
    }
}

/// Summary of a converged move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    /// Arm+ramp passes performed (0 when already converged).
    pub passes: u32,
    /// Hardware writes issued.
    pub writes: usize,
    /// Writes that targeted an intermediate voltage instead of the target.
    pub intermediate_steps: usize,
    /// Final current voltage of every requested channel.
    pub final_voltages: Vec<(Channel, f64)>,
}

/// Public status of a single step of the convergence loop.
#[derive(Debug)]
pub enum MoveStatus {
    /// Not done; call `step` again after the suspension elapses.
    Suspended(Suspension),
    /// Every requested channel is within tolerance of its target.
    Converged(MoveReport),
    /// Halted with a typed error; hardware is left in a safe state.
    Aborted(BimorphError),
}
