//! Hardware-boundary types shared across the bimorph stack.
//!
//! The controller never talks to EPICS or vendor SDKs directly; everything it
//! needs from the mirror goes through [`BimorphDevice`].

pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::fmt;

/// Number of piezo channels on the mirror controller.
pub const CHANNEL_COUNT: usize = 32;

/// One voltage per channel, indexed by `Channel::index()`.
pub type Voltages = [f64; CHANNEL_COUNT];

/// Error type returned across the device boundary.
pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// Integer channel index in `0..CHANNEL_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Returns `None` when `index` is not a valid channel.
    #[inline]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < CHANNEL_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// All channels in ascending order.
    pub fn all() -> impl Iterator<Item = Channel> {
        (0..CHANNEL_COUNT as u8).map(Channel)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel{}", self.0)
    }
}

impl TryFrom<u8> for Channel {
    type Error = u8;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Channel::new(v).ok_or(v)
    }
}

impl TryFrom<usize> for Channel {
    type Error = usize;
    fn try_from(v: usize) -> Result<Self, Self::Error> {
        u8::try_from(v)
            .ok()
            .and_then(Channel::new)
            .ok_or(v)
    }
}

/// The bimorph mirror power supply as seen by the controller.
///
/// `set` and `start_ramp` are asynchronous on real hardware: a write is only
/// acknowledged once the armed readback reflects it, and a ramp only once
/// `current_voltages` match the setpoints.
pub trait BimorphDevice {
    fn current_voltages(&mut self) -> Result<Voltages, DeviceError>;
    fn armed_voltages(&mut self) -> Result<Voltages, DeviceError>;
    fn setpoint_voltages(&mut self) -> Result<Voltages, DeviceError>;
    /// Commit `value` to one channel's setpoint/armed register.
    fn set(&mut self, channel: Channel, value: f64) -> Result<(), DeviceError>;
    /// Begin moving every armed voltage into the current voltage.
    fn start_ramp(&mut self) -> Result<(), DeviceError>;
}

impl<D: BimorphDevice + ?Sized> BimorphDevice for &mut D {
    fn current_voltages(&mut self) -> Result<Voltages, DeviceError> {
        (**self).current_voltages()
    }
    fn armed_voltages(&mut self) -> Result<Voltages, DeviceError> {
        (**self).armed_voltages()
    }
    fn setpoint_voltages(&mut self) -> Result<Voltages, DeviceError> {
        (**self).setpoint_voltages()
    }
    fn set(&mut self, channel: Channel, value: f64) -> Result<(), DeviceError> {
        (**self).set(channel, value)
    }
    fn start_ramp(&mut self) -> Result<(), DeviceError> {
        (**self).start_ramp()
    }
}

impl<D: BimorphDevice + ?Sized> BimorphDevice for Box<D> {
    fn current_voltages(&mut self) -> Result<Voltages, DeviceError> {
        (**self).current_voltages()
    }
    fn armed_voltages(&mut self) -> Result<Voltages, DeviceError> {
        (**self).armed_voltages()
    }
    fn setpoint_voltages(&mut self) -> Result<Voltages, DeviceError> {
        (**self).setpoint_voltages()
    }
    fn set(&mut self, channel: Channel, value: f64) -> Result<(), DeviceError> {
        (**self).set(channel, value)
    }
    fn start_ramp(&mut self) -> Result<(), DeviceError> {
        (**self).start_ramp()
    }
}
