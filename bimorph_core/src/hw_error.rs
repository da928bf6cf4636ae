//! Maps `Box<dyn Error>` from the device boundary to typed `BimorphError`.
//!
//! `BimorphDevice` returns `Box<dyn Error + Send + Sync>` so that EPICS or
//! simulated backends can report whatever they like; this module converts
//! those to our typed error enum, downcasting `bimorph_hardware::HwError`
//! when the `hardware-errors` feature is on.

use crate::error::BimorphError;

/// Map a device-boundary error to a typed `BimorphError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> BimorphError {
    #[cfg(feature = "hardware-errors")]
    {
        use bimorph_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::NonFinite(_) => BimorphError::HardwareFault(hw.to_string()),
                HwError::WaitTimeout | HwError::Device(_) => BimorphError::Hardware(hw.to_string()),
            };
        }
    }

    BimorphError::Hardware(e.to_string())
}
