//! Masked output writes through the SIO block
//!
//! Pins are claimed as embassy [`Output`]s, which sets their function to
//! SIO and enables the output driver. Writes then go straight to the SIO
//! `GPIO_OUT_XOR` alias, which flips only the requested bits in a single
//! store, so axes sharing the register never disturb each other.

use embassy_rp::gpio::{AnyPin, Level, Output, Pin as _};
use embassy_rp::pac;
use embassy_rp::Peri;
use heapless::Vec;
use tickstep_hal::OutputPort;

use crate::pins::{PinError, NUM_PINS};

/// Bank 0 output register restricted to claimed pins
pub struct SioPort {
    outputs: Vec<Output<'static>, NUM_PINS>,
    claimed: u32,
}

impl Default for SioPort {
    fn default() -> Self {
        Self::new()
    }
}

impl SioPort {
    /// Create a port with no pins claimed
    pub const fn new() -> Self {
        Self {
            outputs: Vec::new(),
            claimed: 0,
        }
    }

    /// Drive a pin from this port, starting low
    pub fn claim(&mut self, pin: Peri<'static, AnyPin>) -> Result<(), PinError> {
        let number = pin.pin();
        if self.claimed & (1 << number) != 0 {
            return Err(PinError::AlreadyTaken);
        }
        self.outputs
            .push(Output::new(pin, Level::Low))
            .map_err(|_| PinError::AlreadyTaken)?;
        self.claimed |= 1 << number;
        Ok(())
    }

    /// Mask of claimed pins
    pub fn claimed(&self) -> u32 {
        self.claimed
    }
}

impl OutputPort for SioPort {
    fn configure_outputs(&mut self, mask: u32) {
        // Claimed pins are outputs already; anything else stays untouched
        let missing = mask & !self.claimed;
        if missing != 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("sio: pins {=u32:#x} not claimed, ignoring", missing);
        }
    }

    fn write_masked(&mut self, mask: u32, value: u32) {
        let out = pac::SIO.gpio_out(0);
        let flip = (out.value().read() ^ value) & mask & self.claimed;
        if flip != 0 {
            out.value_xor().write_value(flip);
        }
    }

    fn output(&self) -> u32 {
        pac::SIO.gpio_out(0).value().read()
    }
}
