//! Taking GPIO pins by number
//!
//! Axis wiring comes from configuration as pin numbers and masks, so the
//! firmware needs to turn a number into an owned pin at runtime.

use embassy_rp::gpio::AnyPin;
use embassy_rp::{Peri, Peripherals};

use crate::gpio::SioPort;

/// Number of user GPIOs in bank 0
pub const NUM_PINS: usize = 30;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin,
    /// Pin already taken
    AlreadyTaken,
}

/// Every bank 0 pin, handed out once each
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; NUM_PINS],
}

macro_rules! bank {
    ($p:ident; $($pin:ident),* $(,)?) => {
        [$(Some($p.$pin.into())),*]
    };
}

impl PinBank {
    /// Take ownership of all GPIO pins
    pub fn new(p: Peripherals) -> Self {
        Self {
            pins: bank!(p;
                PIN_0, PIN_1, PIN_2, PIN_3, PIN_4, PIN_5, PIN_6, PIN_7, PIN_8, PIN_9,
                PIN_10, PIN_11, PIN_12, PIN_13, PIN_14, PIN_15, PIN_16, PIN_17, PIN_18, PIN_19,
                PIN_20, PIN_21, PIN_22, PIN_23, PIN_24, PIN_25, PIN_26, PIN_27, PIN_28, PIN_29,
            ),
        }
    }

    /// Take a pin by number
    pub fn take(&mut self, pin: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        self.pins
            .get_mut(pin as usize)
            .ok_or(PinError::InvalidPin)?
            .take()
            .ok_or(PinError::AlreadyTaken)
    }

    /// Check if a pin is available
    pub fn is_available(&self, pin: u8) -> bool {
        matches!(self.pins.get(pin as usize), Some(Some(_)))
    }

    /// Hand every pin in `mask` to `port`
    ///
    /// Checks the whole mask first, so on error no pin has moved.
    pub fn claim_mask(&mut self, mask: u32, port: &mut SioPort) -> Result<(), PinError> {
        if mask >> NUM_PINS != 0 {
            return Err(PinError::InvalidPin);
        }
        let pins = (0..NUM_PINS as u8).filter(|&n| mask & (1 << n) != 0);
        if pins.clone().any(|n| !self.is_available(n)) {
            return Err(PinError::AlreadyTaken);
        }
        for n in pins {
            port.claim(self.take(n)?)?;
        }
        Ok(())
    }
}
