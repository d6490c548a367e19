//! RP2040 backend for the tickstep scheduler
//!
//! This crate implements the `tickstep-hal` traits on RP2040 peripherals:
//!
//! - [`timer::AlarmTimer`]: the 1 MHz system timer, with one alarm as the
//!   step compare and another as the period boundary
//! - [`gpio::SioPort`]: masked writes to the SIO output register
//! - [`pins::PinBank`]: taking GPIO pins by number for config-driven setup
//!
//! The embassy time driver owns TIMER alarm 0; this crate uses alarms 2
//! and 3 and leaves alarm 1 free.

#![no_std]

pub mod gpio;
pub mod pins;
pub mod timer;

pub use gpio::SioPort;
pub use pins::{PinBank, PinError};
pub use timer::{AlarmTimer, TIMER_FREQ};

// Re-export the traits for convenience
pub use tickstep_hal::{OutputPort, StepTimer, TimerStatus};
