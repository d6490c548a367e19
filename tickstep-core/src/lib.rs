//! Board-agnostic core of a real-time multi-axis stepper scheduler
//!
//! This crate contains everything that does not touch hardware directly:
//!
//! - Per-period motion planning (integer kinematics and step-time solver)
//! - Double-buffered step scheduling and interrupt-side dispatch
//! - Acceleration sequences and the motion-command API
//! - Timing and axis configuration types
//!
//! Hardware is reached only through the `tickstep-hal` traits.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod motion;
pub mod scheduler;

pub use config::{AxisConfig, PhaseTables, TimingConfig};
pub use error::{ConfigError, StepperError};
pub use motion::{Direction, PowerLevel, ProfileState, StepperState};
pub use scheduler::{Controller, Nesting, SeqAction, StepperCallback};
