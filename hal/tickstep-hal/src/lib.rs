//! Tickstep Hardware Abstraction Layer
//!
//! This crate defines the two peripherals the motion scheduler drives
//! directly. Chip-specific crates implement them so the scheduler core
//! stays board-agnostic and can be exercised on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  tickstep-firmware (ISR trampoline)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tickstep-core (scheduler, planner)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tickstep-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ tickstep-hal- │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`timer::StepTimer`] - Period counter with a step-compare channel
//! - [`gpio::OutputPort`] - Atomic multi-bit output register

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod timer;

// Re-export key traits at crate root for convenience
pub use gpio::OutputPort;
pub use timer::{StepTimer, TimerStatus};
