//! Step scheduling and dispatch
//!
//! - [`heap`]: double-buffered, time-ordered step lists
//! - [`sequence`]: pooled per-axis acceleration sequences
//! - [`controller`]: the interrupt handler and per-period driver
//! - [`commands`]: the application-facing motion API

pub mod commands;
pub mod controller;
pub mod heap;
pub mod sequence;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{Controller, Nesting, StepperCallback};
pub use heap::{StepHeap, TimerStep, STEP_HEAP_SIZE};
pub use sequence::{SeqAction, SeqIndex, SeqPool, SEQ_POOL_SIZE};
