//! Configuration types
//!
//! Timing parameters shared by the planner and the timer, and per-axis
//! output wiring. Both are plain data so a board can build them from
//! constants or deserialize them (with the `serde` feature).

pub mod axis;
pub mod timing;

pub use axis::{AxisConfig, DriveMode, PhaseTables, MAX_PIN, MAX_SEQUENCE_LEN};
pub use timing::{TimingConfig, DEFAULT_PPS, DEFAULT_TIMER_FREQ, MAX_PERIOD_TICKS};
