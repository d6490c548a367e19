//! Embassy async tasks
//!
//! Tasks talk to the scheduler only through `motion::with_motion` and
//! the sequence-mark signal.

pub mod motion;
pub mod status;

pub use motion::motion_task;
pub use status::status_task;
