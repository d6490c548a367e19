//! Motion planning
//!
//! Per-period kinematics: the step-time solver, the per-axis state it
//! integrates, and the planner that turns velocity and acceleration
//! into scheduled steps.

pub mod axis;
pub mod planner;
pub mod profile;
pub mod solver;

pub use axis::StepperState;
pub use planner::{get_power, plan_period};
pub use profile::{state_at, velocity_at, ProfileState};
pub use solver::solve_dist;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Advance through the phase table
    Forward,
    /// Retreat through the phase table
    Backward,
}

/// Drive power level, selecting which phase table is written
///
/// Ordered so that `Hold < Run < Acc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PowerLevel {
    /// Stationary
    Hold,
    /// Constant velocity
    Run,
    /// Accelerating or decelerating
    Acc,
}
