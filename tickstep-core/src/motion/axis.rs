//! Per-axis motion state
//!
//! Long-lived state of one stepper axis. The planner mutates it once per
//! period; the dispatcher advances the phase index and odometry for
//! every step it fires.

use crate::config::PhaseTables;
use crate::scheduler::SeqIndex;

use super::{Direction, PowerLevel};

/// State of one stepper axis
#[derive(Debug, Clone)]
pub struct StepperState {
    /// Velocity in `1/VEL_SCALE` units per period
    pub velocity: i32,
    /// Velocity change per period
    pub acceleration: i32,
    /// Sub-step position remainder, normalised to `[0, DIST_SCALE)`
    pub step_frac: i32,
    /// Signed step count planned for the next period
    pub n_steps: i32,
    /// Head of the pending acceleration sequence (entries live in the
    /// controller's sequence pool)
    pub acceleration_sequence: Option<SeqIndex>,
    /// Whole steps integrated by the planner
    pub(crate) step_full: i32,
    /// Steps actually dispatched (signed)
    pub(crate) step_count: i32,
    /// Index into the phase tables
    pub(crate) current_step: usize,
    /// Output pins owned by this axis
    pub(crate) io_mask: u32,
    /// Phase tables, `None` until the axis I/O is configured
    pub(crate) phases: Option<PhaseTables>,
    #[cfg(feature = "timing-errors")]
    pub(crate) err_min: i32,
    #[cfg(feature = "timing-errors")]
    pub(crate) err_max: i32,
}

impl StepperState {
    /// Create a stationary axis with no outputs
    pub const fn new() -> Self {
        Self {
            velocity: 0,
            acceleration: 0,
            step_frac: 0,
            n_steps: 0,
            acceleration_sequence: None,
            step_full: 0,
            step_count: 0,
            current_step: 0,
            io_mask: 0,
            phases: None,
            #[cfg(feature = "timing-errors")]
            err_min: i32::MAX,
            #[cfg(feature = "timing-errors")]
            err_max: i32::MIN,
        }
    }

    /// Whole steps integrated by the planner
    pub fn step_full(&self) -> i32 {
        self.step_full
    }

    /// Steps dispatched to the outputs (signed odometry)
    pub fn step_count(&self) -> i32 {
        self.step_count
    }

    /// Current index into the phase tables
    pub fn phase(&self) -> usize {
        self.current_step
    }

    /// Output pins owned by this axis
    pub fn io_mask(&self) -> u32 {
        self.io_mask
    }

    /// Check whether the axis is neither moving nor about to move
    pub fn is_stationary(&self) -> bool {
        self.velocity == 0 && self.acceleration == 0
    }

    /// Attach outputs and reset the phase index
    pub(crate) fn set_io(&mut self, io_mask: u32, phases: PhaseTables) {
        self.io_mask = io_mask;
        self.phases = Some(phases);
        self.current_step = 0;
    }

    /// Pattern for the hold table at the current phase
    pub(crate) fn hold_pattern(&self) -> Option<u32> {
        self.phases
            .map(|p| p.table(PowerLevel::Hold)[self.current_step])
    }

    /// Move one phase and return the pattern to write
    ///
    /// Returns `None` (and leaves odometry untouched) if the axis has no
    /// outputs configured.
    pub(crate) fn advance(&mut self, direction: Direction, power: PowerLevel) -> Option<u32> {
        let phases = self.phases?;
        let len = phases.sequence_length();
        match direction {
            Direction::Forward => {
                self.step_count = self.step_count.wrapping_add(1);
                self.current_step += 1;
                if self.current_step >= len {
                    self.current_step = 0;
                }
            }
            Direction::Backward => {
                self.step_count = self.step_count.wrapping_sub(1);
                if self.current_step == 0 {
                    self.current_step = len - 1;
                } else {
                    self.current_step -= 1;
                }
            }
        }
        Some(phases.table(power)[self.current_step])
    }

    /// Record the deviation of a dispatched step from its scheduled tick
    ///
    /// `period_ticks` wraps deviations into `[-T/2, T/2)`.
    #[cfg(feature = "timing-errors")]
    pub(crate) fn record_timing(&mut self, now: u32, scheduled: u32, period_ticks: u32) {
        let period = period_ticks as i32;
        let mut err = now as i32 - scheduled as i32;
        if err >= period / 2 {
            err -= period;
        } else if err < -(period / 2) {
            err += period;
        }
        self.err_min = self.err_min.min(err);
        self.err_max = self.err_max.max(err);
    }

    /// Read and reset the timing-error bounds
    #[cfg(feature = "timing-errors")]
    pub(crate) fn take_timing_errors(&mut self, timer_freq: u32) -> (i32, i32) {
        let bounds = (self.err_min, self.err_max);
        self.reset_timing_errors(timer_freq);
        bounds
    }

    /// Seed the bounds so any recorded deviation replaces them
    #[cfg(feature = "timing-errors")]
    pub(crate) fn reset_timing_errors(&mut self, timer_freq: u32) {
        self.err_min = timer_freq as i32;
        self.err_max = -(timer_freq as i32);
    }
}

impl Default for StepperState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TABLE: [u32; 4] = [0b0001, 0b0010, 0b0100, 0b1000];

    fn configured() -> StepperState {
        let mut state = StepperState::new();
        state.set_io(0b1111, PhaseTables::uniform(&TABLE).unwrap());
        state
    }

    #[test]
    fn test_forward_wraps() {
        let mut state = configured();
        for _ in 0..3 {
            state.advance(Direction::Forward, PowerLevel::Run);
        }
        assert_eq!(state.phase(), 3);
        assert_eq!(state.advance(Direction::Forward, PowerLevel::Run), Some(0b0001));
        assert_eq!(state.phase(), 0);
        assert_eq!(state.step_count(), 4);
    }

    #[test]
    fn test_backward_wraps() {
        let mut state = configured();
        assert_eq!(state.advance(Direction::Backward, PowerLevel::Hold), Some(0b1000));
        assert_eq!(state.phase(), 3);
        assert_eq!(state.step_count(), -1);
    }

    #[test]
    fn test_unconfigured_axis_does_not_count() {
        let mut state = StepperState::new();
        assert_eq!(state.advance(Direction::Forward, PowerLevel::Acc), None);
        assert_eq!(state.step_count(), 0);
        assert_eq!(state.hold_pattern(), None);
    }

    #[cfg(feature = "timing-errors")]
    #[test]
    fn test_timing_error_wraps_half_period() {
        let mut state = configured();
        state.take_timing_errors(1000);
        state.record_timing(12, 10, 100);
        state.record_timing(2, 98, 100); // late across the period edge
        assert_eq!(state.take_timing_errors(1000), (2, 4));
        assert_eq!(state.take_timing_errors(1000), (1000, -1000));
    }
}
