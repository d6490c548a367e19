//! Look-ahead over a pending acceleration sequence
//!
//! Predicts the velocity and position an axis will have when a future
//! period is planned, given its current state and the sequence entries
//! still waiting to be applied. Used to chain new motion commands onto
//! the end of what is already queued.

use crate::scheduler::SeqAction;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Predicted axis state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfileState {
    /// Velocity in `1/VEL_SCALE` units per period
    pub velocity: i32,
    /// Position in `1/DIST_SCALE` fractions of a step
    pub position: i64,
}

impl ProfileState {
    /// Advance by `periods` plans at constant acceleration
    fn integrate(&mut self, acceleration: i32, periods: u32) {
        let a = acceleration as i64;
        let n = periods as i64;
        self.position += (a * n + 2 * self.velocity as i64) * n;
        self.velocity = (self.velocity as i64 + a * n) as i32;
    }
}

/// State entering the plan of `period`
///
/// `state` and `acceleration` describe the axis after the plan of
/// `last_planned`. Sequence entries must be in period order; an entry at
/// period `p` takes effect for the plan of `p`. Callback marks do not
/// change the acceleration.
pub fn state_at<I>(
    state: ProfileState,
    acceleration: i32,
    last_planned: u32,
    period: u32,
    sequence: I,
) -> ProfileState
where
    I: IntoIterator<Item = (u32, SeqAction)>,
{
    let mut state = state;
    let mut a = acceleration;
    let mut t = last_planned;

    for (entry_period, action) in sequence {
        if entry_period >= period {
            break;
        }
        let SeqAction::Accelerate(next) = action else {
            continue;
        };
        let first_unplanned = t.saturating_add(1);
        let applied_from = entry_period.max(first_unplanned);
        state.integrate(a, applied_from - first_unplanned);
        t = applied_from - 1;
        a = next;
    }

    state.integrate(a, period.saturating_sub(t.saturating_add(1)));
    state
}

/// Velocity entering the plan of `period`
pub fn velocity_at<I>(
    velocity: i32,
    acceleration: i32,
    last_planned: u32,
    period: u32,
    sequence: I,
) -> i32
where
    I: IntoIterator<Item = (u32, SeqAction)>,
{
    let start = ProfileState {
        velocity,
        position: 0,
    };
    state_at(start, acceleration, last_planned, period, sequence).velocity
}

#[cfg(test)]
mod tests {
    use super::*;

    const REST: ProfileState = ProfileState {
        velocity: 0,
        position: 0,
    };

    #[test]
    fn test_last_period_number_does_not_overflow() {
        let seq = [(u32::MAX - 1, SeqAction::Accelerate(5))];
        let s = state_at(REST, 100, u32::MAX, u32::MAX, seq);
        assert_eq!(s, REST);
        let s = state_at(REST, 100, u32::MAX - 1, u32::MAX, seq);
        assert_eq!(s, REST);
    }

    #[test]
    fn test_next_period_is_current_state() {
        let s = state_at(REST, 100, 10, 11, core::iter::empty());
        assert_eq!(s, REST);
    }

    #[test]
    fn test_constant_acceleration() {
        // Three plans (11, 12, 13) at a = 100 from rest
        let s = state_at(REST, 100, 10, 14, core::iter::empty());
        assert_eq!(s.velocity, 300);
        // Per plan: a + 2v => 100 + 300 + 500
        assert_eq!(s.position, 900);
    }

    #[test]
    fn test_sequence_switches_acceleration() {
        let seq = [
            (12, SeqAction::Accelerate(0)),
            (13, SeqAction::Callback),
            (14, SeqAction::Accelerate(-50)),
        ];
        // Plan 11 at a = 100, plans 12..13 at 0, plan 14 at -50
        let s = state_at(REST, 100, 10, 15, seq);
        assert_eq!(s.velocity, 50);
        assert_eq!(s.position, 100 + 200 + 200 + (-50 + 200));
    }

    #[test]
    fn test_entries_at_or_after_target_ignored() {
        let seq = [(15, SeqAction::Accelerate(1000))];
        assert_eq!(velocity_at(20, 0, 10, 15, seq), 20);
        assert_eq!(velocity_at(20, 0, 10, 16, seq), 1020);
    }

    #[test]
    fn test_matches_planner_integration() {
        use crate::config::TimingConfig;
        use crate::motion::{plan_period, StepperState};
        use crate::scheduler::heap::StepHeap;

        let timing = TimingConfig::DEFAULT;
        let mut heap = StepHeap::<65>::new();
        let mut axis = StepperState::new();
        axis.velocity = 700;
        axis.acceleration = 37;

        let predicted = state_at(
            ProfileState {
                velocity: axis.velocity,
                position: 0,
            },
            axis.acceleration,
            0,
            9,
            core::iter::empty(),
        );
        for _ in 1..9 {
            heap.take_pending();
            plan_period(&mut axis, 0, &timing, &mut heap.writer());
            heap.switch();
        }
        let position = axis.step_full() as i64 * timing.dist_scale as i64 + axis.step_frac as i64;
        assert_eq!(predicted.velocity, axis.velocity);
        assert_eq!(predicted.position, position);
    }
}
