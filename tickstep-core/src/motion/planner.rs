//! Period planner
//!
//! Once per period and per axis, integrates velocity and acceleration
//! into a whole-step count and schedules each of those steps at the
//! tick the solver finds for it.
//!
//! Position over one period under constant acceleration advances by
//! `a + 2·v` fractional units (the factor 2 comes from the finite
//! difference of `a·n² + 2·v·n`).

use crate::config::TimingConfig;
use crate::scheduler::heap::{Link, StepWriter};

use super::solver::solve_dist;
use super::{Direction, PowerLevel, StepperState};

/// Power level for the coming period
///
/// Fixed once per axis per period, before the velocity update.
pub fn get_power(state: &StepperState) -> PowerLevel {
    if state.acceleration != 0 {
        PowerLevel::Acc
    } else if state.velocity == 0 {
        PowerLevel::Hold
    } else {
        PowerLevel::Run
    }
}

/// Plan one period for one axis
///
/// Sets `n_steps`, inserts one event per step into `queue`, then
/// advances `velocity`, `step_frac` and the whole-step odometry.
/// Returns the number of steps planned (sign gives the direction).
pub fn plan_period<const N: usize>(
    state: &mut StepperState,
    axis: u8,
    timing: &TimingConfig,
    queue: &mut StepWriter<'_, N>,
) -> i32 {
    let dist_scale = timing.dist_scale as i64;
    let step_frac = state.acceleration as i64 + 2 * state.velocity as i64 + state.step_frac as i64;
    let steps = step_frac.div_euclid(dist_scale) as i32;
    let remainder = step_frac.rem_euclid(dist_scale) as i32;

    state.n_steps = steps;
    schedule_steps(state, axis, timing, queue);

    state.velocity = state.velocity.wrapping_add(state.acceleration);
    state.step_frac = remainder;
    state.step_full = state.step_full.wrapping_add(steps);
    steps
}

/// Insert the `n_steps` events of the coming period
///
/// Each step solves for the tick where the axis crosses the next whole
/// step boundary, searching from the previous step's tick so the
/// per-axis insertion cursor only ever moves forward.
fn schedule_steps<const N: usize>(
    state: &StepperState,
    axis: u8,
    timing: &TimingConfig,
    queue: &mut StepWriter<'_, N>,
) {
    let s_scaling = timing.s_scaling();
    let step = timing.dist_scale as i64 * s_scaling;
    let v = state.velocity as i64 * timing.v_scaling();
    let a = state.acceleration as i64;
    let period = timing.period_ticks();
    let power = get_power(state);

    let (direction, mut s, delta) = if state.n_steps >= 0 {
        (Direction::Forward, -(state.step_frac as i64) * s_scaling, step)
    } else {
        (
            Direction::Backward,
            (timing.dist_scale - state.step_frac) as i64 * s_scaling,
            -step,
        )
    };

    let mut t = 0;
    let mut at = Link::Head;
    for _ in 0..state.n_steps.unsigned_abs() {
        s += delta;
        t = solve_dist(s, a, v, t, period);
        at = queue.insert_step(at, axis, t, direction, power);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::heap::StepHeap;

    /// Run one boundary: hand off, plan, swap. The planned list stays
    /// readable through `pending_iter` until the next call.
    fn plan(state: &mut StepperState, timing: &TimingConfig, heap: &mut StepHeap<65>) -> i32 {
        heap.take_pending();
        let steps = {
            let mut writer = heap.writer();
            plan_period(state, 0, timing, &mut writer)
        };
        heap.switch();
        steps
    }

    fn times(heap: &StepHeap<65>) -> heapless::Vec<u32, 65> {
        heap.pending_iter().map(|s| s.time).collect()
    }

    #[test]
    fn test_power_selection() {
        let mut state = StepperState::new();
        assert_eq!(get_power(&state), PowerLevel::Hold);
        state.velocity = 10;
        assert_eq!(get_power(&state), PowerLevel::Run);
        state.acceleration = -1;
        assert_eq!(get_power(&state), PowerLevel::Acc);
    }

    #[test]
    fn test_stationary_axis_plans_nothing() {
        let timing = TimingConfig::DEFAULT;
        let mut heap = StepHeap::<65>::new();
        let mut state = StepperState::new();
        state.step_frac = 1234;
        for _ in 0..10 {
            assert_eq!(plan(&mut state, &timing, &mut heap), 0);
            assert_eq!(state.n_steps, 0);
            assert_eq!(state.step_frac, 1234);
            assert_eq!(heap.pending_iter().count(), 0);
        }
    }

    #[test]
    fn test_constant_velocity_spacing() {
        // 2·v = 2·DIST_SCALE: two steps per period, at T/2 and at the end
        let timing = TimingConfig::DEFAULT;
        let mut heap = StepHeap::<65>::new();
        let mut state = StepperState::new();
        state.velocity = timing.dist_scale;

        assert_eq!(plan(&mut state, &timing, &mut heap), 2);
        let times = times(&heap);
        assert_eq!(times.len(), 2);
        assert!(times[0].abs_diff(2925) <= 2, "first step at {}", times[0]);
        assert_eq!(times[1], timing.period_ticks() - 1);
        assert_eq!(state.step_frac, 0);
        assert_eq!(state.step_full(), 2);
    }

    #[test]
    fn test_reverse_motion() {
        let timing = TimingConfig::DEFAULT;
        let mut heap = StepHeap::<65>::new();
        let mut state = StepperState::new();
        state.velocity = -timing.dist_scale / 2;

        assert_eq!(plan(&mut state, &timing, &mut heap), -1);
        assert_eq!(state.step_frac, 0);
        let step = heap.pending_iter().next().unwrap();
        assert_eq!(step.direction, Direction::Backward);
        assert_eq!(step.power, PowerLevel::Run);
        // Backward from frac 0 crosses the boundary immediately
        assert_eq!(step.time, 0);
    }

    #[test]
    fn test_reverse_steps_solved_exactly() {
        let timing = TimingConfig::DEFAULT;
        let mut heap = StepHeap::<65>::new();
        let mut state = StepperState::new();
        state.velocity = -timing.dist_scale;

        assert_eq!(plan(&mut state, &timing, &mut heap), -2);
        // First step at the boundary, second halfway through the period
        assert_eq!(times(&heap).as_slice(), &[0, timing.period_ticks() / 2]);
        assert!(heap
            .pending_iter()
            .all(|s| s.direction == Direction::Backward));
    }

    #[test]
    fn test_step_frac_stays_normalised() {
        let timing = TimingConfig::DEFAULT;
        let mut heap = StepHeap::<65>::new();
        let mut state = StepperState::new();
        state.velocity = 3000;
        state.acceleration = -700;
        for _ in 0..20 {
            plan(&mut state, &timing, &mut heap);
            assert!(state.step_frac >= 0 && state.step_frac < timing.dist_scale);
        }
    }

    #[test]
    fn test_acceleration_crosses_threshold() {
        // DIST_SCALE = 65536, acceleration 4096 from rest
        let timing = TimingConfig {
            timer_freq: 748_800,
            pps: 128,
            dist_scale: 65_536,
            vel_scale: 256,
        };
        let mut heap = StepHeap::<65>::new();
        let mut state = StepperState::new();
        state.acceleration = 4096;

        // Period 1: step_frac' = 4096
        assert_eq!(plan(&mut state, &timing, &mut heap), 0);
        assert_eq!(state.step_frac, 4096);
        assert_eq!(state.velocity, 4096);

        // Period 2: 4096 + 2·4096 + 4096 = 16384
        assert_eq!(plan(&mut state, &timing, &mut heap), 0);
        assert_eq!(state.step_frac, 16_384);

        // Period 3: 4096 + 2·8192 + 16384 = 36864
        assert_eq!(plan(&mut state, &timing, &mut heap), 0);
        assert_eq!(state.step_frac, 36_864);

        // Period 4: 4096 + 2·12288 + 36864 = 65536, exactly one step
        assert_eq!(plan(&mut state, &timing, &mut heap), 1);
        assert_eq!(state.step_frac, 0);
        let t = times(&heap);
        assert_eq!(t.len(), 1);
        assert!(t[0] < timing.period_ticks());

        // Keep accelerating until a period carries several steps
        let mut multi = false;
        for _ in 0..40 {
            plan(&mut state, &timing, &mut heap);
            let t = times(&heap);
            assert!(t.iter().all(|&x| x < timing.period_ticks()));
            assert!(t.windows(2).all(|w| w[0] < w[1]), "times {:?}", t);
            multi |= t.len() > 1;
        }
        assert!(multi);
    }
}
