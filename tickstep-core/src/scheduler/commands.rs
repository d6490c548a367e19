//! Motion-command API
//!
//! Application-side operations on a [`Controller`]. None of these are
//! reentrant with the interrupt handler: the platform must keep the
//! timer interrupt masked (or hold whatever lock guards the controller)
//! for the duration of each call.
//!
//! Periods are absolute counts of period boundaries. A command for
//! period `p` takes effect when the boundary before `p` plans it, so the
//! earliest period that can still be changed is `current_period() + 2`.

use heapless::Vec;
use tickstep_hal::{OutputPort, StepTimer};

use crate::config::PhaseTables;
use crate::error::StepperError;
use crate::motion::{self, ProfileState, StepperState};

use super::controller::{Controller, StepperCallback};
use super::sequence::{SeqAction, SeqIndex};

impl<T, P, const AXES: usize, const HEAP: usize, const SEQS: usize>
    Controller<T, P, AXES, HEAP, SEQS>
where
    T: StepTimer,
    P: OutputPort,
{
    /// Attach output pins and phase tables to an axis
    ///
    /// Configures `mask` as outputs and drives the first hold pattern.
    pub fn init_io(
        &mut self,
        axis: usize,
        mask: u32,
        phases: PhaseTables,
    ) -> Result<(), StepperError> {
        let state = self.axes.get_mut(axis).ok_or(StepperError::InvalidAxis)?;
        state.set_io(mask, phases);
        self.port.configure_outputs(mask);
        self.set_hold(axis);
        Ok(())
    }

    /// Install or clear the sequence callback
    pub fn set_callback(&mut self, callback: Option<StepperCallback>) {
        self.user_callback = callback;
    }

    /// Number of period boundaries handled so far
    ///
    /// Periods are absolute `u32` numbers. Scheduling assumes the counter
    /// does not wrap (about 388 days at 128 periods/s); look-ahead near
    /// `u32::MAX` saturates instead of overflowing.
    pub fn current_period(&self) -> u32 {
        self.period_count
    }

    /// State of an axis
    pub fn axis(&self, axis: usize) -> Result<&StepperState, StepperError> {
        self.axes.get(axis).ok_or(StepperError::InvalidAxis)
    }

    /// State of an axis, mutably
    ///
    /// Writing `velocity` or `acceleration` directly takes effect at the
    /// next boundary.
    pub fn axis_mut(&mut self, axis: usize) -> Result<&mut StepperState, StepperError> {
        self.axes.get_mut(axis).ok_or(StepperError::InvalidAxis)
    }

    /// Steps dispatched so far (signed)
    pub fn current_step(&self, axis: usize) -> Result<i32, StepperError> {
        Ok(self.axis(axis)?.step_count())
    }

    /// Planned position in `1/DIST_SCALE` fractions of a step
    pub fn step_position(&self, axis: usize) -> Result<i64, StepperError> {
        let state = self.axis(axis)?;
        Ok(state.step_full() as i64 * self.timing.dist_scale as i64 + state.step_frac as i64)
    }

    /// Velocity after the last plan
    pub fn current_velocity(&self, axis: usize) -> Result<i32, StepperError> {
        Ok(self.axis(axis)?.velocity)
    }

    /// Splice a sequence into an axis, replacing everything from its
    /// first period on
    ///
    /// Entries must be in non-decreasing period order. Existing callback
    /// marks at the first period are kept ahead of the new entries.
    pub fn add_acc_seq(
        &mut self,
        axis: usize,
        entries: &[(u32, SeqAction)],
    ) -> Result<(), StepperError> {
        if axis >= AXES {
            return Err(StepperError::InvalidAxis);
        }
        let Some(&(first, _)) = entries.first() else {
            return Ok(());
        };
        if entries.windows(2).any(|w| w[0].0 > w[1].0) {
            return Err(StepperError::InvalidArgument);
        }
        if first <= self.period_count.wrapping_add(1) {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "axis {}: sequence for period {} too late (now {})",
                axis,
                first,
                self.period_count
            );
            return Err(StepperError::TooLate);
        }
        let head = self
            .sequences
            .chain(entries)
            .ok_or(StepperError::OutOfMemory)?;

        let (prev, tail) = self.seek(axis, |period, action| {
            period < first || (period == first && action.is_callback())
        });
        self.sequences.release_chain(tail);
        self.link_after(axis, prev, Some(head));
        Ok(())
    }

    /// Set the acceleration of an axis from `period` on
    pub fn add_acc(&mut self, axis: usize, period: u32, acceleration: i32) -> Result<(), StepperError> {
        self.add_acc_seq(axis, &[(period, SeqAction::Accelerate(acceleration))])
    }

    /// Schedule a callback for the boundary that plans `period`
    ///
    /// Unlike [`Controller::add_acc_seq`], nothing already queued is
    /// removed. The mark goes ahead of entries already queued for the
    /// same period, so a later splice at that period keeps it.
    pub fn insert_callback(&mut self, axis: usize, period: u32) -> Result<(), StepperError> {
        if axis >= AXES {
            return Err(StepperError::InvalidAxis);
        }
        if period <= self.period_count.wrapping_add(1) {
            return Err(StepperError::TooLate);
        }
        let entry = self
            .sequences
            .allocate(period, SeqAction::Callback)
            .ok_or(StepperError::OutOfMemory)?;

        let (prev, tail) = self.seek(axis, |p, _| p < period);
        self.sequences.set_next(entry, tail);
        self.link_after(axis, prev, Some(entry));
        Ok(())
    }

    /// Velocity the axis will have entering the plan of `period`
    pub fn velocity_at(&self, axis: usize, period: u32) -> Result<i32, StepperError> {
        let state = self.axis(axis)?;
        Ok(motion::velocity_at(
            state.velocity,
            state.acceleration,
            self.last_planned(),
            period,
            self.sequences.iter(state.acceleration_sequence),
        ))
    }

    /// Velocity and position the axis will have entering the plan of
    /// `period`
    pub fn state_at(&self, axis: usize, period: u32) -> Result<ProfileState, StepperError> {
        let state = self.axis(axis)?;
        if period < self.period_count.wrapping_add(2) {
            return Err(StepperError::TooLate);
        }
        let start = ProfileState {
            velocity: state.velocity,
            position: self.step_position(axis)?,
        };
        Ok(motion::state_at(
            start,
            state.acceleration,
            self.last_planned(),
            period,
            self.sequences.iter(state.acceleration_sequence),
        ))
    }

    /// Ramp an axis to `final_velocity` starting at `start_period`
    ///
    /// Accelerates at `±max_acc` for as many whole periods as fit, then
    /// one period of the remainder, then holds. Returns the period from
    /// which the axis runs at `final_velocity`.
    pub fn set_velocity(
        &mut self,
        axis: usize,
        start_period: u32,
        max_acc: u32,
        final_velocity: i32,
    ) -> Result<u32, StepperError> {
        let velocity = self.velocity_at(axis, start_period)?;
        if final_velocity == velocity {
            self.add_acc(axis, start_period, 0)?;
            return Ok(start_period);
        }
        if max_acc == 0 || max_acc > i32::MAX as u32 {
            return Err(StepperError::InvalidArgument);
        }

        let delta = final_velocity as i64 - velocity as i64;
        let acc = if delta > 0 { max_acc as i64 } else { -(max_acc as i64) };
        let full = delta / acc;
        let rest = delta - full * acc;

        let mut entries: Vec<(u32, SeqAction), 3> = Vec::new();
        let mut end = start_period;
        if full > 0 {
            let _ = entries.push((end, SeqAction::Accelerate(acc as i32)));
            end = end.wrapping_add(full as u32);
        }
        if rest != 0 {
            let _ = entries.push((end, SeqAction::Accelerate(rest as i32)));
            end = end.wrapping_add(1);
        }
        let _ = entries.push((end, SeqAction::Accelerate(0)));

        self.add_acc_seq(axis, &entries)?;
        Ok(end)
    }

    /// Read and reset the timing-error bounds of an axis
    ///
    /// Returns `(min, max)` deviation in ticks of dispatched steps from
    /// their scheduled time since the last call.
    #[cfg(feature = "timing-errors")]
    pub fn timing_errors(&mut self, axis: usize) -> Result<(i32, i32), StepperError> {
        let timer_freq = self.timing.timer_freq;
        Ok(self.axis_mut(axis)?.take_timing_errors(timer_freq))
    }

    /// Last period whose plan is already reflected in the axis state
    fn last_planned(&self) -> u32 {
        self.period_count.wrapping_add(1)
    }

    /// Walk an axis sequence while `keep` holds
    ///
    /// Returns the last kept entry and the first one not kept.
    fn seek(
        &self,
        axis: usize,
        keep: impl Fn(u32, SeqAction) -> bool,
    ) -> (Option<SeqIndex>, Option<SeqIndex>) {
        let mut prev = None;
        let mut cursor = self.axes[axis].acceleration_sequence;
        while let Some(index) = cursor {
            let entry = self.sequences.get(index);
            if !keep(entry.period, entry.action) {
                break;
            }
            prev = Some(index);
            cursor = entry.next();
        }
        (prev, cursor)
    }

    fn link_after(&mut self, axis: usize, prev: Option<SeqIndex>, next: Option<SeqIndex>) {
        match prev {
            Some(index) => self.sequences.set_next(index, next),
            None => self.axes[axis].acceleration_sequence = next,
        }
    }
}
