//! Interrupt-driven step dispatcher
//!
//! The [`Controller`] owns the step timer, the output port, every axis
//! and both scheduling pools. The platform routes its timer interrupt to
//! [`Controller::service`], which does two things:
//!
//! - on a step compare, fires every step that is due and re-arms the
//!   compare for the next one
//! - on a period boundary, flushes whatever the last period left behind,
//!   takes over the list planned during that period, then plans the
//!   following period for every axis
//!
//! Steps planned during period `k` are therefore dispatched during
//! period `k + 1`.

use tickstep_hal::{OutputPort, StepTimer};

use crate::config::TimingConfig;
use crate::error::ConfigError;
use crate::motion::{plan_period, StepperState};

use super::heap::{StepHeap, StepRef, STEP_HEAP_SIZE};
use super::sequence::{SeqAction, SeqPool, SEQ_POOL_SIZE};

/// User callback, called with `(axis, period)` from interrupt context
pub type StepperCallback = fn(usize, u32);

/// Whether the period handler may be preempted
///
/// On controllers that need it, [`Nesting::Enabled`] brackets the
/// handler with [`StepTimer::enter_nested`] and
/// [`StepTimer::exit_nested`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Nesting {
    /// Run the handler with interrupts as the hardware left them
    Disabled,
    /// Open a nesting window for higher-priority interrupts
    Enabled,
}

/// Multi-axis stepper scheduler
pub struct Controller<
    T,
    P,
    const AXES: usize,
    const HEAP: usize = STEP_HEAP_SIZE,
    const SEQS: usize = SEQ_POOL_SIZE,
> {
    pub(crate) timer: T,
    pub(crate) port: P,
    pub(crate) timing: TimingConfig,
    pub(crate) axes: [StepperState; AXES],
    pub(crate) heap: StepHeap<HEAP>,
    pub(crate) sequences: SeqPool<SEQS>,
    /// Next step to dispatch in the running period
    current_step: Option<StepRef>,
    pub(crate) period_count: u32,
    pub(crate) user_callback: Option<StepperCallback>,
}

impl<T, P, const AXES: usize, const HEAP: usize, const SEQS: usize>
    Controller<T, P, AXES, HEAP, SEQS>
where
    T: StepTimer,
    P: OutputPort,
{
    /// Axis numbers travel in a `u8` inside scheduled steps
    const AXES_FIT: () = assert!(AXES <= u8::MAX as usize + 1, "too many axes");

    /// Create the scheduler and start the period timer
    ///
    /// All axes start stationary with no outputs attached.
    pub fn new(timer: T, port: P, timing: TimingConfig) -> Result<Self, ConfigError> {
        let () = Self::AXES_FIT;
        timing.validate()?;

        let mut controller = Self {
            timer,
            port,
            timing,
            axes: core::array::from_fn(|_| StepperState::new()),
            heap: StepHeap::new(),
            sequences: SeqPool::new(),
            current_step: None,
            period_count: 0,
            user_callback: None,
        };
        #[cfg(feature = "timing-errors")]
        for axis in controller.axes.iter_mut() {
            axis.reset_timing_errors(timing.timer_freq);
        }
        controller.timer.disable_step_compare();
        controller.timer.start(timing.period_ticks());

        #[cfg(feature = "defmt")]
        defmt::info!(
            "stepper: {} axes, {} ticks/period",
            AXES,
            timing.period_ticks()
        );

        Ok(controller)
    }

    /// Timer interrupt entry point
    pub fn service(&mut self, nesting: Nesting) {
        if nesting == Nesting::Enabled {
            self.timer.enter_nested();
        }

        let status = self.timer.take_status();
        if status.step_due {
            self.advance_step();
        }
        if status.period_elapsed {
            self.advance_period();
        } else {
            self.timer.end_of_interrupt();
        }

        if nesting == Nesting::Enabled {
            self.timer.exit_nested();
        }
    }

    /// Fire every step whose time has come
    fn advance_step(&mut self) {
        let mut now = self.timer.now();
        while let Some(at) = self.current_step {
            let time = self.heap.get(at).time;
            if time > now {
                break;
            }
            self.do_step(at);
            self.current_step = self.heap.next(at);
            if let Some(next) = self.current_step {
                self.timer.set_step_compare(self.heap.get(next).time);
                // The compare may already be behind the counter
                now = self.timer.now();
            }
        }
    }

    fn advance_period(&mut self) {
        // Steps the last period did not reach
        while let Some(at) = self.current_step {
            self.do_step(at);
            self.current_step = self.heap.next(at);
        }

        self.current_step = self.heap.take_pending();
        match self.current_step {
            Some(at) => self.timer.set_step_compare(self.heap.get(at).time),
            None => self.timer.disable_step_compare(),
        }
        self.advance_step();
        self.period_count = self.period_count.wrapping_add(1);
        self.timer.end_of_interrupt();

        for index in 0..AXES {
            if self.axes[index].is_stationary() {
                self.timer.disable_interrupts();
                self.set_hold(index);
                self.timer.enable_interrupts();
            }
            self.apply_sequence(index);

            let mut writer = self.heap.writer();
            plan_period(&mut self.axes[index], index as u8, &self.timing, &mut writer);
        }

        self.heap.switch();
    }

    /// Consume the sequence entries due for the plan about to run
    fn apply_sequence(&mut self, index: usize) {
        let due = self.period_count.wrapping_add(1);
        while let Some(head) = self.axes[index].acceleration_sequence {
            let entry = *self.sequences.get(head);
            if entry.period > due {
                break;
            }
            self.axes[index].acceleration_sequence = entry.next();
            match entry.action {
                SeqAction::Accelerate(acceleration) => {
                    self.axes[index].acceleration = acceleration;
                }
                SeqAction::Callback => {
                    if let Some(callback) = self.user_callback {
                        callback(index, self.period_count);
                    }
                }
            }
            self.sequences.release(head);
        }
    }

    fn do_step(&mut self, at: StepRef) {
        let step = *self.heap.get(at);
        let Some(state) = self.axes.get_mut(step.axis as usize) else {
            return;
        };
        if let Some(pattern) = state.advance(step.direction, step.power) {
            self.port.write_masked(state.io_mask(), pattern);
            #[cfg(feature = "timing-errors")]
            state.record_timing(self.timer.now(), step.time, self.timing.period_ticks());
        }
    }

    pub(crate) fn set_hold(&mut self, index: usize) {
        let state = &self.axes[index];
        if let Some(pattern) = state.hold_pattern() {
            self.port.write_masked(state.io_mask(), pattern);
        }
    }

    /// Timing parameters
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Step timer
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Step timer, mutably
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Output port
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Step heap, for diagnostics
    pub fn heap(&self) -> &StepHeap<HEAP> {
        &self.heap
    }

    /// Free entries left in the sequence pool
    pub fn sequence_capacity(&self) -> usize {
        self.sequences.available()
    }
}
