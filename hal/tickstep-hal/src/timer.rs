//! Step timer abstraction
//!
//! The scheduler needs one timer peripheral with two interrupt sources:
//!
//! - a hardware-fixed **period compare** that restarts the tick counter
//!   every `1/PPS` seconds
//! - an independently maskable **step compare** that is re-armed with
//!   the time of the next scheduled step
//!
//! Tick values are always relative to the start of the current period.

/// Interrupt flags latched by the timer
///
/// Both flags may be set in the same interrupt entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerStatus {
    /// Step compare matched
    pub step_due: bool,
    /// Period compare matched (counter restarted)
    pub period_elapsed: bool,
}

impl TimerStatus {
    /// No flag set
    pub const fn none() -> Self {
        Self {
            step_due: false,
            period_elapsed: false,
        }
    }

    /// Check whether any flag is set
    pub fn any(&self) -> bool {
        self.step_due || self.period_elapsed
    }
}

/// Period timer with a step-compare channel
pub trait StepTimer {
    /// Start counting with a period of `period_ticks`
    ///
    /// Enables both interrupt sources. The step compare starts disabled.
    fn start(&mut self, period_ticks: u32);

    /// Current tick within the period
    fn now(&self) -> u32;

    /// Arm the step compare for `ticks` into the current period
    fn set_step_compare(&mut self, ticks: u32);

    /// Park the step compare so it cannot match during this period
    fn disable_step_compare(&mut self);

    /// Read and clear the latched interrupt flags
    fn take_status(&mut self) -> TimerStatus;

    /// Acknowledge the interrupt to the interrupt controller
    fn end_of_interrupt(&mut self) {}

    /// Mask both timer interrupt sources
    fn disable_interrupts(&mut self);

    /// Unmask both timer interrupt sources
    fn enable_interrupts(&mut self);

    /// Allow higher-priority interrupts to preempt the handler
    ///
    /// Controllers that nest by priority in hardware leave this empty.
    fn enter_nested(&mut self) {}

    /// Close the bracket opened by [`StepTimer::enter_nested`]
    fn exit_nested(&mut self) {}
}
