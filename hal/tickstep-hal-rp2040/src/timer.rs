//! Step timer on the RP2040 system timer
//!
//! The RP2040 timer is a free-running 64-bit microsecond counter with four
//! 32-bit alarms that match on equality. There is no counter reset, so
//! the period is emulated: alarm 3 fires at every period boundary and is
//! re-armed one period ahead, and all tick values handed to the
//! scheduler are offsets from the start of the current period.
//!
//! An alarm written with a time that has already passed will not fire
//! until the counter wraps. The scheduler re-reads [`StepTimer::now`]
//! after every re-arm and dispatches such steps itself.

use embassy_rp::interrupt::{self, InterruptExt};
use embassy_rp::pac;
use tickstep_hal::{StepTimer, TimerStatus};

/// Tick rate of the system timer
pub const TIMER_FREQ: u32 = 1_000_000;

/// Alarm used as the step compare
const STEP_ALARM: usize = 2;
/// Alarm used as the period boundary
const PERIOD_ALARM: usize = 3;

/// Scheduler timer on TIMER alarms 2 (step) and 3 (period)
///
/// The platform must route `TIMER_IRQ_2` and `TIMER_IRQ_3` to the
/// controller at the same priority.
#[derive(Debug, Default)]
pub struct AlarmTimer {
    period_start: u32,
    period_ticks: u32,
}

impl AlarmTimer {
    /// Create the timer; nothing is touched until `start`
    pub const fn new() -> Self {
        Self {
            period_start: 0,
            period_ticks: 0,
        }
    }

    /// Set the priority of both timer interrupt lines
    pub fn set_priority(&self, priority: interrupt::Priority) {
        interrupt::TIMER_IRQ_2.set_priority(priority);
        interrupt::TIMER_IRQ_3.set_priority(priority);
    }
}

impl StepTimer for AlarmTimer {
    fn start(&mut self, period_ticks: u32) {
        let timer = pac::TIMER;
        self.period_ticks = period_ticks;

        timer.intr().write(|w| {
            w.set_alarm(STEP_ALARM, true);
            w.set_alarm(PERIOD_ALARM, true);
        });
        self.period_start = timer.timerawl().read();
        timer
            .alarm(PERIOD_ALARM)
            .write_value(self.period_start.wrapping_add(period_ticks));
        timer.inte().modify(|w| {
            w.set_alarm(STEP_ALARM, true);
            w.set_alarm(PERIOD_ALARM, true);
        });

        interrupt::TIMER_IRQ_2.unpend();
        interrupt::TIMER_IRQ_3.unpend();
        self.enable_interrupts();

        #[cfg(feature = "defmt")]
        defmt::debug!("alarm timer: period {} us", period_ticks);
    }

    fn now(&self) -> u32 {
        pac::TIMER.timerawl().read().wrapping_sub(self.period_start)
    }

    fn set_step_compare(&mut self, ticks: u32) {
        pac::TIMER
            .alarm(STEP_ALARM)
            .write_value(self.period_start.wrapping_add(ticks));
    }

    fn disable_step_compare(&mut self) {
        // Just behind the counter: a full 32-bit wrap away
        pac::TIMER
            .alarm(STEP_ALARM)
            .write_value(self.period_start.wrapping_sub(1));
    }

    fn take_status(&mut self) -> TimerStatus {
        let timer = pac::TIMER;
        let ints = timer.ints().read();
        let status = TimerStatus {
            step_due: ints.alarm(STEP_ALARM),
            period_elapsed: ints.alarm(PERIOD_ALARM),
        };
        timer.intr().write(|w| {
            w.set_alarm(STEP_ALARM, status.step_due);
            w.set_alarm(PERIOD_ALARM, status.period_elapsed);
        });

        if status.period_elapsed {
            self.period_start = self.period_start.wrapping_add(self.period_ticks);
            timer
                .alarm(PERIOD_ALARM)
                .write_value(self.period_start.wrapping_add(self.period_ticks));
        }
        status
    }

    fn disable_interrupts(&mut self) {
        interrupt::TIMER_IRQ_2.disable();
        interrupt::TIMER_IRQ_3.disable();
    }

    fn enable_interrupts(&mut self) {
        // SAFETY: both handlers only touch the controller the platform
        // hands them, and it is not borrowed while these lines are masked
        unsafe {
            interrupt::TIMER_IRQ_2.enable();
            interrupt::TIMER_IRQ_3.enable();
        }
    }
}
