//! Host-side timer and port doubles for scheduler tests

use tickstep_hal::{OutputPort, StepTimer, TimerStatus};

use super::controller::{Controller, Nesting};

/// Controller wired to the test doubles
pub type TestController<const AXES: usize, const HEAP: usize = { super::heap::STEP_HEAP_SIZE }> =
    Controller<MockTimer, MockPort, AXES, HEAP>;

/// Timer whose counter and flags are set by the test
#[derive(Debug, Default)]
pub struct MockTimer {
    /// Period passed to `start`
    pub period: Option<u32>,
    pub now: u32,
    /// Armed step compare, `None` when parked
    pub compare: Option<u32>,
    /// Flags returned by the next `take_status`
    pub status: TimerStatus,
    pub eoi_count: u32,
    pub irq_enabled: bool,
    /// Calls to `disable_interrupts` plus `enable_interrupts`
    pub mask_toggles: u32,
    pub nest_depth: u32,
    pub nest_entries: u32,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepTimer for MockTimer {
    fn start(&mut self, period_ticks: u32) {
        self.period = Some(period_ticks);
        self.irq_enabled = true;
    }

    fn now(&self) -> u32 {
        self.now
    }

    fn set_step_compare(&mut self, ticks: u32) {
        self.compare = Some(ticks);
    }

    fn disable_step_compare(&mut self) {
        self.compare = None;
    }

    fn take_status(&mut self) -> TimerStatus {
        let status = core::mem::take(&mut self.status);
        if status.period_elapsed {
            // Counter restarts on the period match
            self.now = 0;
        }
        status
    }

    fn end_of_interrupt(&mut self) {
        self.eoi_count += 1;
    }

    fn disable_interrupts(&mut self) {
        self.irq_enabled = false;
        self.mask_toggles += 1;
    }

    fn enable_interrupts(&mut self) {
        self.irq_enabled = true;
        self.mask_toggles += 1;
    }

    fn enter_nested(&mut self) {
        self.nest_depth += 1;
        self.nest_entries += 1;
    }

    fn exit_nested(&mut self) {
        self.nest_depth -= 1;
    }
}

/// Output register in memory
#[derive(Debug, Default)]
pub struct MockPort {
    pub value: u32,
    pub configured: u32,
    pub writes: u32,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputPort for MockPort {
    fn configure_outputs(&mut self, mask: u32) {
        self.configured |= mask;
    }

    fn write_masked(&mut self, mask: u32, value: u32) {
        self.value = (self.value & !mask) | (value & mask);
        self.writes += 1;
    }

    fn output(&self) -> u32 {
        self.value
    }
}

impl<const AXES: usize, const HEAP: usize, const SEQS: usize>
    Controller<MockTimer, MockPort, AXES, HEAP, SEQS>
{
    /// Deliver a period interrupt
    pub fn boundary(&mut self) {
        self.timer.status = TimerStatus {
            step_due: false,
            period_elapsed: true,
        };
        self.service(Nesting::Disabled);
    }

    /// Deliver step interrupts until the period has nothing left to fire
    pub fn sweep_with(&mut self, mut observe: impl FnMut(&MockTimer)) {
        let period = self.timing.period_ticks();
        while let Some(at) = self.timer.compare {
            if at < self.timer.now || at >= period {
                break;
            }
            self.timer.now = at;
            self.timer.status = TimerStatus {
                step_due: true,
                period_elapsed: false,
            };
            self.service(Nesting::Disabled);
            observe(&self.timer);
            if self.timer.compare == Some(at) {
                break;
            }
        }
    }

    pub fn sweep(&mut self) {
        self.sweep_with(|_| {});
    }

    /// One boundary followed by every step of the period
    pub fn run_period(&mut self) {
        self.boundary();
        self.sweep();
    }
}
