//! Shared motion controller
//!
//! The controller lives in a critical-section mutex so the timer
//! interrupts and the async tasks can both reach it. Every access from
//! a task masks interrupts for its duration, which is what the command
//! API requires; the interrupt handlers take the same lock, so the
//! period handler runs with interrupts masked as well.

use core::cell::RefCell;

use defmt::*;
use embassy_rp::interrupt;
use embassy_rp::interrupt::Priority;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU32, Ordering};
use static_cell::StaticCell;

use tickstep_core::config::{AxisConfig, PhaseTables, MAX_SEQUENCE_LEN};
use tickstep_core::{Controller, Nesting, PowerLevel};
use tickstep_hal_rp2040::{AlarmTimer, SioPort};

use crate::machine;

/// Controller type for this machine
pub type MotionController = Controller<AlarmTimer, SioPort, { machine::AXES }>;

/// Phase table storage: acc, run, hold per axis
type TableStore = [[heapless::Vec<u32, MAX_SEQUENCE_LEN>; 3]; machine::AXES];

static MOTION: Mutex<CriticalSectionRawMutex, RefCell<Option<MotionController>>> =
    Mutex::new(RefCell::new(None));

static PHASE_TABLES: StaticCell<TableStore> = StaticCell::new();

/// Sequence marks reached, as `(axis, period)`
pub static SEQUENCE_MARK: Signal<CriticalSectionRawMutex, (usize, u32)> = Signal::new();

/// Number of sequence marks reached since boot
pub static MARK_COUNT: AtomicU32 = AtomicU32::new(0);

/// Build the controller and attach every configured axis
///
/// Runs under the lock so no timer interrupt can observe a half-built
/// controller. On a timing error nothing is installed and the motion
/// task finds no controller.
pub fn install(timer: AlarmTimer, port: SioPort) {
    timer.set_priority(Priority::P1);
    let tables = build_tables(&machine::AXIS_CONFIG);

    let installed = MOTION.lock(|cell| {
        let mut controller = match MotionController::new(timer, port, machine::TIMING) {
            Ok(controller) => controller,
            Err(e) => {
                error!("Motion controller rejected timing: {:?}", e);
                return false;
            }
        };

        for (axis, (config, table)) in machine::AXIS_CONFIG.iter().zip(tables.iter()).enumerate() {
            let phases = match PhaseTables::new(&table[0], &table[1], &table[2]) {
                Ok(phases) => phases,
                Err(e) => {
                    error!("Axis {}: bad phase tables: {:?}", axis, e);
                    continue;
                }
            };
            if let Err(e) = controller.init_io(axis, config.io_mask(), phases) {
                error!("Axis {}: init failed: {:?}", axis, e);
            }
        }
        controller.set_callback(Some(on_sequence_mark));

        *cell.borrow_mut() = Some(controller);
        true
    });
    if !installed {
        return;
    }

    info!(
        "Motion controller running: {} axes, {} ticks/period",
        machine::AXES,
        machine::TIMING.period_ticks()
    );
}

/// Run `f` on the controller with the timer interrupts locked out
///
/// Returns `None` if the controller is not installed.
pub fn with_motion<R>(f: impl FnOnce(&mut MotionController) -> R) -> Option<R> {
    MOTION.lock(|cell| cell.borrow_mut().as_mut().map(f))
}

fn build_tables(axes: &[AxisConfig; machine::AXES]) -> &'static TableStore {
    let store = PHASE_TABLES.init(core::array::from_fn(|axis| {
        let config = &axes[axis];
        [
            config.table(PowerLevel::Acc),
            config.table(PowerLevel::Run),
            config.table(PowerLevel::Hold),
        ]
    }));
    &*store
}

/// Sequence callback, called from the period interrupt
fn on_sequence_mark(axis: usize, period: u32) {
    MARK_COUNT.fetch_add(1, Ordering::Relaxed);
    SEQUENCE_MARK.signal((axis, period));
}

fn service() {
    MOTION.lock(|cell| {
        if let Some(controller) = cell.borrow_mut().as_mut() {
            controller.service(Nesting::Disabled);
        }
    });
}

#[interrupt]
fn TIMER_IRQ_2() {
    service();
}

#[interrupt]
fn TIMER_IRQ_3() {
    service();
}
