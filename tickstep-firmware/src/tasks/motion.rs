//! Demonstration motion task
//!
//! Ramps every axis to the configured cruise velocity, holds it, ramps
//! back to rest, then repeats in the other direction. Each leg ends with
//! a sequence mark on axis 0; the task sleeps on the mark signal instead
//! of polling the controller.

use defmt::*;
use embassy_time::Timer;

use tickstep_core::StepperError;

use crate::machine;
use crate::motion::{with_motion, SEQUENCE_MARK};

/// Periods between "now" and the first period a command can change
const LEAD_PERIODS: u32 = 2;

/// Queue a ramp of every axis to `target`, then a mark `hold` periods
/// after the slowest axis gets there
fn schedule_leg(target: i32, hold: u32) -> Result<u32, StepperError> {
    with_motion(|controller| {
        let start = controller.current_period().wrapping_add(LEAD_PERIODS);
        let mut reached = start;
        for axis in 0..machine::AXES {
            let end = controller.set_velocity(axis, start, machine::MAX_ACC, target)?;
            reached = reached.max(end);
        }
        controller.insert_callback(0, reached.wrapping_add(hold))?;
        Ok(reached)
    })
    // No controller means no axes
    .unwrap_or(Err(StepperError::InvalidAxis))
}

/// Run one leg and wait for its mark
async fn run_leg(target: i32, hold: u32) -> bool {
    SEQUENCE_MARK.reset();
    match schedule_leg(target, hold) {
        Ok(reached) => {
            debug!("Velocity {} reached at period {}", target, reached);
        }
        Err(e) => {
            warn!("Could not schedule velocity {}: {:?}", target, e);
            return false;
        }
    }
    let (axis, period) = SEQUENCE_MARK.wait().await;
    trace!("Mark on axis {} at period {}", axis, period);
    true
}

/// Motion task - cycles the demonstration move forever
#[embassy_executor::task]
pub async fn motion_task() {
    info!(
        "Motion task started: cruise {}, max_acc {}",
        machine::CRUISE_VELOCITY,
        machine::MAX_ACC
    );

    let mut direction = 1;
    loop {
        let cruise = direction * machine::CRUISE_VELOCITY;
        if !run_leg(cruise, machine::CRUISE_PERIODS).await || !run_leg(0, 0).await {
            // Pool exhausted or controller missing: back off and retry
            Timer::after_millis(100).await;
            continue;
        }
        direction = -direction;
    }
}
