//! Periodic scheduler status report

use defmt::*;
use embassy_time::{Duration, Ticker};
use portable_atomic::Ordering;

use crate::machine;
use crate::motion::{with_motion, MARK_COUNT};

/// Report interval in milliseconds
pub const STATUS_INTERVAL_MS: u64 = 2000;

/// Status task - logs position, velocity and heap diagnostics
#[embassy_executor::task]
pub async fn status_task() {
    info!("Status task started");

    let mut ticker = Ticker::every(Duration::from_millis(STATUS_INTERVAL_MS));
    let mut last_dropped = 0;

    loop {
        ticker.next().await;

        let Some((period, dropped, free)) = with_motion(|c| {
            (c.current_period(), c.heap().dropped(), c.sequence_capacity())
        }) else {
            warn!("Motion controller not installed");
            continue;
        };

        info!(
            "period {} marks {} free seq {}",
            period,
            MARK_COUNT.load(Ordering::Relaxed),
            free
        );
        for axis in 0..machine::AXES {
            let state = with_motion(|c| (c.current_step(axis), c.current_velocity(axis)));
            if let Some((Ok(step), Ok(velocity))) = state {
                debug!("axis {}: step {} velocity {}", axis, step, velocity);
            }
        }
        if dropped != last_dropped {
            warn!("Step heap full: {} steps dropped", dropped - last_dropped);
            last_dropped = dropped;
        }
    }
}
