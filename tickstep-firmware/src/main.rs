//! tickstep - stepper scheduler firmware
//!
//! Main firmware binary for RP2040 boards driving phase-table steppers
//! straight from GPIO. The TIMER interrupts run the scheduler; async
//! tasks queue motion and report status.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use {defmt_rtt as _, panic_probe as _};

use tickstep_hal_rp2040::{AlarmTimer, PinBank, SioPort};

mod machine;
mod motion;
mod tasks;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("tickstep firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    let mut pins = PinBank::new(p);
    info!("Peripherals initialized");

    // Claim every axis' pins for the SIO port
    let mut port = SioPort::new();
    for (axis, config) in machine::AXIS_CONFIG.iter().enumerate() {
        if let Err(e) = pins.claim_mask(config.io_mask(), &mut port) {
            error!("Axis {}: cannot claim pins {=u32:#x}: {:?}", axis, config.io_mask(), e);
        }
    }
    info!("Output pins claimed: {=u32:#x}", port.claimed());

    motion::install(AlarmTimer::new(), port);

    spawner.spawn(tasks::motion_task()).unwrap();
    spawner.spawn(tasks::status_task()).unwrap();

    info!("All tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in interrupts and tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
    }
}
