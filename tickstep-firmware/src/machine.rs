//! Machine constants generated from machine.toml

use tickstep_core::config::{AxisConfig, DriveMode, TimingConfig};

include!(concat!(env!("OUT_DIR"), "/machine.rs"));
