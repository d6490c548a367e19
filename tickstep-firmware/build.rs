//! Build script for tickstep-firmware
//!
//! - Sets up linker search paths and scripts
//! - Parses and validates machine.toml at compile time
//! - Generates the machine constants included by `src/machine.rs`

use std::env;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tickstep_core::config::{AxisConfig, TimingConfig};
use tickstep_core::scheduler::STEP_HEAP_SIZE;

/// RP2040 system timer rate; the timer backend cannot run at any other
const RP2040_TIMER_FREQ: u32 = 1_000_000;

/// Bank 0 GPIOs usable as outputs
const RP2040_PINS: u8 = 30;

/// Upper bound on axes, keeps the controller small enough for RAM
const MAX_AXES: usize = 8;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MachineToml {
    timing: TimingToml,
    #[serde(default)]
    axis: Vec<AxisConfig>,
    motion: MotionToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimingToml {
    timer_freq: u32,
    pps: u32,
    /// Defaults to 2·pps²
    dist_scale: Option<i32>,
    /// Defaults to pps
    vel_scale: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MotionToml {
    max_acc: u32,
    cruise_velocity: i32,
    cruise_periods: u32,
}

fn main() {
    setup_linker();
    let machine = load_config();
    let timing = validate_timing(&machine.timing);
    validate_axes(&machine.axis);
    validate_motion(&machine.motion, &timing, machine.axis.len());
    generate(&machine, &timing);
}

/// Set up linker search paths for memory.x and the link scripts
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read and deserialize machine.toml
fn load_config() -> MachineToml {
    println!("cargo:rerun-if-changed=machine.toml");

    let config_path = Path::new("machine.toml");
    if !config_path.exists() {
        fail(
            "machine.toml not found!",
            &[
                "The firmware requires a machine.toml configuration file."
                    .to_string(),
                "Please create one in the tickstep-firmware directory.".to_string(),
            ],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read machine.toml", &[e.to_string()]),
    };

    match toml::from_str(&content) {
        Ok(machine) => machine,
        Err(e) => fail(
            "Invalid machine.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    }
}

/// Build the timing block and check it fits the RP2040 timer
fn validate_timing(raw: &TimingToml) -> TimingConfig {
    if raw.pps == 0 || raw.pps > 32_768 {
        fail(
            "Invalid timing configuration",
            &["[timing] pps must be 1..=32768".to_string()],
        );
    }

    let mut errors = Vec::new();
    let mut timing = TimingConfig::matched(raw.timer_freq, raw.pps);
    if let Some(dist_scale) = raw.dist_scale {
        timing.dist_scale = dist_scale;
    }
    if let Some(vel_scale) = raw.vel_scale {
        timing.vel_scale = vel_scale;
    }

    if raw.timer_freq != RP2040_TIMER_FREQ {
        errors.push(format!(
            "[timing] timer_freq must be {} on RP2040",
            RP2040_TIMER_FREQ
        ));
    }
    if let Err(e) = timing.validate() {
        errors.push(format!(
            "[timing] {:?}: period must be 2..=65535 ticks, scales > 0",
            e
        ));
    } else if raw.timer_freq % raw.pps != 0 {
        println!(
            "cargo:warning=[timing] pps does not divide timer_freq; periods drift by {} ticks/s",
            raw.timer_freq % raw.pps
        );
    }

    if !errors.is_empty() {
        fail("Invalid timing configuration", &errors);
    }
    timing
}

/// Check pins, drive modes and pin ownership across axes
fn validate_axes(axes: &[AxisConfig]) {
    let mut errors = Vec::new();

    if axes.is_empty() {
        errors.push("Missing [[axis]] section - at least one axis is required".to_string());
    }
    if axes.len() > MAX_AXES {
        errors.push(format!("At most {} axes are supported", MAX_AXES));
    }

    let mut used = 0u32;
    for (i, axis) in axes.iter().enumerate() {
        let pins = axis.coils.iter().chain(axis.current.iter().flatten());
        if axis.validate().is_err() || pins.clone().any(|&p| p >= RP2040_PINS) {
            errors.push(format!(
                "[[axis]] {} uses a pin outside GPIO0..GPIO{}",
                i,
                RP2040_PINS - 1
            ));
            continue;
        }
        let mask = axis.io_mask();
        if mask.count_ones() as usize != pins.count() {
            errors.push(format!("[[axis]] {} lists the same pin twice", i));
        }
        if used & mask != 0 {
            errors.push(format!(
                "[[axis]] {} shares pins {:#x} with an earlier axis",
                i,
                used & mask
            ));
        }
        used |= mask;
    }

    if !errors.is_empty() {
        fail("Invalid axis configuration", &errors);
    }
}

/// Check the demonstration move against the step heap
fn validate_motion(motion: &MotionToml, timing: &TimingConfig, axes: usize) {
    let mut errors = Vec::new();

    if motion.max_acc == 0 || motion.max_acc > i32::MAX as u32 {
        errors.push("[motion] max_acc must be 1..=2147483647".to_string());
    }
    if motion.cruise_velocity == i32::MIN {
        errors.push("[motion] cruise_velocity out of range".to_string());
    }

    // Steps per period at cruise, rounded up, for all axes together
    let per_axis = (2 * motion.cruise_velocity.unsigned_abs() as u64)
        .div_ceil(timing.dist_scale.max(1) as u64)
        + 1;
    let total = per_axis * axes as u64;
    if total > STEP_HEAP_SIZE as u64 {
        println!(
            "cargo:warning=[motion] up to {} steps per period exceed the step heap ({}); extra steps will be dropped",
            total, STEP_HEAP_SIZE
        );
    }

    if !errors.is_empty() {
        fail("Invalid motion configuration", &errors);
    }
}

/// Write `machine.rs` into OUT_DIR
fn generate(machine: &MachineToml, timing: &TimingConfig) {
    let mut out = String::new();
    writeln!(out, "// Generated by build.rs from machine.toml").unwrap();
    writeln!(
        out,
        "pub const TIMING: TimingConfig = TimingConfig {{ timer_freq: {}, pps: {}, dist_scale: {}, vel_scale: {} }};",
        timing.timer_freq, timing.pps, timing.dist_scale, timing.vel_scale
    )
    .unwrap();
    writeln!(out, "pub const AXES: usize = {};", machine.axis.len()).unwrap();
    writeln!(out, "pub const AXIS_CONFIG: [AxisConfig; AXES] = [").unwrap();
    for axis in &machine.axis {
        writeln!(
            out,
            "    AxisConfig {{ coils: {:?}, current: {:?}, drive: DriveMode::{:?} }},",
            axis.coils, axis.current, axis.drive
        )
        .unwrap();
    }
    writeln!(out, "];").unwrap();
    writeln!(out, "pub const MAX_ACC: u32 = {};", machine.motion.max_acc).unwrap();
    writeln!(
        out,
        "pub const CRUISE_VELOCITY: i32 = {};",
        machine.motion.cruise_velocity
    )
    .unwrap();
    writeln!(
        out,
        "pub const CRUISE_PERIODS: u32 = {};",
        machine.motion.cruise_periods
    )
    .unwrap();

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("machine.rs"), out).unwrap();

    println!(
        "cargo:warning=machine.toml validated: {} axes, {} ticks/period",
        machine.axis.len(),
        timing.period_ticks()
    );
}

/// Abort the build with a boxed diagnostic
fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|line| {
                let truncated = if line.len() > 62 {
                    format!("{}...", &line[..59])
                } else {
                    line.clone()
                };
                format!("║  • {:<62} ║", truncated)
            })
            .collect::<Vec<_>>()
            .join("\n")
    );
}
