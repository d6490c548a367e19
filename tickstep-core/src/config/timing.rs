//! Scheduler timing and fixed-point scaling
//!
//! Positions are tracked in `1/DIST_SCALE` fractions of a step and
//! velocities in `1/VEL_SCALE` units per period. The solver works on
//! `a·t² + v·t` in timer ticks, so both are rescaled before solving:
//!
//! - `S_SCALING = 2·TIMER_FREQ² / DIST_SCALE` (displacement)
//! - `V_SCALING = 2·TIMER_FREQ / VEL_SCALE` (velocity)
//!
//! With `DIST_SCALE = 2·PPS²` and `VEL_SCALE = PPS` the solver curve
//! ends exactly at the displacement the planner integrates for one
//! period.

use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default timer frequency in Hz
pub const DEFAULT_TIMER_FREQ: u32 = 748_800;

/// Default number of periods per second
pub const DEFAULT_PPS: u32 = 128;

/// Largest period (in ticks) the 16-bit compare registers can express
pub const MAX_PERIOD_TICKS: u32 = 0xFFFF;

/// Timing configuration shared by planner and dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// Tick frequency of the step timer in Hz
    pub timer_freq: u32,
    /// Planner periods per second
    pub pps: u32,
    /// Fractional steps per whole step
    pub dist_scale: i32,
    /// Velocity fixed-point scale
    pub vel_scale: i32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TimingConfig {
    /// 748.8 kHz timer, 128 periods per second, matched scales
    pub const DEFAULT: Self = Self::matched(DEFAULT_TIMER_FREQ, DEFAULT_PPS);

    /// Create a configuration with `DIST_SCALE = 2·PPS²` and `VEL_SCALE = PPS`
    pub const fn matched(timer_freq: u32, pps: u32) -> Self {
        Self {
            timer_freq,
            pps,
            dist_scale: (2 * pps * pps) as i32,
            vel_scale: pps as i32,
        }
    }

    /// Ticks per period (`TIMER_FREQ / PPS`)
    pub const fn period_ticks(&self) -> u32 {
        self.timer_freq / self.pps
    }

    /// Displacement scaling between position units and solver units
    pub const fn s_scaling(&self) -> i64 {
        let freq = self.timer_freq as i64;
        2 * freq * freq / self.dist_scale as i64
    }

    /// Velocity scaling between velocity units and solver units
    pub const fn v_scaling(&self) -> i64 {
        2 * self.timer_freq as i64 / self.vel_scale as i64
    }

    /// Check that the configuration can drive the timer
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pps == 0 || self.dist_scale <= 0 || self.vel_scale <= 0 {
            return Err(ConfigError::InvalidTiming);
        }
        let period = self.period_ticks();
        if period < 2 || period > MAX_PERIOD_TICKS {
            return Err(ConfigError::InvalidTiming);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scaling() {
        let timing = TimingConfig::DEFAULT;
        assert_eq!(timing.period_ticks(), 5850);
        assert_eq!(timing.dist_scale, 32_768);
        assert_eq!(timing.vel_scale, 128);
        assert_eq!(timing.v_scaling(), 11_700);
        assert!(timing.validate().is_ok());
    }

    #[test]
    fn test_matched_scales_close_the_period() {
        // a·T² must equal a·S_SCALING and v·V_SCALING·T must equal 2v·S_SCALING
        let timing = TimingConfig::DEFAULT;
        let t = timing.period_ticks() as i64;
        assert_eq!(t * t, timing.s_scaling());
        assert_eq!(timing.v_scaling() * t, 2 * timing.s_scaling());
    }

    #[test]
    fn test_invalid_timing() {
        let mut timing = TimingConfig::DEFAULT;
        timing.pps = 0;
        assert_eq!(timing.validate(), Err(ConfigError::InvalidTiming));

        let mut timing = TimingConfig::DEFAULT;
        timing.pps = 10; // 74_880 ticks does not fit 16 bits
        assert_eq!(timing.validate(), Err(ConfigError::InvalidTiming));

        let mut timing = TimingConfig::DEFAULT;
        timing.dist_scale = 0;
        assert_eq!(timing.validate(), Err(ConfigError::InvalidTiming));
    }
}
