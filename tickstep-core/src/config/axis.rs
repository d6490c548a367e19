//! Per-axis output configuration
//!
//! An axis is driven by stepping through a cyclic table of GPIO bit
//! patterns. Three tables exist, one per [`PowerLevel`]; they share the
//! same length so the phase index stays valid when the level changes.

use heapless::Vec;

use crate::error::ConfigError;
use crate::motion::PowerLevel;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest supported phase sequence
pub const MAX_SEQUENCE_LEN: usize = 8;

/// Highest GPIO bit in the output register
pub const MAX_PIN: u8 = 31;

/// Phase tables for the three power levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTables {
    acc: &'static [u32],
    run: &'static [u32],
    hold: &'static [u32],
}

impl PhaseTables {
    /// Create phase tables, checking that all three have the same length
    pub fn new(
        acc: &'static [u32],
        run: &'static [u32],
        hold: &'static [u32],
    ) -> Result<Self, ConfigError> {
        if acc.is_empty() || run.is_empty() || hold.is_empty() {
            return Err(ConfigError::EmptyPhaseTable);
        }
        if acc.len() != run.len() || run.len() != hold.len() {
            return Err(ConfigError::PhaseTableLength);
        }
        Ok(Self { acc, run, hold })
    }

    /// Use the same table for every power level
    pub fn uniform(table: &'static [u32]) -> Result<Self, ConfigError> {
        Self::new(table, table, table)
    }

    /// Number of phases in the cycle
    pub fn sequence_length(&self) -> usize {
        self.hold.len()
    }

    /// Table for a power level
    pub fn table(&self, power: PowerLevel) -> &'static [u32] {
        match power {
            PowerLevel::Acc => self.acc,
            PowerLevel::Run => self.run,
            PowerLevel::Hold => self.hold,
        }
    }
}

/// Coil energising scheme for a four-wire unipolar/bipolar stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DriveMode {
    /// One coil at a time (4 phases)
    Wave,
    /// Two adjacent coils at a time (4 phases)
    #[default]
    Full,
    /// Alternating one and two coils (8 phases)
    Half,
}

impl DriveMode {
    /// Number of phases in one electrical cycle
    pub const fn sequence_length(self) -> usize {
        match self {
            DriveMode::Wave | DriveMode::Full => 4,
            DriveMode::Half => 8,
        }
    }

    /// Coils (0..4) energised at `phase`, as a 4-bit mask
    pub const fn coils(self, phase: usize) -> u8 {
        match self {
            DriveMode::Wave => 1 << (phase % 4),
            DriveMode::Full => {
                let p = phase % 4;
                (1 << p) | (1 << ((p + 1) % 4))
            }
            DriveMode::Half => {
                let p = phase % 8;
                if p % 2 == 0 {
                    1 << (p / 2)
                } else {
                    (1 << (p / 2)) | (1 << ((p / 2 + 1) % 4))
                }
            }
        }
    }
}

/// GPIO assignment of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisConfig {
    /// Coil pins A, B, C, D in sequence order
    pub coils: [u8; 4],
    /// Current-select pins: first is asserted when running, both when
    /// accelerating, none when holding
    pub current: Option<[u8; 2]>,
    /// Energising scheme
    #[cfg_attr(feature = "serde", serde(default))]
    pub drive: DriveMode,
}

impl AxisConfig {
    /// Create an axis without current-select pins
    pub const fn new(coils: [u8; 4], drive: DriveMode) -> Self {
        Self {
            coils,
            current: None,
            drive,
        }
    }

    /// Check that every pin fits in the output register
    pub fn validate(&self) -> Result<(), ConfigError> {
        let current = self.current.unwrap_or([0, 0]);
        if self.coils.iter().chain(current.iter()).any(|&p| p > MAX_PIN) {
            return Err(ConfigError::InvalidPin);
        }
        Ok(())
    }

    /// All pins owned by this axis
    pub fn io_mask(&self) -> u32 {
        let mut mask = self.coils.iter().fold(0u32, |m, &p| m | bit(p));
        if let Some(current) = self.current {
            mask |= bit(current[0]) | bit(current[1]);
        }
        mask
    }

    /// Current-select bits for a power level
    pub fn current_bits(&self, power: PowerLevel) -> u32 {
        match (self.current, power) {
            (None, _) | (Some(_), PowerLevel::Hold) => 0,
            (Some([run, _]), PowerLevel::Run) => bit(run),
            (Some([run, boost]), PowerLevel::Acc) => bit(run) | bit(boost),
        }
    }

    /// Output pattern for one phase at one power level
    pub fn pattern(&self, power: PowerLevel, phase: usize) -> u32 {
        let coils = self.drive.coils(phase);
        let bits = self
            .coils
            .iter()
            .enumerate()
            .filter(|(i, _)| coils & (1 << i) != 0)
            .fold(0u32, |m, (_, &p)| m | bit(p));
        bits | self.current_bits(power)
    }

    /// Build the phase table for one power level
    pub fn table(&self, power: PowerLevel) -> Vec<u32, MAX_SEQUENCE_LEN> {
        (0..self.drive.sequence_length())
            .map(|phase| self.pattern(power, phase))
            .collect()
    }
}

fn bit(pin: u8) -> u32 {
    1u32 << (pin & MAX_PIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    static FOUR: [u32; 4] = [1, 2, 4, 8];
    static TWO: [u32; 2] = [1, 2];

    #[test]
    fn test_phase_tables_length_check() {
        assert!(PhaseTables::new(&FOUR, &FOUR, &FOUR).is_ok());
        assert_eq!(
            PhaseTables::new(&FOUR, &TWO, &FOUR),
            Err(ConfigError::PhaseTableLength)
        );
        assert_eq!(
            PhaseTables::new(&[], &[], &[]),
            Err(ConfigError::EmptyPhaseTable)
        );
    }

    #[test]
    fn test_table_selection() {
        let tables = PhaseTables::new(&FOUR, &TWO, &TWO);
        assert!(tables.is_err());

        let tables = PhaseTables::uniform(&FOUR).unwrap();
        assert_eq!(tables.sequence_length(), 4);
        assert_eq!(tables.table(PowerLevel::Hold)[3], 8);
    }

    #[test]
    fn test_full_step_pattern() {
        let axis = AxisConfig::new([0, 1, 2, 3], DriveMode::Full);
        let table = axis.table(PowerLevel::Run);
        assert_eq!(table.as_slice(), &[0b0011, 0b0110, 0b1100, 0b1001]);
        assert_eq!(axis.io_mask(), 0b1111);
    }

    #[test]
    fn test_half_step_pattern() {
        let axis = AxisConfig::new([4, 5, 6, 7], DriveMode::Half);
        let table = axis.table(PowerLevel::Hold);
        assert_eq!(table.len(), 8);
        assert_eq!(table[0], 0b0001 << 4);
        assert_eq!(table[1], 0b0011 << 4);
        assert_eq!(table[7], 0b1001 << 4);
    }

    #[test]
    fn test_current_select_bits() {
        let mut axis = AxisConfig::new([0, 1, 2, 3], DriveMode::Wave);
        axis.current = Some([8, 9]);
        assert_eq!(axis.io_mask(), 0b11_0000_1111);
        assert_eq!(axis.pattern(PowerLevel::Hold, 0), 0b0001);
        assert_eq!(axis.pattern(PowerLevel::Run, 0), 0b01_0000_0001);
        assert_eq!(axis.pattern(PowerLevel::Acc, 1), 0b11_0000_0010);
    }

    #[test]
    fn test_invalid_pin() {
        let axis = AxisConfig::new([0, 1, 2, 40], DriveMode::Full);
        assert_eq!(axis.validate(), Err(ConfigError::InvalidPin));
    }
}
