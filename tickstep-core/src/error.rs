//! Error types for the motion-command API and configuration

/// Errors returned by the motion-command API
///
/// None of these can occur inside the interrupt handler; the dispatch
/// path never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperError {
    /// Axis index is out of range
    InvalidAxis,
    /// Requested period is already planned or being executed
    TooLate,
    /// Acceleration-sequence pool is exhausted
    OutOfMemory,
    /// Sequence entries out of period order, or a zero acceleration limit
    InvalidArgument,
}

/// Errors detected while validating configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A phase table has no entries
    EmptyPhaseTable,
    /// Phase tables of one axis differ in length
    PhaseTableLength,
    /// Timing parameters are zero or do not fit the timer
    InvalidTiming,
    /// A pin number is outside the output register
    InvalidPin,
}
