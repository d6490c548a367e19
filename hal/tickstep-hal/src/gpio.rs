//! GPIO port abstraction
//!
//! Stepper phases are driven by writing a whole bit pattern at once, so
//! the abstraction is a port (many pins) rather than a single pin.

/// Multi-bit digital output register
///
/// Implementations must make [`OutputPort::write_masked`] atomic with
/// respect to bits outside `mask`: other axes and unrelated peripherals
/// share the same register.
pub trait OutputPort {
    /// Configure every pin in `mask` as an output
    fn configure_outputs(&mut self, mask: u32);

    /// Replace the bits selected by `mask` with the matching bits of `value`
    ///
    /// Equivalent to `out = (out & !mask) | (value & mask)`.
    fn write_masked(&mut self, mask: u32, value: u32);

    /// Read back the current output register
    fn output(&self) -> u32;

    /// Check whether all pins in `mask` are driven high
    fn is_set_high(&self, mask: u32) -> bool {
        self.output() & mask == mask
    }
}
