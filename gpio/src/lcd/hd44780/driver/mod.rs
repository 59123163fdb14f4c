mod gpio;

use crate::GpioResult;
pub use gpio::*;
use std::fmt::Debug;

/// Register-level transfer interface to an HD44780 controller.
///
/// Implementations own the physical framing: how a byte gets onto the data
/// lines and strobed into the controller's input latch, including the
/// two-nibble sequencing on buses narrower than a byte. Everything above this
/// seam ([super::Hd44780Display]) is bus-agnostic, so an I2C-backpack
/// implementation can slot in later.
///
/// This driver never reads from the controller; busy-flag polling is replaced
/// by worst-case delays above the seam.
pub trait Hd44780Bus: Debug {
    /// Whether the bus drives all 8 data lines. Buses that are not 8-bit
    /// transfer each byte as two nibbles, high nibble first.
    fn is_eight_bit(&self) -> bool;

    /// Drives the control lines to a known idle state: register select and
    /// strobe low, and read/write (when wired) low. Called once before any
    /// traffic, while the controller's power-on state is still unknown.
    fn set_idle(&mut self) -> GpioResult<()>;

    /// Performs a single physical transfer without touching register select:
    /// the low nibble of `value` on a 4-bit bus, the whole byte on an 8-bit
    /// one. Only used by the mode-negotiation handshake, which runs before
    /// byte framing is established.
    fn write_raw(&mut self, value: u8) -> GpioResult<()>;

    /// Transfers `value` into the instruction register (register select low).
    fn write_command(&mut self, value: u8) -> GpioResult<()>;

    /// Transfers `value` into the data register (register select high).
    fn write_data(&mut self, value: u8) -> GpioResult<()>;
}
