//! Bus interface abstraction for the INA3221 driver.

pub mod i2c;

/// Abstraction over the 16-bit register access required by the driver.
///
/// The INA3221 transfers register words most-significant byte first, while
/// SMBus word primitives are little-endian. Implementations hide that
/// asymmetry: values crossing this trait are always in host order.
pub trait Ina3221Interface {
    /// Error type produced by the concrete bus implementation.
    type Error;

    /// Writes a 16-bit register.
    fn write_register(&mut self, register: u8, value: u16) -> core::result::Result<(), Self::Error>;

    /// Reads a 16-bit register.
    fn read_register(&mut self, register: u8) -> core::result::Result<u16, Self::Error>;
}
