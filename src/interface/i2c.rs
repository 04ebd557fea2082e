//! I2C interface implementation built on top of `embedded-hal` `I2c`.

use embedded_hal::i2c::I2c;

use super::Ina3221Interface;

/// Address selected when `A0` is tied to `GND`.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// I2C-based interface implementation for the INA3221 driver.
pub struct I2cInterface<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cInterface<I2C> {
    /// Creates a new interface talking to the device at `address`.
    pub const fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Returns the 7-bit device address used for every transfer.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Provides mutable access to the wrapped I2C bus.
    pub fn i2c_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Consumes the interface and returns the owned I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Ina3221Interface for I2cInterface<I2C>
where
    I2C: I2c,
{
    type Error = I2C::Error;

    fn write_register(&mut self, register: u8, value: u16) -> core::result::Result<(), Self::Error> {
        let [msb, lsb] = value.to_be_bytes();
        self.i2c.write(self.address, &[register, msb, lsb])
    }

    fn read_register(&mut self, register: u8) -> core::result::Result<u16, Self::Error> {
        let mut word = [0u8; 2];
        self.i2c.write_read(self.address, &[register], &mut word)?;
        Ok(u16::from_be_bytes(word))
    }
}

#[cfg(test)]
mod tests {
    use super::{I2cInterface, DEFAULT_ADDRESS};
    use crate::interface::Ina3221Interface;
    use core::convert::Infallible;
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    /// Register file that stores whatever bytes are written and replays them on read.
    struct Loopback {
        registers: [[u8; 2]; 16],
    }

    impl ErrorType for Loopback {
        type Error = Infallible;
    }

    impl I2c for Loopback {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            let mut pointer = 0usize;
            for operation in operations.iter_mut() {
                match operation {
                    Operation::Write(data) => {
                        pointer = data[0] as usize;
                        if data.len() == 3 {
                            self.registers[pointer] = [data[1], data[2]];
                        }
                    }
                    Operation::Read(buf) => buf.copy_from_slice(&self.registers[pointer]),
                }
            }
            Ok(())
        }
    }

    #[test]
    fn write_register_sends_most_significant_byte_first() {
        let expectations = [I2cTransaction::write(DEFAULT_ADDRESS, vec![0x00, 0xFF, 0x23])];
        let mut interface = I2cInterface::new(I2cMock::new(&expectations), DEFAULT_ADDRESS);

        interface.write_register(0x00, 0xFF23).unwrap();
        interface.release().done();
    }

    #[test]
    fn read_register_swaps_wire_order_into_host_order() {
        let expectations = [I2cTransaction::write_read(
            0x41,
            vec![0x0F],
            vec![0x00, 0x01],
        )];
        let mut interface = I2cInterface::new(I2cMock::new(&expectations), 0x41);

        assert_eq!(interface.read_register(0x0F).unwrap(), 0x0001);
        interface.release().done();
    }

    #[test]
    fn bus_errors_are_propagated() {
        let expectations = [I2cTransaction::write_read(DEFAULT_ADDRESS, vec![0x02], vec![0, 0])
            .with_error(ErrorKind::Other)];
        let mut interface = I2cInterface::new(I2cMock::new(&expectations), DEFAULT_ADDRESS);

        assert_eq!(interface.read_register(0x02), Err(ErrorKind::Other));
        interface.release().done();
    }

    #[test]
    fn write_then_read_round_trips_on_loopback() {
        let bus = Loopback { registers: [[0; 2]; 16] };
        let mut interface = I2cInterface::new(bus, DEFAULT_ADDRESS);

        for value in [0x0000, 0x0001, 0x1F40, 0x8008, 0xFF23, 0xFFFF] {
            interface.write_register(0x07, value).unwrap();
            assert_eq!(interface.read_register(0x07).unwrap(), value);
        }
    }
}
