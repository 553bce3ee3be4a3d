//! SPI interface implementation built on top of `embedded-hal` `SpiDevice`.

use embedded_hal::spi::{Operation, SpiDevice};

use super::{encode_read_address, encode_write_address, Iis3dwbInterface};

// Payload bytes that fit the on-stack full-duplex frame.
const SCRATCH_LEN: usize = 32;

/// SPI-based interface implementation for the IIS3DWB driver.
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI> {
    /// Creates a new interface from the provided SPI device abstraction.
    pub const fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Provides mutable access to the wrapped SPI device.
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Consumes the interface and returns the owned SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Iis3dwbInterface for SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    type Error = SPI::Error;

    fn write_register(&mut self, register: u8, value: u8) -> core::result::Result<(), Self::Error> {
        self.spi.write(&[encode_write_address(register), value])
    }

    fn read_register(&mut self, register: u8) -> core::result::Result<u8, Self::Error> {
        let mut value = [0u8; 1];
        self.burst_read(register, &mut value)?;
        Ok(value[0])
    }

    fn burst_read(&mut self, register: u8, buf: &mut [u8]) -> core::result::Result<(), Self::Error> {
        if buf.is_empty() {
            return Ok(());
        }

        let address = encode_read_address(register);

        if buf.len() <= SCRATCH_LEN {
            let frame_len = buf.len() + 1;
            let mut tx = [0u8; SCRATCH_LEN + 1];
            let mut rx = [0u8; SCRATCH_LEN + 1];
            tx[0] = address;

            self.spi.transfer(&mut rx[..frame_len], &tx[..frame_len])?;

            // rx[0] was shifted in during the address byte.
            buf.copy_from_slice(&rx[1..frame_len]);
            return Ok(());
        }

        // Same frame on the wire, clocked as two operations under one chip select.
        let mut discarded = [0u8; 1];
        buf.fill(0);
        self.spi.transaction(&mut [
            Operation::Transfer(&mut discarded, &[address]),
            Operation::TransferInPlace(buf),
        ])
    }
}
