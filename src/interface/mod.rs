//! Bus interface abstraction and register framing for the IIS3DWB driver.
//!
//! The device shares one shift register between the address byte and the data
//! that follows it. Every read is therefore a single full-duplex transfer one byte
//! longer than the payload, and the byte clocked in while the address goes out
//! carries nothing and is dropped.

pub mod spi;

/// Address bit selecting a register read; cleared for writes.
pub const READ_FLAG: u8 = 0x80;

/// Returns the address byte for a read starting at `register`.
pub const fn encode_read_address(register: u8) -> u8 {
    register | READ_FLAG
}

/// Returns the address byte for a write to `register`.
pub const fn encode_write_address(register: u8) -> u8 {
    register & !READ_FLAG
}

/// Reassembles a little-endian two's-complement axis value.
pub const fn decode_axis_pair(low: u8, high: u8) -> i16 {
    i16::from_le_bytes([low, high])
}

/// Abstraction over the low-level bus access required by the driver.
pub trait Iis3dwbInterface {
    /// Error type produced by the concrete bus implementation.
    type Error;

    /// Writes a single register.
    fn write_register(&mut self, register: u8, value: u8) -> core::result::Result<(), Self::Error>;

    /// Reads a single register.
    fn read_register(&mut self, register: u8) -> core::result::Result<u8, Self::Error>;

    /// Reads consecutive registers starting at `register` into `buf`.
    fn burst_read(&mut self, register: u8, buf: &mut [u8]) -> core::result::Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_address_sets_high_bit() {
        assert_eq!(encode_read_address(0x0F), 0x8F);
        assert_eq!(encode_read_address(0x28), 0xA8);
        assert_eq!(encode_read_address(0x8F), 0x8F);
    }

    #[test]
    fn write_address_clears_high_bit() {
        assert_eq!(encode_write_address(0x10), 0x10);
        assert_eq!(encode_write_address(0x92), 0x12);
    }

    #[test]
    fn decodes_signed_little_endian_pairs() {
        assert_eq!(decode_axis_pair(0xFF, 0xFF), -1);
        assert_eq!(decode_axis_pair(0x00, 0x80), i16::MIN);
        assert_eq!(decode_axis_pair(0xFF, 0x7F), i16::MAX);
        assert_eq!(decode_axis_pair(0x01, 0x00), 1);
    }

    #[test]
    fn decode_inverts_le_encoding() {
        for value in [i16::MIN, -12_345, -256, -1, 0, 1, 255, 256, 12_345, i16::MAX] {
            let [low, high] = value.to_le_bytes();
            assert_eq!(decode_axis_pair(low, high), value);
        }
    }
}
