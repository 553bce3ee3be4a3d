//! Strongly typed parameter enumerations for the IIS3DWB driver.
//!
//! These enums map directly to datasheet field encodings and are used across
//! [`Config`](crate::config::Config) and the register bitfields.
//!
//! # Examples
//!
//! ```rust
//! use iis3dwb::params::FullScale;
//!
//! let fs = FullScale::G4;
//! assert_eq!(fs.g(), 4);
//! ```

use modular_bitfield::prelude::Specifier;

/// Accelerometer full-scale selections encoded in `CTRL1_XL.FS_XL`.
///
/// The encoding is not monotonic: `01` selects ±16 g.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 2]
pub enum FullScale {
    /// ±2 g.
    G2 = 0b00,
    /// ±16 g.
    G16 = 0b01,
    /// ±4 g.
    G4 = 0b10,
    /// ±8 g.
    G8 = 0b11,
}

impl FullScale {
    /// Returns the full-scale range in g.
    pub const fn g(self) -> u8 {
        match self {
            Self::G2 => 2,
            Self::G4 => 4,
            Self::G8 => 8,
            Self::G16 => 16,
        }
    }

    /// Returns the output sensitivity in milli-g per LSB.
    pub const fn mg_per_lsb(self) -> f32 {
        match self {
            Self::G2 => 0.061,
            Self::G4 => 0.122,
            Self::G8 => 0.244,
            Self::G16 => 0.488,
        }
    }
}

/// Accelerometer power selection encoded in `CTRL1_XL.XL_EN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[repr(u8)]
#[bits = 3]
pub enum AccelPower {
    /// Accelerometer powered down (reset default).
    PowerDown = 0b000,
    /// Accelerometer on, 26.667 kHz output data rate.
    Enabled = 0b101,
}
