//! Acceleration sample type.

use crate::interface::decode_axis_pair;
use crate::params::FullScale;

/// Number of consecutive output bytes spanning the X, Y and Z axes.
pub const SAMPLE_BYTES: usize = 6;

/// One raw triaxial acceleration reading, in device LSBs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// X-axis reading.
    pub x: i16,
    /// Y-axis reading.
    pub y: i16,
    /// Z-axis reading.
    pub z: i16,
}

impl Sample {
    /// Creates a sample from raw axis values.
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Decodes the `OUTX_L_XL..=OUTZ_H_XL` burst, low byte first per axis.
    pub fn from_le_bytes(raw: &[u8; SAMPLE_BYTES]) -> Self {
        Self {
            x: decode_axis_pair(raw[0], raw[1]),
            y: decode_axis_pair(raw[2], raw[3]),
            z: decode_axis_pair(raw[4], raw[5]),
        }
    }

    /// Scales the reading to milli-g for the full-scale range it was taken at.
    pub fn to_mg(&self, full_scale: FullScale) -> [f32; 3] {
        let k = full_scale.mg_per_lsb();
        [self.x as f32 * k, self.y as f32 * k, self.z as f32 * k]
    }
}

impl From<[i16; 3]> for Sample {
    fn from([x, y, z]: [i16; 3]) -> Self {
        Self { x, y, z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_axes_low_byte_first() {
        let raw = [0x34, 0x12, 0xFF, 0xFF, 0x00, 0x80];
        assert_eq!(Sample::from_le_bytes(&raw), Sample::new(0x1234, -1, i16::MIN));
    }

    #[test]
    fn scales_with_full_scale_sensitivity() {
        let sample = Sample::new(1000, -1000, 0);

        let [x, y, z] = sample.to_mg(FullScale::G2);
        assert!((x - 61.0).abs() < 1e-3);
        assert!((y + 61.0).abs() < 1e-3);
        assert_eq!(z, 0.0);

        let [x, _, _] = sample.to_mg(FullScale::G16);
        assert!((x - 488.0).abs() < 1e-3);
    }
}
