//! Register map definitions for the IIS3DWB accelerometer.
//!
//! Only the registers used for bring-up and polled acquisition are modelled.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

use crate::params::{AccelPower, FullScale};

/// Register address of `WHO_AM_I`.
pub const REG_WHO_AM_I: u8 = 0x0F;
/// Register address of `CTRL1_XL`.
pub const REG_CTRL1_XL: u8 = 0x10;
/// Register address of `CTRL3_C`.
pub const REG_CTRL3_C: u8 = 0x12;
/// Register address of `STATUS_REG`.
pub const REG_STATUS: u8 = 0x1E;
/// Register address of `OUTX_L_XL`; Y and Z follow in little-endian pairs.
pub const REG_OUTX_L_XL: u8 = 0x28;

/// Value `WHO_AM_I` reports for an IIS3DWB.
pub const WHO_AM_I_VALUE: u8 = 0x7B;

/// Bitfield representation of `CTRL1_XL` (address `0x10`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ctrl1Xl {
    #[skip]
    __: B1,
    // Second-stage low-pass filter on the output path (bit 1).
    pub lpf2_enable: bool,
    // Full-scale selection (bits 3:2).
    pub full_scale: FullScale,
    #[skip]
    __: B1,
    // Accelerometer enable (bits 7:5).
    pub power: AccelPower,
}

impl From<u8> for Ctrl1Xl {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<Ctrl1Xl> for u8 {
    fn from(value: Ctrl1Xl) -> Self {
        value.into_bytes()[0]
    }
}

/// Bitfield representation of `CTRL3_C` (address `0x12`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ctrl3C {
    // Software reset, self-clearing (bit 0).
    pub sw_reset: bool,
    #[skip]
    __: B1,
    // Register address auto-increment for multi-byte access (bit 2).
    pub if_inc: bool,
    // 3-wire SPI select (bit 3).
    pub sim: bool,
    // Interrupt pads open-drain (bit 4).
    pub pp_od: bool,
    // Interrupt active-low (bit 5).
    pub h_lactive: bool,
    // Block data update (bit 6).
    pub bdu: bool,
    // Reboot memory content (bit 7).
    pub boot: bool,
}

impl From<u8> for Ctrl3C {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<Ctrl3C> for u8 {
    fn from(value: Ctrl3C) -> Self {
        value.into_bytes()[0]
    }
}

/// Bitfield representation of `STATUS_REG` (address `0x1E`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    // New accelerometer sample available (bit 0).
    pub accel_data_ready: bool,
    #[skip]
    __: B1,
    // New temperature sample available (bit 2).
    pub temp_data_ready: bool,
    #[skip]
    __: B5,
}

impl From<u8> for Status {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<Status> for u8 {
    fn from(value: Status) -> Self {
        value.into_bytes()[0]
    }
}
