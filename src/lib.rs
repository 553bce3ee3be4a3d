//! Driver for the ST IIS3DWB vibration sensor, plus a threaded acquisition
//! pipeline for hosted targets.
//!
//! The driver core ([`Iis3dwb`]) is `no_std` and works over any
//! `embedded-hal` 1.0 [`SpiDevice`](embedded_hal::spi::SpiDevice). The `std`
//! feature adds the bounded [`SampleQueue`] and [`Pipeline`]; `linux` adds
//! spidev helpers.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
mod log;

mod error;

#[cfg(feature = "std")]
pub mod acquisition;
pub mod config;
pub mod device;
pub mod interface;
pub mod params;
#[cfg(feature = "std")]
pub mod queue;
pub mod registers;
pub mod sample;

pub use crate::config::Config;
pub use crate::device::{Iis3dwb, SessionState};
pub use crate::error::{Error, Result};
pub use crate::params::FullScale;
pub use crate::sample::Sample;

#[cfg(feature = "std")]
pub use crate::acquisition::{
    InitError,
    LogSink,
    Pipeline,
    PipelineConfig,
    PipelineStats,
    SampleSink,
    StartError,
    StopError,
};
#[cfg(feature = "linux")]
pub use crate::acquisition::linux::{acquisition_init, open_spidev, BusConfig, OpenError};
#[cfg(feature = "std")]
pub use crate::queue::{QueueEmpty, QueueFull, SampleQueue};
