//! Linux spidev transport.

use std::fmt;
use std::io;
use std::path::Path;

use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{Delay, SPIError, SpidevDevice};

use super::{InitError, Pipeline, PipelineConfig, SampleSink};
use crate::device::Iis3dwb;
use crate::interface::spi::SpiInterface;

/// Session type produced by [`open_spidev`].
pub type SpidevSession = Iis3dwb<SpiInterface<SpidevDevice>>;

/// Bus settings applied when the spidev node is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// SPI mode (CPOL/CPHA in bits 1:0) plus any spidev mode flags.
    pub mode: u8,
    /// Maximum clock in hertz.
    pub max_speed_hz: u32,
    /// Word width in bits.
    pub bits_per_word: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            mode: 0,
            max_speed_hz: 8_000_000,
            bits_per_word: 8,
        }
    }
}

/// The spidev node could not be opened or configured.
#[derive(Debug)]
pub enum OpenError {
    /// Opening the device node failed.
    Open(SPIError),
    /// Applying mode, speed or word width failed.
    Configure(io::Error),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(err) => write!(f, "failed to open SPI device: {err:?}"),
            Self::Configure(err) => write!(f, "failed to configure SPI device: {err}"),
        }
    }
}

impl std::error::Error for OpenError {}

/// Opens a spidev node and wraps it in an unidentified session.
pub fn open_spidev(path: impl AsRef<Path>, bus: &BusConfig) -> Result<SpidevSession, OpenError> {
    Ok(Iis3dwb::new_spi(open_device(path.as_ref(), bus)?))
}

/// Opens the sensor, brings it up at the default range without LPF2 and builds
/// an idle pipeline with default idle intervals.
pub fn acquisition_init<S: SampleSink>(
    path: impl AsRef<Path>,
    bus: &BusConfig,
    queue_capacity: usize,
    sink: S,
) -> Result<Pipeline<SpiInterface<SpidevDevice>, S>, InitError<SPIError>> {
    if queue_capacity == 0 {
        return Err(InitError::InvalidCapacity);
    }

    let spi = open_device(path.as_ref(), bus).map_err(InitError::Open)?;
    let config = PipelineConfig::new().queue_capacity(queue_capacity).build();
    Pipeline::init(SpiInterface::new(spi), &mut Delay, sink, config)
}

fn open_device(path: &Path, bus: &BusConfig) -> Result<SpidevDevice, OpenError> {
    let mut spi = SpidevDevice::open(path).map_err(OpenError::Open)?;

    let options = SpidevOptions::new()
        .mode(SpiModeFlags::from_bits_truncate(u32::from(bus.mode)))
        .max_speed_hz(bus.max_speed_hz)
        .bits_per_word(bus.bits_per_word)
        .build();
    spi.0.configure(&options).map_err(OpenError::Configure)?;

    info!(
        "opened {} (mode {}, {} Hz, {} bits)",
        path.display(),
        bus.mode,
        bus.max_speed_hz,
        bus.bits_per_word
    );
    Ok(spi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::LogSink;

    #[test]
    fn missing_device_node_is_an_open_error() {
        let result = open_spidev("/dev/does-not-exist/spidev9.9", &BusConfig::default());
        assert!(matches!(result, Err(OpenError::Open(_))));
    }

    #[test]
    fn zero_capacity_is_rejected_before_opening() {
        let result = acquisition_init(
            "/dev/does-not-exist/spidev9.9",
            &BusConfig::default(),
            0,
            LogSink,
        );
        assert!(matches!(result, Err(InitError::InvalidCapacity)));
    }
}
