//! High-level IIS3DWB device session.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::interface::spi::SpiInterface;
use crate::interface::Iis3dwbInterface;
use crate::params::AccelPower;
use crate::registers::{
    Ctrl1Xl,
    Ctrl3C,
    Status,
    REG_CTRL1_XL,
    REG_CTRL3_C,
    REG_OUTX_L_XL,
    REG_STATUS,
    REG_WHO_AM_I,
    WHO_AM_I_VALUE,
};
use crate::sample::{Sample, SAMPLE_BYTES};
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;

// Settle time after a software reset before the register file is usable (milliseconds).
const RESET_SETTLE_DELAY_MS: u32 = 10;

/// Bring-up progress of a session.
///
/// States are ordered; an operation that needs a given state also runs in every
/// later one except [`SessionState::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Bus open, device not yet identified.
    Uninitialized,
    /// `WHO_AM_I` matched.
    Identified,
    /// `CTRL1_XL` programmed; samples can be read.
    Configured,
    /// Full bring-up sequence completed through [`Iis3dwb::init`].
    Ready,
    /// Bus released; every operation fails.
    Closed,
}

/// Decoded view of `STATUS_REG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSnapshot {
    /// STATUS_REG[0] XLDA.
    pub accel_data_ready: bool,
    /// STATUS_REG[2] TDA.
    pub temp_data_ready: bool,
}

impl From<Status> for StatusSnapshot {
    fn from(status: Status) -> Self {
        Self {
            accel_data_ready: status.accel_data_ready(),
            temp_data_ready: status.temp_data_ready(),
        }
    }
}

/// Synchronous session owning the bus to one IIS3DWB.
pub struct Iis3dwb<IFACE> {
    interface: Option<IFACE>,
    config: Config,
    state: SessionState,
}

impl<IFACE> Iis3dwb<IFACE> {
    // ==================================================================
    // == Session Construction & Ownership ==============================
    // ==================================================================
    /// Opens a session over the provided bus interface.
    pub fn new(interface: IFACE) -> Self {
        Self {
            interface: Some(interface),
            config: Config::default(),
            state: SessionState::Uninitialized,
        }
    }

    /// Current bring-up state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Configuration last written to the device.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Provides mutable access to the underlying interface, if still open.
    pub fn interface_mut(&mut self) -> Option<&mut IFACE> {
        self.interface.as_mut()
    }
}

impl<SPI> Iis3dwb<SpiInterface<SPI>>
where
    SPI: SpiDevice,
{
    /// Convenience constructor for SPI transports.
    pub fn new_spi(spi: SPI) -> Self {
        Self::new(SpiInterface::new(spi))
    }
}

impl<IFACE, CommE> Iis3dwb<IFACE>
where
    IFACE: Iis3dwbInterface<Error = CommE>,
{
    // ==================================================================
    // == Bring-up ======================================================
    // ==================================================================
    /// Runs the full bring-up sequence: identify, reset, configure.
    pub fn init(&mut self, delay: &mut impl DelayNs, config: Config) -> Result<(), CommE> {
        self.identify()?;
        self.reset(delay)?;
        self.configure(config)?;
        self.state = SessionState::Ready;
        info!("IIS3DWB ready (+/-{} g, lpf2 {})", config.full_scale.g(), config.lpf2_enabled);
        Ok(())
    }

    /// Reads the raw `WHO_AM_I` register.
    pub fn who_am_i(&mut self) -> Result<u8, CommE> {
        let value = self
            .interface_for(SessionState::Uninitialized)?
            .read_register(REG_WHO_AM_I)?;
        Ok(value)
    }

    /// Verifies `WHO_AM_I` against the IIS3DWB identity.
    ///
    /// A mismatch leaves the session where it was; the bus stays open until
    /// [`close`](Self::close).
    pub fn identify(&mut self) -> Result<(), CommE> {
        let found = self.who_am_i()?;
        if found != WHO_AM_I_VALUE {
            warn!("WHO_AM_I mismatch: read {:#x}, expected {:#x}", found, WHO_AM_I_VALUE);
            return Err(Error::IdentityMismatch { found });
        }

        if self.state < SessionState::Identified {
            self.state = SessionState::Identified;
        }
        info!("IIS3DWB detected (WHO_AM_I = {:#x})", found);
        Ok(())
    }

    /// Issues a software reset and waits for the device to settle.
    ///
    /// The 10 ms wait is mandatory; the register file is not usable before it
    /// elapses. The device comes back unconfigured.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), CommE> {
        let command = u8::from(Ctrl3C::new().with_sw_reset(true));
        self
            .interface_for(SessionState::Identified)?
            .write_register(REG_CTRL3_C, command)?;

        delay.delay_ms(RESET_SETTLE_DELAY_MS);

        self.config = Config::default();
        self.state = SessionState::Identified;
        debug!("IIS3DWB soft reset complete");
        Ok(())
    }

    /// Enables the accelerometer with the given range and filter path.
    ///
    /// Everything lands in `CTRL1_XL` with a single write.
    pub fn configure(&mut self, config: Config) -> Result<(), CommE> {
        let ctrl = Ctrl1Xl::new()
            .with_power(AccelPower::Enabled)
            .with_full_scale(config.full_scale)
            .with_lpf2_enable(config.lpf2_enabled);
        let value = u8::from(ctrl);

        self
            .interface_for(SessionState::Identified)?
            .write_register(REG_CTRL1_XL, value)?;

        self.config = config;
        self.state = SessionState::Configured;
        debug!("CTRL1_XL <- {:#x}", value);
        Ok(())
    }

    // ==================================================================
    // == Data Acquisition ==============================================
    // ==================================================================
    /// Returns a snapshot of `STATUS_REG`.
    pub fn read_status(&mut self) -> Result<StatusSnapshot, CommE> {
        let raw = self
            .interface_for(SessionState::Configured)?
            .read_register(REG_STATUS)?;
        Ok(Status::from(raw).into())
    }

    /// Polls the accelerometer data-ready flag.
    pub fn is_data_ready(&mut self) -> Result<bool, CommE> {
        Ok(self.read_status()?.accel_data_ready)
    }

    /// Reads the X, Y and Z output registers in one burst.
    ///
    /// Readiness is not checked here. Reading without a prior successful
    /// [`is_data_ready`](Self::is_data_ready) may return the previous sample or
    /// a mix of two.
    pub fn read_sample(&mut self) -> Result<Sample, CommE> {
        let mut raw = [0u8; SAMPLE_BYTES];
        self
            .interface_for(SessionState::Configured)?
            .burst_read(REG_OUTX_L_XL, &mut raw)?;
        Ok(Sample::from_le_bytes(&raw))
    }

    // ==================================================================
    // == Teardown ======================================================
    // ==================================================================
    /// Releases the bus and returns it to the caller.
    ///
    /// Succeeds once; later calls, like every other operation on a closed
    /// session, fail with [`Error::SessionClosed`].
    pub fn close(&mut self) -> Result<IFACE, CommE> {
        let interface = self.interface.take().ok_or(Error::SessionClosed)?;
        self.state = SessionState::Closed;
        debug!("IIS3DWB session closed");
        Ok(interface)
    }

    fn interface_for(&mut self, required: SessionState) -> Result<&mut IFACE, CommE> {
        if self.state == SessionState::Closed {
            return Err(Error::SessionClosed);
        }
        if self.state < required {
            return Err(Error::NotReady);
        }
        self.interface.as_mut().ok_or(Error::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FullScale;
    use embedded_hal::spi::ErrorKind;
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    #[derive(Default)]
    struct RecordingDelay {
        total_ns: u64,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    fn read_reg(register: u8, value: u8) -> Vec<SpiTransaction<u8>> {
        vec![
            SpiTransaction::transaction_start(),
            SpiTransaction::transfer(vec![register | 0x80, 0x00], vec![0x00, value]),
            SpiTransaction::transaction_end(),
        ]
    }

    fn write_reg(register: u8, value: u8) -> Vec<SpiTransaction<u8>> {
        vec![
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![register, value]),
            SpiTransaction::transaction_end(),
        ]
    }

    fn finish(mut device: Iis3dwb<SpiInterface<SpiMock<u8>>>) {
        let mut spi = device.close().unwrap().release();
        spi.done();
    }

    #[test]
    fn identify_accepts_expected_who_am_i() {
        let expectations = read_reg(0x0F, 0x7B);
        let mut device = Iis3dwb::new_spi(SpiMock::new(&expectations));

        assert_eq!(device.state(), SessionState::Uninitialized);
        device.identify().unwrap();
        assert_eq!(device.state(), SessionState::Identified);

        finish(device);
    }

    #[test]
    fn identify_rejects_wrong_device_and_blocks_reads() {
        let expectations = read_reg(0x0F, 0x00);
        let mut device = Iis3dwb::new_spi(SpiMock::new(&expectations));

        assert_eq!(
            device.identify(),
            Err(Error::IdentityMismatch { found: 0x00 })
        );
        assert_eq!(device.state(), SessionState::Uninitialized);
        assert_eq!(device.read_sample(), Err(Error::NotReady));
        assert_eq!(device.is_data_ready(), Err(Error::NotReady));

        finish(device);
    }

    #[test]
    fn reset_writes_sw_reset_and_waits_ten_ms() {
        let mut expectations = read_reg(0x0F, 0x7B);
        expectations.extend(write_reg(0x12, 0x01));
        let mut device = Iis3dwb::new_spi(SpiMock::new(&expectations));
        let mut delay = RecordingDelay::default();

        device.identify().unwrap();
        device.reset(&mut delay).unwrap();

        assert_eq!(delay.total_ns, 10_000_000);
        assert_eq!(device.state(), SessionState::Identified);

        finish(device);
    }

    #[test]
    fn reset_requires_identification() {
        let expectations: Vec<SpiTransaction<u8>> = Vec::new();
        let mut device = Iis3dwb::new_spi(SpiMock::new(&expectations));
        let mut delay = RecordingDelay::default();

        assert_eq!(device.reset(&mut delay), Err(Error::NotReady));
        assert_eq!(delay.total_ns, 0);

        finish(device);
    }

    #[test]
    fn configure_composes_ctrl1_xl_in_one_write() {
        let mut expectations = read_reg(0x0F, 0x7B);
        expectations.extend(write_reg(0x10, 0xA6));
        let mut device = Iis3dwb::new_spi(SpiMock::new(&expectations));

        let config = Config::new().full_scale(FullScale::G16).lpf2(true).build();
        device.identify().unwrap();
        device.configure(config).unwrap();

        assert_eq!(device.state(), SessionState::Configured);
        assert_eq!(device.config(), &config);

        finish(device);
    }

    #[test]
    fn init_runs_full_bring_up() {
        let mut expectations = read_reg(0x0F, 0x7B);
        expectations.extend(write_reg(0x12, 0x01));
        expectations.extend(write_reg(0x10, 0xA0));
        let mut device = Iis3dwb::new_spi(SpiMock::new(&expectations));
        let mut delay = RecordingDelay::default();

        device.init(&mut delay, Config::default()).unwrap();
        assert_eq!(device.state(), SessionState::Ready);

        finish(device);
    }

    #[test]
    fn data_ready_reflects_status_bit_zero() {
        let mut expectations = read_reg(0x0F, 0x7B);
        expectations.extend(write_reg(0x10, 0xA0));
        expectations.extend(read_reg(0x1E, 0x04));
        expectations.extend(read_reg(0x1E, 0x05));
        let mut device = Iis3dwb::new_spi(SpiMock::new(&expectations));

        device.identify().unwrap();
        device.configure(Config::default()).unwrap();

        assert!(!device.is_data_ready().unwrap());
        assert!(device.is_data_ready().unwrap());
        assert_eq!(device.state(), SessionState::Configured);

        finish(device);
    }

    #[test]
    fn read_sample_decodes_burst() {
        let mut expectations = read_reg(0x0F, 0x7B);
        expectations.extend(write_reg(0x10, 0xA0));
        expectations.extend([
            SpiTransaction::transaction_start(),
            SpiTransaction::transfer(
                vec![0xA8, 0, 0, 0, 0, 0, 0],
                vec![0x00, 0x10, 0x00, 0xFF, 0xFF, 0x00, 0x80],
            ),
            SpiTransaction::transaction_end(),
        ]);
        let mut device = Iis3dwb::new_spi(SpiMock::new(&expectations));

        device.identify().unwrap();
        device.configure(Config::default()).unwrap();

        assert_eq!(device.read_sample().unwrap(), Sample::new(16, -1, -32768));

        finish(device);
    }

    #[test]
    fn closed_session_rejects_everything() {
        let expectations: Vec<SpiTransaction<u8>> = Vec::new();
        let mut device = Iis3dwb::new_spi(SpiMock::new(&expectations));

        let mut spi = device.close().unwrap().release();
        spi.done();

        assert_eq!(device.state(), SessionState::Closed);
        assert!(matches!(device.close(), Err(Error::SessionClosed)));
        assert_eq!(device.identify(), Err(Error::SessionClosed));
        assert_eq!(device.read_sample(), Err(Error::SessionClosed));
        assert!(device.interface_mut().is_none());
    }

    struct FailingBus;

    impl Iis3dwbInterface for FailingBus {
        type Error = ErrorKind;

        fn write_register(&mut self, _: u8, _: u8) -> core::result::Result<(), ErrorKind> {
            Err(ErrorKind::Other)
        }

        fn read_register(&mut self, _: u8) -> core::result::Result<u8, ErrorKind> {
            Err(ErrorKind::Other)
        }

        fn burst_read(&mut self, _: u8, _: &mut [u8]) -> core::result::Result<(), ErrorKind> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn bus_errors_propagate_unchanged() {
        let mut device = Iis3dwb::new(FailingBus);

        assert_eq!(device.identify(), Err(Error::Interface(ErrorKind::Other)));
        assert_eq!(device.state(), SessionState::Uninitialized);
    }
}
