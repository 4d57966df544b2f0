//! STCC4 CO2 concentration sensor driver
//!
//! The driver is generic over an `embedded-hal` blocking I2C connection and
//! delay provider, and speaks the device's word-oriented protocol: big endian
//! 16-bit commands, CRC-8 protected data words, and a small sleep / idle /
//! measuring state machine.

use core::fmt::Debug;
use core::marker::PhantomData;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use log::{debug, warn};

pub mod base;
pub mod device;

use crate::base::{verify_word, Base};
pub use crate::device::*;

/// Stcc4 sensor object
/// This is generic over an I2C connector, a delay provider and the
/// associated I2C error type
pub struct Stcc4<Conn, Delay, Err> {
    conn: Conn,
    delay: Delay,
    address: u8,
    crc_policy: CrcPolicy,
    state: DeviceState,
    _err: PhantomData<Err>,
}

/// Stcc4 error object
#[derive(Debug)]
pub enum Error<ConnErr> {
    /// Underlying bus transport failure
    Conn(ConnErr),
    /// CRC mismatch on a received word (calculated, received)
    Crc(u8, u8),
    /// Caller-supplied value outside the device's accepted range,
    /// rejected before any bus traffic
    InvalidArgument,
    /// Response too short or malformed
    Decode,
    /// Device acknowledged the command but reported failure
    OperationFailed,
}

impl<ConnErr> From<ConnErr> for Error<ConnErr> {
    fn from(conn_err: ConnErr) -> Self {
        Error::Conn(conn_err)
    }
}

impl<Conn, Delay, Err> Stcc4<Conn, Delay, Err>
where
    Conn: i2c::Read<Error = Err> + i2c::Write<Error = Err>,
    Delay: DelayMs<u16>,
    Err: Debug,
{
    /// Create a new Stcc4 sensor instance on the default I2C address
    pub fn new(conn: Conn, delay: Delay) -> Result<Self, Error<Err>> {
        Self::with_address(conn, delay, DEFAULT_ADDRESS)
    }

    /// Create a new Stcc4 sensor instance on the given I2C address
    /// (0x64 default, 0x65 when the ADDR strap is pulled)
    pub fn with_address(conn: Conn, delay: Delay, address: u8) -> Result<Self, Error<Err>> {
        let mut s = Stcc4 {
            conn,
            delay,
            address,
            crc_policy: CrcPolicy::default(),
            state: DeviceState::Idle,
            _err: PhantomData,
        };

        // Probe the device. A mismatched identity may mean a wrong device or
        // bus corruption, but communication itself worked, so leave the
        // decision to the caller
        let id = s.identify()?;
        if id != DEVICE_ID {
            warn!(
                "Unexpected device id {:#010x} (expected {:#010x})",
                id, DEVICE_ID
            );
        }

        Ok(s)
    }

    /// Select how CRC bytes on received frames are handled.
    /// Defaults to `CrcPolicy::Lenient`
    pub fn set_crc_policy(&mut self, policy: CrcPolicy) {
        self.crc_policy = policy;
    }

    /// Last known device state.
    /// Mirrored optimistically from issued commands, the device itself is
    /// authoritative and this may go stale if it rejects a transition
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Read the 32-bit product identity.
    ///
    /// Retries up to five times with a 200ms backoff while the decoded value
    /// differs from [`DEVICE_ID`], then returns the last-seen value without
    /// erroring. Callers must validate the result themselves
    pub fn identify(&mut self) -> Result<u32, Error<Err>> {
        let mut buff = [0u8; 18];
        let mut id = 0;

        for attempt in 0..ID_RETRY_COUNT {
            if attempt > 0 {
                self.delay.delay_ms(ID_RETRY_DELAY_MS);
            }

            self.read_command(Command::GetId, &mut buff)?;
            id = Self::decode_identity(&buff, self.crc_policy)?;

            if id == DEVICE_ID {
                return Ok(id);
            }

            debug!("Device id {:#010x} did not match on attempt {}", id, attempt + 1);
        }

        Ok(id)
    }

    /// Start continuous measurement mode
    /// Blocks for the settle delay the device needs to change state
    pub fn start_continuous(&mut self) -> Result<(), Error<Err>> {
        self.write_command(Command::StartContinuousMeasurement, &[])?;
        self.delay.delay_ms(START_MEASUREMENT_SETTLE_MS);

        self.state = DeviceState::Measuring;
        Ok(())
    }

    /// Stop continuous measurement mode
    /// Blocks for the settle delay the device needs to change state
    pub fn stop_continuous(&mut self) -> Result<(), Error<Err>> {
        self.write_command(Command::StopContinuousMeasurement, &[])?;
        self.delay.delay_ms(STOP_MEASUREMENT_SETTLE_MS);

        self.state = DeviceState::Idle;
        Ok(())
    }

    /// Read the latest measurement from the device
    pub fn read_measurement(&mut self) -> Result<Measurement, Error<Err>> {
        let mut buff = [0u8; 12];

        self.read_command(Command::ReadMeasurement, &mut buff)?;

        Self::decode_measurement(&buff, self.crc_policy)
    }

    /// Trigger a single shot measurement.
    ///
    /// The sample is only valid after [`SINGLE_SHOT_SETTLE_MS`], waiting is
    /// left to the caller so async contexts can await instead of block
    pub fn single_shot(&mut self) -> Result<(), Error<Err>> {
        self.write_command(Command::SingleShot, &[])
    }

    /// Set temperature and humidity compensation values, used to improve CO2
    /// accuracy when no live RHT sensor is attached.
    /// Temperature must be within 10-40 C and humidity within 20-80 %RH
    pub fn set_rht_compensation(&mut self, temp: f32, rh: f32) -> Result<(), Error<Err>> {
        if !(10.0..=40.0).contains(&temp) || !(20.0..=80.0).contains(&rh) {
            return Err(Error::InvalidArgument);
        }

        let words = [temp_to_raw(temp), rh_to_raw(rh)];
        self.write_command(Command::SetRhtCompensation, &words)
    }

    /// Set ambient pressure compensation
    /// Pressure must be within 400-1100 hPa
    pub fn set_pressure_compensation(&mut self, pressure: u16) -> Result<(), Error<Err>> {
        if !(400..=1100).contains(&pressure) {
            return Err(Error::InvalidArgument);
        }

        // Transmitted in units of 1/50 hPa
        self.write_command(Command::SetPressureCompensation, &[pressure * 50])
    }

    /// Put the device into sleep mode
    pub fn sleep(&mut self) -> Result<(), Error<Err>> {
        self.write_command(Command::Sleep, &[])?;

        self.state = DeviceState::Asleep;
        Ok(())
    }

    /// Wake the device from sleep mode
    pub fn wake(&mut self) -> Result<(), Error<Err>> {
        self.write_command(Command::Wakeup, &[])?;

        self.state = DeviceState::Idle;
        Ok(())
    }

    /// Soft reset the underlying device
    pub fn soft_reset(&mut self) -> Result<(), Error<Err>> {
        self.write_command(Command::SoftReset, &[])?;

        self.state = DeviceState::Idle;
        Ok(())
    }

    /// Restore the device's factory configuration
    /// The device acknowledges with a zero word, anything else is a failure
    pub fn factory_reset(&mut self) -> Result<(), Error<Err>> {
        self.write_command(Command::FactoryReset, &[])?;

        let mut buff = [0u8; 2];
        self.read_response(&mut buff)?;

        let ack = (buff[0] as u16) << 8 | buff[1] as u16;
        if ack != 0 {
            return Err(Error::OperationFailed);
        }

        self.state = DeviceState::Idle;
        Ok(())
    }

    /// Enable the production test mode
    pub fn enable_test_mode(&mut self) -> Result<(), Error<Err>> {
        self.write_command(Command::EnableTestMode, &[])
    }

    /// Disable the production test mode
    pub fn disable_test_mode(&mut self) -> Result<(), Error<Err>> {
        self.write_command(Command::DisableTestMode, &[])
    }

    /// Perform a forced recalibration (FRC) against a known reference
    /// concentration of at most 32000 ppm.
    ///
    /// An all-zeroes or all-ones correction word means the device rejected
    /// the recalibration, this is reported through
    /// [`FrcCorrection::is_valid`] rather than an error so the caller can
    /// retry in a loop
    pub fn forced_recalibration(&mut self, target_ppm: u16) -> Result<FrcCorrection, Error<Err>> {
        if target_ppm > 32000 {
            return Err(Error::InvalidArgument);
        }

        self.write_command(Command::ForcedRecalibration, &[target_ppm])?;

        // The device needs time to compute the correction before it can be read
        self.delay.delay_ms(FRC_PROCESS_DELAY_MS);

        let mut buff = [0u8; 3];
        self.read_response(&mut buff)?;

        verify_word(&buff, self.crc_policy)?;

        let correction = FrcCorrection::new((buff[0] as u16) << 8 | buff[1] as u16);
        if !correction.is_valid() {
            debug!("Device rejected recalibration: {:#06x}", correction.raw());
        }

        Ok(correction)
    }

    /// Decode an 18-byte identity response into the 32-bit product identity
    fn decode_identity(data: &[u8], policy: CrcPolicy) -> Result<u32, Error<Err>> {
        if data.len() < 6 {
            return Err(Error::Decode);
        }

        verify_word(&data[0..3], policy)?;
        verify_word(&data[3..6], policy)?;

        // Identity is the two leading words, CRC bytes skipped
        let id = (data[0] as u32) << 24
            | (data[1] as u32) << 16
            | (data[3] as u32) << 8
            | (data[4] as u32);

        Ok(id)
    }

    /// Decode a 12-byte measurement response
    /// Layout is four words with trailing CRCs: CO2, raw temperature,
    /// raw humidity, status
    fn decode_measurement(data: &[u8], policy: CrcPolicy) -> Result<Measurement, Error<Err>> {
        if data.len() < 12 {
            return Err(Error::Decode);
        }

        for group in data[..12].chunks(3) {
            verify_word(group, policy)?;
        }

        let co2 = (data[0] as u16) << 8 | data[1] as u16;
        let temp = temp_from_raw((data[3] as u16) << 8 | data[4] as u16);
        let rh = rh_from_raw((data[6] as u16) << 8 | data[7] as u16);
        let status = (data[9] as u16) << 8 | data[10] as u16;

        Ok(Measurement {
            co2,
            temp,
            rh,
            status,
        })
    }
}
