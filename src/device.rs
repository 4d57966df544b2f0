//! Stcc4 device definitions
//!

/// Stcc4 default I2C address
pub const DEFAULT_ADDRESS: u8 = 0x64;

/// Stcc4 alternate I2C address, selected by the ADDR hardware strap
pub const ALTERNATE_ADDRESS: u8 = 0x65;

pub const CRC_POLY: u8 = 0x31;
pub const CRC_INIT: u8 = 0xff;
pub const CRC_XOR: u8 = 0x00;

/// Canonical product identity returned by `Command::GetId`
pub const DEVICE_ID: u32 = 0x0901_018A;

/// Attempts made by identify() before giving up on a matching ID
pub const ID_RETRY_COUNT: usize = 5;

/// Backoff between identify() attempts in milliseconds
pub const ID_RETRY_DELAY_MS: u16 = 200;

/// Settle time after starting continuous measurement
pub const START_MEASUREMENT_SETTLE_MS: u16 = 1000;

/// Settle time after stopping continuous measurement
/// (the device needs up to 1200ms to execute this instruction)
pub const STOP_MEASUREMENT_SETTLE_MS: u16 = 1200;

/// Time the device needs to produce a sample after a single shot trigger.
/// Not applied by the driver, callers must wait this long before reading
pub const SINGLE_SHOT_SETTLE_MS: u16 = 500;

/// Time the device needs to compute a forced recalibration correction
pub const FRC_PROCESS_DELAY_MS: u16 = 200;

/// Stcc4 command set
/// Wide commands and data are big endian 16-bit unsigned integers, each data
/// word is followed by a CRC-8 checksum. Wake-up and soft-reset are narrow
/// commands transmitted as a single raw byte with no checksum, per datasheet.
#[derive(PartialEq, Clone, Debug)]
pub enum Command {
    /// Read the 18-byte product identity block
    GetId,

    /// Start continuous measurement at the device's fixed interval
    /// No associated data or CRC
    StartContinuousMeasurement,

    /// Stop continuous measurement
    /// No associated data or CRC
    StopContinuousMeasurement,

    /// Read the latest 12-byte measurement block
    ReadMeasurement,

    /// Set temperature and humidity compensation
    /// Data is two u16 raw codes (temperature then humidity)
    SetRhtCompensation,

    /// Set ambient pressure compensation
    /// Data is a u16 in hPa * 50
    SetPressureCompensation,

    /// Trigger a single shot measurement
    SingleShot,

    /// Enter sleep mode
    Sleep,

    /// Wake from sleep mode
    Wakeup,

    /// Soft reset the device
    SoftReset,

    /// Restore factory configuration
    /// Device acknowledges with a single u16, zero on success
    FactoryReset,

    /// Enable the production test mode
    EnableTestMode,

    /// Disable the production test mode
    DisableTestMode,

    /// Forced recalibration (FRC) against a reference CO2 concentration
    /// Data is the target concentration in ppm, response is the correction word
    ForcedRecalibration,
}

/// Wire framing for a command, the device mixes 16-bit command words with
/// single-byte commands that bypass the word/CRC framing entirely
#[derive(PartialEq, Clone, Debug)]
pub enum CommandFrame {
    /// Single raw byte, no CRC
    Narrow(u8),
    /// Big-endian 16-bit command word
    Wide(u16),
}

impl Command {
    /// Map a command onto its wire framing
    pub fn frame(&self) -> CommandFrame {
        use CommandFrame::*;

        match self {
            Command::GetId => Wide(0x365B),
            Command::StartContinuousMeasurement => Wide(0x218B),
            Command::StopContinuousMeasurement => Wide(0x3F86),
            Command::ReadMeasurement => Wide(0xEC05),
            Command::SetRhtCompensation => Wide(0xE000),
            Command::SetPressureCompensation => Wide(0xE016),
            Command::SingleShot => Wide(0x219D),
            Command::Sleep => Wide(0x3650),
            Command::Wakeup => Narrow(0x00),
            Command::SoftReset => Narrow(0x06),
            Command::FactoryReset => Wide(0x3632),
            Command::EnableTestMode => Wide(0x3FBC),
            Command::DisableTestMode => Wide(0x3F3D),
            Command::ForcedRecalibration => Wide(0x362F),
        }
    }
}

/// Stcc4 measurement object
#[derive(PartialEq, Clone, Debug)]
pub struct Measurement {
    /// CO2 concentration in parts-per-million (PPM)
    pub co2: u16,
    /// Temperature in degrees celsius
    pub temp: f32,
    /// Relative Humidity (%)
    pub rh: f32,
    /// Raw device status word
    pub status: u16,
}

/// Correction word returned by a forced recalibration
#[derive(PartialEq, Clone, Debug)]
pub struct FrcCorrection {
    raw: u16,
}

impl FrcCorrection {
    pub(crate) fn new(raw: u16) -> Self {
        FrcCorrection { raw }
    }

    /// Raw correction word as returned by the device
    pub fn raw(&self) -> u16 {
        self.raw
    }

    /// False when the device rejected the recalibration (0x0000 or 0xFFFF).
    /// A failed recalibration should be retried by the caller
    pub fn is_valid(&self) -> bool {
        self.raw != 0x0000 && self.raw != 0xFFFF
    }
}

/// Local mirror of the device state machine.
/// Updated optimistically after each state-changing command, the device
/// itself remains authoritative and may reject out-of-order operations
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum DeviceState {
    /// Low power mode, only wake-up is accepted
    Asleep,
    /// Awake and idle, accepting commands
    Idle,
    /// Continuous measurement running
    Measuring,
}

/// Handling of CRC bytes on received frames
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum CrcPolicy {
    /// Skip CRC bytes without verification (legacy driver behavior)
    Lenient,
    /// Verify every received word and reject on mismatch
    Strict,
}

impl Default for CrcPolicy {
    fn default() -> Self {
        CrcPolicy::Lenient
    }
}

/// Convert a raw temperature code to degrees celsius
pub fn temp_from_raw(raw: u16) -> f32 {
    -45.0 + (175.0 * raw as f32) / 65535.0
}

/// Convert a temperature in degrees celsius to the device's raw code
pub fn temp_to_raw(temp: f32) -> u16 {
    ((temp + 45.0) * 65535.0 / 175.0) as u16
}

/// Convert a raw humidity code to percent relative humidity
pub fn rh_from_raw(raw: u16) -> f32 {
    -6.0 + (125.0 * raw as f32) / 65535.0
}

/// Convert a percent relative humidity to the device's raw code
pub fn rh_to_raw(rh: f32) -> u16 {
    ((rh + 6.0) * 65535.0 / 125.0) as u16
}
