//! Stcc4 command-line utility
//!

extern crate embedded_hal;
extern crate linux_embedded_hal;
use linux_embedded_hal::{Delay, I2cdev};

extern crate structopt;
use structopt::StructOpt;

extern crate humantime;
use humantime::Duration as HumanDuration;

#[macro_use]
extern crate log;
extern crate simplelog;
use simplelog::{LevelFilter, TermLogger};

extern crate sensor_stcc4;
use sensor_stcc4::{
    CrcPolicy, Stcc4, ALTERNATE_ADDRESS, DEFAULT_ADDRESS, SINGLE_SHOT_SETTLE_MS,
};

#[derive(StructOpt)]
#[structopt(name = "stcc4-util")]
/// A Command Line Interface (CLI) for interacting with a local Stcc4 CO2 sensor over I2C
pub struct Options {
    /// Specify the i2c interface to use to connect to the stcc4 device
    #[structopt(short = "d", long = "i2c", default_value = "/dev/i2c-1", env = "STCC4_I2C")]
    i2c: String,

    /// Use the alternate device address (0x65, ADDR strap pulled)
    #[structopt(long = "alt-address")]
    alt_address: bool,

    /// Take a single shot measurement and exit instead of sampling continuously
    #[structopt(long = "single-shot")]
    single_shot: bool,

    /// Ambient pressure compensation in hPa (400-1100), applied at startup
    #[structopt(long = "pressure")]
    pressure: Option<u16>,

    /// Verify CRC bytes on received frames instead of skipping them
    #[structopt(long = "strict-crc")]
    strict_crc: bool,

    /// Specify period for taking measurements
    #[structopt(short = "p", long = "sample-period", default_value = "5s")]
    pub period: HumanDuration,

    /// Number of allowed I2C errors (per measurement attempt) prior to exiting
    #[structopt(long = "allowed-errors", default_value = "3")]
    pub allowed_errors: usize,

    /// Enable verbose logging
    #[structopt(long = "log-level", default_value = "info")]
    level: LevelFilter,
}

fn main() {
    // Load options
    let opts = Options::from_args();

    // Setup logging
    TermLogger::init(opts.level, simplelog::Config::default()).unwrap();

    debug!("Connecting to I2C device");
    let i2c = match I2cdev::new(&opts.i2c) {
        Ok(v) => v,
        Err(e) => {
            error!("Error opening I2C device '{}': {:?}", &opts.i2c, e);
            std::process::exit(-1);
        }
    };

    let address = match opts.alt_address {
        true => ALTERNATE_ADDRESS,
        false => DEFAULT_ADDRESS,
    };

    debug!("Connecting to STCC4 at {:#04x}", address);
    let mut sensor = match Stcc4::with_address(i2c, Delay, address) {
        Ok(v) => v,
        Err(e) => {
            error!("Error connecting to STCC4: {:?}", e);
            std::process::exit(-2);
        }
    };

    if opts.strict_crc {
        sensor.set_crc_policy(CrcPolicy::Strict);
    }

    if let Some(pressure) = opts.pressure {
        debug!("Setting pressure compensation to {} hPa", pressure);
        if let Err(e) = sensor.set_pressure_compensation(pressure) {
            error!("Error setting pressure compensation: {:?}", e);
            std::process::exit(-3);
        }
    }

    if opts.single_shot {
        debug!("Triggering single shot measurement");
        if let Err(e) = sensor.single_shot() {
            error!("Error triggering single shot: {:?}", e);
            std::process::exit(-4);
        }

        // The sample is only valid once the device has settled
        std::thread::sleep(std::time::Duration::from_millis(SINGLE_SHOT_SETTLE_MS as u64));

        match sensor.read_measurement() {
            Ok(m) => {
                info!(
                    "CO2: {} ppm, Temperature: {:.2} C, Humidity: {:.2} %",
                    m.co2, m.temp, m.rh
                );
            }
            Err(e) => {
                error!("Error reading sensor data: {:?}", e);
                std::process::exit(-5);
            }
        }

        return;
    }

    debug!("Starting continuous measurement");
    if let Err(e) = sensor.start_continuous() {
        error!("Error starting continuous mode: {:?}", e);
        std::process::exit(-4);
    }

    let mut errors = 0;

    loop {
        debug!("Starting sensor read cycle");

        match sensor.read_measurement() {
            Ok(m) => {
                errors = 0;
                info!(
                    "CO2: {} ppm, Temperature: {:.2} C, Humidity: {:.2} %",
                    m.co2, m.temp, m.rh
                );
                if m.status != 0 {
                    warn!("Sensor status flags set: {:#06x}", m.status);
                }
            }
            Err(e) => {
                warn!("Error reading sensor data: {:?}", e);
                errors += 1;
            }
        }

        if errors > opts.allowed_errors {
            error!("Exceeded maximum allowed I2C errors");
            std::process::exit(-5);
        }

        // Wait for enough time for another sensor reading
        std::thread::sleep(*opts.period);
    }
}
