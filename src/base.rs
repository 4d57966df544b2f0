//! Base communication implementation for interacting with the Stcc4 device
//!

use core::fmt::Debug;

use embedded_hal::blocking::i2c;
use log::trace;

use crate::device::*;
use crate::{Error, Stcc4};

/// Largest write frame: command word plus two data words with their CRCs
const MAX_FRAME_LEN: usize = 8;

/// Base API for reading and writing to the device
/// This should not be required by consumers, but is exposed to support alternate use
pub trait Base<Err> {
    /// Write a command to the device with zero or more data words
    fn write_command(&mut self, command: Command, data: &[u16]) -> Result<(), Error<Err>>;
    /// Read a response from the device without issuing a command first
    fn read_response(&mut self, data: &mut [u8]) -> Result<(), Error<Err>>;
    /// Write a command then read the response back
    fn read_command(&mut self, command: Command, data: &mut [u8]) -> Result<(), Error<Err>>;
}

/// Split a 16-bit command word into its big-endian wire bytes
pub fn encode_command(cmd: u16) -> [u8; 2] {
    [(cmd >> 8) as u8, (cmd & 0xFF) as u8]
}

/// Helper for device CRC-8 calculation
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC_INIT;

    // For each byte
    for v in data {
        // XOR with current byte
        crc ^= v;

        // For each bit (in -ve order, but, doesn't actually matter here)
        for _bit in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC_POLY;
            } else {
                crc = crc << 1;
            }
        }
    }

    // Apply final xor
    crc ^ CRC_XOR
}

/// Check the trailing CRC byte of one received word group (high, low, crc)
/// under the given policy
pub fn verify_word<Err>(group: &[u8], policy: CrcPolicy) -> Result<(), Error<Err>> {
    if policy == CrcPolicy::Lenient {
        return Ok(());
    }

    let crc = crc8(&group[..2]);
    if crc != group[2] {
        return Err(Error::Crc(crc, group[2]));
    }

    Ok(())
}

/// Base implementation over blocking I2C
impl<Conn, Delay, Err> Base<Err> for Stcc4<Conn, Delay, Err>
where
    Conn: i2c::Read<Error = Err> + i2c::Write<Error = Err>,
    Err: Debug,
{
    fn write_command(&mut self, command: Command, data: &[u16]) -> Result<(), Error<Err>> {
        match command.frame() {
            CommandFrame::Narrow(op) => {
                // Narrow commands are a bare byte and carry no data words
                debug_assert!(data.is_empty());

                trace!("Writing narrow command: {:#04x}", op);

                self.conn.write(self.address, &[op]).map_err(Error::Conn)
            }
            CommandFrame::Wide(op) => {
                debug_assert!(data.len() <= 2);

                let mut buff = [0u8; MAX_FRAME_LEN];
                buff[..2].copy_from_slice(&encode_command(op));

                // Each data word is followed by its own CRC byte
                let mut len = 2;
                for d in data {
                    buff[len] = (d >> 8) as u8;
                    buff[len + 1] = (d & 0xFF) as u8;
                    buff[len + 2] = crc8(&buff[len..len + 2]);
                    len += 3;
                }

                trace!("Writing command: {:#06x} data: {:x?}", op, data);

                self.conn
                    .write(self.address, &buff[..len])
                    .map_err(Error::Conn)
            }
        }
    }

    fn read_response(&mut self, data: &mut [u8]) -> Result<(), Error<Err>> {
        self.conn.read(self.address, data).map_err(Error::Conn)?;

        trace!("Read data: {:x?}", data);

        Ok(())
    }

    fn read_command(&mut self, command: Command, data: &mut [u8]) -> Result<(), Error<Err>> {
        // First write the command to initialise the read
        self.write_command(command, &[])?;

        // Then, read the data back
        // Note: this two-phase approach is specified in the datasheet
        self.read_response(data)
    }
}
