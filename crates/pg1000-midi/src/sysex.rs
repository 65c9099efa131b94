//! Roland exclusive framing: constants, checksum and parsing.
//!
//! ```text
//! F0 41 dev 14 12 a2 a1 a0 d.. sum F7   DT1 (data set)
//! F0 41 dev 14 11 a2 a1 a0 s2 s1 s0 sum F7   RQ1 (data request)
//! ```
//!
//! The checksum covers the command byte through the last data byte.

use pg1000_params::SysExAddress;

use crate::error::{Error, Result};

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;
pub const ROLAND_ID: u8 = 0x41;
pub const D50_MODEL_ID: u8 = 0x14;
pub const CMD_RQ1: u8 = 0x11;
pub const CMD_DT1: u8 = 0x12;

/// Status bytes at or above this are real-time and never interrupt framing.
pub const TIMING_CLOCK: u8 = 0xF8;

/// `F0`, manufacturer, device, model, command.
pub const HEADER_LEN: usize = 5;
/// Smallest DT1: header, address, one data byte, checksum, `F7`.
pub const MIN_DT1_LEN: usize = HEADER_LEN + 3 + 1 + 2;
/// Exact RQ1 length.
pub const RQ1_LEN: usize = HEADER_LEN + 3 + 3 + 2;
/// Data bytes the synthesizer puts in one bulk dump chunk.
pub const DUMP_CHUNK_LEN: usize = 256;
/// A DT1 carrying one full dump chunk.
pub const MAX_DT1_LEN: usize = HEADER_LEN + 3 + DUMP_CHUNK_LEN + 2;

/// Size of a full patch (both tones plus patch block).
pub const PATCH_DUMP_SIZE: SysExAddress = SysExAddress::new(0x00, 0x03, 0x25);
/// Writing here stores the edit buffer into the current patch slot.
pub const PATCH_WRITE_ADDRESS: SysExAddress = SysExAddress::new(0x00, 0x20, 0x00);

/// Roland checksum over exactly the bytes given (command through last data byte).
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum: u32 = bytes.iter().map(|b| u32::from(b & 0x7F)).sum();
    (128 - (sum & 0x7F) as u8) & 0x7F
}

/// Check the checksum of a complete `F0 .. F7` message.
///
/// The covered bytes plus the received checksum must sum to zero in 7 bits.
pub fn verify_checksum(message: &[u8]) -> bool {
    if message.len() < HEADER_LEN + 2
        || message[0] != SYSEX_START
        || message[message.len() - 1] != SYSEX_END
    {
        return false;
    }
    let covered = &message[HEADER_LEN - 1..message.len() - 1];
    covered.iter().map(|b| u32::from(b & 0x7F)).sum::<u32>() & 0x7F == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysExHeader {
    pub manufacturer: u8,
    pub device: u8,
    pub model: u8,
    pub command: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysExBody {
    DataSet { address: SysExAddress, data: Vec<u8> },
    DataRequest { address: SysExAddress, size: SysExAddress },
}

/// A validated Roland exclusive message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysExMessage {
    pub header: SysExHeader,
    pub body: SysExBody,
}

impl SysExMessage {
    /// Parse and checksum-verify a complete `F0 .. F7` message.
    ///
    /// Manufacturer, device and model are reported, not filtered.
    pub fn parse(message: &[u8]) -> Result<Self> {
        if message.len() < HEADER_LEN + 2 {
            return Err(Error::Malformed("message too short"));
        }
        if message[0] != SYSEX_START || message[message.len() - 1] != SYSEX_END {
            return Err(Error::Malformed("missing exclusive framing"));
        }

        let payload = &message[1..message.len() - 1];
        if payload.iter().any(|b| b & 0x80 != 0) {
            return Err(Error::Malformed("status byte inside exclusive message"));
        }

        let header = SysExHeader {
            manufacturer: message[1],
            device: message[2],
            model: message[3],
            command: message[4],
        };

        let body = match header.command {
            CMD_DT1 if message.len() >= MIN_DT1_LEN => SysExBody::DataSet {
                address: address_at(message, HEADER_LEN),
                data: message[HEADER_LEN + 3..message.len() - 2].to_vec(),
            },
            CMD_RQ1 if message.len() == RQ1_LEN => SysExBody::DataRequest {
                address: address_at(message, HEADER_LEN),
                size: address_at(message, HEADER_LEN + 3),
            },
            CMD_DT1 | CMD_RQ1 => return Err(Error::Malformed("wrong length for command")),
            _ => return Err(Error::Malformed("unsupported command")),
        };

        if !verify_checksum(message) {
            let covered = &message[HEADER_LEN - 1..message.len() - 2];
            return Err(Error::Checksum {
                expected: checksum(covered),
                found: message[message.len() - 2],
            });
        }

        Ok(Self { header, body })
    }
}

fn address_at(message: &[u8], at: usize) -> SysExAddress {
    SysExAddress::new(message[at], message[at + 1], message[at + 2])
}
