//! Outbound message builders.

use pg1000_params::SysExAddress;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::sysex::{checksum, CMD_DT1, CMD_RQ1, HEADER_LEN, SYSEX_END, SYSEX_START};

pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;

/// Validate a 1-based MIDI channel and return its 0-based nibble.
#[inline]
pub fn channel_nibble(channel: u8) -> Result<u8> {
    if !(1..=16).contains(&channel) {
        return Err(Error::InvalidChannel(channel));
    }
    Ok(channel - 1)
}

/// Manufacturer, model and channel an exclusive message is addressed with.
///
/// The device id on the wire is the 0-based channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusiveTarget {
    pub manufacturer_id: u8,
    pub model_id: u8,
    pub channel: u8,
}

impl ExclusiveTarget {
    #[inline]
    pub fn device_id(&self) -> Result<u8> {
        channel_nibble(self.channel)
    }
}

/// Bytes ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub bytes: SmallVec<[u8; 16]>,
}

impl OutboundMessage {
    pub fn control_change(channel: u8, cc: u8, value: u8) -> Result<Self> {
        let status = CONTROL_CHANGE | channel_nibble(channel)?;
        Ok(Self {
            bytes: SmallVec::from_slice(&[status, cc & 0x7F, value & 0x7F]),
        })
    }

    pub fn program_change(channel: u8, program: u8) -> Result<Self> {
        let status = PROGRAM_CHANGE | channel_nibble(channel)?;
        Ok(Self {
            bytes: SmallVec::from_slice(&[status, program & 0x7F]),
        })
    }

    /// DT1: write `data` starting at `address`.
    pub fn data_set(target: ExclusiveTarget, address: SysExAddress, data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Malformed("data set without data"));
        }
        let mut body: SmallVec<[u8; 8]> = SmallVec::with_capacity(3 + data.len());
        body.extend(address.bytes().iter().map(|b| b & 0x7F));
        body.extend(data.iter().map(|b| b & 0x7F));
        Self::exclusive(target, CMD_DT1, &body)
    }

    /// RQ1: ask for `size` bytes starting at `address`.
    pub fn data_request(
        target: ExclusiveTarget,
        address: SysExAddress,
        size: SysExAddress,
    ) -> Result<Self> {
        let mut body = [0u8; 6];
        body[..3].copy_from_slice(&address.bytes());
        body[3..].copy_from_slice(&size.bytes());
        for byte in &mut body {
            *byte &= 0x7F;
        }
        Self::exclusive(target, CMD_RQ1, &body)
    }

    fn exclusive(target: ExclusiveTarget, command: u8, body: &[u8]) -> Result<Self> {
        let mut bytes = SmallVec::with_capacity(HEADER_LEN + body.len() + 2);
        bytes.extend_from_slice(&[
            SYSEX_START,
            target.manufacturer_id & 0x7F,
            target.device_id()?,
            target.model_id & 0x7F,
            command,
        ]);
        bytes.extend_from_slice(body);
        let sum = checksum(&bytes[HEADER_LEN - 1..]);
        bytes.push(sum);
        bytes.push(SYSEX_END);
        Ok(Self { bytes })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
