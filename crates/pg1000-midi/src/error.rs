//! Error types for the protocol engine.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid MIDI channel: {0} (expected 1-16)")]
    InvalidChannel(u8),

    #[error("Invalid parameter index: {0}")]
    InvalidParameter(usize),

    #[error("Value {value} out of range (max {max})")]
    ValueOutOfRange { value: u16, max: u16 },

    #[error("Exclusive message exceeded {max} bytes")]
    BufferOverflow { max: usize },

    #[error("Checksum mismatch: expected {expected:#04X}, found {found:#04X}")]
    Checksum { expected: u8, found: u8 },

    #[error("Malformed message: {0}")]
    Malformed(&'static str),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Registry(#[from] pg1000_params::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
