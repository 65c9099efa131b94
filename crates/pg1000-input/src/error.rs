//! Error types for the input subsystem.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid analog channel: chip {chip}, channel {channel}")]
    InvalidChannel { chip: u8, channel: u8 },

    #[error("Invalid button index: {0}")]
    InvalidButton(usize),

    #[error("Invalid LED index: {0}")]
    InvalidLed(usize),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
