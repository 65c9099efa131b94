//! Error types for the parameter registry.

use thiserror::Error;

use crate::address::SysExAddress;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid parameter index: {0}")]
    InvalidIndex(usize),

    #[error("Value {value} outside {min}..={max}")]
    ValueOutOfRange { value: u8, min: u8, max: u8 },

    #[error("No parameter at address {0}")]
    UnknownAddress(SysExAddress),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
