//! Centralized error type for the pg1000 umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Input: {0}")]
    Input(#[from] pg1000_input::Error),

    #[error("Parameters: {0}")]
    Params(#[from] pg1000_params::Error),

    #[error("MIDI: {0}")]
    Midi(#[from] pg1000_midi::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
