//! # PG-1000 - Programmer Controller Firmware Core
//!
//! Hardware-independent core of a D-50 programmer surface: 56 pots and a button/LED
//! panel edit synthesizer parameters over Roland exclusive messages.
//!
//! ## Architecture
//!
//! `pg1000` is an umbrella crate that coordinates:
//! - **pg1000-input** - Analog conditioning (smoothing, calibration, hysteresis) and
//!   digital panel I/O (debounce, LED blink)
//! - **pg1000-params** - Parameter registry, exponential value filter, selection gate,
//!   the built-in D-50 table
//! - **pg1000-midi** - Wire codec, Roland checksum, inbound framing, rate limiting,
//!   byte transport traits
//!
//! The umbrella adds the mode state machine, the display formatting and the
//! [`Controller`] that runs one cooperative poll cycle at a time.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pg1000::prelude::*;
//!
//! let mut controller = Controller::builder()
//!     .config(ControllerConfig::from_json_str(&settings)?)
//!     .adc(adc)
//!     .io(expander)
//!     .transport(uart)
//!     .display(lcd)
//!     .build()?;
//!
//! loop {
//!     controller.poll(Instant::now())?;
//! }
//! ```

pub use pg1000_input as input;
pub use pg1000_midi as midi;
pub use pg1000_params as params;

mod builder;
pub mod config;
mod controller;
pub mod display;
mod error;
pub mod ui;

pub use builder::ControllerBuilder;
pub use config::{ControllerConfig, UiConfig};
pub use controller::{Controller, PollSummary};
pub use display::{parameter_screen, value_bar, Screen, TextDisplay, DISPLAY_COLUMNS};
pub use error::{Error, Result};
pub use ui::{MenuItem, Mode, ModeMachine, UiContext, UiRequest};

pub mod prelude {
    pub use crate::{
        Controller, ControllerBuilder, ControllerConfig, Error, Mode, PollSummary, Result,
        Screen, TextDisplay,
    };

    pub use pg1000_input::{AnalogTransfer, LedState, RegisterIo};
    pub use pg1000_midi::{inbound_queue, ByteSink, ByteSource, ByteTransport, ReceiveMode};
    pub use pg1000_params::{ParamGroup, ParameterRegistry, SysExAddress, ValueSource};

    pub use std::time::{Duration, Instant};
}
