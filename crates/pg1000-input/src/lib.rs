//! Input conditioning for the PG-1000 control surface.
//!
//! Turns raw collaborator readings into stable logical values:
//!
//! - **Value smoothing**: fixed-window moving average plus a hysteresis comparator
//! - **Analog conditioning**: per-channel smoothing, calibration and change detection
//!   over multiplexed ADC chips
//! - **Digital I/O**: debounced button edges and time-driven LED patterns on a
//!   register-addressed I/O expander
//!
//! Hardware access goes through the [`AnalogTransfer`] and [`RegisterIo`] traits; the
//! engines never own a bus.
//!
//! # Example
//!
//! ```ignore
//! use pg1000_input::{AnalogConfig, AnalogEngine};
//!
//! let mut analog = AnalogEngine::new(AnalogConfig::default())?;
//! analog.read_all(&mut adc);
//! for (pot, value) in analog.take_changes() {
//!     // map `pot` to parameters
//! }
//! ```

pub mod error;
pub use error::{Error, Result};

mod smoother;
pub use smoother::{
    apply_hysteresis, ValueSmoother, DEFAULT_HYSTERESIS, DEFAULT_WINDOW, MAX_WINDOW,
};

pub mod analog;
pub use analog::{AnalogConfig, AnalogEngine, AnalogTransfer, CalibrationRange, MAX_RAW};

pub mod digital;
pub use digital::{
    button, led, registers, Button, ButtonSpec, DigitalConfig, DigitalEngine, Edge, Led, LedSpec,
    LedState, RegisterIo, PANEL_BUTTONS, PANEL_LEDS,
};
