//! Parameter registry for the PG-1000 controller.
//!
//! A static table of D-50 parameters, each identified by a three-byte exclusive
//! address and tagged with the memory block it belongs to. Values change only through
//! [`ParameterRegistry::update_value`], which runs pot input through a per-parameter
//! exponential filter and a commit deadband.
//!
//! The [`SelectionGate`] records which sections and partials the operator has selected;
//! callers check [`SelectionGate::can_edit`] on every write path.

pub mod error;
pub use error::{Error, Result};

mod address;
pub use address::SysExAddress;

mod parameter;
pub use parameter::{ParamGroup, ParamType, Parameter, Section, KEYFOLLOW_LABELS};

mod filter;
pub use filter::ExponentialFilter;

mod table;

mod registry;
pub use registry::{ParameterRegistry, RegistryConfig, ValueSource};

mod selection;
pub use selection::{GateToggle, SelectionGate};
