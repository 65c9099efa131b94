//! Protocol engine for the PG-1000 controller.
//!
//! Speaks the subset of MIDI a D-50 programmer needs:
//!
//! - **Outbound**: Control Change, Program Change, and Roland exclusive DT1/RQ1
//!   messages, with per-parameter rate limiting
//! - **Inbound**: a byte-at-a-time framing parser with a bounded exclusive buffer,
//!   checksum validation, and DT1 write-back into the parameter registry
//! - **Transport**: [`ByteSink`] / [`ByteSource`] collaborator traits and an SPSC queue
//!   for interrupt-driven receive
//!
//! Malformed inbound data is dropped and counted in [`ProtocolStats`]; caller mistakes
//! come back as [`Error`].

pub mod error;
pub use error::{Error, Result};

pub mod sysex;
pub use sysex::{checksum, verify_checksum, SysExBody, SysExHeader, SysExMessage};

mod message;
pub use message::{channel_nibble, ExclusiveTarget, OutboundMessage, CONTROL_CHANGE, PROGRAM_CHANGE};

mod parser;
pub use parser::{InboundEvent, InboundParser, ParserState};

mod rate_limit;
pub use rate_limit::RateLimiter;

mod transport;
pub use transport::{ByteSink, ByteSource, ByteTransport};

mod queue;
pub use queue::{inbound_queue, InboundConsumer, InboundProducer, DEFAULT_QUEUE_CAPACITY};

mod engine;
pub use engine::{ProtocolConfig, ProtocolEngine, ProtocolStats, ReceiveMode};
