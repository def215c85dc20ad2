//! ELM327 Adapter Protocol
//!
//! Implements the AT/OBD-II text protocol spoken by ELM327-class adapters.
//!
//! Every request is a line terminated by a carriage return; every response
//! ends with the `>` prompt. Requests race a timer, and a timed-out read is
//! cancelled by dropping it.

pub mod codec;
pub mod commands;
mod connection;
mod error;
pub mod response;
pub mod serial;

pub use codec::PromptCodec;
pub use connection::{ElmAdapter, ExchangeState};
pub use error::{ParseError, ProtocolError};
pub use response::{parse_engine_data, EngineField, EngineReading};
pub use serial::{list_ports, open_port, PortInfo};

/// Default baud rate for ELM327 adapters
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Default timeout for a single request/response exchange in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Timeout for the adapter reset, which reboots the chip
pub const RESET_TIMEOUT_MS: u64 = 3000;

/// Prompt byte the adapter sends when it is ready for the next command
pub const PROMPT: u8 = b'>';

/// Largest response accepted before the prompt arrives
pub const MAX_RESPONSE_SIZE: usize = 4096;
