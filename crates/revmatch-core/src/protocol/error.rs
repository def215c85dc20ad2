//! Protocol errors

use thiserror::Error;

use super::EngineField;

/// Errors that can occur while talking to the adapter
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("No response to '{command}' within {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("Adapter closed the connection")]
    Disconnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Adapter initialization failed at '{command}': {source}")]
    Init {
        command: String,
        #[source]
        source: Box<ProtocolError>,
    },

    #[error("Buffer overflow: no prompt within {0} bytes")]
    BufferOverflow(usize),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the error only spoils the current acquisition cycle
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::BufferOverflow(_))
    }
}

/// Errors decoding an engine data response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{field} (PID {pid}) not found in response", pid = .field.pid())]
    MissingPid { field: EngineField },

    #[error("{field} (PID {pid}) found but not enough bytes follow it", pid = .field.pid())]
    Truncated { field: EngineField },

    #[error("{field} (PID {pid}) is followed by invalid hex", pid = .field.pid())]
    InvalidHex { field: EngineField },
}

impl ParseError {
    /// The field that could not be recovered
    pub fn field(&self) -> EngineField {
        match self {
            Self::MissingPid { field } | Self::Truncated { field } | Self::InvalidHex { field } => {
                *field
            }
        }
    }
}
