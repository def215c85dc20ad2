//! Telemetry samples
//!
//! The unit of data produced once per acquisition cycle by any source.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{ParseError, ProtocolError};

/// Why a source produced no sample this cycle
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Replay data exhausted")]
    Exhausted,
}

impl AcquireError {
    /// Whether the acquisition loop should skip this cycle and carry on
    pub fn is_recoverable(&self) -> bool {
        match self {
            AcquireError::Protocol(e) => e.is_recoverable(),
            AcquireError::Parse(_) => true,
            AcquireError::Exhausted => false,
        }
    }
}

/// One acquisition cycle's worth of engine data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Engine speed in RPM
    pub rpm: i32,
    /// Road speed in MPH
    pub speed_mph: i32,
    /// Calculated engine load in percent, `None` when the source does not report it
    pub load: Option<u8>,
    /// Throttle position in percent, `None` when the source does not report it
    pub throttle: Option<u8>,
    /// Wall-clock time of the sample in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl Sample {
    /// Create a sample carrying only RPM and speed
    pub fn new(rpm: i32, speed_mph: i32, timestamp_ms: i64) -> Self {
        Self {
            rpm,
            speed_mph,
            load: None,
            throttle: None,
            timestamp_ms,
        }
    }

    /// Whether the sample is usable for gear inference.
    ///
    /// A stopped engine or a negative speed reading is never inferred against
    /// or logged.
    pub fn is_plausible(&self) -> bool {
        self.rpm > 0 && self.speed_mph >= 0
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausibility_filter() {
        assert!(Sample::new(850, 0, 0).is_plausible());
        assert!(!Sample::new(0, 10, 0).is_plausible());
        assert!(!Sample::new(-1, 10, 0).is_plausible());
        assert!(!Sample::new(2000, -1, 0).is_plausible());
    }

    #[test]
    fn test_new_sample_has_no_optional_fields() {
        let sample = Sample::new(1200, 15, 42);
        assert_eq!(sample.load, None);
        assert_eq!(sample.throttle, None);
        assert_eq!(sample.timestamp_ms, 42);
    }
}
