//! Data Logging
//!
//! Records every accepted sample together with its inferred gear and
//! rev-match target.

mod format;
mod writer;

pub use format::{format_row, parse_row, CSV_HEADER};
pub use writer::{ConsoleSink, CsvLogWriter, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BUFFER};

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::gearbox::GearMatch;
use crate::telemetry::Sample;

/// Errors writing the log
#[derive(Error, Debug)]
pub enum DatalogError {
    #[error("Could not open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Log write failed: {0}")]
    Write(#[from] io::Error),
}

/// One logged row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Engine speed in RPM
    pub rpm: i32,
    /// Road speed in MPH
    pub speed_mph: i32,
    /// Inferred gear
    pub gear: u32,
    /// Downshift target RPM, written as -1 when absent
    pub target_rpm: Option<u32>,
    /// Engine load in percent, written as -1 when absent
    pub load: Option<u8>,
    /// Throttle position in percent, written as -1 when absent
    pub throttle: Option<u8>,
    /// Sample time in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl LogRecord {
    /// Combine a sample with its gear match
    pub fn new(sample: &Sample, gear_match: GearMatch) -> Self {
        Self {
            rpm: sample.rpm,
            speed_mph: sample.speed_mph,
            gear: gear_match.gear,
            target_rpm: gear_match.target_rpm,
            load: sample.load,
            throttle: sample.throttle,
            timestamp_ms: sample.timestamp_ms,
        }
    }
}

/// Destination for log rows
pub trait RowSink {
    /// Append one row
    fn write_row(&mut self, record: &LogRecord) -> Result<(), DatalogError>;

    /// Push buffered rows to their destination
    fn flush(&mut self) -> Result<(), DatalogError>;
}
