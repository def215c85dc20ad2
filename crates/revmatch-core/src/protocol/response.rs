//! Engine data response decoding
//!
//! A cleaned multi-PID response looks like `410C1AF80D3C0432114B0548`: each
//! PID marker is followed by its data bytes as hex pairs. Markers are
//! searched for in order, each search starting where the previous field's
//! data ended.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::commands::{PID_LOAD, PID_RPM, PID_SPEED, PID_THROTTLE};
use super::ParseError;
use crate::telemetry::Sample;

/// km/h to mph
pub const KMH_TO_MPH: f64 = 0.621371;

/// Fields decoded from an engine data response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineField {
    /// Engine speed, PID 0C
    Rpm,
    /// Vehicle speed, PID 0D
    Speed,
    /// Calculated engine load, PID 04
    Load,
    /// Throttle position, PID 11
    Throttle,
}

impl EngineField {
    /// Hex marker of the PID carrying this field
    pub fn pid(&self) -> &'static str {
        match self {
            EngineField::Rpm => PID_RPM,
            EngineField::Speed => PID_SPEED,
            EngineField::Load => PID_LOAD,
            EngineField::Throttle => PID_THROTTLE,
        }
    }
}

impl fmt::Display for EngineField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineField::Rpm => "rpm",
            EngineField::Speed => "speed",
            EngineField::Load => "load",
            EngineField::Throttle => "throttle",
        };
        f.write_str(name)
    }
}

/// Decoded engine values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineReading {
    /// Engine speed in RPM
    pub rpm: i32,
    /// Vehicle speed in MPH, truncated
    pub speed_mph: i32,
    /// Engine load in percent
    pub load: u8,
    /// Throttle position in percent
    pub throttle: u8,
}

impl EngineReading {
    /// Stamp the reading into a sample
    pub fn into_sample(self, timestamp_ms: i64) -> Sample {
        Sample {
            rpm: self.rpm,
            speed_mph: self.speed_mph,
            load: Some(self.load),
            throttle: Some(self.throttle),
            timestamp_ms,
        }
    }
}

/// Decode RPM, speed, load and throttle from a cleaned response
pub fn parse_engine_data(response: &str) -> Result<EngineReading, ParseError> {
    let mut scanner = PidScanner::new(response.as_bytes());

    let [a, b] = scanner.field::<2>(EngineField::Rpm)?;
    let [speed_kmh] = scanner.field::<1>(EngineField::Speed)?;
    let [load] = scanner.field::<1>(EngineField::Load)?;
    let [throttle] = scanner.field::<1>(EngineField::Throttle)?;

    Ok(EngineReading {
        rpm: decode_rpm(a, b),
        speed_mph: kmh_to_mph(speed_kmh),
        load: byte_to_percent(load),
        throttle: byte_to_percent(throttle),
    })
}

/// `((A * 256) + B) / 4`
pub fn decode_rpm(a: u8, b: u8) -> i32 {
    (a as i32 * 256 + b as i32) / 4
}

/// Convert a km/h byte to whole mph, truncating
pub fn kmh_to_mph(kmh: u8) -> i32 {
    (kmh as f64 * KMH_TO_MPH) as i32
}

/// Scale a 0-255 byte to a 0-100 percentage, truncating
pub fn byte_to_percent(value: u8) -> u8 {
    (value as f64 * 100.0 / 255.0) as u8
}

/// Cursor over a cleaned response
struct PidScanner<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> PidScanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Find `field`'s marker at or after the cursor and read `N` data bytes
    fn field<const N: usize>(&mut self, field: EngineField) -> Result<[u8; N], ParseError> {
        let marker = field.pid().as_bytes();
        let found = self.bytes[self.cursor..]
            .windows(marker.len())
            .position(|w| w == marker)
            .ok_or(ParseError::MissingPid { field })?;

        let start = self.cursor + found + marker.len();
        let end = start + 2 * N;
        if end > self.bytes.len() {
            return Err(ParseError::Truncated { field });
        }

        let mut out = [0u8; N];
        for (slot, pair) in out.iter_mut().zip(self.bytes[start..end].chunks_exact(2)) {
            *slot = hex_byte(pair).ok_or(ParseError::InvalidHex { field })?;
        }
        self.cursor = end;
        Ok(out)
    }
}

fn hex_byte(pair: &[u8]) -> Option<u8> {
    let hi = (pair[0] as char).to_digit(16)?;
    let lo = (pair[1] as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}
