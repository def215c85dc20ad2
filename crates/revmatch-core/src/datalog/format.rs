//! CSV row format
//!
//! `RPM,MPH,CurrentGear,RevMatch,Load,Throttle,Time`, speed with one decimal
//! and `-1` standing in for absent values.

use std::fmt::Write;

use super::LogRecord;

/// Header line of every log file
pub const CSV_HEADER: &str = "RPM,MPH,CurrentGear,RevMatch,Load,Throttle,Time";

const ABSENT: i64 = -1;

/// Format a record as a CSV line, including the trailing newline
pub fn format_row(record: &LogRecord) -> String {
    let mut line = String::with_capacity(48);
    let _ = writeln!(
        line,
        "{},{:.1},{},{},{},{},{}",
        record.rpm,
        record.speed_mph as f64,
        record.gear,
        or_absent(record.target_rpm),
        or_absent(record.load),
        or_absent(record.throttle),
        record.timestamp_ms
    );
    line
}

/// Parse a CSV line back into a record.
///
/// Returns `None` for the header, comments and malformed lines. Columns
/// beyond the seventh are ignored; a fractional speed is truncated.
pub fn parse_row(line: &str) -> Option<LogRecord> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split(',').map(str::trim);
    let rpm = fields.next()?.parse().ok()?;
    let speed: f64 = fields.next()?.parse().ok()?;
    if !speed.is_finite() {
        return None;
    }
    let gear = fields.next()?.parse().ok()?;
    let target_rpm = optional(fields.next()?)?;
    let load = optional(fields.next()?)?;
    let throttle = optional(fields.next()?)?;
    let timestamp_ms = fields.next()?.parse().ok()?;

    Some(LogRecord {
        rpm,
        speed_mph: speed as i32,
        gear,
        target_rpm,
        load,
        throttle,
        timestamp_ms,
    })
}

fn or_absent<T: Into<i64>>(value: Option<T>) -> i64 {
    value.map(Into::into).unwrap_or(ABSENT)
}

/// `-1` → `Some(None)`, a valid value → `Some(Some(v))`, garbage → `None`
fn optional<T: std::str::FromStr>(field: &str) -> Option<Option<T>> {
    if field == "-1" {
        return Some(None);
    }
    field.parse().ok().map(Some)
}
