//! Vehicle profile file
//!
//! Properties-style lines: `key = value` or `key: value`, `#` and `!`
//! comments. `gear_ratio` repeats once per gear, first gear first.
//!
//! ```text
//! # 2006 hatchback, 205/55R16
//! gear_ratio = 11,42
//! gear_ratio = 19,41
//! gear_ratio = 28,41
//! gear_ratio = 35,39
//! gear_ratio = 1.0
//! final_drive = 17,72
//! wheel_circumference = 78.5
//! min_rpm = 800
//! max_rpm = 6800
//! ```
//!
//! A ratio is either a plain decimal or `input,output` tooth counts, giving
//! `output / input`.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use super::ConfigError;
use crate::gearbox::RatioProfile;

const GEAR_RATIO: &str = "gear_ratio";
const FINAL_DRIVE: &str = "final_drive";
const WHEEL_CIRCUMFERENCE: &str = "wheel_circumference";
const MIN_RPM: &str = "min_rpm";
const MAX_RPM: &str = "max_rpm";

/// Read and validate a vehicle profile file
pub fn load_vehicle_profile<P: AsRef<Path>>(path: P) -> Result<RatioProfile, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let profile = parse_vehicle_profile(&content)?;
    debug!(
        gears = profile.gear_count(),
        final_drive = profile.final_drive(),
        "loaded vehicle profile from {}",
        path.display()
    );
    Ok(profile)
}

/// Parse and validate vehicle profile text.
///
/// Every missing setting is reported at once.
pub fn parse_vehicle_profile(content: &str) -> Result<RatioProfile, ConfigError> {
    let mut gear_ratios = Vec::new();
    let mut final_drive = None;
    let mut wheel_circumference = None;
    let mut min_rpm = None;
    let mut max_rpm = None;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let Some((key, value)) = split_key_value(trimmed) else {
            warn!(line, "ignoring config line without a separator: {trimmed}");
            continue;
        };

        match key {
            GEAR_RATIO => gear_ratios.push(parse_ratio(value, line)?),
            FINAL_DRIVE => final_drive = Some(parse_ratio(value, line)?),
            WHEEL_CIRCUMFERENCE => wheel_circumference = Some(parse_number::<f64>(value, line)?),
            MIN_RPM => min_rpm = Some(parse_number::<i32>(value, line)?),
            MAX_RPM => max_rpm = Some(parse_number::<i32>(value, line)?),
            other => warn!(line, "ignoring unknown config key '{other}'"),
        }
    }

    let mut missing = Vec::new();
    if gear_ratios.is_empty() {
        missing.push(GEAR_RATIO);
    }
    if final_drive.is_none() {
        missing.push(FINAL_DRIVE);
    }
    if wheel_circumference.is_none() {
        missing.push(WHEEL_CIRCUMFERENCE);
    }
    if min_rpm.is_none() {
        missing.push(MIN_RPM);
    }
    if max_rpm.is_none() {
        missing.push(MAX_RPM);
    }

    match (final_drive, wheel_circumference, min_rpm, max_rpm) {
        (Some(final_drive), Some(wheel_circumference), Some(min_rpm), Some(max_rpm))
            if missing.is_empty() =>
        {
            validate(&gear_ratios, final_drive, wheel_circumference, min_rpm, max_rpm)?;
            Ok(RatioProfile::new(
                gear_ratios,
                final_drive,
                wheel_circumference,
                min_rpm,
                max_rpm,
            ))
        }
        _ => Err(ConfigError::Missing { fields: missing }),
    }
}

fn validate(
    gear_ratios: &[f64],
    final_drive: f64,
    wheel_circumference: f64,
    min_rpm: i32,
    max_rpm: i32,
) -> Result<(), ConfigError> {
    if let Some(bad) = gear_ratios.iter().find(|r| **r <= 0.0) {
        return Err(ConfigError::InvalidValue {
            field: GEAR_RATIO,
            message: format!("ratio must be positive, got {bad}"),
        });
    }
    if final_drive <= 0.0 {
        return Err(ConfigError::InvalidValue {
            field: FINAL_DRIVE,
            message: format!("ratio must be positive, got {final_drive}"),
        });
    }
    if wheel_circumference <= 0.0 {
        return Err(ConfigError::InvalidValue {
            field: WHEEL_CIRCUMFERENCE,
            message: format!("must be positive, got {wheel_circumference}"),
        });
    }
    if min_rpm >= max_rpm {
        return Err(ConfigError::InvalidValue {
            field: MIN_RPM,
            message: format!("{min_rpm} is not below max_rpm {max_rpm}"),
        });
    }
    if gear_ratios.windows(2).any(|pair| pair[1] >= pair[0]) {
        warn!("gear ratios are not strictly decreasing; inferred gears may be unreliable");
    }
    Ok(())
}

/// Split at the first `=` or `:`
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    Some((line[..pos].trim(), line[pos + 1..].trim()))
}

fn parse_ratio(value: &str, line: usize) -> Result<f64, ConfigError> {
    let Some((input, output)) = value.split_once(',') else {
        return parse_number(value, line);
    };

    let input: u32 = parse_number(input, line)?;
    let output: u32 = parse_number(output, line)?;
    if input == 0 {
        return Err(ConfigError::Parse {
            line,
            message: format!("'{value}' has zero input teeth"),
        });
    }
    Ok(f64::from(output) / f64::from(input))
}

fn parse_number<T: std::str::FromStr>(value: &str, line: usize) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned.parse().map_err(|e| ConfigError::Parse {
        line,
        message: format!("'{value}': {e}"),
    })
}
