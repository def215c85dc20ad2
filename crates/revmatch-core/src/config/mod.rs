//! Configuration
//!
//! Loads the vehicle ratio profile from a `key = value` file and carries the
//! runtime settings assembled by the command line front end.

mod app;
mod vehicle;

pub use app::{default_output_path, AppConfig, DEFAULT_CONFIG_PATH, DEFAULT_PORT};
pub use vehicle::{load_vehicle_profile, parse_vehicle_profile};

use std::path::PathBuf;
use thiserror::Error;

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Missing required settings: {}", .fields.join(", "))]
    Missing { fields: Vec<&'static str> },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}
