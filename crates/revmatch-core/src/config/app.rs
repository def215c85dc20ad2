//! Runtime settings

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::{DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Serial port used when none is given
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM9";
/// Serial port used when none is given
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default vehicle profile location
pub const DEFAULT_CONFIG_PATH: &str = "vehicle.conf";

/// Settings for one logging session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Serial port of the adapter
    pub port: String,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Run without an adapter, from replay or synthetic data
    pub test_mode: bool,
    /// Echo adapter responses and skipped cycles
    pub debug: bool,
    /// Use the trend-smoothed gear estimator
    pub smoothing: bool,
    /// CSV log destination; in test mode `None` prints rows instead
    pub output_path: Option<PathBuf>,
    /// Vehicle profile file
    pub config_path: PathBuf,
    /// Recorded log to replay in test mode
    pub replay_path: Option<PathBuf>,
    /// Per-exchange adapter timeout
    pub timeout: Duration,
    /// Seed for synthetic data
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            test_mode: false,
            debug: false,
            smoothing: false,
            output_path: None,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            replay_path: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            seed: None,
        }
    }
}

impl AppConfig {
    /// Where the CSV log goes, if anywhere.
    ///
    /// Live sessions always log, to a timestamped file unless a path was
    /// given. Test sessions only log when asked to.
    pub fn log_destination(&self) -> Option<PathBuf> {
        match (&self.output_path, self.test_mode) {
            (Some(path), _) => Some(path.clone()),
            (None, false) => Some(default_output_path()),
            (None, true) => None,
        }
    }
}

/// `logs/YYYY-MM-DD_HH-MM-SS.csv` in local time
pub fn default_output_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    PathBuf::from("logs").join(format!("{stamp}.csv"))
}
