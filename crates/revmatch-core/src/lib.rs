//! # revmatch Core Library
//!
//! Core functionality for the revmatch OBD-II telemetry logger.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - ELM327 adapter communication (command framing, timeouts, PID decoding)
//! - Gear inference from the RPM/speed relationship, with optional trend smoothing
//! - Rev-match target RPM calculation for downshifts
//! - Replay and synthetic telemetry sources for running without a car
//! - Buffered CSV logging of every accepted sample
//!
//! ## Example
//!
//! ```rust,ignore
//! use revmatch_core::config::default_output_path;
//! use revmatch_core::prelude::*;
//!
//! let app_config = AppConfig::default();
//! let profile = std::sync::Arc::new(load_vehicle_profile(&app_config.config_path)?);
//! let shutdown = ShutdownFlag::new();
//!
//! let mut source = TelemetrySource::connect(&app_config, shutdown.clone()).await?;
//! let mut estimator = GearEstimator::direct(profile.clone());
//! let matcher = RevMatcher::new(profile);
//! let mut sink = CsvLogWriter::create(default_output_path())?;
//!
//! let stats = revmatch_core::acquisition::run(
//!     &mut source, &mut estimator, &matcher, &mut sink, &shutdown,
//! ).await?;
//! println!("accepted {} samples", stats.accepted);
//! ```

pub mod acquisition;
pub mod config;
pub mod datalog;
pub mod gearbox;
pub mod protocol;
pub mod shutdown;
pub mod simulation;
pub mod source;
pub mod telemetry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::acquisition::{AcquisitionStats, RunError};
    pub use crate::config::{load_vehicle_profile, AppConfig, ConfigError};
    pub use crate::datalog::{ConsoleSink, CsvLogWriter, DatalogError, LogRecord, RowSink};
    pub use crate::gearbox::{
        infer_gear, GearEstimator, GearMatch, RatioProfile, RevMatcher, TrendGearEstimator,
    };
    pub use crate::protocol::{ElmAdapter, ParseError, ProtocolError};
    pub use crate::shutdown::ShutdownFlag;
    pub use crate::simulation::{ReplaySource, SimulationSource, SyntheticSource};
    pub use crate::source::TelemetrySource;
    pub use crate::telemetry::{AcquireError, Sample};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
