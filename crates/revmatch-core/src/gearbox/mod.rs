//! Gearbox Model
//!
//! Maps live RPM/speed samples onto the vehicle's gear ratios.
//!
//! - [`RatioProfile`]: the immutable per-vehicle ratio table
//! - [`infer_gear`] / [`GearEstimator`]: which gear the car is in
//! - [`TrendGearEstimator`]: the same, gated on the short-term RPM/speed trend
//! - [`RevMatcher`]: target RPM for a downshift into the next-lower gear

mod inference;
mod profile;
mod rev_match;
mod trend;

pub use inference::{gear_for_ratio, infer_gear, GearEstimator};
pub use profile::RatioProfile;
pub use rev_match::{GearMatch, RevMatcher};
pub use trend::{TrendEntry, TrendGearEstimator, TrendWindow};

/// Relates wheel circumference in inches, road speed in MPH and rotational
/// speed in RPM (inches per mile / minutes per hour).
pub const TIRE_CONVERSION: f64 = 1056.0;

/// Trailing window used by the trend-gated estimator, in milliseconds
pub const DEFAULT_TREND_WINDOW_MS: i64 = 250;

/// Maximum number of observations kept in a trend window
pub const DEFAULT_TREND_CAPACITY: usize = 8;
