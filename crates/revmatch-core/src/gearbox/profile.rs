//! Vehicle ratio profile

use serde::{Deserialize, Serialize};

use super::TIRE_CONVERSION;

/// Gear and final-drive ratios of one vehicle, plus the usable RPM band.
///
/// Built once at startup by the configuration loader, which is responsible
/// for validating it, and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioProfile {
    gear_ratios: Vec<f64>,
    final_drive: f64,
    wheel_circumference: f64,
    min_rpm: i32,
    max_rpm: i32,
}

impl RatioProfile {
    /// Create a profile.
    ///
    /// `gear_ratios` is in gear order (first gear first); `wheel_circumference`
    /// is in inches.
    pub fn new(
        gear_ratios: Vec<f64>,
        final_drive: f64,
        wheel_circumference: f64,
        min_rpm: i32,
        max_rpm: i32,
    ) -> Self {
        Self {
            gear_ratios,
            final_drive,
            wheel_circumference,
            min_rpm,
            max_rpm,
        }
    }

    /// Gear ratios, first gear first
    pub fn gear_ratios(&self) -> &[f64] {
        &self.gear_ratios
    }

    /// Ratio of a 1-based gear number
    pub fn ratio(&self, gear: u32) -> Option<f64> {
        let index = (gear as usize).checked_sub(1)?;
        self.gear_ratios.get(index).copied()
    }

    /// Number of forward gears
    pub fn gear_count(&self) -> u32 {
        self.gear_ratios.len() as u32
    }

    /// Final drive ratio
    pub fn final_drive(&self) -> f64 {
        self.final_drive
    }

    /// Wheel circumference in inches
    pub fn wheel_circumference(&self) -> f64 {
        self.wheel_circumference
    }

    /// Lowest RPM a rev-match target may have
    pub fn min_rpm(&self) -> i32 {
        self.min_rpm
    }

    /// Highest RPM a rev-match target may have
    pub fn max_rpm(&self) -> i32 {
        self.max_rpm
    }

    /// Whether `rpm` lies inside `[min_rpm, max_rpm]`
    pub fn rpm_in_band(&self, rpm: i32) -> bool {
        (self.min_rpm..=self.max_rpm).contains(&rpm)
    }

    /// Observed gearbox ratio for an RPM/speed pair.
    ///
    /// Undefined (infinite or NaN) for a speed of zero; callers treat that
    /// case separately.
    pub fn ratio_for(&self, rpm: i32, speed_mph: i32) -> f64 {
        (rpm as f64 * self.wheel_circumference)
            / (speed_mph as f64 * TIRE_CONVERSION * self.final_drive)
    }

    /// Engine RPM that `ratio` would produce at `speed_mph`
    pub fn rpm_for(&self, ratio: f64, speed_mph: i32) -> f64 {
        (TIRE_CONVERSION * speed_mph as f64 * self.final_drive * ratio) / self.wheel_circumference
    }
}
