//! Gear inference
//!
//! Classifies an RPM/speed sample into a gear by comparing the observed ratio
//! against the midpoints between adjacent gear ratios.
//!
//! Boundary rule: with midpoints `m[g] = (r[g] + r[g+1]) / 2`, the gear is
//! the smallest `g` in `1..N-1` with `ratio > m[g]`, else `N`. A ratio that
//! sits exactly on a midpoint is not greater than it and lands in the higher
//! gear.

use std::sync::Arc;

use super::{RatioProfile, TrendGearEstimator};
use crate::telemetry::Sample;

/// Infer the current gear from RPM and road speed.
///
/// A stationary vehicle (`speed_mph == 0`) is in first gear.
pub fn infer_gear(profile: &RatioProfile, rpm: i32, speed_mph: i32) -> u32 {
    if speed_mph == 0 {
        return 1;
    }
    gear_for_ratio(profile.gear_ratios(), profile.ratio_for(rpm, speed_mph))
}

/// Map an observed overall ratio onto a 1-based gear number
pub fn gear_for_ratio(gear_ratios: &[f64], ratio: f64) -> u32 {
    for (index, pair) in gear_ratios.windows(2).enumerate() {
        let midpoint = (pair[0] + pair[1]) / 2.0;
        if ratio > midpoint {
            return index as u32 + 1;
        }
    }
    gear_ratios.len().max(1) as u32
}

/// Gear estimator selected once per acquisition session
#[derive(Debug)]
pub enum GearEstimator {
    /// Instantaneous midpoint classification of every sample
    Direct(Arc<RatioProfile>),
    /// Classification gated on the short-term RPM/speed trend
    Trend(TrendGearEstimator),
}

impl GearEstimator {
    /// Stateless estimator
    pub fn direct(profile: Arc<RatioProfile>) -> Self {
        Self::Direct(profile)
    }

    /// Trend-gated estimator with the default window
    pub fn smoothed(profile: Arc<RatioProfile>) -> Self {
        Self::Trend(TrendGearEstimator::new(profile))
    }

    /// Estimate the gear for one sample
    pub fn estimate(&mut self, sample: &Sample) -> u32 {
        match self {
            Self::Direct(profile) => infer_gear(profile, sample.rpm, sample.speed_mph),
            Self::Trend(estimator) => {
                estimator.infer(sample.rpm, sample.speed_mph, sample.timestamp_ms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scenario_profile() -> RatioProfile {
        RatioProfile::new(vec![4.0, 2.5, 1.5, 1.0], 3.0, 79.0, 800, 7000)
    }

    #[test]
    fn test_stationary_is_first_gear() {
        let p = scenario_profile();
        for rpm in [0, 850, 3000, 7000, 12_000] {
            assert_eq!(infer_gear(&p, rpm, 0), 1);
        }
    }

    #[test]
    fn test_scenario_third_gear() {
        // 3000 * 79 / (45 * 1056 * 3.0) = 1.6625, between the 2.0 and 1.25 midpoints
        assert_eq!(infer_gear(&scenario_profile(), 3000, 45), 3);
    }

    #[test]
    fn test_exact_midpoints_fall_to_higher_gear() {
        let ratios = [4.0, 2.5, 1.5, 1.0];
        assert_eq!(gear_for_ratio(&ratios, 3.25), 2);
        assert_eq!(gear_for_ratio(&ratios, 3.250_000_001), 1);
        assert_eq!(gear_for_ratio(&ratios, 2.0), 3);
        assert_eq!(gear_for_ratio(&ratios, 2.000_000_001), 2);
        assert_eq!(gear_for_ratio(&ratios, 1.25), 4);
        assert_eq!(gear_for_ratio(&ratios, 1.250_000_001), 3);
    }

    #[test]
    fn test_ratios_beyond_the_table() {
        let ratios = [4.0, 2.5, 1.5, 1.0];
        assert_eq!(gear_for_ratio(&ratios, 10.0), 1);
        assert_eq!(gear_for_ratio(&ratios, 0.5), 4);
    }

    #[test]
    fn test_single_gear_profile() {
        assert_eq!(gear_for_ratio(&[3.0], 9.0), 1);
        assert_eq!(gear_for_ratio(&[3.0], 0.1), 1);
        assert_eq!(gear_for_ratio(&[], 1.0), 1);
    }

    #[test]
    fn test_gear_non_increasing_as_ratio_grows() {
        let ratios = [3.5, 2.1, 1.4, 1.0];
        let mut previous = u32::MAX;
        for step in 0..=500 {
            let ratio = 0.5 + step as f64 * 0.01;
            let gear = gear_for_ratio(&ratios, ratio);
            assert!(gear <= previous, "gear rose from {previous} to {gear} at ratio {ratio}");
            previous = gear;
        }
        assert_eq!(previous, 1);
    }

    #[test]
    fn test_direct_estimator_uses_sample_fields() {
        let mut estimator = GearEstimator::direct(Arc::new(scenario_profile()));
        assert_eq!(estimator.estimate(&Sample::new(3000, 45, 0)), 3);
        assert_eq!(estimator.estimate(&Sample::new(3000, 0, 1)), 1);
    }
}
