//! Rev-match target calculation

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{infer_gear, RatioProfile};

/// Inferred gear and the downshift target RPM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearMatch {
    /// Current gear, 1-based
    pub gear: u32,
    /// RPM to blip to before dropping into `gear - 1`, if a safe one exists
    pub target_rpm: Option<u32>,
}

impl GearMatch {
    /// A result with no usable downshift target
    pub fn no_target(gear: u32) -> Self {
        Self {
            gear,
            target_rpm: None,
        }
    }
}

/// Computes the RPM the engine would turn in the next-lower gear at the
/// current road speed
#[derive(Debug, Clone)]
pub struct RevMatcher {
    profile: Arc<RatioProfile>,
}

impl RevMatcher {
    /// Create a matcher sharing `profile`
    pub fn new(profile: Arc<RatioProfile>) -> Self {
        Self { profile }
    }

    /// The profile in use
    pub fn profile(&self) -> &RatioProfile {
        &self.profile
    }

    /// Target RPM for a downshift from `gear`.
    ///
    /// No target in first gear, and none when the target falls outside the
    /// profile's RPM band. The target is truncated, not rounded. `rpm` does
    /// not enter the calculation; the road speed alone fixes the target.
    pub fn rev_match(&self, gear: u32, _rpm: i32, speed_mph: i32) -> GearMatch {
        if gear < 2 {
            return GearMatch::no_target(gear);
        }
        let Some(lower_ratio) = self.profile.ratio(gear - 1) else {
            return GearMatch::no_target(gear);
        };

        let target = self.profile.rpm_for(lower_ratio, speed_mph);
        if !target.is_finite() {
            return GearMatch::no_target(gear);
        }
        let target = target as i32;
        if target < 0 || !self.profile.rpm_in_band(target) {
            return GearMatch::no_target(gear);
        }

        GearMatch {
            gear,
            target_rpm: Some(target as u32),
        }
    }

    /// Infer the gear with the stateless rule, then rev-match it
    pub fn evaluate(&self, rpm: i32, speed_mph: i32) -> GearMatch {
        let gear = infer_gear(&self.profile, rpm, speed_mph);
        self.rev_match(gear, rpm, speed_mph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn matcher() -> RevMatcher {
        RevMatcher::new(Arc::new(RatioProfile::new(
            vec![4.0, 2.5, 1.5, 1.0],
            3.0,
            79.0,
            800,
            7000,
        )))
    }

    #[test]
    fn test_first_gear_has_no_target() {
        let m = matcher();
        for (rpm, mph) in [(800, 0), (3000, 10), (6500, 40), (1, 200)] {
            assert_eq!(m.rev_match(1, rpm, mph), GearMatch::no_target(1));
        }
    }

    #[test]
    fn test_scenario_target() {
        // trunc(1056 * 45 * 3.0 * 2.5 / 79) = trunc(4511.39)
        assert_eq!(
            matcher().evaluate(3000, 45),
            GearMatch {
                gear: 3,
                target_rpm: Some(4511)
            }
        );
    }

    #[test]
    fn test_target_uses_next_lower_gear() {
        // From fourth into third: trunc(1056 * 60 * 3.0 * 1.5 / 79) = trunc(3609.11)
        assert_eq!(matcher().rev_match(4, 2500, 60).target_rpm, Some(3609));
    }

    #[test]
    fn test_out_of_band_target_is_dropped() {
        let m = matcher();
        // Second into first at 60 mph: far above 7000
        assert_eq!(m.rev_match(2, 5000, 60), GearMatch::no_target(2));
        // Fourth into third at 5 mph: below 800
        assert_eq!(m.rev_match(4, 900, 5), GearMatch::no_target(4));
    }

    #[test]
    fn test_gear_beyond_profile_has_no_target() {
        assert_eq!(matcher().rev_match(9, 3000, 45), GearMatch::no_target(9));
    }

    #[test]
    fn test_target_never_leaves_band() {
        let m = matcher();
        for gear in 1..=4 {
            for mph in (0..=160).step_by(3) {
                if let Some(target) = m.rev_match(gear, 3000, mph).target_rpm {
                    assert!(
                        (800..=7000).contains(&target),
                        "gear {gear} at {mph} mph produced {target}"
                    );
                }
            }
        }
    }
}
