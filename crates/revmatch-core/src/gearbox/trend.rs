//! Trend-gated gear inference
//!
//! Instantaneous RPM/speed ratios flip between gears while the clutch is in
//! and during engine braking. The estimator here keeps a short trailing
//! window of observations and only re-classifies while RPM and speed rise
//! together; otherwise the previous gear is held.

use std::collections::VecDeque;
use std::sync::Arc;

use super::{infer_gear, RatioProfile, DEFAULT_TREND_CAPACITY, DEFAULT_TREND_WINDOW_MS};

/// One buffered observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendEntry {
    /// Engine speed in RPM
    pub rpm: i32,
    /// Road speed in MPH
    pub speed_mph: i32,
    /// Sample time in milliseconds
    pub timestamp_ms: i64,
}

/// Bounded, time-ordered ring of recent observations
#[derive(Debug, Clone)]
pub struct TrendWindow {
    entries: VecDeque<TrendEntry>,
    capacity: usize,
    horizon_ms: i64,
}

impl Default for TrendWindow {
    fn default() -> Self {
        Self::new(DEFAULT_TREND_CAPACITY, DEFAULT_TREND_WINDOW_MS)
    }
}

impl TrendWindow {
    /// Create a window holding at most `capacity` entries no older than `horizon_ms`
    pub fn new(capacity: usize, horizon_ms: i64) -> Self {
        let capacity = capacity.max(2);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            horizon_ms,
        }
    }

    /// Evict stale entries relative to `entry`, then append it
    pub fn push(&mut self, entry: TrendEntry) {
        // A clock that steps backwards starts a fresh window
        if self
            .entries
            .back()
            .is_some_and(|last| entry.timestamp_ms < last.timestamp_ms)
        {
            self.entries.clear();
        }

        let cutoff = entry.timestamp_ms.saturating_sub(self.horizon_ms);
        while self
            .entries
            .front()
            .is_some_and(|oldest| oldest.timestamp_ms < cutoff)
        {
            self.entries.pop_front();
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Number of buffered entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffered entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &TrendEntry> {
        self.entries.iter()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Mean `(dRPM/dt, dSpeed/dt)` per second across consecutive entries.
    ///
    /// Pairs with a non-positive time delta are skipped; `None` when no pair
    /// is usable.
    pub fn derivatives(&self) -> Option<(f64, f64)> {
        let mut rpm_rate = 0.0;
        let mut speed_rate = 0.0;
        let mut pairs = 0u32;

        for (a, b) in self.entries.iter().zip(self.entries.iter().skip(1)) {
            let dt = b.timestamp_ms - a.timestamp_ms;
            if dt <= 0 {
                continue;
            }
            let dt_secs = dt as f64 / 1000.0;
            rpm_rate += (b.rpm - a.rpm) as f64 / dt_secs;
            speed_rate += (b.speed_mph - a.speed_mph) as f64 / dt_secs;
            pairs += 1;
        }

        if pairs == 0 {
            return None;
        }
        Some((rpm_rate / pairs as f64, speed_rate / pairs as f64))
    }
}

/// Gear estimator that holds its last answer through ambiguous transients.
///
/// Owns its window; create one per acquisition session.
#[derive(Debug)]
pub struct TrendGearEstimator {
    profile: Arc<RatioProfile>,
    window: TrendWindow,
    previous_gear: Option<u32>,
}

impl TrendGearEstimator {
    /// Create an estimator with the default 250 ms window
    pub fn new(profile: Arc<RatioProfile>) -> Self {
        Self::with_window(profile, TrendWindow::default())
    }

    /// Create an estimator with a custom window
    pub fn with_window(profile: Arc<RatioProfile>, window: TrendWindow) -> Self {
        Self {
            profile,
            window,
            previous_gear: None,
        }
    }

    /// Last gear reported, if any
    pub fn previous_gear(&self) -> Option<u32> {
        self.previous_gear
    }

    /// The trailing window
    pub fn window(&self) -> &TrendWindow {
        &self.window
    }

    /// Forget the window and the held gear
    pub fn reset(&mut self) {
        self.window.clear();
        self.previous_gear = None;
    }

    /// Infer the gear for a timestamped sample
    pub fn infer(&mut self, rpm: i32, speed_mph: i32, timestamp_ms: i64) -> u32 {
        self.window.push(TrendEntry {
            rpm,
            speed_mph,
            timestamp_ms,
        });

        // Nothing to hold yet: the first sample of a session seeds the gear
        let Some(held) = self.previous_gear else {
            let gear = infer_gear(&self.profile, rpm, speed_mph);
            self.previous_gear = Some(gear);
            return gear;
        };

        if self.window.len() < 2 {
            return held;
        }

        let Some((rpm_rate, speed_rate)) = self.window.derivatives() else {
            return held;
        };
        if rpm_rate * speed_rate <= 0.0 || rpm_rate < 0.0 {
            tracing::trace!(rpm_rate, speed_rate, held, "ambiguous trend, holding gear");
            return held;
        }

        let gear = infer_gear(&self.profile, rpm, speed_mph);
        self.previous_gear = Some(gear);
        gear
    }
}
