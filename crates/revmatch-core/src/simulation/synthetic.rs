//! Synthetic telemetry generator

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::telemetry::{now_millis, Sample};

const MAX_SPEED_MPH: i32 = 80;
const MIN_RPM: i32 = 800;
const MAX_RPM: i32 = 7000;
const RPM_PER_MPH: i32 = 50;
const RPM_JITTER: i32 = 500;

/// Endless source of random but speed-correlated samples
#[derive(Debug)]
pub struct SyntheticSource {
    rng: StdRng,
    /// Delay before each sample, mimicking the adapter's round trip
    interval: Option<Duration>,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSource {
    /// Create a generator seeded from the OS
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            interval: None,
        }
    }

    /// Create a reproducible generator
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            interval: None,
        }
    }

    /// Wait `interval` before producing each sample
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Draw the next RPM/speed pair without pacing
    pub fn generate(&mut self) -> Sample {
        let speed = self.rng.gen_range(0..=MAX_SPEED_MPH);
        let base_rpm = speed * RPM_PER_MPH + MIN_RPM;
        let jitter = self.rng.gen_range(-RPM_JITTER..RPM_JITTER);
        let rpm = (base_rpm + jitter).clamp(MIN_RPM, MAX_RPM);
        Sample::new(rpm, speed, now_millis())
    }

    /// Produce the next sample, pacing if configured
    pub async fn next_sample(&mut self) -> Sample {
        if let Some(interval) = self.interval {
            tokio::time::sleep(interval).await;
        }
        self.generate()
    }
}
