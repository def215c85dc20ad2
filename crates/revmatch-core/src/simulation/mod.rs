//! Simulation Mode - stand-in telemetry without an adapter
//!
//! Either replays a previously recorded log or synthesizes plausible,
//! speed-correlated RPM/speed pairs. Both produce the same [`Sample`]s as
//! the live adapter, without load or throttle.

mod replay;
mod synthetic;

pub use replay::ReplaySource;
pub use synthetic::SyntheticSource;

use crate::telemetry::{AcquireError, Sample};

/// Simulated telemetry source
#[derive(Debug)]
pub enum SimulationSource {
    /// Finite playback of recorded samples
    Replay(ReplaySource),
    /// Endless pseudo-random samples
    Synthetic(SyntheticSource),
}

impl SimulationSource {
    /// Simulated sources are always connected
    pub fn is_connected(&self) -> bool {
        true
    }

    /// Produce the next sample
    pub async fn next_sample(&mut self) -> Result<Sample, AcquireError> {
        match self {
            SimulationSource::Replay(replay) => replay.next_sample(),
            SimulationSource::Synthetic(synthetic) => Ok(synthetic.next_sample().await),
        }
    }
}
