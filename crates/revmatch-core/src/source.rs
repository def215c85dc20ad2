//! Telemetry source selection
//!
//! The live adapter and the simulation source behind one type, chosen once
//! at startup and never switched afterwards.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialStream;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::protocol::{open_port, ElmAdapter, PromptCodec, ProtocolError};
use crate::shutdown::ShutdownFlag;
use crate::simulation::{ReplaySource, SimulationSource, SyntheticSource};
use crate::telemetry::{AcquireError, Sample};

/// Delay between synthetic samples, roughly one adapter round trip
pub const SYNTHETIC_INTERVAL: Duration = Duration::from_millis(100);

/// Where samples come from for this session
#[derive(Debug)]
pub enum TelemetrySource<T = SerialStream> {
    /// ELM327 adapter on a live transport
    Adapter(ElmAdapter<T>),
    /// Replayed or synthetic data
    Simulation(SimulationSource),
}

impl TelemetrySource<SerialStream> {
    /// Build the source described by `config`.
    ///
    /// Test mode replays `config.replay_path` when it holds any samples and
    /// otherwise synthesizes data. Live mode opens the serial port and runs
    /// the adapter setup sequence; failure of either is fatal.
    pub async fn connect(config: &AppConfig, shutdown: ShutdownFlag) -> Result<Self, ProtocolError> {
        if config.test_mode {
            return Ok(Self::Simulation(simulation_for(config, shutdown)));
        }

        info!(port = %config.port, baud = config.baud_rate, "opening adapter");
        let stream = open_port(&config.port, config.baud_rate)?;
        let mut adapter = ElmAdapter::with_codec(stream, PromptCodec::default(), config.timeout);
        adapter.set_echo(config.debug);
        adapter.initialize().await?;
        info!("adapter ready");
        Ok(Self::Adapter(adapter))
    }
}

impl<T> TelemetrySource<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Whether the source can still deliver samples
    pub fn is_connected(&self) -> bool {
        match self {
            Self::Adapter(adapter) => adapter.is_connected(),
            Self::Simulation(simulation) => simulation.is_connected(),
        }
    }

    /// Acquire one sample
    pub async fn next_sample(&mut self) -> Result<Sample, AcquireError> {
        match self {
            Self::Adapter(adapter) => adapter.engine_data().await,
            Self::Simulation(simulation) => simulation.next_sample().await,
        }
    }

    /// Short label for log messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Adapter(_) => "adapter",
            Self::Simulation(SimulationSource::Replay(_)) => "replay",
            Self::Simulation(SimulationSource::Synthetic(_)) => "synthetic",
        }
    }
}

fn simulation_for(config: &AppConfig, shutdown: ShutdownFlag) -> SimulationSource {
    if let Some(path) = &config.replay_path {
        match ReplaySource::from_csv_file(path, shutdown) {
            Ok(replay) if !replay.is_empty() => return SimulationSource::Replay(replay),
            Ok(_) => warn!("no usable samples in {}, using random data", path.display()),
            Err(e) => warn!("could not read {}: {e}, using random data", path.display()),
        }
    }

    let synthetic = match config.seed {
        Some(seed) => SyntheticSource::with_seed(seed),
        None => SyntheticSource::new(),
    };
    SimulationSource::Synthetic(synthetic.with_interval(SYNTHETIC_INTERVAL))
}
