//! Acquisition loop
//!
//! Pulls one sample per cycle, filters it, infers the gear, computes the
//! rev-match target and hands the row to the sink. The shutdown flag is
//! checked once per cycle.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::datalog::{DatalogError, LogRecord, RowSink};
use crate::gearbox::{GearEstimator, RevMatcher};
use crate::shutdown::ShutdownFlag;
use crate::source::TelemetrySource;
use crate::telemetry::AcquireError;

/// Errors that end an acquisition session
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Telemetry source failed: {0}")]
    Source(#[source] AcquireError),

    #[error(transparent)]
    Log(#[from] DatalogError),
}

/// Counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    /// Samples logged
    pub accepted: u64,
    /// Samples dropped as implausible
    pub filtered: u64,
    /// Cycles lost to adapter timeouts
    pub timeouts: u64,
    /// Cycles lost to undecodable responses
    pub parse_errors: u64,
}

impl AcquisitionStats {
    /// Cycles that produced no logged row
    pub fn skipped(&self) -> u64 {
        self.filtered + self.timeouts + self.parse_errors
    }
}

/// Run until the shutdown flag is cleared or the source fails for good.
///
/// Timeouts and parse errors skip the cycle. Running out of replay data ends
/// the session normally. Buffered rows are flushed before returning.
pub async fn run<T, S>(
    source: &mut TelemetrySource<T>,
    estimator: &mut GearEstimator,
    matcher: &RevMatcher,
    sink: &mut S,
    shutdown: &ShutdownFlag,
) -> Result<AcquisitionStats, RunError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: RowSink + ?Sized,
{
    let mut stats = AcquisitionStats::default();
    info!(source = source.kind(), "acquisition started");

    loop {
        // Replay and synthetic sources never wait, so give the signal task a turn
        tokio::task::yield_now().await;
        if !shutdown.is_running() {
            break;
        }

        let sample = match source.next_sample().await {
            Ok(sample) => sample,
            Err(AcquireError::Exhausted) => break,
            Err(e) if e.is_recoverable() => {
                match &e {
                    AcquireError::Parse(_) => stats.parse_errors += 1,
                    _ => stats.timeouts += 1,
                }
                debug!("skipping cycle: {e}");
                continue;
            }
            Err(e) => {
                warn!("stopping acquisition: {e}");
                sink.flush()?;
                return Err(RunError::Source(e));
            }
        };

        if !sample.is_plausible() {
            stats.filtered += 1;
            continue;
        }

        let gear = estimator.estimate(&sample);
        let gear_match = matcher.rev_match(gear, sample.rpm, sample.speed_mph);
        sink.write_row(&LogRecord::new(&sample, gear_match))?;
        stats.accepted += 1;
    }

    sink.flush()?;
    info!(
        accepted = stats.accepted,
        skipped = stats.skipped(),
        "acquisition finished"
    );
    Ok(stats)
}
