//! Playback of recorded logs

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::datalog::parse_row;
use crate::shutdown::ShutdownFlag;
use crate::telemetry::{AcquireError, Sample};

/// Finite, ordered playback of previously recorded samples.
///
/// Delivering the final sample stops the shared shutdown flag, so the
/// acquisition loop finishes the current cycle and exits.
#[derive(Debug)]
pub struct ReplaySource {
    records: Vec<Sample>,
    position: usize,
    shutdown: ShutdownFlag,
    signalled: bool,
}

impl ReplaySource {
    /// Play `records` in the order given
    pub fn new(records: Vec<Sample>, shutdown: ShutdownFlag) -> Self {
        Self {
            records,
            position: 0,
            shutdown,
            signalled: false,
        }
    }

    /// Load samples from log lines, skipping anything unparseable.
    ///
    /// Recorded timestamps are kept; load and throttle are not replayed.
    pub fn from_reader<R: BufRead>(reader: R, shutdown: ShutdownFlag) -> io::Result<Self> {
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for line in reader.lines() {
            let line = line?;
            match parse_row(&line) {
                Some(row) => records.push(Sample::new(row.rpm, row.speed_mph, row.timestamp_ms)),
                None => skipped += 1,
            }
        }

        debug!(loaded = records.len(), skipped, "replay data parsed");
        Ok(Self::new(records, shutdown))
    }

    /// Load samples from a CSV log file
    pub fn from_csv_file<P: AsRef<Path>>(path: P, shutdown: ShutdownFlag) -> io::Result<Self> {
        let path = path.as_ref();
        let source = Self::from_reader(BufReader::new(File::open(path)?), shutdown)?;
        info!("loaded {} replay samples from {}", source.len(), path.display());
        Ok(source)
    }

    /// Total number of samples
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there is nothing to play
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Samples not yet delivered
    pub fn remaining(&self) -> usize {
        self.records.len() - self.position
    }

    /// Deliver the next recorded sample
    pub fn next_sample(&mut self) -> Result<Sample, AcquireError> {
        let next = self.records.get(self.position).copied();
        if next.is_some() {
            self.position += 1;
        }

        if self.position == self.records.len() && !self.signalled {
            self.signalled = true;
            info!("replay finished after {} samples", self.records.len());
            self.shutdown.stop();
        }

        next.ok_or(AcquireError::Exhausted)
    }
}
