//! Buffered log writers

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{format_row, DatalogError, LogRecord, RowSink, CSV_HEADER};

/// Flush once this many bytes are buffered
pub const DEFAULT_MAX_BUFFER: usize = 8192;

/// Flush at least this often while rows keep arriving
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// CSV writer that batches rows in memory.
///
/// Buffered rows are flushed when the buffer fills, when the flush interval
/// has passed, and when the writer is dropped.
pub struct CsvLogWriter<W: Write> {
    out: W,
    buffer: String,
    max_buffer: usize,
    flush_interval: Duration,
    last_flush: Instant,
    rows: u64,
    flushes: u64,
    echo: bool,
}

impl CsvLogWriter<File> {
    /// Create (or truncate) the log file, creating missing parent directories
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, DatalogError> {
        let path = path.as_ref();
        let open_error = |source| DatalogError::Open {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_error)?;
        }
        let file = File::create(path).map_err(open_error)?;
        info!("logging to {}", path.display());
        Ok(Self::new(file))
    }
}

impl<W: Write> CsvLogWriter<W> {
    /// Wrap a writer; the header is buffered immediately
    pub fn new(out: W) -> Self {
        let mut buffer = String::with_capacity(DEFAULT_MAX_BUFFER);
        buffer.push_str(CSV_HEADER);
        buffer.push('\n');
        Self {
            out,
            buffer,
            max_buffer: DEFAULT_MAX_BUFFER,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            last_flush: Instant::now(),
            rows: 0,
            flushes: 0,
            echo: false,
        }
    }

    /// Override the buffer size and flush interval
    pub fn with_limits(mut self, max_buffer: usize, flush_interval: Duration) -> Self {
        self.max_buffer = max_buffer;
        self.flush_interval = flush_interval;
        self
    }

    /// Also log each row at debug level
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Rows written so far
    pub fn row_count(&self) -> u64 {
        self.rows
    }

    /// Flushes performed so far
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    /// Bytes waiting to be flushed
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// The underlying writer
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> RowSink for CsvLogWriter<W> {
    fn write_row(&mut self, record: &LogRecord) -> Result<(), DatalogError> {
        if self.echo {
            debug!(
                rpm = record.rpm,
                mph = record.speed_mph,
                gear = record.gear,
                target = ?record.target_rpm,
                "row"
            );
        }

        self.buffer.push_str(&format_row(record));
        self.rows += 1;

        if self.buffer.len() >= self.max_buffer || self.last_flush.elapsed() >= self.flush_interval {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DatalogError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.out.write_all(self.buffer.as_bytes())?;
        self.out.flush()?;
        self.buffer.clear();
        self.last_flush = Instant::now();
        self.flushes += 1;
        Ok(())
    }
}

impl<W: Write> Drop for CsvLogWriter<W> {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        info!(rows = self.rows, "flushing remaining log data");
        if let Err(e) = self.flush() {
            warn!("final log flush failed: {e}");
        }
    }
}

/// Sink that prints rows instead of storing them
#[derive(Debug, Default)]
pub struct ConsoleSink {
    rows: u64,
}

impl ConsoleSink {
    /// Create a console sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows printed so far
    pub fn row_count(&self) -> u64 {
        self.rows
    }
}

impl RowSink for ConsoleSink {
    fn write_row(&mut self, record: &LogRecord) -> Result<(), DatalogError> {
        self.rows += 1;
        info!(
            "RPM: {}, MPH: {:.1}, Current Gear: {}, Target RPM: {}, Time: {}",
            record.rpm,
            record.speed_mph as f64,
            record.gear,
            record.target_rpm.map_or(-1, i64::from),
            record.timestamp_ms
        );
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DatalogError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(rpm: i32) -> LogRecord {
        LogRecord {
            rpm,
            speed_mph: 30,
            gear: 2,
            target_rpm: None,
            load: None,
            throttle: None,
            timestamp_ms: 1000,
        }
    }

    #[test]
    fn test_rows_stay_buffered_until_flush() {
        let mut writer = CsvLogWriter::new(Vec::new());
        writer.write_row(&record(1500)).unwrap();
        assert!(writer.get_ref().is_empty());

        writer.flush().unwrap();
        let text = String::from_utf8(writer.get_ref().clone()).unwrap();
        assert_eq!(text, format!("{CSV_HEADER}\n1500,30.0,2,-1,-1,-1,1000\n"));
        assert_eq!(writer.flush_count(), 1);
        assert_eq!(writer.buffered_len(), 0);
    }

    #[test]
    fn test_full_buffer_flushes() {
        let mut writer =
            CsvLogWriter::new(Vec::new()).with_limits(64, Duration::from_secs(3600));
        writer.write_row(&record(1500)).unwrap();
        assert_eq!(writer.flush_count(), 0);
        writer.write_row(&record(1600)).unwrap();
        assert_eq!(writer.flush_count(), 1);
        assert_eq!(writer.row_count(), 2);
    }

    #[test]
    fn test_elapsed_interval_flushes() {
        let mut writer = CsvLogWriter::new(Vec::new()).with_limits(1 << 20, Duration::ZERO);
        writer.write_row(&record(1500)).unwrap();
        assert_eq!(writer.flush_count(), 1);
        assert!(!writer.get_ref().is_empty());
    }

    #[test]
    fn test_drop_flushes_buffered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.csv");

        let mut writer = CsvLogWriter::create(&path).unwrap();
        writer.write_row(&record(1500)).unwrap();
        assert_eq!(writer.flush_count(), 0);
        drop(writer);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("{CSV_HEADER}\n1500,30.0,2,-1,-1,-1,1000\n"));
    }

    #[test]
    fn test_console_sink_counts_rows() {
        let mut sink = ConsoleSink::new();
        sink.write_row(&record(900)).unwrap();
        sink.write_row(&record(950)).unwrap();
        assert_eq!(sink.row_count(), 2);
    }
}
