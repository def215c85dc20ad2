//! revmatch - OBD-II gear and rev-match logger
//!
//! Reads RPM and speed from an ELM327 adapter (or replayed/synthetic data in
//! test mode), infers the gear, computes the downshift rev-match target and
//! logs every sample to CSV.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use revmatch_core::acquisition;
use revmatch_core::config::{load_vehicle_profile, AppConfig, DEFAULT_CONFIG_PATH, DEFAULT_PORT};
use revmatch_core::datalog::{ConsoleSink, CsvLogWriter, RowSink};
use revmatch_core::gearbox::{GearEstimator, RevMatcher};
use revmatch_core::protocol::{list_ports, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};
use revmatch_core::shutdown::{install_signal_handlers, ShutdownFlag};
use revmatch_core::source::TelemetrySource;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "revmatch")]
#[command(version, about = "OBD-II gear inference and rev-match logger")]
struct Cli {
    /// Run without an adapter, replaying a log or generating random data
    #[arg(short, long)]
    test: bool,

    /// Echo adapter responses and skipped cycles
    #[arg(short, long)]
    debug: bool,

    /// Vehicle profile file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// CSV log file (default: logs/<date>_<time>.csv; test mode prints rows instead)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Adapter serial port
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Per-request adapter timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Only change gear when RPM and speed trend together
    #[arg(short, long)]
    smooth: bool,

    /// Log file to replay in test mode
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Seed for synthetic test data
    #[arg(long)]
    seed: Option<u64>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        AppConfig {
            port: self.port.clone(),
            baud_rate: self.baud,
            test_mode: self.test,
            debug: self.debug,
            smoothing: self.smooth,
            output_path: self.output.clone(),
            config_path: self.config.clone(),
            replay_path: self.replay.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            seed: self.seed,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    if cli.list_ports {
        print_ports();
        return Ok(());
    }

    let config = cli.app_config();
    let profile = load_vehicle_profile(&config.config_path)
        .with_context(|| format!("loading {}", config.config_path.display()))?;
    let profile = Arc::new(profile);
    info!(gears = profile.gear_count(), "vehicle profile loaded");

    let shutdown = ShutdownFlag::new();
    install_signal_handlers(shutdown.clone()).context("installing signal handlers")?;

    let mut source = TelemetrySource::connect(&config, shutdown.clone())
        .await
        .context("starting telemetry source")?;

    let mut sink: Box<dyn RowSink> = match config.log_destination() {
        Some(path) => {
            let mut writer = CsvLogWriter::create(&path)?;
            writer.set_echo(config.debug);
            Box::new(writer)
        }
        None => Box::new(ConsoleSink::new()),
    };

    let mut estimator = if config.smoothing {
        GearEstimator::smoothed(profile.clone())
    } else {
        GearEstimator::direct(profile.clone())
    };
    let matcher = RevMatcher::new(profile);

    let stats =
        acquisition::run(&mut source, &mut estimator, &matcher, sink.as_mut(), &shutdown).await?;

    info!(
        accepted = stats.accepted,
        filtered = stats.filtered,
        timeouts = stats.timeouts,
        parse_errors = stats.parse_errors,
        "session complete"
    );
    Ok(())
}

fn print_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        let marker = if port.is_likely_adapter() { "*" } else { " " };
        match (&port.product, port.vid, port.pid) {
            (product, Some(vid), Some(pid)) => println!(
                "{marker} {} [{vid:04x}:{pid:04x}] {}",
                port.name,
                product.as_deref().unwrap_or("")
            ),
            _ if port.bluetooth => println!("{marker} {} (bluetooth)", port.name),
            _ => println!("{marker} {}", port.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_app_config() {
        let cli = Cli::try_parse_from(["revmatch"]).unwrap();
        assert_eq!(cli.app_config(), AppConfig::default());
    }

    #[test]
    fn test_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "revmatch",
            "-t",
            "-d",
            "--smooth",
            "--port",
            "/dev/rfcomm0",
            "--baud",
            "115200",
            "--timeout-ms",
            "250",
            "--replay",
            "logs/old.csv",
            "--seed",
            "9",
        ])
        .unwrap();

        let config = cli.app_config();
        assert!(config.test_mode && config.debug && config.smoothing);
        assert_eq!(config.port, "/dev/rfcomm0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.replay_path, Some(PathBuf::from("logs/old.csv")));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.log_destination(), None);
    }

    #[test]
    fn test_rejects_bad_baud() {
        assert!(Cli::try_parse_from(["revmatch", "--baud", "fast"]).is_err());
    }
}
