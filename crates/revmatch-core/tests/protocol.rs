use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use revmatch_core::acquisition;
use revmatch_core::datalog::{DatalogError, LogRecord, RowSink};
use revmatch_core::gearbox::{GearEstimator, RatioProfile, RevMatcher};
use revmatch_core::protocol::commands::INIT_SEQUENCE;
use revmatch_core::protocol::{
    ElmAdapter, EngineField, ExchangeState, ParseError, PromptCodec, ProtocolError,
};
use revmatch_core::shutdown::ShutdownFlag;
use revmatch_core::source::TelemetrySource;
use revmatch_core::telemetry::AcquireError;
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

/// Reply from the mock adapter: delay, then bytes. `None` stays silent.
type Reply = Option<(Duration, Vec<u8>)>;

fn reply(delay_ms: u64, bytes: &[u8]) -> Reply {
    Some((Duration::from_millis(delay_ms), bytes.to_vec()))
}

/// Mock ELM327 on the far end of a duplex pipe.
///
/// Returns every command it received once the adapter side is dropped.
fn spawn_mock<F>(server: DuplexStream, mut respond: F) -> JoinHandle<Vec<String>>
where
    F: FnMut(&str) -> Reply + Send + 'static,
{
    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut reader = BufReader::new(read);
        let mut received = Vec::new();

        loop {
            let mut raw = Vec::new();
            match reader.read_until(b'\r', &mut raw).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let command = String::from_utf8_lossy(&raw).trim_end().to_string();
            let reply = respond(&command);
            received.push(command);

            if let Some((delay, bytes)) = reply {
                tokio::time::sleep(delay).await;
                if write.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        }
        received
    })
}

fn adapter(client: DuplexStream, timeout_ms: u64) -> ElmAdapter<DuplexStream> {
    ElmAdapter::with_codec(
        client,
        PromptCodec::default(),
        Duration::from_millis(timeout_ms),
    )
}

#[tokio::test(start_paused = true)]
async fn test_initialize_sends_setup_sequence() {
    let (client, server) = duplex(1024);
    let mock = spawn_mock(server, |command| match command {
        "ATZ" => reply(1500, b"\r\rELM327 v1.5\r\r>"),
        _ => reply(0, b"OK\r\r>"),
    });

    let mut elm = adapter(client, 1000);
    elm.initialize().await.unwrap();
    assert_eq!(elm.state(), ExchangeState::Completed);
    drop(elm);

    assert_eq!(mock.await.unwrap(), INIT_SEQUENCE.to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_initialize_reports_failing_command() {
    let (client, server) = duplex(1024);
    let _mock = spawn_mock(server, |command| match command {
        "ATSP6" => None,
        _ => reply(0, b"OK\r\r>"),
    });

    let mut elm = adapter(client, 200);
    let err = elm.initialize().await.unwrap_err();
    match err {
        ProtocolError::Init { command, source } => {
            assert_eq!(command, "ATSP6");
            assert!(matches!(*source, ProtocolError::Timeout { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_engine_data_decodes_all_fields() {
    let (client, server) = duplex(1024);
    let mock = spawn_mock(server, |_| {
        reply(0, b"41 0C 1A F8 0D 3C 04 32 11 4B 05 48 \r\r>")
    });

    let mut elm = adapter(client, 1000);
    let sample = elm.engine_data().await.unwrap();
    assert_eq!(
        (sample.rpm, sample.speed_mph, sample.load, sample.throttle),
        (1726, 37, Some(19), Some(29))
    );
    assert!(sample.timestamp_ms > 0);
    drop(elm);

    assert_eq!(mock.await.unwrap(), vec!["01 0C 0D 04 11 05 4".to_string()]);
}

#[tokio::test]
async fn test_engine_data_without_load_names_load() {
    let (client, server) = duplex(1024);
    let _mock = spawn_mock(server, |_| reply(0, b"410C1AF80D3C114B0548\r\r>"));

    let mut elm = adapter(client, 1000);
    let err = elm.engine_data().await.unwrap_err();
    assert!(err.is_recoverable());
    match err {
        AcquireError::Parse(parse) => {
            assert_eq!(parse, ParseError::MissingPid { field: EngineField::Load });
            assert!(parse.to_string().contains("load"), "{parse}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_without_prompt() {
    let (client, server) = duplex(1024);
    // Partial response, never terminated
    let _mock = spawn_mock(server, |_| reply(0, b"41 0C 1A"));

    let mut elm = adapter(client, 50);
    let err = elm.exchange("010C").await.unwrap_err();
    assert!(
        matches!(err, ProtocolError::Timeout { ref command, timeout_ms: 50 } if command == "010C"),
        "{err}"
    );
    assert!(err.is_recoverable());
    assert_eq!(elm.state(), ExchangeState::TimedOut);
    assert_eq!(elm.counters(), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn test_late_response_is_never_delivered() {
    let (client, server) = duplex(1024);
    let mut calls = 0;
    let _mock = spawn_mock(server, move |_| {
        calls += 1;
        if calls == 1 {
            reply(100, b"41 0D 11\r\r>")
        } else {
            reply(0, b"41 0D 22\r\r>")
        }
    });

    let mut elm = adapter(client, 50);
    assert!(matches!(
        elm.exchange("010D").await,
        Err(ProtocolError::Timeout { .. })
    ));

    // Let the late reply land in the transport
    tokio::time::sleep(Duration::from_millis(150)).await;

    let response = elm.exchange("010D").await.unwrap();
    assert_eq!(response, "410D22");
    assert_eq!(elm.state(), ExchangeState::Completed);
}

#[tokio::test]
async fn test_oversized_response_is_rejected() {
    let (client, server) = duplex(4096);
    let mut calls = 0;
    let _mock = spawn_mock(server, move |_| {
        calls += 1;
        if calls == 1 {
            reply(0, &[b'A'; 300])
        } else {
            reply(0, b"41 0C 1A F8\r\r>")
        }
    });

    let mut elm = ElmAdapter::with_codec(
        client,
        PromptCodec::default().with_max_len(128),
        Duration::from_millis(1000),
    );
    let err = elm.exchange("010C").await.unwrap_err();
    assert!(matches!(err, ProtocolError::BufferOverflow(_)), "{err}");
    assert!(err.is_recoverable());

    // The adapter stays usable after the garbage is thrown away
    let response = elm.exchange("010C").await.unwrap();
    assert_eq!(response, "410C1AF8");
    assert!(elm.is_connected());
    assert_eq!(elm.state(), ExchangeState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_write_times_out() {
    // Nobody reads the far end, so the command cannot be written out
    let (client, _server) = duplex(4);

    let mut elm = adapter(client, 50);
    let err = elm.exchange("01 0C 0D 04 11 05 4").await.unwrap_err();
    assert!(
        matches!(err, ProtocolError::Timeout { timeout_ms: 50, .. }),
        "{err}"
    );
    assert_eq!(elm.state(), ExchangeState::TimedOut);
    assert_eq!(elm.counters(), (1, 1));
    assert!(elm.is_connected());
}

/// Sink that keeps rows in memory and stops the session after `limit` rows
struct StopAfter {
    rows: Vec<(i32, i32)>,
    limit: usize,
    shutdown: ShutdownFlag,
}

impl RowSink for StopAfter {
    fn write_row(&mut self, record: &LogRecord) -> Result<(), DatalogError> {
        self.rows.push((record.rpm, record.speed_mph));
        if self.rows.len() >= self.limit {
            self.shutdown.stop();
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DatalogError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_skips_bad_cycles_from_adapter() {
    let (client, server) = duplex(1024);
    let mut calls = 0;
    let _mock = spawn_mock(server, move |_| {
        calls += 1;
        match calls {
            1 => None,
            // Load missing
            2 => reply(0, b"410C1AF80D3C114B0548\r\r>"),
            _ => reply(0, b"41 0C 1A F8 0D 3C 04 32 11 4B 05 48\r\r>"),
        }
    });

    let profile = Arc::new(RatioProfile::new(vec![4.0, 2.5, 1.5, 1.0], 3.0, 79.0, 800, 7000));
    let shutdown = ShutdownFlag::new();
    let mut source = TelemetrySource::Adapter(adapter(client, 50));
    let mut estimator = GearEstimator::direct(profile.clone());
    let matcher = RevMatcher::new(profile);
    let mut sink = StopAfter {
        rows: Vec::new(),
        limit: 2,
        shutdown: shutdown.clone(),
    };

    let stats = acquisition::run(&mut source, &mut estimator, &matcher, &mut sink, &shutdown)
        .await
        .unwrap();

    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.parse_errors, 1);
    assert_eq!(stats.accepted, 2);
    assert_eq!(sink.rows, vec![(1726, 37), (1726, 37)]);
    assert!(source.is_connected());
}
