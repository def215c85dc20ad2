//! Adapter connection
//!
//! Drives request/response exchanges with the adapter over any async byte
//! transport: a serial port in the field, an in-memory duplex pipe in tests.

use std::fmt;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{timeout_at, Instant};
use tokio_util::codec::Framed;
use tracing::{debug, info};

use super::{
    commands::{ENGINE_DATA, INIT_SEQUENCE, RESET},
    parse_engine_data, PromptCodec, ProtocolError, DEFAULT_TIMEOUT_MS, RESET_TIMEOUT_MS,
};
use crate::telemetry::{now_millis, AcquireError, Sample};

/// Where the most recent exchange got to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// No exchange has run yet
    Idle,
    /// Command written, nothing read yet
    Sent,
    /// Waiting for the prompt
    AwaitingResponse,
    /// Response received
    Completed,
    /// The timer fired first; the read was cancelled
    TimedOut,
    /// The exchange failed for another reason
    Failed,
}

/// ELM327 adapter driver
pub struct ElmAdapter<T> {
    framed: Framed<T, PromptCodec>,
    timeout: Duration,
    echo: bool,
    state: ExchangeState,
    /// A timed-out response may still be in flight
    stale: bool,
    /// The framed stream reported an error and will yield one `None`
    /// before it resumes reading
    resync: bool,
    connected: bool,
    exchanges: u64,
    timeouts: u64,
}

impl<T> fmt::Debug for ElmAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElmAdapter")
            .field("timeout", &self.timeout)
            .field("state", &self.state)
            .field("connected", &self.connected)
            .field("exchanges", &self.exchanges)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl<T> ElmAdapter<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a transport using the `>` prompt and the default timeout
    pub fn new(transport: T) -> Self {
        Self::with_codec(
            transport,
            PromptCodec::default(),
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
        )
    }

    /// Wrap a transport with a custom codec and exchange timeout
    pub fn with_codec(transport: T, codec: PromptCodec, timeout: Duration) -> Self {
        Self {
            framed: Framed::new(transport, codec),
            timeout,
            echo: false,
            state: ExchangeState::Idle,
            stale: false,
            resync: false,
            connected: true,
            exchanges: 0,
            timeouts: 0,
        }
    }

    /// Log every response at debug level
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// State of the most recent exchange
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// False once the transport has reported end-of-stream or an I/O error
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Total exchanges attempted and how many of them timed out
    pub fn counters(&self) -> (u64, u64) {
        (self.exchanges, self.timeouts)
    }

    /// Send the setup sequence. Any failure leaves the adapter unusable.
    pub async fn initialize(&mut self) -> Result<(), ProtocolError> {
        for command in INIT_SEQUENCE {
            let timeout = if command == RESET {
                self.timeout.max(Duration::from_millis(RESET_TIMEOUT_MS))
            } else {
                self.timeout
            };

            match self.exchange_with_timeout(command, timeout).await {
                Ok(response) => info!(command, %response, "adapter setup"),
                Err(e) => {
                    return Err(ProtocolError::Init {
                        command: command.to_string(),
                        source: Box::new(e),
                    })
                }
            }
        }
        Ok(())
    }

    /// Send `command` and wait for the prompt, using the configured timeout
    pub async fn exchange(&mut self, command: &str) -> Result<String, ProtocolError> {
        self.exchange_with_timeout(command, self.timeout).await
    }

    /// Send `command` and race the exchange against `timeout`.
    ///
    /// The write and the read share one deadline. On timeout the pending
    /// future is dropped and whatever part of the response had arrived is
    /// discarded.
    pub async fn exchange_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, ProtocolError> {
        if self.stale {
            self.discard_pending().await;
        }
        self.exchanges += 1;
        let deadline = Instant::now() + timeout;

        self.state = ExchangeState::Sent;
        match timeout_at(deadline, self.framed.send(command.to_string())).await {
            Err(_) => return Err(self.timed_out(command, timeout)),
            Ok(Err(e)) => return Err(self.fail(e)),
            Ok(Ok(())) => {}
        }

        self.state = ExchangeState::AwaitingResponse;
        match timeout_at(deadline, self.next_frame()).await {
            Err(_) => Err(self.timed_out(command, timeout)),
            Ok(None) => Err(self.fail(ProtocolError::Disconnected)),
            Ok(Some(Err(e))) => {
                self.stale = true;
                Err(self.fail(e))
            }
            Ok(Some(Ok(response))) => {
                self.state = ExchangeState::Completed;
                if self.echo {
                    debug!(command = command.trim_end(), %response, "adapter response");
                }
                Ok(response)
            }
        }
    }

    /// Request and decode one engine data sample
    pub async fn engine_data(&mut self) -> Result<Sample, AcquireError> {
        let response = self.exchange(ENGINE_DATA).await?;
        let reading = parse_engine_data(&response)?;
        Ok(reading.into_sample(now_millis()))
    }

    /// Next decoded frame, skipping the pause marker that follows an error
    async fn next_frame(&mut self) -> Option<Result<String, ProtocolError>> {
        loop {
            match self.framed.next().await {
                None if self.resync => self.resync = false,
                Some(Err(e)) => {
                    self.resync = true;
                    return Some(Err(e));
                }
                other => return other,
            }
        }
    }

    fn timed_out(&mut self, command: &str, timeout: Duration) -> ProtocolError {
        self.state = ExchangeState::TimedOut;
        self.stale = true;
        self.timeouts += 1;
        self.framed.read_buffer_mut().clear();
        self.framed.write_buffer_mut().clear();
        ProtocolError::Timeout {
            command: command.trim_end().to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    fn fail(&mut self, error: ProtocolError) -> ProtocolError {
        self.state = ExchangeState::Failed;
        if matches!(
            error,
            ProtocolError::Disconnected | ProtocolError::IoError(_)
        ) {
            self.connected = false;
        }
        error
    }

    /// Drop responses to earlier, timed-out or garbled commands that have
    /// arrived since
    async fn discard_pending(&mut self) {
        // Timeout polls the inner future before the timer, so a zero
        // duration yields only frames that are already readable
        loop {
            match tokio::time::timeout(Duration::ZERO, self.next_frame()).await {
                Ok(Some(Ok(late))) => debug!(response = %late, "discarding late response"),
                Ok(Some(Err(ProtocolError::BufferOverflow(_)))) => {}
                _ => break,
            }
        }
        self.framed.read_buffer_mut().clear();
        self.stale = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn test_exchange_strips_padding() {
        let (client, server) = duplex(256);
        let mut adapter = ElmAdapter::new(client);

        let responder = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read);
            let mut command = Vec::new();
            lines.read_until(b'\r', &mut command).await.unwrap();
            write.write_all(b"41 0D 3C \r\r>").await.unwrap();
            command
        });

        let response = adapter.exchange("010D").await.unwrap();
        assert_eq!(response, "410D3C");
        assert_eq!(adapter.state(), ExchangeState::Completed);
        assert_eq!(responder.await.unwrap(), b"010D\r");
    }

    #[tokio::test]
    async fn test_closed_transport_is_disconnected() {
        let (client, server) = duplex(64);
        drop(server);
        let mut adapter = ElmAdapter::new(client);

        let err = adapter.exchange("ATZ").await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Disconnected | ProtocolError::IoError(_)
        ));
        assert!(!adapter.is_connected());
        assert_eq!(adapter.state(), ExchangeState::Failed);
    }
}
