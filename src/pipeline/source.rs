//! Line source abstraction for sensor bridge input.
//!
//! Provides a unified trait for reading raw JSON lines from different
//! channels: stdin, a device/file path (serial tty configured externally,
//! or a recorded capture) and TCP (a bridge exposing the serial stream).
//! Sources deliver text only; decoding happens inside the session so that
//! a bad line never touches pipeline state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Events produced by a line source.
#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// One non-empty line, trailing newline removed.
    Line(String),
    /// Source reached end of data (EOF, or a permanent disconnect).
    Eof,
}

/// Trait abstracting where input lines come from.
///
/// Implementations handle framing and reconnection internally. The reader
/// task calls [`next_line`](LineSource::next_line) in a `select!` with
/// cancellation.
#[async_trait]
pub trait LineSource: Send + 'static {
    /// Read the next line.
    ///
    /// Returns `LineEvent::Eof` when no more data is available.
    /// Returns `Err` on unrecoverable errors.
    async fn next_line(&mut self) -> Result<LineEvent>;

    /// Human-readable name for logging (e.g. "stdin", "device", "TCP").
    fn source_name(&self) -> &str;
}

/// Turn one raw line into text, or `None` when it is blank.
///
/// Invalid UTF-8 is replaced rather than rejected so the decoder discards
/// the line and the stream carries on.
fn frame_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();
    (!line.is_empty()).then(|| line.to_string())
}

// ============================================================================
// Reader Source (stdin / device / capture file)
// ============================================================================

/// Reads newline-delimited text from any async buffered reader.
pub struct ReaderSource<R> {
    reader: R,
    name: String,
    line_buffer: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin + Send + 'static> ReaderSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            line_buffer: Vec::with_capacity(256),
        }
    }
}

/// Line-delimited JSON on stdin:
/// `./sensor_bridge | breath-monitor --stdin`
pub type StdinSource = ReaderSource<BufReader<tokio::io::Stdin>>;

pub fn stdin_source() -> StdinSource {
    ReaderSource::new(BufReader::new(tokio::io::stdin()), "stdin")
}

/// A character device or file: serial tty or recorded capture.
pub type DeviceSource = ReaderSource<BufReader<tokio::fs::File>>;

/// Open a device path once.
pub async fn open_device(path: &Path) -> Result<DeviceSource> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open input device {}", path.display()))?;
    Ok(ReaderSource::new(
        BufReader::new(file),
        format!("device:{}", path.display()),
    ))
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + 'static> LineSource for ReaderSource<R> {
    async fn next_line(&mut self) -> Result<LineEvent> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_until(b'\n', &mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(LineEvent::Eof);
            }
            if let Some(line) = frame_line(&self.line_buffer) {
                return Ok(LineEvent::Line(line));
            }
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// TCP Source
// ============================================================================

/// Reads lines from a TCP bridge.
///
/// A dropped connection is reconnected with exponential backoff; once the
/// attempts are exhausted the source reports `Eof`.
pub struct TcpSource {
    addr: String,
    reader: Option<BufReader<TcpStream>>,
    line_buffer: Vec<u8>,
    reconnect_attempts: u32,
    initial_delay: Duration,
    reconnections: u64,
}

/// Reconnection delay cap.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

impl TcpSource {
    /// Connect once and return a ready source.
    pub async fn connect(addr: &str, reconnect_attempts: u32, initial_delay: Duration) -> Result<Self> {
        let stream = Self::open_stream(addr).await?;
        Ok(Self {
            addr: addr.to_string(),
            reader: Some(BufReader::new(stream)),
            line_buffer: Vec::with_capacity(256),
            reconnect_attempts,
            initial_delay,
            reconnections: 0,
        })
    }

    async fn open_stream(addr: &str) -> Result<TcpStream> {
        tracing::info!(address = %addr, "Connecting to sensor bridge");

        let stream = tokio::time::timeout(Duration::from_secs(10), TcpStream::connect(addr))
            .await
            .with_context(|| format!("Timed out connecting to {addr}"))?
            .with_context(|| format!("Failed to connect to {addr}"))?;

        // Enable TCP keepalive to detect dead bridges
        let sock_ref = socket2::SockRef::from(&stream);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(Duration::from_secs(30))
            .with_interval(Duration::from_secs(10));
        let _ = sock_ref.set_tcp_keepalive(&keepalive);
        let _ = stream.set_nodelay(true);

        tracing::info!(address = %addr, "Sensor bridge connection established");
        Ok(stream)
    }

    /// Reconnect with exponential backoff. Returns `false` when exhausted.
    async fn reconnect(&mut self) -> bool {
        self.reader = None;

        for attempt in 1..=self.reconnect_attempts {
            let delay = backoff_delay(self.initial_delay, attempt).min(MAX_RECONNECT_DELAY);
            tracing::warn!(
                attempt = attempt,
                max_attempts = self.reconnect_attempts,
                delay_ms = delay.as_millis() as u64,
                "Sensor bridge reconnecting after disconnect"
            );
            tokio::time::sleep(delay).await;

            match Self::open_stream(&self.addr).await {
                Ok(stream) => {
                    self.reader = Some(BufReader::new(stream));
                    self.reconnections += 1;
                    tracing::info!(
                        attempt = attempt,
                        total_reconnections = self.reconnections,
                        "Sensor bridge reconnection successful"
                    );
                    return true;
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt, error = %e, "Reconnection attempt failed");
                }
            }
        }

        tracing::error!(
            max_attempts = self.reconnect_attempts,
            "Sensor bridge reconnection exhausted"
        );
        false
    }
}

#[async_trait]
impl LineSource for TcpSource {
    async fn next_line(&mut self) -> Result<LineEvent> {
        loop {
            let Some(reader) = self.reader.as_mut() else {
                return Ok(LineEvent::Eof);
            };

            self.line_buffer.clear();
            let lost = match reader.read_until(b'\n', &mut self.line_buffer).await {
                Ok(0) => {
                    tracing::warn!("Sensor bridge closed the connection");
                    true
                }
                Ok(_) => false,
                Err(e) => {
                    tracing::warn!(error = %e, "Sensor bridge read failed");
                    true
                }
            };

            if lost {
                if !self.reconnect().await {
                    return Ok(LineEvent::Eof);
                }
                continue;
            }

            if let Some(line) = frame_line(&self.line_buffer) {
                return Ok(LineEvent::Line(line));
            }
        }
    }

    fn source_name(&self) -> &str {
        "TCP"
    }
}

// ============================================================================
// Acquisition
// ============================================================================

/// Where to read input from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputChannel {
    Stdin,
    Device(PathBuf),
    Tcp(String),
}

impl std::fmt::Display for InputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputChannel::Stdin => write!(f, "stdin"),
            InputChannel::Device(p) => write!(f, "device {}", p.display()),
            InputChannel::Tcp(addr) => write!(f, "tcp {addr}"),
        }
    }
}

/// `initial * 2^(attempt-1)`
fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    initial.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Retry `open` up to `attempts` times with doubling delay.
///
/// The error of the final attempt is returned when all fail.
pub async fn acquire_with_retry<T, F, Fut>(
    what: &str,
    attempts: u32,
    initial_delay: Duration,
    mut open: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match open().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                let delay = backoff_delay(initial_delay, attempt);
                tracing::warn!(
                    attempt = attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Failed to acquire {}, retrying", what
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e.context(format!("Failed to acquire {what} after {attempts} attempts")));
            }
        }
    }
}

/// Open the configured input channel, retrying at startup.
pub async fn acquire_source(
    channel: &InputChannel,
    attempts: u32,
    initial_delay: Duration,
) -> Result<Box<dyn LineSource>> {
    let what = channel.to_string();
    match channel {
        InputChannel::Stdin => Ok(Box::new(stdin_source())),
        InputChannel::Device(path) => {
            let source = acquire_with_retry(&what, attempts, initial_delay, || open_device(path)).await?;
            Ok(Box::new(source))
        }
        InputChannel::Tcp(addr) => {
            let source = acquire_with_retry(&what, attempts, initial_delay, || {
                TcpSource::connect(addr, attempts, initial_delay)
            })
            .await?;
            Ok(Box::new(source))
        }
    }
}

#[async_trait]
impl LineSource for Box<dyn LineSource> {
    async fn next_line(&mut self) -> Result<LineEvent> {
        (**self).next_line().await
    }

    fn source_name(&self) -> &str {
        (**self).source_name()
    }
}

// ============================================================================
// Reader Task
// ============================================================================

/// Forward lines from `source` into a bounded channel until EOF, error or
/// cancellation. Dropping the sender signals end of input to the tick loop.
///
/// Returns the number of lines forwarded.
pub fn spawn_reader<S: LineSource>(
    mut source: S,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<u64> {
    tokio::spawn(async move {
        let name = source.source_name().to_string();
        let mut forwarded = 0u64;
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                result = source.next_line() => match result {
                    Ok(ev) => ev,
                    Err(e) => {
                        tracing::warn!(source = %name, error = %e, "Input source error");
                        break;
                    }
                },
            };

            match event {
                LineEvent::Line(line) => {
                    if tx.send(line).await.is_err() {
                        // Tick loop is gone
                        break;
                    }
                    forwarded += 1;
                }
                LineEvent::Eof => {
                    tracing::info!(source = %name, lines = forwarded, "Input source reached end");
                    break;
                }
            }
        }
        forwarded
    })
}
