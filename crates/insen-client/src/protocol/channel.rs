//! Command/response exchange
//!
//! Frames a command line, waits for the reply and strips its terminator.
//!
//! A reply is taken from a single read. INSEN replies fit comfortably in the
//! default 512-byte buffer; a reply that fills the buffer completely is
//! returned truncated and logged, since nothing on the wire marks where the
//! remainder would begin.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::commands::LINE_TERMINATOR;
use super::transport::Transport;
use super::{InsenError, DEFAULT_RESPONSE_BUFFER, DEFAULT_TIMEOUT_MS};

/// Prompt some firmware builds echo in front of each reply
const PROMPT_PREFIX: &str = ">>> ";

/// Cumulative traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Commands written to the link
    pub commands: u64,
    /// Bytes written, including line terminators
    pub tx_bytes: u64,
    /// Bytes read before any stripping
    pub rx_bytes: u64,
    /// Commands that got no reply in time
    pub timeouts: u64,
}

/// Request/response layer over a [`Transport`]
pub struct CommandChannel {
    transport: Box<dyn Transport>,
    timeout: Duration,
    buffer_size: usize,
    stats: ChannelStats,
}

impl CommandChannel {
    /// Wrap a transport with the default timeout and buffer size
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            buffer_size: DEFAULT_RESPONSE_BUFFER,
            stats: ChannelStats::default(),
        }
    }

    /// Set how long `send` waits for the reply to start arriving
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the reply buffer size (minimum 1 byte)
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Reply wait bound used by [`send`](Self::send)
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Traffic counters since the channel was created
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Name of the underlying port
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Discard anything buffered on the link
    pub fn clear(&mut self) -> Result<(), InsenError> {
        self.transport
            .clear()
            .map_err(|e| InsenError::Read(e.to_string()))
    }

    /// Send `command` and return the reply line without its terminator
    pub fn send(&mut self, command: &str) -> Result<String, InsenError> {
        let frame = format!("{}{}", command, LINE_TERMINATOR);
        debug!(command, "sending command");

        let start = Instant::now();
        self.write_all(frame.as_bytes())?;
        self.stats.commands += 1;
        self.stats.tx_bytes += frame.len() as u64;

        let ready = self
            .transport
            .wait_readable(self.timeout)
            .map_err(|e| InsenError::Read(e.to_string()))?;
        if !ready {
            self.stats.timeouts += 1;
            debug!(
                command,
                timeout_ms = self.timeout.as_millis() as u64,
                "no reply before timeout"
            );
            return Err(InsenError::Timeout);
        }

        let mut buffer = vec![0u8; self.buffer_size];
        let n = self
            .transport
            .read(&mut buffer)
            .map_err(|e| InsenError::Read(e.to_string()))?;
        if n == 0 {
            return Err(InsenError::Read("no data returned".to_string()));
        }
        if n == buffer.len() {
            warn!(
                command,
                buffer_size = self.buffer_size,
                "reply filled the read buffer and may be truncated"
            );
        }
        self.stats.rx_bytes += n as u64;

        let response = clean_response(&String::from_utf8_lossy(&buffer[..n]));
        debug!(
            command,
            response = response.as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "received reply"
        );
        Ok(response)
    }

    fn write_all(&mut self, mut data: &[u8]) -> Result<(), InsenError> {
        while !data.is_empty() {
            match self.transport.write(data) {
                Ok(0) => return Err(InsenError::Write("no bytes written".to_string())),
                Ok(n) => data = &data[n..],
                Err(e) => return Err(InsenError::Write(e.to_string())),
            }
        }
        Ok(())
    }
}

/// Strip at most one trailing `\n`, then at most one trailing `\r`, and the
/// console prompt if present
fn clean_response(raw: &str) -> String {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.strip_prefix(PROMPT_PREFIX).unwrap_or(line).to_string()
}
