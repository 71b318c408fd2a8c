//! Client configuration
//!
//! Settings can be built in code or loaded from a JSON file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::{
    InsenError, DEFAULT_BAUD_RATE, DEFAULT_PORT_READ_TIMEOUT_MS, DEFAULT_RESPONSE_BUFFER,
    DEFAULT_TIMEOUT_MS,
};

/// Connection settings for [`InsenClient`](crate::InsenClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub port_name: String,
    /// Line speed; the firmware runs at 115200
    pub baud_rate: u32,
    /// Wait for a reply to start arriving
    pub command_timeout_ms: u64,
    /// Blocking read timeout on the port itself
    pub port_read_timeout_ms: u64,
    /// Pause after opening the port before the first command
    pub settle_delay_ms: u64,
    /// Reply buffer size in bytes
    pub response_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            command_timeout_ms: DEFAULT_TIMEOUT_MS,
            port_read_timeout_ms: DEFAULT_PORT_READ_TIMEOUT_MS,
            settle_delay_ms: 100,
            response_buffer: DEFAULT_RESPONSE_BUFFER,
        }
    }
}

impl ClientConfig {
    /// Default settings for the given port
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Default::default()
        }
    }

    /// Set the reply wait bound
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the pause between opening the port and the first command
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Reply wait bound
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Timeout for a single blocking port read
    pub fn port_read_timeout(&self) -> Duration {
        Duration::from_millis(self.port_read_timeout_ms)
    }

    /// Pause after opening the port
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Load settings from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, InsenError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write settings as pretty-printed JSON
    pub fn save_json_file(&self, path: impl AsRef<Path>) -> Result<(), InsenError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
