//! Connection management
//!
//! Owns the link to the INSEN device and exposes the four protocol queries.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    parser, ChannelStats, Command, CommandChannel, InsenError, SerialTransport, Transport,
};
use crate::config::ClientConfig;
use crate::controller::{ControllerInfo, ControllerState, FirmwareInfo, SystemStatus, MAX_CONTROLLERS};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No port held
    Disconnected,
    /// Port open and ready for commands
    Connected,
}

/// Client for one INSEN device.
///
/// All queries require a connection and fail with
/// [`InsenError::InvalidParam`] otherwise, without touching the port.
/// Errors are never retried here; the protocol carries no request ids, so
/// resending a command is only safe when the caller knows it is idempotent.
pub struct InsenClient {
    config: ClientConfig,
    channel: Option<CommandChannel>,
}

impl InsenClient {
    /// Create a client (not yet connected)
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            channel: None,
        }
    }

    /// Create a client and connect to `port_name` with default settings
    pub fn open(port_name: &str) -> Result<Self, InsenError> {
        let mut client = Self::new(ClientConfig::new(port_name));
        client.connect()?;
        Ok(client)
    }

    /// Settings this client was created with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        if self.channel.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Shorthand for `state() == ConnectionState::Connected`
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Traffic counters for the current connection
    pub fn stats(&self) -> Option<ChannelStats> {
        self.channel.as_ref().map(|c| c.stats())
    }

    /// Open the configured serial port and connect
    pub fn connect(&mut self) -> Result<(), InsenError> {
        if self.is_connected() {
            return Err(InsenError::InvalidParam("already connected".to_string()));
        }
        if self.config.port_name.is_empty() {
            return Err(InsenError::InvalidParam("no port name configured".to_string()));
        }

        let transport = SerialTransport::open(
            &self.config.port_name,
            self.config.baud_rate,
            self.config.port_read_timeout(),
        )?;
        self.connect_with(Box::new(transport))
    }

    /// Connect over an already opened transport
    pub fn connect_with(&mut self, transport: Box<dyn Transport>) -> Result<(), InsenError> {
        if self.is_connected() {
            return Err(InsenError::InvalidParam("already connected".to_string()));
        }

        let mut channel = CommandChannel::new(transport)
            .with_timeout(self.config.command_timeout())
            .with_buffer_size(self.config.response_buffer);

        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            debug!(
                settle_ms = settle.as_millis() as u64,
                "waiting for device after port open"
            );
            std::thread::sleep(settle);
        }
        // Drop anything the device printed while booting
        channel.clear()?;

        info!(port = channel.transport_name(), "connected to INSEN device");
        self.channel = Some(channel);
        Ok(())
    }

    /// Release the port. Calling this when already disconnected is a no-op.
    pub fn disconnect(&mut self) {
        if let Some(channel) = self.channel.take() {
            info!(
                port = channel.transport_name(),
                commands = channel.stats().commands,
                "disconnected from INSEN device"
            );
        }
    }

    fn send(&mut self, command: Command) -> Result<String, InsenError> {
        let channel = self.channel.as_mut().ok_or_else(InsenError::not_connected)?;
        channel.send(&command.text())
    }

    /// Query firmware identification (`INFO`)
    pub fn get_firmware_info(&mut self) -> Result<FirmwareInfo, InsenError> {
        let response = self.send(Command::Info)?;
        Ok(parser::parse_firmware_info(&response))
    }

    /// Query device counters (`STATUS`)
    pub fn get_status(&mut self) -> Result<SystemStatus, InsenError> {
        let response = self.send(Command::Status)?;
        Ok(parser::parse_status(&response))
    }

    /// List connected controllers (`LIST`)
    pub fn list_controllers(&mut self) -> Result<Vec<ControllerInfo>, InsenError> {
        let response = self.send(Command::List)?;
        parser::parse_controller_list(&response)
    }

    /// Fetch one input snapshot (`GET <id>`).
    ///
    /// An empty slot yields [`InsenError::ControllerDisconnected`]; polling
    /// callers should skip the id rather than treat it as a link failure.
    pub fn get_controller_input(&mut self, id: u8) -> Result<ControllerState, InsenError> {
        if id >= MAX_CONTROLLERS {
            return Err(InsenError::InvalidParam(format!(
                "controller id {} out of range 0..{}",
                id, MAX_CONTROLLERS
            )));
        }

        let response = self.send(Command::Get(id))?;
        let mut state = match parser::parse_controller_input(&response) {
            Err(InsenError::ControllerDisconnected(_)) => {
                return Err(InsenError::ControllerDisconnected(id))
            }
            other => other?,
        };
        if state.id != id {
            warn!(requested = id, echoed = state.id, "controller id mismatch in reply");
            state.id = id;
        }
        Ok(state)
    }
}

impl Drop for InsenClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
