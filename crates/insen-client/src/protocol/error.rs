//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the INSEN firmware
#[derive(Error, Debug)]
pub enum InsenError {
    /// Bad argument, or the client is not in a state to run the operation
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// The port could not be opened or configured
    #[error("Failed to open serial port {port}: {reason}")]
    PortOpen {
        /// Port name as given by the caller
        port: String,
        /// Error reported by the OS
        reason: String,
    },

    /// Writing a command failed or wrote nothing
    #[error("Serial write error: {0}")]
    Write(String),

    /// Reading a reply failed or returned nothing
    #[error("Serial read error: {0}")]
    Read(String),

    /// No reply within the command timeout
    #[error("Communication timeout")]
    Timeout,

    /// Reply did not start with the expected tag token
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// The firmware reports no controller in the requested slot
    #[error("Controller {0} disconnected")]
    ControllerDisconnected(u8),

    /// Config file is not valid JSON
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Config file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InsenError {
    pub(crate) fn not_connected() -> Self {
        InsenError::InvalidParam("not connected to INSEN device".to_string())
    }

    /// Numeric error code as used by the firmware's C client library.
    ///
    /// Configuration and generic I/O errors have no firmware counterpart and
    /// map to `-1` (invalid parameter) and `-4` (read) respectively.
    pub fn code(&self) -> i32 {
        match self {
            InsenError::InvalidParam(_) | InsenError::Config(_) => -1,
            InsenError::PortOpen { .. } => -2,
            InsenError::Write(_) => -3,
            InsenError::Read(_) | InsenError::Io(_) => -4,
            InsenError::Timeout => -5,
            InsenError::InvalidResponse(_) => -6,
            InsenError::ControllerDisconnected(_) => -7,
        }
    }

    /// Short description for a numeric error code
    pub fn describe_code(code: i32) -> &'static str {
        match code {
            0 => "Success",
            -1 => "Invalid parameter",
            -2 => "Failed to open serial port",
            -3 => "Serial write error",
            -4 => "Serial read error",
            -5 => "Communication timeout",
            -6 => "Invalid response format",
            -7 => "Controller disconnected",
            _ => "Unknown error",
        }
    }

    /// True for the expected, non-fatal "no controller in this slot" condition
    pub fn is_disconnected(&self) -> bool {
        matches!(self, InsenError::ControllerDisconnected(_))
    }

    /// True for errors that indicate the link itself is unhealthy.
    /// Callers should `disconnect` and optionally reconnect.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            InsenError::PortOpen { .. }
                | InsenError::Write(_)
                | InsenError::Read(_)
                | InsenError::Io(_)
        )
    }
}
