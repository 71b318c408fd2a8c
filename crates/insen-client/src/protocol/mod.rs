//! Serial Protocol Communication
//!
//! Implements the INSEN line protocol: `\r\n`-terminated ASCII commands
//! answered by a single `|`-delimited reply line.

pub mod channel;
mod client;
pub mod commands;
mod error;
pub mod parser;
pub mod serial;
pub mod transport;

pub use channel::{ChannelStats, CommandChannel};
pub use client::{ConnectionState, InsenClient};
pub use commands::Command;
pub use error::InsenError;
pub use serial::{list_ports, PortInfo};
pub use transport::{SerialTransport, Transport};

/// Baud rate of the INSEN USB-host MCU
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// How long to wait for a reply to start arriving, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Per-call blocking read timeout on the serial port, in milliseconds
pub const DEFAULT_PORT_READ_TIMEOUT_MS: u64 = 1000;

/// Reply buffer size; INSEN replies are well below this
pub const DEFAULT_RESPONSE_BUFFER: usize = 512;
