//! Protocol commands
//!
//! The fixed command set understood by the INSEN firmware.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Line terminator appended to every command
pub const LINE_TERMINATOR: &str = "\r\n";

/// Commands for the INSEN firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Firmware identification (`INFO`)
    Info,

    /// Device counters (`STATUS`)
    Status,

    /// Connected controllers (`LIST`)
    List,

    /// Input snapshot for one controller slot (`GET <id>`)
    Get(u8),
}

impl Command {
    /// Command text without terminator
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Convert command to bytes, appending CR LF for transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}{}", self, LINE_TERMINATOR).into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Info => f.write_str("INFO"),
            Command::Status => f.write_str("STATUS"),
            Command::List => f.write_str("LIST"),
            Command::Get(id) => write!(f, "GET {}", id),
        }
    }
}
