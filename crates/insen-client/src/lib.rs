//! # INSEN Client Library
//!
//! Host-side client for the INSEN USB-host controller aggregator.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial transport setup (115200 8N1, raw)
//! - Command/response exchange with timeout handling
//! - Parsing of the `INFO`, `STATUS`, `LIST` and `GET` replies
//! - Background polling of controller input
//! - A simulated device for running without hardware
//!
//! ## Example
//!
//! ```rust,no_run
//! use insen_client::{ClientConfig, InsenClient};
//!
//! let mut client = InsenClient::new(ClientConfig::new("/dev/ttyUSB0"));
//! client.connect()?;
//!
//! println!("{}", client.get_firmware_info()?);
//! for controller in client.list_controllers()? {
//!     println!("{}: {}", controller.id, controller.controller_type);
//! }
//!
//! match client.get_controller_input(0) {
//!     Ok(state) => println!("{}", state),
//!     Err(e) if e.is_disconnected() => println!("slot 0 is empty"),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), insen_client::InsenError>(())
//! ```

pub mod config;
pub mod controller;
pub mod demo;
pub mod monitor;
pub mod protocol;

pub use config::ClientConfig;
pub use controller::{
    Buttons, ControllerInfo, ControllerState, Dpad, FirmwareInfo, Stick, SystemStatus,
    DEFAULT_DEADZONE, MAX_CONTROLLERS,
};
pub use demo::DemoDevice;
pub use monitor::{Monitor, MonitorConfig, SnapshotStore};
pub use protocol::{ConnectionState, InsenClient, InsenError, Transport};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ClientConfig;
    pub use crate::controller::{Buttons, ControllerState, Dpad, FirmwareInfo, SystemStatus};
    pub use crate::monitor::{Monitor, MonitorConfig};
    pub use crate::protocol::{InsenClient, InsenError, Transport};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
