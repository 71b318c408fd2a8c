//! Serial port handling
//!
//! Port discovery and 8N1 raw-mode setup for the INSEN USB-host MCU.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;

use tracing::debug;

use super::InsenError;

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb_info) => Self {
                name: info.port_name,
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                manufacturer: usb_info.manufacturer,
                product: usb_info.product,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// Device families in discovery order. INSEN boards enumerate as USB CDC
/// (`ttyACM*`); bridge adapters (`ttyUSB*`) come next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PortFamily {
    CdcAcm,
    UsbSerial,
    Other,
}

/// Ordering key: family, then device number, then name
fn port_order(name: &str) -> (PortFamily, u32, &str) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let numbered = |family, rest: &str| (family, rest.parse().unwrap_or(u32::MAX), basename);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        numbered(PortFamily::CdcAcm, rest)
    } else if let Some(rest) = basename.strip_prefix("ttyUSB") {
        numbered(PortFamily::UsbSerial, rest)
    } else {
        (PortFamily::Other, 0, basename)
    }
}

fn sort_ports(ports: &mut [PortInfo]) {
    ports.sort_by(|a, b| port_order(&a.name).cmp(&port_order(&b.name)));
}

/// Serial ports an INSEN device could be attached to, CDC ports first
pub fn list_ports() -> Vec<PortInfo> {
    let mut found: HashMap<String, PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| {
            let port = PortInfo::from(info);
            (port.name.clone(), port)
        })
        .collect();

    // CDC devices can be missing from enumeration right after plug-in
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        let names = entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("ttyACM") || name.starts_with("ttyUSB"));
        for name in names {
            let path = format!("/dev/{}", name);
            found
                .entry(path.clone())
                .or_insert_with(|| PortInfo::bare(path));
        }
    }

    let mut ports: Vec<PortInfo> = found.into_values().collect();
    sort_ports(&mut ports);
    ports
}

/// Open a serial port. `read_timeout` bounds each blocking read call.
pub fn open_port(
    name: &str,
    baud_rate: u32,
    read_timeout: Duration,
) -> Result<Box<dyn SerialPort>, InsenError> {
    serialport::new(name, baud_rate)
        .timeout(read_timeout)
        .open()
        .map_err(|e| InsenError::PortOpen {
            port: name.to_string(),
            reason: e.to_string(),
        })
}

/// Configure a serial port for raw 8N1 without flow control
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), InsenError> {
    let name = port.name().unwrap_or_default();
    let config_err = |e: serialport::Error| InsenError::PortOpen {
        port: name.clone(),
        reason: e.to_string(),
    };
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(config_err)?;
    port.set_parity(serialport::Parity::None).map_err(config_err)?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(config_err)?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(config_err)?;

    // Some USB-serial bridges hold the MCU in reset while DTR is low
    if let Err(e) = port.write_data_terminal_ready(true) {
        debug!("configure_port: failed to set DTR high: {} (continuing)", e);
    }

    Ok(())
}

/// Discard any bytes buffered in either direction
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), InsenError> {
    port.clear(serialport::ClearBuffer::All)
        .map_err(|e| InsenError::Read(e.to_string()))
}
