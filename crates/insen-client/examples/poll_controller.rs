//! INSEN Controller Polling Tool
//!
//! Connects to an INSEN device (or the built-in simulator), prints device
//! information and then streams significant controller input.
//!
//! Usage:
//!   cargo run --example poll_controller -- [OPTIONS] [PORT]
//!
//! Options:
//!   --port PORT       Serial port (default: /dev/ttyUSB0)
//!   --config FILE     Load client settings from a JSON file
//!   --ids LIST        Comma-separated controller ids to poll (default: 0)
//!   --fps N           Poll rate in Hz (default: 60)
//!   --seconds N       How long to monitor (default: 30)
//!   --demo            Use the simulated device instead of a serial port
//!   --list-ports      Print available serial ports and exit
//!
//! Set RUST_LOG=insen_client=debug to see protocol traffic.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use insen_client::protocol::list_ports;
use insen_client::{
    ClientConfig, DemoDevice, InsenClient, Monitor, MonitorConfig, DEFAULT_DEADZONE,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = ClientConfig::new("/dev/ttyUSB0");
    let mut monitor_config = MonitorConfig::default();
    let mut seconds = 30u64;
    let mut demo = false;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--port" | "-p" => {
                config.port_name = value.context("--port needs a value")?.clone();
                i += 1;
            }
            "--config" | "-c" => {
                let path = value.context("--config needs a value")?;
                config = ClientConfig::from_json_file(path)
                    .with_context(|| format!("loading {}", path))?;
                i += 1;
            }
            "--ids" => {
                monitor_config.controller_ids = value
                    .context("--ids needs a value")?
                    .split(',')
                    .map(|id| id.trim().parse::<u8>())
                    .collect::<Result<_, _>>()
                    .context("invalid controller id")?;
                i += 1;
            }
            "--fps" => {
                monitor_config.rate_hz = value.context("--fps needs a value")?.parse()?;
                i += 1;
            }
            "--seconds" => {
                seconds = value.context("--seconds needs a value")?.parse()?;
                i += 1;
            }
            "--demo" => demo = true,
            "--list-ports" => {
                for port in list_ports() {
                    println!(
                        "{}  {}",
                        port.name,
                        port.product.as_deref().unwrap_or("")
                    );
                }
                return Ok(());
            }
            other if !other.starts_with('-') => config.port_name = other.to_string(),
            other => bail!("unknown option {}", other),
        }
        i += 1;
    }

    let mut client = InsenClient::new(config);
    if demo {
        client.connect_with(Box::new(DemoDevice::new()))?;
    } else {
        client.connect()?;
    }

    println!("{}", client.get_firmware_info()?);
    let status = client.get_status()?;
    println!(
        "Status: {} active, {} inputs, {} commands, {} bytes free",
        status.active_controllers, status.total_inputs, status.api_commands, status.free_heap
    );
    for controller in client.list_controllers()? {
        println!("Controller {}: {}", controller.id, controller.controller_type);
    }

    println!(
        "Monitoring controllers {:?} at {} Hz for {} seconds...",
        monitor_config.controller_ids, monitor_config.rate_hz, seconds
    );

    let client = Arc::new(Mutex::new(client));
    let (mut monitor, rx) = Monitor::start(Arc::clone(&client), monitor_config)?;

    let deadline = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < deadline && monitor.is_running() {
        if let Ok(state) = rx.recv_timeout(Duration::from_millis(100)) {
            if state.has_significant_input(DEFAULT_DEADZONE) {
                println!("{}", state);
            }
        }
    }

    if !monitor.stop() {
        bail!("monitor thread did not stop; leaving port open");
    }
    if let Ok(mut client) = client.lock() {
        client.disconnect();
    }
    Ok(())
}
