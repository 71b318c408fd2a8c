use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use super::serial::{clear_buffers, configure_port, open_port};
use super::InsenError;

/// Interval between readiness checks while waiting for a reply
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Byte-level link to the INSEN device.
///
/// The handle is released when the transport is dropped.
pub trait Transport: Send {
    /// Write bytes, returning how many were accepted
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Block until at least one byte is readable or `timeout` expires.
    /// Returns `Ok(false)` on expiry.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read whatever is available into `buf`
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard buffered input and output
    fn clear(&mut self) -> io::Result<()>;

    /// Human-readable name of the underlying device
    fn name(&self) -> &str;
}

/// Serial port transport
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialTransport {
    /// Open `name` at `baud_rate`, configure raw 8N1 and flush stale bytes
    pub fn open(name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, InsenError> {
        let mut port = open_port(name, baud_rate, read_timeout)?;
        configure_port(port.as_mut())?;
        clear_buffers(port.as_mut())?;
        Ok(Self::new(port, name))
    }

    /// Wrap a port that is already open and configured
    pub fn new(port: Box<dyn SerialPort>, name: impl Into<String>) -> Self {
        Self {
            port,
            name: name.into(),
        }
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.port.write(data)?;
        self.port.flush()?;
        Ok(n)
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let available = self
                .port
                .bytes_to_read()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            if available > 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn clear(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
