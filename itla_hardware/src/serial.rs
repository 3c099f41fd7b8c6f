//! Serial-port transport backed by the `serialport` crate.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use itla_traits::{Transport, TransportFactory};
use tracing::trace;

use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn open(path: &str, baud: u32) -> crate::error::Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(250))
            .open()
            .map_err(|e| HwError::Port(format!("{path}: {e}")))?;
        trace!(path, baud, "serial port opened");
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        self.port.write_all(bytes).map_err(HwError::Io)?;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), BoxError> {
        let deadline = Instant::now() + timeout;
        let mut filled = 0;
        while filled < buf.len() {
            let now = Instant::now();
            if now >= deadline {
                return Err(HwError::Timeout.into());
            }
            // Per-read timeout shrinks toward the overall deadline so a
            // trickle of bytes cannot stretch the exchange past it.
            self.port
                .set_timeout(deadline - now)
                .map_err(|e| HwError::Port(e.to_string()))?;
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => return Err(HwError::Port("serial port closed".into()).into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(HwError::Timeout.into());
                }
                Err(e) => return Err(HwError::Io(e).into()),
            }
        }
        Ok(())
    }
}

/// Opens [`SerialTransport`]s on a fixed device path; the baud rate varies
/// per open, as the connect ladder requires.
pub struct SerialFactory {
    path: String,
}

impl SerialFactory {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl TransportFactory for SerialFactory {
    fn open(&self, baud: u32) -> Result<Box<dyn Transport + Send>, BoxError> {
        Ok(Box::new(SerialTransport::open(&self.path, baud)?))
    }
}
