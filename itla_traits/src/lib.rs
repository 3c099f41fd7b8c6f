pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// Blocking byte channel to an ITLA module (a serial port in production).
///
/// The protocol layer owns the transport exclusively; implementations do not
/// need to be thread-safe beyond `Send`.
pub trait Transport {
    /// Write the whole buffer to the device.
    fn write_all(
        &mut self,
        bytes: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Read exactly `buf.len()` bytes, blocking up to `timeout`.
    ///
    /// A timeout must surface as an error whose display contains "timeout"
    /// (or a typed `itla_hardware::HwError::Timeout`), never as a short read.
    fn read_exact(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Opens a [`Transport`] at a given baud rate.
///
/// Baud auto-detection reopens the channel once per ladder rung, so the
/// connect path needs an opener rather than a ready transport.
pub trait TransportFactory {
    fn open(
        &self,
        baud: u32,
    ) -> Result<Box<dyn Transport + Send>, Box<dyn std::error::Error + Send + Sync>>;
}
