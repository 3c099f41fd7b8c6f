use crate::client::Status;
use itla_config::CalibrationError;
use thiserror::Error;

/// Failures raised by the laser operations. Per-exchange protocol errors are
/// NOT here: those travel as [`Status`] inside each reply so the settle
/// loops stay exception-free.
#[derive(Debug, Error)]
pub enum LaserError {
    #[error("frequency {freq_thz} THz outside tunable range [{min_thz}, {max_thz}] THz")]
    FrequencyOutOfRange {
        freq_thz: f64,
        min_thz: f64,
        max_thz: f64,
    },
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("client is disconnected")]
    Disconnected,
    #[error("device reported {status:?} during {context}")]
    Device {
        status: Status,
        context: &'static str,
    },
    #[error("register {register:#04x} did not switch to AEA string mode (status {status:?})")]
    NotAeaMode { register: u8, status: Status },
    #[error("no jump calibration loaded; configure the .sled/.map files")]
    NoCalibration,
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("cannot open transport: {0}")]
    Port(String),
    #[error("no baud rate produced a valid NOP response (tried {tried:?})")]
    Baud { tried: Vec<u32> },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing protocol client")]
    MissingClient,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
