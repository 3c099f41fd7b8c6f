//! Transport implementations for the ITLA control stack: a real serial
//! port (feature `serial`, default on) and an in-memory simulator.

pub mod error;
pub mod sim;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::HwError;
pub use sim::{DeviceState, SharedDevice, SimulatedFactory, SimulatedItla};

#[cfg(feature = "serial")]
pub use serial::{SerialFactory, SerialTransport};
