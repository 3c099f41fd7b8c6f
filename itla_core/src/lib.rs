#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core control logic for Pure Photonics ITLA tunable lasers
//! (hardware-agnostic).
//!
//! All device I/O goes through the `itla_traits::Transport` seam. The crate
//! provides:
//!
//! - **Frame codec**: the 4-byte request/response format with its BIP-4
//!   checksum (`frame` module)
//! - **Protocol client**: FIFO-serialized single-in-flight exchanges, baud
//!   auto-detection, signed decoding, AEA string reads (`client` module)
//! - **Register map**: the fixed vendor register table (`registers` module)
//! - **Laser controller**: power-up/down, clean jump, clean sweep and
//!   telemetry snapshots (`laser`, `jump`, `sweep`, `status` modules)
//! - **Status poller**: background polling thread (`poller` module)
//!
//! ## Error contract
//!
//! Per-exchange failures (timeout, checksum, device status) are values, not
//! exceptions: every `communicate` returns the decoded value together with
//! a [`client::Status`]. The jump and sweep sequences poll registers in
//! tight loops and decide retry vs. abort per iteration; deadlines expire
//! by falling through, and outcomes are read from telemetry.

pub mod client;
pub mod config;
pub mod conversions;
pub mod error;
pub mod frame;
pub mod mocks;
pub mod poller;
pub mod registers;
pub mod status;

mod jump;
mod laser;
mod sweep;

pub use client::{BAUD_LADDER, ItlaClient, Reply, SignedReply, Status};
pub use config::{JumpCfg, LaserCfg, StartupCfg, SweepCfg, Timeouts};
pub use error::{BuildError, ConnectError, LaserError, Report, Result};
pub use frame::Mode;
pub use laser::{JumpCalibration, Laser, LaserBuilder};
pub use poller::StatusPoller;
pub use status::{JumpOutcome, LaserStatus, SweepState};
