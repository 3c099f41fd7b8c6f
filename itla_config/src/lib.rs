#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration parsing for the ITLA laser controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The calibration loaders parse the vendor `.sled` / `.map` text files and
//!   expose the sled-spacing and frequency interpolation used by clean jump.

pub mod calibration;

pub use calibration::{CalibrationError, MapPoint, MapTable, SLED_CENTER_TEMP_C};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Connection {
    /// Serial device path, e.g. "/dev/ttyUSB0" or "COM12".
    pub port: String,
    /// Baud rate to try first; auto-detection walks the ladder from here.
    pub baud: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Per-exchange response timeout (ms).
    pub exchange_ms: u64,
    /// Interval between register polls in settle/pause loops (ms).
    pub poll_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            exchange_ms: 250,
            poll_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct JumpCfg {
    /// Deadline for the frequency-error settle poll (ms). Best effort.
    pub settle_deadline_ms: u64,
    /// Settled when the residual offset is at or below this (GHz).
    pub settle_tolerance_ghz: f64,
    /// Deadline for the NOP ready wait (ms); expiry logs and falls through.
    pub ready_deadline_ms: u64,
    /// Tunable-range fallback used when the device range registers fail.
    pub freq_min_thz: f64,
    pub freq_max_thz: f64,
}

impl Default for JumpCfg {
    fn default() -> Self {
        Self {
            settle_deadline_ms: 2_000,
            settle_tolerance_ghz: 0.1,
            ready_deadline_ms: 30_000,
            freq_min_thz: 191.5,
            freq_max_thz: 196.25,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SweepCfg {
    /// Sweep amplitude written to the device (GHz).
    pub amplitude_ghz: u16,
    /// Sweep speed written to the device (MHz/s).
    pub speed_mhz_per_s: u16,
    /// Bound on the direction-detection poll in an automatic pause (ms).
    pub direction_timeout_ms: u64,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self {
            amplitude_ghz: 50,
            speed_mhz_per_s: 20_000,
            direction_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Files {
    /// Vendor `.sled` calibration file.
    pub sled: Option<String>,
    /// Vendor `.map` calibration file.
    pub map: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Poller {
    /// Status poll period (ms).
    pub period_ms: u64,
}

impl Default for Poller {
    fn default() -> Self {
        Self { period_ms: 250 }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub connection: Connection,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub jump: JumpCfg,
    #[serde(default)]
    pub sweep: SweepCfg,
    #[serde(default)]
    pub files: Files,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub poller: Poller,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Connection
        if self.connection.port.is_empty() {
            eyre::bail!("connection.port must not be empty");
        }
        const BAUD_LADDER: [u32; 6] = [4_800, 9_600, 19_200, 38_400, 57_600, 115_200];
        if !BAUD_LADDER.contains(&self.connection.baud) {
            eyre::bail!(
                "connection.baud must be one of {:?}, got {}",
                BAUD_LADDER,
                self.connection.baud
            );
        }

        // Timeouts
        if self.timeouts.exchange_ms == 0 {
            eyre::bail!("timeouts.exchange_ms must be >= 1");
        }
        if self.timeouts.exchange_ms > 10_000 {
            eyre::bail!("timeouts.exchange_ms is unreasonably large (>10s)");
        }
        if self.timeouts.poll_ms == 0 {
            eyre::bail!("timeouts.poll_ms must be >= 1");
        }

        // Jump
        if self.jump.settle_tolerance_ghz <= 0.0 {
            eyre::bail!("jump.settle_tolerance_ghz must be > 0");
        }
        if self.jump.freq_min_thz >= self.jump.freq_max_thz {
            eyre::bail!("jump.freq_min_thz must be below jump.freq_max_thz");
        }
        if self.jump.ready_deadline_ms == 0 {
            eyre::bail!("jump.ready_deadline_ms must be >= 1");
        }

        // Sweep: the hardware sweeps at most +-25 GHz around center.
        if self.sweep.amplitude_ghz == 0 || self.sweep.amplitude_ghz > 50 {
            eyre::bail!("sweep.amplitude_ghz must be in [1, 50]");
        }
        if self.sweep.speed_mhz_per_s == 0 {
            eyre::bail!("sweep.speed_mhz_per_s must be >= 1");
        }
        if self.sweep.direction_timeout_ms == 0 {
            eyre::bail!("sweep.direction_timeout_ms must be >= 1");
        }

        // Poller
        if self.poller.period_ms == 0 {
            eyre::bail!("poller.period_ms must be >= 1");
        }

        Ok(())
    }
}
