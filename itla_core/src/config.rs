//! Runtime configuration for the protocol client and laser controller.
//!
//! These are plain structs used by `ItlaClient` and `Laser`; they are
//! separate from the TOML-deserialized config in `itla_config`, which the
//! CLI converts at startup.

use std::time::Duration;

/// Exchange and polling cadence.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Per-exchange response timeout. The device answers well inside this
    /// at any supported baud rate.
    pub exchange: Duration,
    /// Interval between register reads in settle/pause loops.
    pub poll: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            exchange: Duration::from_millis(250),
            poll: Duration::from_millis(100),
        }
    }
}

/// Clean-jump sequencing knobs.
#[derive(Debug, Clone, Copy)]
pub struct JumpCfg {
    /// Hardware settling delay after the sled/current writes, before the
    /// trigger sequence. Fixed requirement, not polled.
    pub pre_trigger_delay: Duration,
    /// Deadline for the frequency-error settle poll. Best effort: expiry
    /// falls through to the NOP wait.
    pub settle_deadline: Duration,
    /// Settled once the residual offset is at or below this (GHz).
    pub settle_tolerance_ghz: f64,
    /// Deadline for the NOP ready wait; expiry logs a warning and falls
    /// through so unattended runs cannot hang.
    pub ready_deadline: Duration,
    /// Cadence of the NOP ready poll.
    pub ready_poll: Duration,
    /// Tunable range used when the device range registers do not answer.
    pub fallback_min_thz: f64,
    pub fallback_max_thz: f64,
}

impl Default for JumpCfg {
    fn default() -> Self {
        Self {
            pre_trigger_delay: Duration::from_millis(500),
            settle_deadline: Duration::from_secs(2),
            settle_tolerance_ghz: 0.1,
            ready_deadline: Duration::from_secs(30),
            ready_poll: Duration::from_millis(250),
            fallback_min_thz: 191.5,
            fallback_max_thz: 196.25,
        }
    }
}

/// Clean-sweep knobs.
#[derive(Debug, Clone, Copy)]
pub struct SweepCfg {
    /// Sweep amplitude written by `sweep_prepare` when not overridden (GHz).
    pub amplitude_ghz: u16,
    /// Sweep speed written by `sweep_prepare` when not overridden (MHz/s).
    pub speed_mhz_per_s: u16,
    /// Delay between enabling clean mode and enabling the sweep
    /// (vendor recommendation).
    pub mode_settle_delay: Duration,
    /// Bound on the direction-detection poll in an automatic pause; on
    /// expiry the sweep pauses at the current offset instead.
    pub direction_timeout: Duration,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self {
            amplitude_ghz: 50,
            speed_mhz_per_s: 20_000,
            mode_settle_delay: Duration::from_millis(500),
            direction_timeout: Duration::from_secs(2),
        }
    }
}

/// Power-up sequencing knobs.
#[derive(Debug, Clone, Copy)]
pub struct StartupCfg {
    /// Optical power the module is expected to reach (dBm).
    pub target_power_dbm: f64,
    /// Acceptable deviation from the target power (dBm).
    pub power_tolerance_dbm: f64,
    /// Deadline for the power ramp; expiry falls through.
    pub power_deadline: Duration,
    /// Pause after the frequency/channel writes before enabling output.
    pub enable_delay: Duration,
}

impl Default for StartupCfg {
    fn default() -> Self {
        Self {
            target_power_dbm: 10.0,
            power_tolerance_dbm: 1.0,
            power_deadline: Duration::from_secs(5),
            enable_delay: Duration::from_secs(1),
        }
    }
}

/// Aggregate runtime configuration for [`crate::Laser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LaserCfg {
    pub timeouts: Timeouts,
    pub jump: JumpCfg,
    pub sweep: SweepCfg,
    pub startup: StartupCfg,
}
