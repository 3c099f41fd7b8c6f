//! Snapshot and state types reported by the laser controller.

/// Point-in-time telemetry snapshot. Produced by whichever thread polled
/// last; staleness is expected and tolerated by display consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserStatus {
    /// Optical output power in dBm, clamped at 0 from below.
    pub power_dbm: f64,
    /// Frequency the module reports (THz).
    pub frequency_thz: f64,
    /// Offset from the sweep/jump center frequency (GHz, signed).
    pub offset_ghz: f64,
}

/// Clean-sweep state machine. Starting a jump forces `Stopped` first;
/// `sweep_start` from `Paused` resumes the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Stopped,
    Running,
    Paused,
}

/// Telemetry from a completed clean jump. A jump that did not converge is
/// reported here, not raised: the caller inspects `settled`/`residual_ghz`.
#[derive(Debug, Clone, Copy)]
pub struct JumpOutcome {
    pub target_thz: f64,
    /// Frequency the module claims after the jump.
    pub reported_thz: f64,
    /// Last observed frequency error (GHz).
    pub residual_ghz: f64,
    /// Residual was inside tolerance before the settle deadline.
    pub settled: bool,
    /// NOP reported ready before its deadline.
    pub ready: bool,
}
