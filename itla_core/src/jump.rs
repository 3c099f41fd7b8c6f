//! Clean-jump sequencing.
//!
//! A clean jump preloads the target frequency, sled temperature and bias
//! current, then walks the module through its four trigger stages and waits
//! for the frequency error to collapse. The waits are best effort: deadlines
//! fall through and the caller reads the outcome from telemetry.

use std::sync::PoisonError;

use crate::error::LaserError;
use crate::laser::{Laser, split_frequency, to_register};
use crate::registers as reg;
use crate::status::{JumpOutcome, SweepState};

impl Laser {
    /// Jump to `freq_thz` using the loaded calibration.
    ///
    /// Rejects frequencies outside the tunable range before any register
    /// is written. Only one jump can be in flight; an active sweep is
    /// stopped first since both own the shared offset register.
    pub fn clean_jump(&self, freq_thz: f64) -> Result<JumpOutcome, LaserError> {
        let _jump = self.jump_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (min_thz, max_thz) = self.range_thz;
        if !(freq_thz >= min_thz && freq_thz <= max_thz) {
            return Err(LaserError::FrequencyOutOfRange {
                freq_thz,
                min_thz,
                max_thz,
            });
        }

        // Calibration math up front: a bad table leaves the device untouched.
        let calibration = self.calibration.as_ref().ok_or(LaserError::NoCalibration)?;
        let sled_temp_c = calibration.map.sled_temperature_for(
            freq_thz,
            calibration.sled_slope_c_per_ghz,
            calibration.sled_spacing_c,
        )?;
        let sled_reg = to_register(sled_temp_c * 100.0);
        let current_ma = calibration.map.current_for(freq_thz)?;
        let current_reg = to_register(current_ma * 10.0);

        {
            let mut sweep = self.lock_sweep();
            if *sweep != SweepState::Stopped {
                tracing::info!("stopping active sweep before jump");
                self.sweep_stop_locked(&mut sweep)?;
            }
        }

        // Clean (no-dither) mode, unless already there.
        let mode = self.client.read(reg::MODE);
        if !(mode.is_ok() && mode.value == 1) {
            self.write_checked(reg::MODE, 1, "clean mode on")?;
        }

        let (thz, ghz) = split_frequency(freq_thz);
        self.write_checked(reg::CJUMP_THZ, thz, "jump target THz")?;
        self.write_checked(reg::CJUMP_GHZ, ghz, "jump target GHz")?;
        tracing::debug!(
            freq_thz,
            sled_temp_c,
            current_ma,
            sled_reg,
            current_reg,
            "jump target loaded"
        );
        self.write_checked(reg::CJUMP_SLED, sled_reg, "jump sled temperature")?;
        self.write_checked(reg::CJUMP_CURRENT, current_reg, "jump current")?;

        // Hardware settling requirement before the trigger sequence.
        self.clock.sleep(self.cfg.jump.pre_trigger_delay);
        tracing::info!(freq_thz, "jumping");

        // Four discrete trigger writes: memory, filter 1, filter 2, execute.
        for stage in ["memory", "filter 1", "filter 2", "execute"] {
            let reply = self.write_checked(reg::CJUMP_ON, 1, "jump trigger")?;
            tracing::debug!(stage, reply = reply.value, "jump trigger");
        }

        // Best-effort settle wait on the frequency error register.
        let tolerance = self.cfg.jump.settle_tolerance_ghz;
        let deadline = self.clock.deadline(self.cfg.jump.settle_deadline);
        let mut residual_ghz = self.jump_offset_ghz();
        while residual_ghz.abs() > tolerance && self.clock.now() < deadline && !self.aborted() {
            self.clock.sleep(self.cfg.timeouts.poll);
            residual_ghz = self.jump_offset_ghz();
        }
        let settled = residual_ghz.abs() <= tolerance;
        tracing::info!(residual_ghz, settled, "frequency error after jump");

        // Definitive settle signal.
        let ready = self.wait_nop();

        // Read back what the module thinks it is doing, then re-arm.
        let reported_thz = self.frequency();
        tracing::info!(reported_thz, "module-reported frequency");
        self.write_checked(reg::CJUMP_ON, 0, "jump re-arm")?;

        Ok(JumpOutcome {
            target_thz: freq_thz,
            reported_thz,
            residual_ghz,
            settled,
            ready,
        })
    }

    /// Frequency error relative to the jump target (GHz, signed).
    pub(crate) fn jump_offset_ghz(&self) -> f64 {
        f64::from(self.client.read_signed(reg::CSWEEP_OFFSET).value) / 10.0
    }
}
