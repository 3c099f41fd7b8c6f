//! High-level laser controller: power-up/down sequences, telemetry reads,
//! and the shared state both the jump and sweep sequences build on.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use itla_config::calibration::{MapTable, load_sled_temperatures, sled_spacing};
use itla_traits::{Clock, MonotonicClock};

use crate::client::{ItlaClient, Reply, Status};
use crate::config::LaserCfg;
use crate::error::{BuildError, LaserError};
use crate::registers as reg;
use crate::status::{LaserStatus, SweepState};

/// Calibration inputs for clean jump, loaded once per session.
#[derive(Debug, Clone)]
pub struct JumpCalibration {
    pub map: MapTable,
    /// Spacing between equivalent sled modes (°C).
    pub sled_spacing_c: f64,
    /// Sled temperature slope (°C/GHz, negative).
    pub sled_slope_c_per_ghz: f64,
}

impl JumpCalibration {
    pub fn new(map: MapTable, sled_spacing_c: f64, sled_slope_c_per_ghz: f64) -> Self {
        Self {
            map,
            sled_spacing_c,
            sled_slope_c_per_ghz,
        }
    }

    /// Load the vendor `.sled`/`.map` files and read the sled slope from
    /// the device.
    pub fn from_files(
        client: &ItlaClient,
        sled_path: &Path,
        map_path: &Path,
    ) -> crate::error::Result<Self> {
        let slope = client.read_signed(reg::SLED_SLOPE);
        if !slope.status.device_reported() {
            eyre::bail!("cannot read sled slope from device: {:?}", slope.status);
        }
        let sled_slope_c_per_ghz = f64::from(slope.value) * 0.0001;

        let temps = load_sled_temperatures(sled_path)?;
        let sled_spacing_c = sled_spacing(&temps)?;
        let map = MapTable::load(map_path)?;
        tracing::info!(
            sled_spacing_c,
            sled_slope_c_per_ghz,
            grid_points = map.points().len(),
            "jump calibration loaded"
        );
        Ok(Self::new(map, sled_spacing_c, sled_slope_c_per_ghz))
    }
}

type AbortCheck = Box<dyn Fn() -> bool + Send + Sync>;

/// Laser controller. Stateless between calls apart from the shared client
/// handle and the sweep state machine; safe to share behind an `Arc`.
pub struct Laser {
    pub(crate) client: Arc<ItlaClient>,
    /// Absent when only telemetry/sweep operations are needed; clean jump
    /// requires it and fails typed without it.
    pub(crate) calibration: Option<JumpCalibration>,
    pub(crate) cfg: LaserCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    /// Tunable range, read from the device at build time or the fallback.
    pub(crate) range_thz: (f64, f64),
    /// Serializes whole clean-jump sequences.
    pub(crate) jump_lock: Mutex<()>,
    pub(crate) sweep_state: Mutex<SweepState>,
    /// Checked at poll-loop granularity, never mid-exchange.
    abort_check: Option<AbortCheck>,
}

pub struct LaserBuilder {
    client: Option<Arc<ItlaClient>>,
    calibration: Option<JumpCalibration>,
    cfg: LaserCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    abort_check: Option<AbortCheck>,
}

impl LaserBuilder {
    pub fn with_client(mut self, client: Arc<ItlaClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_calibration(mut self, calibration: JumpCalibration) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn with_cfg(mut self, cfg: LaserCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Abort hook consulted between exchanges in settle/pause loops.
    pub fn with_abort_check(
        mut self,
        check: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        self.abort_check = Some(Box::new(check));
        self
    }

    pub fn build(self) -> Result<Laser, BuildError> {
        let client = self.client.ok_or(BuildError::MissingClient)?;
        let calibration = self.calibration;
        let cfg = self.cfg;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let range_thz = device_range(&client).unwrap_or_else(|| {
            tracing::warn!(
                min_thz = cfg.jump.fallback_min_thz,
                max_thz = cfg.jump.fallback_max_thz,
                "device range registers unavailable; using fallback range"
            );
            (cfg.jump.fallback_min_thz, cfg.jump.fallback_max_thz)
        });
        tracing::info!(min_thz = range_thz.0, max_thz = range_thz.1, "tunable range");

        Ok(Laser {
            client,
            calibration,
            cfg,
            clock,
            range_thz,
            jump_lock: Mutex::new(()),
            sweep_state: Mutex::new(SweepState::Stopped),
            abort_check: self.abort_check,
        })
    }
}

/// Tunable range from the device's first/last frequency registers.
fn device_range(client: &ItlaClient) -> Option<(f64, f64)> {
    let lfl1 = client.read(reg::LFL1);
    let lfl2 = client.read(reg::LFL2);
    let lfh1 = client.read(reg::LFH1);
    let lfh2 = client.read(reg::LFH2);
    if ![&lfl1, &lfl2, &lfh1, &lfh2].iter().all(|r| r.is_ok()) {
        return None;
    }
    let min = f64::from(lfl1.value) + f64::from(lfl2.value) / 10_000.0;
    let max = f64::from(lfh1.value) + f64::from(lfh2.value) / 10_000.0;
    (min < max).then_some((min, max))
}

/// Split a THz frequency into the device's (THz, 0.1 GHz) register pair.
pub(crate) fn split_frequency(freq_thz: f64) -> (u16, u16) {
    let thz = freq_thz.trunc();
    let ghz_tenths = ((freq_thz - thz) * 10_000.0).round();
    (thz as u16, ghz_tenths as u16)
}

/// Round a scaled physical value into a 16-bit register, two's complement
/// for negatives.
pub(crate) fn to_register(scaled: f64) -> u16 {
    let v = scaled.round() as i64;
    v.rem_euclid(65_536) as u16
}

impl Laser {
    pub fn builder() -> LaserBuilder {
        LaserBuilder {
            client: None,
            calibration: None,
            cfg: LaserCfg::default(),
            clock: None,
            abort_check: None,
        }
    }

    pub fn client(&self) -> &Arc<ItlaClient> {
        &self.client
    }

    pub fn tunable_range_thz(&self) -> (f64, f64) {
        self.range_thz
    }

    pub(crate) fn aborted(&self) -> bool {
        self.abort_check.as_ref().is_some_and(|f| f())
    }

    /// Write that distinguishes only "client gone" from "best effort".
    /// Device-reported problems are logged and left for telemetry, matching
    /// how the jump/sweep sequences tolerate hardware jitter.
    pub(crate) fn write_checked(
        &self,
        register: u8,
        data: u16,
        context: &'static str,
    ) -> Result<Reply, LaserError> {
        let reply = self.client.write(register, data);
        match reply.status {
            Status::Disconnected => Err(LaserError::Disconnected),
            s if !s.is_ok() => {
                tracing::warn!(register = reg::name(register), status = ?s, context, "write not acknowledged");
                Ok(reply)
            }
            _ => Ok(reply),
        }
    }

    /// Current NOP register value.
    pub fn check_nop(&self) -> Reply {
        self.client.read(reg::NOP)
    }

    /// On a device-reported fault, read NOP for the detail code.
    pub fn read_error_detail(&self) -> Option<u16> {
        match self.client.last_error() {
            s @ (Status::ExecutionError | Status::CommandPending) => {
                let nop = self.client.read(reg::NOP);
                tracing::error!(status = ?s, nop = nop.value, "device fault detail");
                Some(nop.value)
            }
            _ => None,
        }
    }

    /// Poll NOP until it reports ready (nonzero and <= 16) or the deadline
    /// expires. Returns whether ready was reached; expiry falls through.
    pub(crate) fn wait_nop(&self) -> bool {
        let deadline = self.clock.deadline(self.cfg.jump.ready_deadline);
        loop {
            let nop = self.client.read(reg::NOP);
            if (1..=16).contains(&nop.value) {
                tracing::debug!(nop = nop.value, "module ready");
                self.read_error_detail();
                return true;
            }
            if self.clock.now() >= deadline {
                tracing::warn!(nop = nop.value, "module not ready before deadline");
                self.read_error_detail();
                return false;
            }
            if self.aborted() {
                tracing::debug!("ready wait aborted");
                return false;
            }
            self.clock.sleep(self.cfg.jump.ready_poll);
        }
    }

    /// Optical power in dBm, clamped at 0 from below.
    pub fn check_power(&self) -> f64 {
        let power = f64::from(self.client.read_signed(reg::OOP).value) * 0.01;
        if power < 0.0 { 0.0 } else { power }
    }

    /// Frequency the module reports (THz).
    pub fn frequency(&self) -> f64 {
        let thz = self.client.read(reg::GET_FREQ_THZ).value;
        let ghz = self.client.read_signed(reg::GET_FREQ_GHZ).value;
        f64::from(thz) + f64::from(ghz) / 10.0 / 1000.0
    }

    /// Telemetry snapshot: power, frequency, sweep/jump offset.
    pub fn status(&self) -> LaserStatus {
        LaserStatus {
            power_dbm: self.check_power(),
            frequency_thz: self.frequency(),
            offset_ghz: self.current_offset(),
        }
    }

    pub fn manufacturer(&self) -> Result<String, LaserError> {
        self.client.read_string(reg::MFGR)
    }

    pub fn model(&self) -> Result<String, LaserError> {
        self.client.read_string(reg::MODEL)
    }

    pub fn serial_number(&self) -> Result<String, LaserError> {
        self.client.read_string(reg::SERIAL)
    }

    /// Power-up sequence: set the frequency, enable output, wait for the
    /// module to settle near its operating power, then enter clean mode.
    pub fn laser_on(&self, freq_thz: f64) -> Result<(), LaserError> {
        let probe = self.client.read(reg::NOP);
        if !probe.status.device_reported() {
            return Err(LaserError::Device {
                status: probe.status,
                context: "power-up probe",
            });
        }
        self.read_error_detail();

        let (thz, ghz) = split_frequency(freq_thz);
        self.write_checked(reg::FREQ_THZ, thz, "set frequency THz")?;
        self.write_checked(reg::FREQ_GHZ, ghz, "set frequency GHz")?;
        // Channel 1 so the module comes up on the frequency just written.
        self.write_checked(reg::CHANNEL, 1, "select channel")?;
        self.clock.sleep(self.cfg.startup.enable_delay);

        let enable = self.write_checked(reg::RESET_ENABLE, reg::SET_ON, "enable output")?;
        if enable.value != 1 {
            tracing::debug!(reply = enable.value, "enable acknowledged oddly");
            self.read_error_detail();
        }

        self.wait_nop();

        let startup = self.cfg.startup;
        let deadline = self.clock.deadline(startup.power_deadline);
        let mut power = self.check_power();
        tracing::info!(power_dbm = power, "output enabled");
        while (power - startup.target_power_dbm).abs() > startup.power_tolerance_dbm
            && self.clock.now() < deadline
            && !self.aborted()
        {
            self.clock.sleep(std::time::Duration::from_millis(200));
            power = self.check_power();
            tracing::debug!(power_dbm = power, "waiting for operating power");
        }
        self.read_error_detail();

        self.write_checked(reg::MODE, 1, "clean mode on")?;
        Ok(())
    }

    /// Power-down: leave clean mode, disable output.
    pub fn laser_off(&self) -> Result<(), LaserError> {
        self.write_checked(reg::MODE, 0, "clean mode off")?;
        self.write_checked(reg::RESET_ENABLE, reg::SET_OFF, "disable output")?;
        Ok(())
    }

    pub(crate) fn lock_sweep(&self) -> std::sync::MutexGuard<'_, SweepState> {
        self.sweep_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
