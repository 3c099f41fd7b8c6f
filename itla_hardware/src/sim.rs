//! In-memory ITLA simulator.
//!
//! Speaks the real 4-byte frame protocol, so it can stand in for a module
//! anywhere a `Transport` is expected: demos without hardware, the connect
//! ladder, and end-to-end jump/sweep tests. The model is deliberately
//! shallow: registers echo writes, NOP reports busy for a configurable
//! number of reads after a jump, and the frequency error decays
//! geometrically instead of following thermal physics.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use itla_core::frame;
use itla_core::registers as reg;
use itla_traits::{Transport, TransportFactory};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Simulated module state, shared by every transport opened on it.
#[derive(Debug)]
pub struct DeviceState {
    store: HashMap<u8, u16>,
    /// Frequency the simulated laser is lasing at (THz).
    pub freq_thz: f64,
    pub enabled: bool,
    pub sweep_on: bool,
    /// Sweep offset advances by this much on every offset read (0.1 GHz).
    pub sweep_step_tenths: i16,
    sweep_offset_tenths: i16,
    /// Residual frequency error reported after a jump (0.1 GHz); halves on
    /// every read.
    pub jump_residual_tenths: i16,
    jump_stage: u8,
    /// NOP reads reporting busy (17) after a jump executes.
    pub nop_busy_reads: u16,
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    /// Every write the device accepted, in order.
    pub writes: Vec<(u8, u16)>,
    aea_buf: VecDeque<u8>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            store: HashMap::new(),
            freq_thz: 193.0,
            enabled: false,
            sweep_on: false,
            sweep_step_tenths: 7,
            sweep_offset_tenths: 0,
            jump_residual_tenths: 25,
            jump_stage: 0,
            nop_busy_reads: 0,
            manufacturer: "Pure Photonics".into(),
            model: "PPCL550".into(),
            serial: "CRTNHBM047".into(),
            writes: Vec::new(),
            aea_buf: VecDeque::new(),
        }
    }
}

impl DeviceState {
    fn write(&mut self, register: u8, data: u16) -> (u8, u16) {
        self.writes.push((register, data));
        match register {
            reg::RESET_ENABLE => self.enabled = data == reg::SET_ON,
            reg::CSWEEP_ON => {
                self.sweep_on = data == 1;
                if !self.sweep_on {
                    self.sweep_offset_tenths = 0;
                }
            }
            reg::CJUMP_ON => {
                if data == 1 {
                    self.jump_stage = self.jump_stage.saturating_add(1);
                    if self.jump_stage == 4 {
                        self.execute_jump();
                    }
                } else {
                    self.jump_stage = 0;
                }
            }
            _ => {}
        }
        self.store.insert(register, data);
        (0, data)
    }

    fn execute_jump(&mut self) {
        let thz = f64::from(self.store.get(&reg::CJUMP_THZ).copied().unwrap_or(0));
        let ghz_tenths = f64::from(self.store.get(&reg::CJUMP_GHZ).copied().unwrap_or(0));
        self.freq_thz = thz + ghz_tenths / 10_000.0;
        self.jump_residual_tenths = 25;
        self.nop_busy_reads = 2;
    }

    fn read(&mut self, register: u8) -> (u8, u16) {
        match register {
            reg::NOP => {
                if self.nop_busy_reads > 0 {
                    self.nop_busy_reads -= 1;
                    (0, 17)
                } else {
                    (0, 1)
                }
            }
            reg::GET_FREQ_THZ => (0, self.freq_thz.trunc() as u16),
            reg::GET_FREQ_GHZ => {
                let tenths = ((self.freq_thz - self.freq_thz.trunc()) * 10_000.0).round();
                (0, tenths as u16)
            }
            reg::OOP => (0, if self.enabled { 1_000 } else { 0 }),
            reg::LFL1 => (0, 191),
            reg::LFL2 => (0, 5_000),
            reg::LFH1 => (0, 196),
            reg::LFH2 => (0, 2_500),
            // -13 * 0.0001 C/GHz, a plausible sled slope.
            reg::SLED_SLOPE => (0, (-13i16) as u16),
            reg::CSWEEP_OFFSET => {
                if self.sweep_on {
                    self.sweep_offset_tenths =
                        self.sweep_offset_tenths.saturating_add(self.sweep_step_tenths);
                    (0, self.sweep_offset_tenths as u16)
                } else {
                    let v = self.jump_residual_tenths;
                    self.jump_residual_tenths /= 2;
                    (0, v as u16)
                }
            }
            reg::MFGR => self.begin_aea(register),
            reg::MODEL => self.begin_aea(register),
            reg::SERIAL => self.begin_aea(register),
            reg::AEA_EAR => {
                let hi = self.aea_buf.pop_front().unwrap_or(0);
                let lo = self.aea_buf.pop_front().unwrap_or(0);
                (0, (u16::from(hi) << 8) | u16::from(lo))
            }
            _ => (0, self.store.get(&register).copied().unwrap_or(0)),
        }
    }

    fn begin_aea(&mut self, register: u8) -> (u8, u16) {
        let text = match register {
            reg::MFGR => self.manufacturer.clone(),
            reg::MODEL => self.model.clone(),
            _ => self.serial.clone(),
        };
        let mut bytes: Vec<u8> = text.into_bytes();
        let len = bytes.len() as u16;
        if bytes.len() % 2 == 1 {
            bytes.push(0);
        }
        self.aea_buf = bytes.into();
        (2, len)
    }

    fn handle(&mut self, request: [u8; 4]) -> [u8; 4] {
        let register = request[1];
        let data = (u16::from(request[2]) << 8) | u16::from(request[3]);
        let (status, value) = if request[0] & 0x01 == 1 {
            self.write(register, data)
        } else {
            self.read(register)
        };
        let hi = (value >> 8) as u8;
        let lo = (value & 0xFF) as u8;
        let sum = frame::checksum(status, register, hi, lo);
        [(sum << 4) | status, register, hi, lo]
    }
}

pub type SharedDevice = Arc<Mutex<DeviceState>>;

/// Transport handle onto a [`DeviceState`]. Unresponsive handles model a
/// baud mismatch: writes vanish and reads time out.
pub struct SimulatedItla {
    state: SharedDevice,
    responsive: bool,
    outbox: VecDeque<u8>,
}

impl SimulatedItla {
    pub fn new(state: SharedDevice) -> Self {
        Self {
            state,
            responsive: true,
            outbox: VecDeque::new(),
        }
    }
}

impl Transport for SimulatedItla {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        if !self.responsive || bytes.len() != 4 {
            return Ok(());
        }
        let mut request = [0u8; 4];
        request.copy_from_slice(bytes);
        let response = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle(request);
        self.outbox.extend(response);
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<(), BoxError> {
        if self.outbox.len() < buf.len() {
            return Err(crate::error::HwError::Timeout.into());
        }
        for slot in buf.iter_mut() {
            *slot = self.outbox.pop_front().unwrap_or(0);
        }
        Ok(())
    }
}

/// Factory producing transports onto one shared simulated module.
pub struct SimulatedFactory {
    state: SharedDevice,
    device_baud: u32,
}

impl SimulatedFactory {
    pub fn new(device_baud: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState::default())),
            device_baud,
        }
    }

    /// Shared device state, for seeding and assertions.
    pub fn state(&self) -> SharedDevice {
        self.state.clone()
    }
}

impl TransportFactory for SimulatedFactory {
    fn open(&self, baud: u32) -> Result<Box<dyn Transport + Send>, BoxError> {
        let mut t = SimulatedItla::new(self.state.clone());
        t.responsive = baud == self.device_baud;
        tracing::debug!(baud, responsive = t.responsive, "simulated port opened");
        Ok(Box::new(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(state: &SharedDevice) -> SimulatedItla {
        SimulatedItla::new(state.clone())
    }

    #[test]
    fn echoes_writes_with_valid_checksum() {
        let state: SharedDevice = Arc::new(Mutex::new(DeviceState::default()));
        let mut t = open(&state);
        let request = frame::encode(frame::Mode::Write, reg::FREQ_THZ, 193);
        t.write_all(&request).unwrap();
        let mut buf = [0u8; 4];
        t.read_exact(&mut buf, Duration::from_millis(10)).unwrap();
        let r = frame::decode(buf);
        assert!(r.checksum_ok);
        assert_eq!(r.value, 193);
        assert_eq!(
            state.lock().unwrap().writes,
            vec![(reg::FREQ_THZ, 193)]
        );
    }

    #[test]
    fn jump_executes_on_fourth_trigger() {
        let state: SharedDevice = Arc::new(Mutex::new(DeviceState::default()));
        let mut t = open(&state);
        let mut buf = [0u8; 4];
        for (r, v) in [(reg::CJUMP_THZ, 194u16), (reg::CJUMP_GHZ, 5_000u16)] {
            t.write_all(&frame::encode(frame::Mode::Write, r, v)).unwrap();
            t.read_exact(&mut buf, Duration::from_millis(10)).unwrap();
        }
        for i in 0..4 {
            t.write_all(&frame::encode(frame::Mode::Write, reg::CJUMP_ON, 1))
                .unwrap();
            t.read_exact(&mut buf, Duration::from_millis(10)).unwrap();
            let freq = state.lock().unwrap().freq_thz;
            if i < 3 {
                assert_eq!(freq, 193.0, "jump must not fire before stage 4");
            }
        }
        assert_eq!(state.lock().unwrap().freq_thz, 194.5);
    }

    #[test]
    fn unresponsive_handle_times_out() {
        let state: SharedDevice = Arc::new(Mutex::new(DeviceState::default()));
        let mut t = SimulatedItla::new(state);
        t.responsive = false;
        t.write_all(&frame::encode(frame::Mode::Read, reg::NOP, 0))
            .unwrap();
        let mut buf = [0u8; 4];
        assert!(t.read_exact(&mut buf, Duration::from_millis(10)).is_err());
    }
}
