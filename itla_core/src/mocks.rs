//! Test doubles for the transport seam.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use itla_traits::{Transport, TransportFactory};

use crate::frame;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One scripted response.
#[derive(Debug, Clone, Copy)]
pub enum ScriptedReply {
    /// Well-formed response with the given status bits and value.
    Value { status_bits: u8, value: u16 },
    /// No response; the read times out.
    Timeout,
    /// Raw frame bytes, e.g. with a broken checksum.
    Garbage([u8; 4]),
}

/// Encode a well-formed response frame the way the device does.
pub fn response_frame(status_bits: u8, echo: u8, value: u16) -> [u8; 4] {
    let hi = (value >> 8) as u8;
    let lo = (value & 0xFF) as u8;
    let sum = frame::checksum(status_bits, echo, hi, lo);
    [(sum << 4) | status_bits, echo, hi, lo]
}

/// Transport that records every written frame and answers from a script.
/// When the script runs dry it echoes each request back as a clean reply,
/// which is what register writes look like on the real module.
pub struct ScriptedTransport {
    script: VecDeque<ScriptedReply>,
    writes: Arc<Mutex<Vec<[u8; 4]>>>,
    outbox: VecDeque<u8>,
    timed_out: bool,
}

impl ScriptedTransport {
    pub fn new(script: impl Into<VecDeque<ScriptedReply>>) -> (Self, Arc<Mutex<Vec<[u8; 4]>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                script: script.into(),
                writes: writes.clone(),
                outbox: VecDeque::new(),
                timed_out: false,
            },
            writes,
        )
    }

    /// Echo-only transport: every exchange succeeds.
    pub fn echo() -> (Self, Arc<Mutex<Vec<[u8; 4]>>>) {
        Self::new(Vec::new())
    }
}

impl Transport for ScriptedTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        if bytes.len() != 4 {
            return Err(format!("expected a 4-byte frame, got {}", bytes.len()).into());
        }
        let mut chunk = [0u8; 4];
        chunk.copy_from_slice(bytes);
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(chunk);

        match self.script.pop_front() {
            Some(ScriptedReply::Value { status_bits, value }) => {
                self.outbox
                    .extend(response_frame(status_bits, chunk[1], value));
            }
            Some(ScriptedReply::Timeout) => self.timed_out = true,
            Some(ScriptedReply::Garbage(raw)) => self.outbox.extend(raw),
            None => {
                let value = (u16::from(chunk[2]) << 8) | u16::from(chunk[3]);
                self.outbox.extend(response_frame(0, chunk[1], value));
            }
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<(), BoxError> {
        if self.timed_out || self.outbox.len() < buf.len() {
            self.timed_out = false;
            return Err("timeout waiting for response".into());
        }
        for slot in buf.iter_mut() {
            *slot = self.outbox.pop_front().unwrap_or(0);
        }
        Ok(())
    }
}

/// Transport that never responds; reads block for the full timeout.
pub struct SilentTransport;

impl Transport for SilentTransport {
    fn write_all(&mut self, _bytes: &[u8]) -> Result<(), BoxError> {
        Ok(())
    }

    fn read_exact(&mut self, _buf: &mut [u8], timeout: Duration) -> Result<(), BoxError> {
        std::thread::sleep(timeout);
        Err("timeout waiting for response".into())
    }
}

/// Factory for connect tests: silent at every baud except `working_baud`,
/// and records the rates it was asked to open.
pub struct LadderFactory {
    pub working_baud: u32,
    pub opens: Arc<Mutex<Vec<u32>>>,
}

impl LadderFactory {
    pub fn new(working_baud: u32) -> Self {
        Self {
            working_baud,
            opens: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl TransportFactory for LadderFactory {
    fn open(&self, baud: u32) -> Result<Box<dyn Transport + Send>, BoxError> {
        self.opens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(baud);
        if baud == self.working_baud {
            let (t, _) = ScriptedTransport::echo();
            Ok(Box::new(t))
        } else {
            Ok(Box::new(SilentTransport))
        }
    }
}

/// Factory whose open always fails, for port-error tests.
pub struct DeadPortFactory;

impl TransportFactory for DeadPortFactory {
    fn open(&self, _baud: u32) -> Result<Box<dyn Transport + Send>, BoxError> {
        Err("no such device".into())
    }
}
