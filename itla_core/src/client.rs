//! Serialized request/response client for the ITLA binary protocol.
//!
//! Exactly one frame is in flight at any time. Concurrent callers take a
//! FIFO ticket and block on a condvar until they reach the head of the
//! queue, so register operations from any number of threads are strictly
//! serialized end-to-end: send frame, block for the response, hand off.
//!
//! Protocol-level failures (timeout, checksum, device status) are carried in
//! every reply rather than raised; the settle loops upstream poll registers
//! tightly and decide retry vs. abort per iteration.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use itla_traits::{Transport, TransportFactory};

use crate::config::Timeouts;
use crate::error::{ConnectError, LaserError};
use crate::frame::{self, Mode};
use crate::registers as reg;

/// Baud rates the module may be configured for, probed in this order.
pub const BAUD_LADDER: [u32; 6] = [4_800, 9_600, 19_200, 38_400, 57_600, 115_200];

/// Outcome of a single exchange. Values 0..=3 come from the response status
/// bits; the rest are produced on this side of the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    NoError = 0,
    /// Device-reported execution error; read NOP for the reason.
    ExecutionError = 1,
    /// Response is the byte count of an AEA string, not a plain value.
    AeaMode = 2,
    CommandPending = 3,
    /// No complete response within the exchange timeout.
    NotResponding = 4,
    /// Response arrived but its checksum did not match.
    ChecksumError = 5,
    /// Client was disconnected; no frame was sent.
    Disconnected = 6,
}

impl Status {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::NoError,
            1 => Self::ExecutionError,
            2 => Self::AeaMode,
            3 => Self::CommandPending,
            4 => Self::NotResponding,
            5 => Self::ChecksumError,
            _ => Self::Disconnected,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::NoError
    }

    /// True when a checksum-valid response arrived, whatever it said.
    pub fn device_reported(self) -> bool {
        matches!(
            self,
            Self::NoError | Self::ExecutionError | Self::AeaMode | Self::CommandPending
        )
    }
}

/// Reply to an unsigned exchange: decoded value plus the exchange status.
/// On timeout the value is the 0xFFFF sentinel.
#[derive(Debug, Clone, Copy)]
pub struct Reply {
    pub value: u16,
    pub status: Status,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    fn disconnected() -> Self {
        Self {
            value: 0xFFFF,
            status: Status::Disconnected,
        }
    }
}

/// Reply with the 16-bit value reinterpreted as two's complement.
#[derive(Debug, Clone, Copy)]
pub struct SignedReply {
    pub value: i16,
    pub status: Status,
}

impl SignedReply {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// FIFO ticket lock. Tickets are handed out in acquisition order and served
/// strictly in that order; waiters park on the condvar instead of spinning.
struct TicketQueue {
    state: Mutex<TicketState>,
    ready: Condvar,
}

struct TicketState {
    next: u64,
    serving: u64,
}

impl TicketQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(TicketState {
                next: 0,
                serving: 0,
            }),
            ready: Condvar::new(),
        }
    }

    fn acquire(&self) -> u64 {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = st.next;
        st.next += 1;
        while st.serving != ticket {
            st = self
                .ready
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        ticket
    }

    fn release(&self) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.serving += 1;
        self.ready.notify_all();
    }
}

/// Protocol client owning the transport for one session.
///
/// Created by [`ItlaClient::connect`]; safe to share behind an `Arc` from
/// any number of threads. After [`ItlaClient::disconnect`] every operation
/// fails closed with [`Status::Disconnected`].
pub struct ItlaClient {
    transport: Mutex<Option<Box<dyn Transport + Send>>>,
    tickets: TicketQueue,
    last_error: AtomicU8,
    connected: AtomicBool,
    timeouts: Timeouts,
}

impl std::fmt::Debug for ItlaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItlaClient")
            .field("connected", &self.connected)
            .field("last_error", &self.last_error)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl ItlaClient {
    /// Open a transport and detect the module's baud rate.
    ///
    /// The candidate rate is probed first, then the rest of
    /// [`BAUD_LADDER`], reopening the transport at each rung. A probe
    /// succeeds when a checksum-valid NOP response arrives; the response
    /// value is never inspected, only timeout/checksum outcomes advance the
    /// ladder.
    pub fn connect(
        factory: &dyn TransportFactory,
        candidate_baud: u32,
        timeouts: Timeouts,
    ) -> Result<Self, ConnectError> {
        let mut tried = Vec::new();
        let rungs = std::iter::once(candidate_baud)
            .chain(BAUD_LADDER.iter().copied().filter(|b| *b != candidate_baud));

        for baud in rungs {
            tried.push(baud);
            let mut transport = factory
                .open(baud)
                .map_err(|e| ConnectError::Port(e.to_string()))?;

            let reply = exchange(transport.as_mut(), reg::NOP, 0, Mode::Read, &timeouts);
            if reply.status.device_reported() {
                tracing::info!(baud, "detected baud rate");
                return Ok(Self {
                    transport: Mutex::new(Some(transport)),
                    tickets: TicketQueue::new(),
                    last_error: AtomicU8::new(reply.status as u8),
                    connected: AtomicBool::new(true),
                    timeouts,
                });
            }
            tracing::debug!(baud, status = ?reply.status, "no valid response, next baud");
        }

        Err(ConnectError::Baud { tried })
    }

    /// Wrap an already-validated transport (tests, simulators).
    pub fn from_transport(transport: Box<dyn Transport + Send>, timeouts: Timeouts) -> Self {
        Self {
            transport: Mutex::new(Some(transport)),
            tickets: TicketQueue::new(),
            last_error: AtomicU8::new(Status::NoError as u8),
            connected: AtomicBool::new(true),
            timeouts,
        }
    }

    /// Core primitive: one framed exchange, FIFO-serialized.
    pub fn communicate(&self, register: u8, data: u16, mode: Mode) -> Reply {
        if !self.connected.load(Ordering::Acquire) {
            self.record(Status::Disconnected);
            return Reply::disconnected();
        }
        self.tickets.acquire();
        let reply = self.exchange_locked(register, data, mode);
        self.tickets.release();
        reply
    }

    /// Same exchange with the value reinterpreted as two's complement.
    pub fn communicate_signed(&self, register: u8, data: u16, mode: Mode) -> SignedReply {
        let r = self.communicate(register, data, mode);
        SignedReply {
            value: r.value as i16,
            status: r.status,
        }
    }

    pub fn read(&self, register: u8) -> Reply {
        self.communicate(register, 0, Mode::Read)
    }

    pub fn read_signed(&self, register: u8) -> SignedReply {
        self.communicate_signed(register, 0, Mode::Read)
    }

    pub fn write(&self, register: u8, data: u16) -> Reply {
        self.communicate(register, data, Mode::Write)
    }

    /// Read an AEA-mode string register (manufacturer, model, serial).
    ///
    /// The initial read answers [`Status::AeaMode`] with the byte count;
    /// the string is then pulled through [`reg::AEA_EAR`] two bytes per
    /// frame. The whole transaction holds a single ticket so no other
    /// caller can interleave with the string window.
    pub fn read_string(&self, register: u8) -> Result<String, LaserError> {
        if !self.connected.load(Ordering::Acquire) {
            self.record(Status::Disconnected);
            return Err(LaserError::Disconnected);
        }
        self.tickets.acquire();
        let result = self.read_string_locked(register);
        self.tickets.release();
        result
    }

    fn read_string_locked(&self, register: u8) -> Result<String, LaserError> {
        let first = self.exchange_locked(register, 0, Mode::Read);
        if first.status != Status::AeaMode {
            return Err(LaserError::NotAeaMode {
                register,
                status: first.status,
            });
        }

        let mut remaining = usize::from(first.value);
        let mut bytes = Vec::with_capacity(remaining);
        while remaining > 0 {
            let reply = self.exchange_locked(reg::AEA_EAR, 0, Mode::Read);
            if !reply.status.device_reported() {
                return Err(LaserError::Device {
                    status: reply.status,
                    context: "AEA string read",
                });
            }
            bytes.push((reply.value >> 8) as u8);
            bytes.push((reply.value & 0xFF) as u8);
            remaining = remaining.saturating_sub(2);
        }
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Status recorded by the most recent exchange. Convenience for
    /// wait-NOP style loops; per-call code should use the reply status.
    pub fn last_error(&self) -> Status {
        Status::from_u8(self.last_error.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Close the transport. Idempotent; subsequent operations fail closed.
    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            tracing::debug!("disconnecting");
        }
        let mut guard = self.lock_transport();
        *guard = None;
    }

    fn lock_transport(&self) -> MutexGuard<'_, Option<Box<dyn Transport + Send>>> {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn exchange_locked(&self, register: u8, data: u16, mode: Mode) -> Reply {
        let mut guard = self.lock_transport();
        let reply = match guard.as_mut() {
            Some(t) => exchange(t.as_mut(), register, data, mode, &self.timeouts),
            None => Reply::disconnected(),
        };
        drop(guard);
        self.record(reply.status);
        reply
    }

    fn record(&self, status: Status) {
        self.last_error.store(status as u8, Ordering::Release);
    }
}

/// One frame out, one frame back. Transport failures of any kind map to the
/// 0xFFFF sentinel with [`Status::NotResponding`], matching what a caller
/// polling a register can act on.
fn exchange(
    transport: &mut dyn Transport,
    register: u8,
    data: u16,
    mode: Mode,
    timeouts: &Timeouts,
) -> Reply {
    let request = frame::encode(mode, register, if mode == Mode::Read { 0 } else { data });
    if let Err(e) = transport.write_all(&request) {
        tracing::warn!(register = reg::name(register), error = %e, "serial write failed");
        return Reply {
            value: 0xFFFF,
            status: Status::NotResponding,
        };
    }

    let mut buf = [0u8; 4];
    if let Err(e) = transport.read_exact(&mut buf, timeouts.exchange) {
        tracing::warn!(register = reg::name(register), error = %e, "no response");
        return Reply {
            value: 0xFFFF,
            status: Status::NotResponding,
        };
    }

    let response = frame::decode(buf);
    let status = if response.checksum_ok {
        Status::from_u8(response.status_bits)
    } else {
        tracing::warn!(register = reg::name(register), "checksum mismatch");
        Status::ChecksumError
    };
    tracing::trace!(
        register = reg::name(register),
        ?mode,
        value = response.value,
        ?status,
        "exchange"
    );
    Reply {
        value: response.value,
        status,
    }
}
