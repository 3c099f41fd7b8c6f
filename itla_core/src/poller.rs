//! Background status polling.
//!
//! Spawns a thread that owns nothing but a `Laser` handle, reads a status
//! snapshot at a fixed period through the shared (FIFO-serialized) client,
//! and pushes the latest snapshot through a bounded channel. Tracks the
//! last-ok timestamp for staleness checks.
//!
//! Safety: each `StatusPoller` spawns exactly one thread that is shut down
//! when the poller is dropped.

use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::laser::Laser;
use crate::status::LaserStatus;

pub struct StatusPoller {
    rx: Option<xch::Receiver<LaserStatus>>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl StatusPoller {
    pub fn spawn(laser: Arc<Laser>, period: Duration) -> Self {
        let (tx, rx) = xch::bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_writer = last_ok.clone();
        let epoch = Instant::now();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_flag.load(Ordering::Relaxed) {
                    tracing::debug!("status poller received shutdown signal");
                    break;
                }
                if !laser.client().is_connected() {
                    tracing::debug!("client disconnected, status poller exiting");
                    break;
                }

                let snapshot = laser.status();
                match tx.try_send(snapshot) {
                    Ok(()) => {
                        let now_ms =
                            epoch.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
                        last_ok_writer.store(now_ms, Ordering::Relaxed);
                    }
                    // Consumer hasn't drained; skip this round.
                    Err(xch::TrySendError::Full(_)) => {}
                    Err(xch::TrySendError::Disconnected(_)) => {
                        tracing::debug!("status consumer disconnected, exiting thread");
                        break;
                    }
                }

                if shutdown_flag.load(Ordering::Relaxed) {
                    break;
                }
                std::thread::sleep(period);
            }
            tracing::trace!("status poller exiting cleanly");
        });

        Self {
            rx: Some(rx),
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Most recent snapshot, if any arrived since the last call.
    pub fn latest(&self) -> Option<LaserStatus> {
        self.rx.as_ref().and_then(|rx| rx.try_iter().last())
    }

    /// Milliseconds since the last successful snapshot delivery.
    pub fn stalled_for(&self) -> u64 {
        let now_ms = self.epoch.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Drop the receiver first so a blocked/queued send cannot keep the
        // thread alive past shutdown.
        self.rx = None;
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("status poller joined"),
                Err(e) => tracing::warn!(?e, "status poller panicked during shutdown"),
            }
        }
    }
}
