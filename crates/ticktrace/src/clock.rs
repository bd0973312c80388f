// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! External fixed-period clock interface.
//!
//! The sampler does not own a timer. It registers a callback with a
//! [`TickSource`] -- on the robot this is the motion runtime's control
//! cycle (~10 ms) -- and the source invokes the callback from its own
//! real-time thread once per tick.
//!
//! # Unregistration handshake
//!
//! `unregister` is the only synchronization point between the control
//! path and the tick thread: it must not return while a callback
//! invocation is in flight, and no further invocation may start after
//! it returns. Callers rely on this to tear down session state (close
//! the output file, release slot bindings) without any lock on the hot
//! path. [`ThreadTicker`] implements the handshake by dropping the stop
//! channel sender and joining the tick thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

/// Errors from a tick source.
#[derive(Debug, Error)]
pub enum ClockError {
    /// Source not ready, gone, or refusing registration.
    #[error("tick source unavailable: {0}")]
    Unavailable(String),

    /// A time query failed.
    #[error("clock query failed: {0}")]
    Query(String),
}

/// Callback invoked once per tick from the source's real-time thread.
///
/// Implementations must stay allocation-free and short; the tick
/// thread also drives the robot's control loop.
pub type TickCallback = Box<dyn FnMut() + Send>;

/// Opaque token for an active callback registration.
///
/// Obtained from [`TickSource::register_post_tick`], consumed by
/// [`TickSource::unregister`]. Cancellation is an explicit operation on
/// the token, never an implicit effect of dropping it.
#[derive(Debug)]
pub struct TickRegistration {
    id: u64,
}

impl TickRegistration {
    /// Mint a token. Intended for [`TickSource`] implementations.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// A fixed-period clock that drives per-tick callbacks.
pub trait TickSource: Send + Sync {
    /// Absolute source time in milliseconds, `offset_ms` in the future
    /// (0 = now).
    fn now(&self, offset_ms: u32) -> Result<i64, ClockError>;

    /// Register `cb` to run once per tick on the source's thread.
    fn register_post_tick(&self, cb: TickCallback) -> Result<TickRegistration, ClockError>;

    /// Remove the registration.
    ///
    /// Blocks until any in-flight callback invocation has returned; no
    /// invocation starts after this returns. The callback is dropped
    /// here, releasing everything it owns.
    fn unregister(&self, reg: TickRegistration);
}

// ============================================================================
// ThreadTicker -- production tick source backed by a named thread
// ============================================================================

/// Background thread + stop channel for one registration.
///
/// Dropping the sender disconnects the channel, which unblocks the tick
/// thread's `recv_timeout` with `Disconnected`; joining then completes
/// the unregistration handshake.
struct TickThread {
    id: u64,
    /// Must be dropped BEFORE joining the thread.
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TickThread {
    fn stop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TickThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// [`TickSource`] backed by a dedicated named thread firing at a fixed
/// period (default 10 ms).
///
/// Deadlines are computed from an absolute schedule, so callback
/// runtime does not accumulate drift; if the thread falls behind a full
/// period it skips the missed deadlines instead of bursting.
///
/// One callback may be registered at a time.
pub struct ThreadTicker {
    period: Duration,
    epoch: Instant,
    next_id: AtomicU64,
    active: Mutex<Option<TickThread>>,
}

/// Default tick period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(10);

impl ThreadTicker {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            epoch: Instant::now(),
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for ThreadTicker {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}

impl TickSource for ThreadTicker {
    fn now(&self, offset_ms: u32) -> Result<i64, ClockError> {
        Ok(self.epoch.elapsed().as_millis() as i64 + i64::from(offset_ms))
    }

    fn register_post_tick(&self, mut cb: TickCallback) -> Result<TickRegistration, ClockError> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(ClockError::Unavailable(
                "a callback is already registered".into(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let period = self.period;
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("ticktrace-tick".into())
            .spawn(move || {
                let mut next = Instant::now() + period;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }

                    cb();

                    next += period;
                    let now = Instant::now();
                    if next < now {
                        // Fell behind; re-anchor rather than firing a burst.
                        next = now + period;
                    }
                }
            })
            .map_err(|e| ClockError::Unavailable(format!("failed to spawn tick thread: {e}")))?;

        *active = Some(TickThread {
            id,
            stop_tx: Some(stop_tx),
            thread: Some(handle),
        });

        Ok(TickRegistration::new(id))
    }

    fn unregister(&self, reg: TickRegistration) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|t| t.id == reg.id()) {
            if let Some(mut thread) = active.take() {
                thread.stop();
            }
        }
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        if let Some(mut thread) = self.active.lock().take() {
            thread.stop();
        }
    }
}
