// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Tick-driven sampler: session lifecycle and the per-tick hot path.
//!
//! # State machine
//!
//! ```text
//! Idle --start()--> Armed --register--> Running --stop()--> Idle
//!                     |                    ^
//!                     +--failure: unwind --+-- (none: stop never fails)
//! ```
//!
//! `Armed` (session built, sink open, callback not yet registered) is
//! transient inside `start`: callers observe `start` as atomic -- on
//! any failure after partial setup the sink is closed and the sampler
//! is back in `Idle` with no session state retained.
//!
//! # Concurrency
//!
//! Two contexts touch the sampler: the external clock's real-time tick
//! thread, and whatever control context calls `start`/`stop`. The tick
//! callback exclusively owns everything it mutates (slot table,
//! snapshot buffer, sink); the only shared state is a set of atomic
//! counters. The control side never takes a lock the tick path can
//! see: teardown is the one-time unregistration handshake of
//! [`TickSource::unregister`], after which the callback -- and with it
//! the sink -- is dropped. There is no per-tick lock anywhere.
//!
//! Hot-path failures (a clock query failing on one tick) skip that
//! tick's record and bump a counter; a robot control loop's stability
//! must not depend on its telemetry sampler, so nothing on the tick
//! path panics, logs, or propagates errors.

use crate::actuator::{self, ActuatorControl};
use crate::clock::{TickCallback, TickRegistration, TickSource};
use crate::error::SamplerError;
use crate::registry::{ChannelRegistry, SensorList};
use crate::sink::{SessionMeta, TraceSink};
use crate::snapshot::SnapshotBuffer;
use crate::telemetry::TelemetryMemory;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for one sampling session.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Where the channel list comes from.
    pub sensor_list: SensorList,
    /// Trace output path (created/truncated at start).
    pub output_path: PathBuf,
    /// Write a `<output>.meta.json` sidecar at start.
    pub write_sidecar: bool,
    /// Ramp all joints to this stiffness during setup (requires an
    /// actuator control backend).
    pub stiffness: Option<f64>,
}

impl SamplerConfig {
    #[must_use]
    pub fn new(sensor_list: SensorList, output_path: impl Into<PathBuf>) -> Self {
        Self {
            sensor_list,
            output_path: output_path.into(),
            write_sidecar: false,
            stiffness: None,
        }
    }

    /// Enable or disable the metadata sidecar.
    #[must_use]
    pub fn sidecar(mut self, enabled: bool) -> Self {
        self.write_sidecar = enabled;
        self
    }

    /// Set a setup-time joint stiffness ramp.
    #[must_use]
    pub fn stiffness(mut self, value: f64) -> Self {
        self.stiffness = Some(value);
        self
    }
}

/// Per-session counters, shared between the tick thread and the
/// control side. The tick path only does Relaxed increments.
#[derive(Debug, Default)]
pub struct SessionStats {
    records_written: AtomicU64,
    ticks_skipped: AtomicU64,
    write_errors: AtomicU64,
}

impl SessionStats {
    #[must_use]
    pub fn snapshot(&self) -> SamplerStats {
        SamplerStats {
            records_written: self.records_written.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Records appended to the trace.
    pub records_written: u64,
    /// Ticks skipped because the clock query failed.
    pub ticks_skipped: u64,
    /// Records lost to sink write failures.
    pub write_errors: u64,
}

enum State {
    Idle,
    Running(ActiveSession),
}

struct ActiveSession {
    registration: TickRegistration,
    stats: Arc<SessionStats>,
    channels: usize,
    output_path: PathBuf,
}

/// Fixed-rate telemetry sampler.
///
/// Holds the external clock and telemetry-memory connections as
/// explicitly owned resources (injected at construction so tests can
/// substitute fakes) and enforces the single-active-session invariant.
/// `stop` may be called from any thread, including one different from
/// the `start` caller; dropping the sampler stops any active session.
pub struct Sampler {
    clock: Arc<dyn TickSource>,
    memory: Arc<dyn TelemetryMemory>,
    actuators: Option<Arc<dyn ActuatorControl>>,
    state: Mutex<State>,
}

impl Sampler {
    #[must_use]
    pub fn new(clock: Arc<dyn TickSource>, memory: Arc<dyn TelemetryMemory>) -> Self {
        Self {
            clock,
            memory,
            actuators: None,
            state: Mutex::new(State::Idle),
        }
    }

    /// Attach a device-control backend for setup-time group
    /// registration and stiffness ramps.
    #[must_use]
    pub fn with_actuators(mut self, control: Arc<dyn ActuatorControl>) -> Self {
        self.actuators = Some(control);
        self
    }

    /// Start a sampling session.
    ///
    /// Validates the clock, resolves the channel registry, performs
    /// actuator setup, opens the sink, then registers the per-tick
    /// callback. Fails with `AlreadyActive` if a session is running
    /// (the existing session is untouched); any later failure unwinds
    /// completely -- sink closed, no registration, state `Idle`.
    pub fn start(&self, config: SamplerConfig) -> Result<(), SamplerError> {
        let mut state = self.state.lock();
        if matches!(*state, State::Running(_)) {
            return Err(SamplerError::AlreadyActive);
        }

        // Fail fast if the clock is not reachable at all, before any
        // session state is built.
        self.clock.now(0)?;

        let registry = ChannelRegistry::resolve(&config.sensor_list, self.memory.as_ref())?;

        if let Some(control) = &self.actuators {
            actuator::create_default_groups(control.as_ref())?;
            if let Some(value) = config.stiffness {
                actuator::set_stiffness(control.as_ref(), value)?;
            }
        }

        let mut sink = TraceSink::create(&config.output_path)?;

        let stats = Arc::new(SessionStats::default());
        let channels = registry.len();
        let keys = registry.keys().to_vec();
        let slots = registry.slots().to_vec();
        let mut snapshot = SnapshotBuffer::new(channels);

        // Prime the fast-access path once before going real-time.
        snapshot.fill(self.memory.as_ref(), &slots);

        let clock = Arc::clone(&self.clock);
        let memory = Arc::clone(&self.memory);
        let shared_stats = Arc::clone(&stats);
        let callback: TickCallback = Box::new(move || {
            let tick_ms = match clock.now(0) {
                Ok(t) => t,
                Err(_) => {
                    // Non-fatal: skip this tick's record, keep the
                    // session running. Totals are logged at stop.
                    shared_stats.ticks_skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            };

            snapshot.fill(memory.as_ref(), &slots);

            match sink.append(tick_ms, snapshot.values()) {
                Ok(()) => {
                    shared_stats.records_written.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    shared_stats.write_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        // The callback owns the sink from here on. If registration
        // fails the callback is dropped on the spot, which closes the
        // sink -- the trace file exists but is empty, and we are back
        // in Idle.
        let registration = self
            .clock
            .register_post_tick(callback)
            .map_err(|e| SamplerError::Device(e.to_string()))?;

        if config.write_sidecar {
            if let Err(e) = SessionMeta::new(keys, &config.output_path)
                .write_sidecar(&config.output_path)
            {
                warn!("failed to write metadata sidecar: {e}");
            }
        }

        info!(
            "sampling started: {} channels -> {}",
            channels,
            config.output_path.display()
        );

        *state = State::Running(ActiveSession {
            registration,
            stats,
            channels,
            output_path: config.output_path,
        });
        Ok(())
    }

    /// Stop the active session. Idempotent; never fails.
    ///
    /// Synchronous: when this returns, no tick callback is executing
    /// and none will start. Unregistration drops the callback, which
    /// flushes and closes the sink.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Idle) {
            State::Idle => {}
            State::Running(session) => {
                self.clock.unregister(session.registration);
                let stats = session.stats.snapshot();
                info!(
                    "sampling stopped: {} records ({} channels), {} ticks skipped, {} write errors -> {}",
                    stats.records_written,
                    session.channels,
                    stats.ticks_skipped,
                    stats.write_errors,
                    session.output_path.display()
                );
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), State::Running(_))
    }

    /// Counters of the active session, or `None` when idle.
    #[must_use]
    pub fn stats(&self) -> Option<SamplerStats> {
        match &*self.state.lock() {
            State::Running(session) => Some(session.stats.snapshot()),
            State::Idle => None,
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SamplerConfig::new(SensorList::Inline(vec!["a".into()]), "/tmp/t.data")
            .sidecar(true)
            .stiffness(0.2);

        assert!(config.write_sidecar);
        assert_eq!(config.stiffness, Some(0.2));
        assert_eq!(config.output_path, PathBuf::from("/tmp/t.data"));
    }

    #[test]
    fn test_stats_snapshot_default() {
        let stats = SessionStats::default();
        assert_eq!(stats.snapshot(), SamplerStats::default());
    }
}
