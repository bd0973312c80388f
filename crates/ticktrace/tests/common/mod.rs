// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Test doubles for the external clock, telemetry memory, and
//! device-control collaborators.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use ticktrace::actuator::{ActuatorControl, ActuatorError};
use ticktrace::clock::{ClockError, TickCallback, TickRegistration, TickSource};
use ticktrace::telemetry::{SlotHandle, TelemetryError, TelemetryMemory};

/// Tick source driven explicitly by the test: `fire()` runs the
/// registered callback once, `set_time` controls the reported clock.
pub struct ManualClock {
    time_ms: AtomicI64,
    callback: Mutex<Option<TickCallback>>,
    fail_register: AtomicBool,
    fail_now: AtomicBool,
    next_id: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            time_ms: AtomicI64::new(start_ms),
            callback: Mutex::new(None),
            fail_register: AtomicBool::new(false),
            fail_now: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn set_time(&self, ms: i64) {
        self.time_ms.store(ms, Ordering::SeqCst);
    }

    /// Make `register_post_tick` fail (for unwind tests).
    pub fn set_register_fails(&self, fails: bool) {
        self.fail_register.store(fails, Ordering::SeqCst);
    }

    /// Make `now` fail (for hot-path skip tests).
    pub fn set_now_fails(&self, fails: bool) {
        self.fail_now.store(fails, Ordering::SeqCst);
    }

    /// Run the registered callback once, as the external tick thread
    /// would. Returns false if nothing is registered.
    pub fn fire(&self) -> bool {
        match self.callback.lock().as_mut() {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }

    pub fn has_callback(&self) -> bool {
        self.callback.lock().is_some()
    }
}

impl TickSource for ManualClock {
    fn now(&self, offset_ms: u32) -> Result<i64, ClockError> {
        if self.fail_now.load(Ordering::SeqCst) {
            return Err(ClockError::Query("injected clock failure".into()));
        }
        Ok(self.time_ms.load(Ordering::SeqCst) + i64::from(offset_ms))
    }

    fn register_post_tick(&self, cb: TickCallback) -> Result<TickRegistration, ClockError> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(ClockError::Unavailable("injected registration failure".into()));
        }
        let mut slot = self.callback.lock();
        if slot.is_some() {
            return Err(ClockError::Unavailable("a callback is already registered".into()));
        }
        *slot = Some(cb);
        Ok(TickRegistration::new(
            self.next_id.fetch_add(1, Ordering::Relaxed),
        ))
    }

    fn unregister(&self, _reg: TickRegistration) {
        // Taking the lock waits out an in-flight fire(); clearing the
        // slot drops the callback and everything it owns.
        *self.callback.lock() = None;
    }
}

/// In-process telemetry memory over a fixed key set.
pub struct ArrayTelemetry {
    keys: Vec<String>,
    values: Mutex<Vec<f64>>,
}

impl ArrayTelemetry {
    pub fn new(pairs: &[(&str, f64)]) -> Self {
        Self {
            keys: pairs.iter().map(|(k, _)| (*k).to_string()).collect(),
            values: Mutex::new(pairs.iter().map(|(_, v)| *v).collect()),
        }
    }

    pub fn set(&self, key: &str, value: f64) {
        let ix = self
            .keys
            .iter()
            .position(|k| k == key)
            .expect("unknown test channel");
        self.values.lock()[ix] = value;
    }
}

impl TelemetryMemory for ArrayTelemetry {
    fn bind(&self, keys: &[String]) -> Result<Vec<SlotHandle>, TelemetryError> {
        Ok(keys
            .iter()
            .map(|key| match self.keys.iter().position(|k| k == key) {
                Some(ix) => SlotHandle::resolved(ix as u32),
                None => SlotHandle::unresolved(),
            })
            .collect())
    }

    fn read_into(&self, slots: &[SlotHandle], out: &mut [f64]) {
        let values = self.values.lock();
        for (slot, v) in slots.iter().zip(out.iter_mut()) {
            *v = match slot.index() {
                Some(ix) => values[ix],
                None => f64::NAN,
            };
        }
    }
}

/// Device-control fake that records every call.
#[derive(Default)]
pub struct RecordingActuators {
    pub groups: Mutex<Vec<(String, Vec<String>)>>,
    pub merges: Mutex<Vec<(String, f64, u32)>>,
}

impl ActuatorControl for RecordingActuators {
    fn create_group(&self, name: &str, keys: &[String]) -> Result<(), ActuatorError> {
        self.groups.lock().push((name.to_string(), keys.to_vec()));
        Ok(())
    }

    fn merge_group(&self, name: &str, value: f64, ramp_ms: u32) -> Result<(), ActuatorError> {
        self.merges.lock().push((name.to_string(), value, ramp_ms));
        Ok(())
    }
}
