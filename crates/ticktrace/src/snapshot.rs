// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Reusable per-tick snapshot buffer.
//!
//! One [`SnapshotBuffer`] lives for the whole session and is refilled
//! in place on every tick, so the hot path never allocates. The value
//! order matches the channel-set order established at resolve time.

use crate::telemetry::{SlotHandle, TelemetryMemory};

/// Fixed-size buffer holding the latest reading of every channel.
#[derive(Debug)]
pub struct SnapshotBuffer {
    values: Vec<f64>,
}

impl SnapshotBuffer {
    /// Buffer for `len` channels, initially NaN.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![f64::NAN; len],
        }
    }

    /// Overwrite the buffer with the current value of every slot.
    ///
    /// Runs on the tick path: delegates to the memory's bulk read and
    /// performs no allocation. `slots.len()` must equal the buffer
    /// length fixed at construction.
    #[inline]
    pub fn fill(&mut self, memory: &dyn TelemetryMemory, slots: &[SlotHandle]) {
        debug_assert_eq!(slots.len(), self.values.len());
        memory.read_into(slots, &mut self.values);
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
