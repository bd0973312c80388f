// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Shared-memory telemetry interface.
//!
//! The robot runtime exposes its sensor values through a shared memory
//! region. The sampler never talks to that region directly; it goes
//! through [`TelemetryMemory`], which binds channel names to fast-access
//! slots once at session start and then serves bulk reads from those
//! slots on every tick. The production implementation is
//! [`TelemetryBoard`](crate::shm::TelemetryBoard); tests substitute an
//! in-process fake.

use thiserror::Error;

/// Errors from the telemetry region.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Region missing, wrong format, or not ready.
    #[error("telemetry region unavailable: {0}")]
    Unavailable(String),
}

/// Fast-access binding of one channel name to a memory location.
///
/// Resolved once per session by the channel registry. A handle that
/// failed to resolve stays permanently unavailable for the session and
/// reads as NaN; underlying layout may change between sessions, so
/// handles must never be reused across `start` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHandle(u32);

/// Sentinel index marking an unresolved handle.
const UNRESOLVED: u32 = u32::MAX;

impl SlotHandle {
    /// Handle bound to slot `index` in the region.
    #[must_use]
    pub fn resolved(index: u32) -> Self {
        debug_assert!(index != UNRESOLVED);
        Self(index)
    }

    /// Handle for a channel that does not exist in the region.
    #[must_use]
    pub const fn unresolved() -> Self {
        Self(UNRESOLVED)
    }

    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.0 != UNRESOLVED
    }

    /// Slot index, or `None` for an unresolved handle.
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        if self.is_resolved() {
            Some(self.0 as usize)
        } else {
            None
        }
    }
}

/// Access to the robot's shared telemetry memory.
///
/// `bind` runs on the control path at session start and may allocate.
/// `read_into` runs on the real-time tick path: implementations must
/// not allocate, block on I/O, or take a lock that a non-real-time
/// thread can hold for unbounded time.
pub trait TelemetryMemory: Send + Sync {
    /// Bind channel names to fast-access slots, in input order.
    ///
    /// Names not present in the region yield
    /// [`SlotHandle::unresolved`]; binding itself only fails when the
    /// region as a whole is unusable.
    fn bind(&self, keys: &[String]) -> Result<Vec<SlotHandle>, TelemetryError>;

    /// Bulk-read the current value of every slot into `out`.
    ///
    /// `out.len()` must equal `slots.len()`. Unresolved slots receive
    /// NaN. Values are best-effort instantaneous reads -- whatever the
    /// region holds right now, no staleness detection.
    fn read_into(&self, slots: &[SlotHandle], out: &mut [f64]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_handle_roundtrip() {
        let h = SlotHandle::resolved(7);
        assert!(h.is_resolved());
        assert_eq!(h.index(), Some(7));
    }

    #[test]
    fn test_unresolved_handle() {
        let h = SlotHandle::unresolved();
        assert!(!h.is_resolved());
        assert_eq!(h.index(), None);
    }
}
