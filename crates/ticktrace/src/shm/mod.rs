// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! POSIX shared-memory telemetry board.
//!
//! The board is the production [`TelemetryMemory`] backend: a single
//! shared memory segment holding a directory of channel names and a
//! table of `f64` values, published by the robot runtime (or by
//! `ticktrace-feed` in development) and read by the sampler.
//!
//! - [`Segment`] wraps `shm_open`/`mmap`/`shm_unlink`.
//! - [`TelemetryBoard`] lays out the segment and implements seqlock
//!   reads so the tick path gets a consistent value set without locks.
//!
//! [`TelemetryMemory`]: crate::telemetry::TelemetryMemory

mod board;
mod segment;

pub use board::{TelemetryBoard, BOARD_MAGIC, BOARD_VERSION, MAX_KEY_LEN};
pub use segment::Segment;

use std::io;
use thiserror::Error;

/// Shared memory errors.
#[derive(Debug, Error)]
pub enum ShmError {
    /// Name violates POSIX shm rules (leading `/`, no other `/`,
    /// at most 255 bytes).
    #[error("invalid segment name: {0}")]
    InvalidName(String),

    /// Segment does not exist.
    #[error("segment not found: {0}")]
    NotFound(String),

    #[error("failed to create segment: {0}")]
    Create(io::Error),

    #[error("failed to open segment: {0}")]
    Open(io::Error),

    #[error("mmap failed: {0}")]
    Mmap(io::Error),

    /// Segment exists but is not a telemetry board (bad magic or
    /// unsupported version).
    #[error("not a telemetry board: {0}")]
    BadHeader(String),

    /// Channel directory is at capacity.
    #[error("board full: capacity {0} channels")]
    Full(usize),

    /// Channel key exceeds [`MAX_KEY_LEN`] bytes.
    #[error("channel key too long ({0} bytes, max {max})", max = MAX_KEY_LEN)]
    KeyTooLong(usize),
}

impl From<ShmError> for crate::telemetry::TelemetryError {
    fn from(e: ShmError) -> Self {
        crate::telemetry::TelemetryError::Unavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShmError>;
