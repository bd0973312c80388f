// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Telemetry board: the shared-memory value table.
//!
//! # Segment Layout
//!
//! ```text
//! Offset              Size            Content
//! 0                   64              BoardHeader (magic, version,
//!                                     capacity, count, epoch)
//! 64                  cap * 128       key directory, one fixed-width
//!                                     NUL-padded entry per channel
//! 64 + cap * 128      cap * 8         value table (f64 bit patterns
//!                                     in AtomicU64 cells)
//! ```
//!
//! # Consistency Protocol
//!
//! One publisher process updates values; any number of readers sample
//! them. A seqlock over the header `epoch` field keeps a bulk read
//! internally consistent without locks:
//!
//! - Writer: store odd epoch (Relaxed), Release fence, store values
//!   (Relaxed), store even epoch (Release). The fence keeps the odd
//!   marker visible before any value write; the closing Release pairs
//!   with the readers' Acquire.
//! - Reader: load epoch (Acquire), copy values (Relaxed), Acquire
//!   fence, re-load epoch. Odd or changed epoch means the copy may be
//!   torn -- retry.
//!
//! Retries are bounded: after [`SEQLOCK_RETRIES`] failed attempts the
//! reader keeps its last copy. The tick path must have bounded latency,
//! and a mixed-epoch sample of a live telemetry value is still a valid
//! instantaneous reading of each individual channel (every cell is a
//! whole atomic `f64`; only cross-channel consistency is lost).
//!
//! The directory only grows: `register` appends and bumps `count` with
//! a Release store, so an index handed out by `lookup` stays valid for
//! the lifetime of the segment.

use super::{Result, Segment, ShmError};
use crate::telemetry::{SlotHandle, TelemetryError, TelemetryMemory};
use std::sync::atomic::{fence, AtomicU32, AtomicU64, Ordering};

/// Magic number identifying a telemetry board segment ("TCKT").
pub const BOARD_MAGIC: u32 = 0x5443_4B54;

/// Current layout version.
pub const BOARD_VERSION: u32 = 1;

/// Fixed width of one key directory entry.
pub const MAX_KEY_LEN: usize = 128;

/// Header size (one cache line).
const HEADER_SIZE: usize = 64;

/// Seqlock read attempts before accepting a possibly-mixed copy.
const SEQLOCK_RETRIES: usize = 3;

/// Board header, at offset 0 of the segment.
#[repr(C, align(64))]
struct BoardHeader {
    magic: u32,
    version: u32,
    capacity: u32,
    /// Registered channel count. Grows only; Release on store,
    /// Acquire on load so a new directory entry is visible before its
    /// index is.
    count: AtomicU32,
    /// Seqlock epoch: odd while a bulk value update is in progress.
    epoch: AtomicU64,
    _pad: [u8; 40],
}

/// Shared-memory channel directory + value table.
///
/// Created by the publishing side (`create` + `register` + `publish`),
/// opened read-mostly by the sampler (`open` + `lookup` +
/// [`TelemetryMemory`] reads).
pub struct TelemetryBoard {
    seg: Segment,
    capacity: usize,
}

impl TelemetryBoard {
    fn layout_size(capacity: usize) -> usize {
        HEADER_SIZE + capacity * (MAX_KEY_LEN + std::mem::size_of::<u64>())
    }

    /// Create a new board with room for `capacity` channels, replacing
    /// any existing segment of the same name.
    pub fn create(name: &str, capacity: usize) -> Result<Self> {
        let seg = Segment::create(name, Self::layout_size(capacity))?;

        // SAFETY: the segment is a fresh zeroed mapping of at least
        // HEADER_SIZE bytes with no other reference; mmap returns
        // page-aligned memory, satisfying the header's alignment.
        unsafe {
            std::ptr::write(
                seg.as_ptr().cast::<BoardHeader>(),
                BoardHeader {
                    magic: BOARD_MAGIC,
                    version: BOARD_VERSION,
                    capacity: capacity as u32,
                    count: AtomicU32::new(0),
                    epoch: AtomicU64::new(0),
                    _pad: [0u8; 40],
                },
            );
        }

        Ok(Self { seg, capacity })
    }

    /// Open an existing board.
    ///
    /// Probes the header first to validate the layout and learn the
    /// capacity, then maps the full segment.
    pub fn open(name: &str) -> Result<Self> {
        let capacity = {
            let probe = Segment::open(name, HEADER_SIZE)?;
            // SAFETY: the probe mapping covers HEADER_SIZE bytes and
            // is page-aligned.
            let header = unsafe { &*probe.as_ptr().cast::<BoardHeader>() };
            if header.magic != BOARD_MAGIC {
                return Err(ShmError::BadHeader(format!(
                    "bad magic 0x{:08x} in {name}",
                    header.magic
                )));
            }
            if header.version != BOARD_VERSION {
                return Err(ShmError::BadHeader(format!(
                    "unsupported version {} in {name}",
                    header.version
                )));
            }
            header.capacity as usize
        };

        let seg = Segment::open(name, Self::layout_size(capacity))?;
        Ok(Self { seg, capacity })
    }

    /// Remove the board's segment name. Idempotent.
    pub fn unlink(name: &str) -> Result<()> {
        Segment::unlink(name)
    }

    fn header(&self) -> &BoardHeader {
        // SAFETY: the mapping covers at least HEADER_SIZE bytes and is
        // page-aligned; the header was initialized by create() (or
        // validated by open()).
        unsafe { &*self.seg.as_ptr().cast::<BoardHeader>() }
    }

    fn value_cell(&self, index: usize) -> &AtomicU64 {
        debug_assert!(index < self.capacity);
        let offset = HEADER_SIZE + self.capacity * MAX_KEY_LEN + index * 8;
        // SAFETY: index < capacity keeps the cell inside the mapping;
        // the value table offset is 8-aligned (64 + capacity * 128).
        unsafe { &*self.seg.as_ptr().add(offset).cast::<AtomicU64>() }
    }

    fn key_entry(&self, index: usize) -> &[u8] {
        debug_assert!(index < self.capacity);
        let offset = HEADER_SIZE + index * MAX_KEY_LEN;
        // SAFETY: index < capacity keeps the entry inside the mapping.
        unsafe { std::slice::from_raw_parts(self.seg.as_ptr().add(offset), MAX_KEY_LEN) }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registered channels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.header().count.load(Ordering::Acquire) as usize
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.seg.name()
    }

    /// Register a channel key, returning its slot index.
    ///
    /// Publisher-side only; a single process owns registration.
    pub fn register(&self, key: &str) -> Result<usize> {
        let bytes = key.as_bytes();
        if bytes.len() > MAX_KEY_LEN {
            return Err(ShmError::KeyTooLong(bytes.len()));
        }

        let header = self.header();
        let index = header.count.load(Ordering::Acquire) as usize;
        if index >= self.capacity {
            return Err(ShmError::Full(self.capacity));
        }

        let offset = HEADER_SIZE + index * MAX_KEY_LEN;
        // SAFETY: index < capacity keeps the entry inside the mapping;
        // the entry is still zeroed (count has never covered it), so
        // no reader looks at it before the Release store below.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.seg.as_ptr().add(offset),
                bytes.len(),
            );
        }

        // Release: entry bytes visible before the index is.
        header.count.store((index + 1) as u32, Ordering::Release);
        Ok(index)
    }

    /// Find the slot index of `key`, if registered.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<usize> {
        let bytes = key.as_bytes();
        if bytes.is_empty() || bytes.len() > MAX_KEY_LEN {
            return None;
        }
        (0..self.count()).find(|&ix| {
            let entry = self.key_entry(ix);
            entry[..bytes.len()] == *bytes
                && (bytes.len() == MAX_KEY_LEN || entry[bytes.len()] == 0)
        })
    }

    /// The registered key at `index`.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<String> {
        if index >= self.count() {
            return None;
        }
        let entry = self.key_entry(index);
        let len = entry.iter().position(|&b| b == 0).unwrap_or(MAX_KEY_LEN);
        Some(String::from_utf8_lossy(&entry[..len]).into_owned())
    }

    /// Publish a batch of value updates as one consistent epoch.
    ///
    /// Publisher-side only. Indices must come from `register`.
    pub fn publish(&self, updates: &[(usize, f64)]) {
        let header = self.header();
        let epoch = header.epoch.load(Ordering::Relaxed);

        // Odd epoch: readers back off until the batch commits.
        header.epoch.store(epoch.wrapping_add(1), Ordering::Relaxed);
        // Keep the odd marker visible before any value store.
        fence(Ordering::Release);

        let count = self.count();
        for &(index, value) in updates {
            if index < count {
                self.value_cell(index).store(value.to_bits(), Ordering::Relaxed);
            }
        }

        // Release: all value stores visible before the even epoch.
        header.epoch.store(epoch.wrapping_add(2), Ordering::Release);
    }

    /// Seqlock bulk read of `slots` into `out`.
    ///
    /// Unresolved slots read as NaN. Bounded: after a few torn
    /// attempts the last copy is kept (see module docs).
    fn read_consistent(&self, slots: &[SlotHandle], out: &mut [f64]) {
        debug_assert_eq!(slots.len(), out.len());
        let header = self.header();
        let mut attempt = 0;

        loop {
            let before = header.epoch.load(Ordering::Acquire);

            for (slot, value) in slots.iter().zip(out.iter_mut()) {
                *value = match slot.index() {
                    Some(ix) if ix < self.capacity => {
                        f64::from_bits(self.value_cell(ix).load(Ordering::Relaxed))
                    }
                    _ => f64::NAN,
                };
            }

            // Pairs with the writer's closing Release store; keeps the
            // value loads above from drifting past the re-check.
            fence(Ordering::Acquire);
            let after = header.epoch.load(Ordering::Relaxed);

            if (before & 1 == 0 && before == after) || attempt >= SEQLOCK_RETRIES {
                return;
            }
            attempt += 1;
            std::hint::spin_loop();
        }
    }
}

impl TelemetryMemory for TelemetryBoard {
    fn bind(&self, keys: &[String]) -> std::result::Result<Vec<SlotHandle>, TelemetryError> {
        Ok(keys
            .iter()
            .map(|key| match self.lookup(key) {
                Some(ix) => SlotHandle::resolved(ix as u32),
                None => SlotHandle::unresolved(),
            })
            .collect())
    }

    fn read_into(&self, slots: &[SlotHandle], out: &mut [f64]) {
        self.read_consistent(slots, out);
    }
}
