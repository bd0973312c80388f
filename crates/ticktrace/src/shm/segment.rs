// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! POSIX shared memory segment wrapper.
//!
//! Safe wrappers around `shm_open`, `ftruncate`, and `mmap` for
//! creating and mapping segments. The mapping is released on drop;
//! unlinking the name is the creator's responsibility (see
//! [`Segment::unlink`]).

use super::{Result, ShmError};
use std::ffi::CString;
use std::io;
use std::ptr;

/// A mapped POSIX shared memory segment.
///
/// Automatically unmaps on drop. Does NOT unlink the segment name.
pub struct Segment {
    ptr: *mut u8,
    size: usize,
    name: String,
}

// SAFETY: the mapping is shared memory designed for cross-process
// access; all concurrent access goes through atomics in the board
// layout built on top of it.
unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

impl Segment {
    /// Create a new segment of `size` bytes, replacing any existing
    /// segment with this name. The memory is zero-initialized.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        Self::validate_name(name)?;

        let c_name = CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))?;

        // SAFETY: c_name is a valid NUL-terminated string. shm_unlink
        // on a missing name is harmless (error ignored); shm_open with
        // O_CREAT|O_EXCL either returns a fresh fd or -1.
        let fd = unsafe {
            libc::shm_unlink(c_name.as_ptr());
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_EXCL,
                0o600,
            )
        };
        if fd < 0 {
            return Err(ShmError::Create(io::Error::last_os_error()));
        }

        // SAFETY: fd is the valid descriptor obtained above.
        let ret = unsafe { libc::ftruncate(fd, size as libc::off_t) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            // SAFETY: fd is valid and not used after this error path.
            unsafe { libc::close(fd) };
            return Err(ShmError::Create(err));
        }

        let ptr = Self::map(fd, size)?;

        // SAFETY: ptr covers exactly `size` writable bytes from the
        // successful mmap; no other reference to the fresh segment
        // exists yet.
        unsafe {
            ptr::write_bytes(ptr, 0, size);
        }

        Ok(Self {
            ptr,
            size,
            name: name.to_string(),
        })
    }

    /// Open an existing segment, mapping `size` bytes from its start.
    ///
    /// `size` may be smaller than the actual segment (header-only
    /// probing relies on this); accessing past the true segment size
    /// is the caller's bug.
    pub fn open(name: &str, size: usize) -> Result<Self> {
        Self::validate_name(name)?;

        let c_name = CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))?;

        // SAFETY: c_name is a valid NUL-terminated string; O_RDWR on
        // an existing segment returns a valid fd or -1.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                return Err(ShmError::NotFound(name.to_string()));
            }
            return Err(ShmError::Open(err));
        }

        let ptr = Self::map(fd, size)?;

        Ok(Self {
            ptr,
            size,
            name: name.to_string(),
        })
    }

    /// mmap `size` bytes of `fd` shared read-write, then close the fd
    /// (the mapping keeps its own reference).
    fn map(fd: libc::c_int, size: usize) -> Result<*mut u8> {
        // SAFETY: null addr lets the kernel pick the address; fd is a
        // valid descriptor owned by this call; MAP_SHARED with
        // PROT_READ|PROT_WRITE is the intended cross-process mapping.
        // MAP_FAILED is checked below.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        // SAFETY: fd is valid; the mapping (if any) holds its own
        // reference, so closing is safe in both outcomes.
        unsafe { libc::close(fd) };

        if ptr == libc::MAP_FAILED {
            return Err(ShmError::Mmap(io::Error::last_os_error()));
        }
        Ok(ptr as *mut u8)
    }

    /// POSIX shm name rules: leading `/`, no other `/`, <= 255 bytes.
    fn validate_name(name: &str) -> Result<()> {
        if !name.starts_with('/') {
            return Err(ShmError::InvalidName(format!(
                "segment name must start with '/': {name}"
            )));
        }
        if name.len() > 1 && name[1..].contains('/') {
            return Err(ShmError::InvalidName(format!(
                "segment name cannot contain '/' after prefix: {name}"
            )));
        }
        if name.len() > 255 {
            return Err(ShmError::InvalidName(format!(
                "segment name too long (max 255): {name}"
            )));
        }
        Ok(())
    }

    /// Remove the segment name. Idempotent: a missing segment is not
    /// an error. The memory itself goes away once all mappings drop.
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))?;

        // SAFETY: c_name is a valid NUL-terminated string; shm_unlink
        // only touches the filesystem namespace.
        let ret = unsafe { libc::shm_unlink(c_name.as_ptr()) };

        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(ShmError::Open(err));
            }
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        // SAFETY: ptr/size come from the successful mmap in create()
        // or open(), and Drop runs once.
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.size);
        }
    }
}
