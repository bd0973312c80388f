// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Append-only trace sink.
//!
//! One record per tick, plain text, no header row:
//!
//! ```text
//! <tick_time_ms> <sample_1> <sample_2> ... <sample_N>\n
//! ```
//!
//! Samples are decimal floating point in channel-set order; an
//! unavailable channel prints as `NaN`. Values use Rust's shortest
//! round-trip float formatting, which always keeps a decimal point
//! (`1.0`, not `1`), so columns stay unambiguous.
//!
//! `append` is the only sink operation on the real-time path. The
//! record is formatted into a line buffer that is reused across ticks,
//! so steady-state appends do not reallocate. Session metadata that
//! would otherwise want a header row lives in an optional JSON sidecar
//! next to the trace file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Pre-sized capacity of the reusable line buffer: a 64-channel record
/// fits without growing.
const LINE_CAPACITY: usize = 1536;

/// Append-only record writer for one session.
pub struct TraceSink {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    line: String,
    records_written: u64,
    appends_dropped: u64,
}

impl TraceSink {
    /// Create (truncate) the trace file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            path,
            line: String::with_capacity(LINE_CAPACITY),
            records_written: 0,
            appends_dropped: 0,
        })
    }

    /// Append one record.
    ///
    /// After `close`, appending is a counted no-op rather than an
    /// error -- the tick thread must never observe a failure it cannot
    /// handle.
    pub fn append(&mut self, tick_ms: i64, samples: &[f64]) -> io::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            self.appends_dropped += 1;
            return Ok(());
        };

        self.line.clear();
        // Infallible: fmt::Write to a String cannot fail.
        let _ = write!(self.line, "{tick_ms}");
        for sample in samples {
            // {:?} is shortest round-trip with a guaranteed decimal
            // point; NaN prints as "NaN".
            let _ = write!(self.line, " {sample:?}");
        }
        self.line.push('\n');

        writer.write_all(self.line.as_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush and close the sink. Idempotent.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records successfully appended.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Appends attempted after close.
    #[must_use]
    pub fn appends_dropped(&self) -> u64 {
        self.appends_dropped
    }
}

impl Drop for TraceSink {
    fn drop(&mut self) {
        // Best effort; explicit close() reports errors.
        let _ = self.close();
    }
}

/// Session metadata written as a JSON sidecar (`<trace>.meta.json`)
/// when enabled, keeping the trace file itself headerless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Wall-clock session start.
    pub started_at: DateTime<Utc>,
    /// Channel keys in column order.
    pub channels: Vec<String>,
    /// Trace file name this sidecar describes.
    pub trace_file: String,
}

impl SessionMeta {
    #[must_use]
    pub fn new(channels: Vec<String>, trace_path: &Path) -> Self {
        Self {
            started_at: Utc::now(),
            channels,
            trace_file: trace_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Sidecar path for a trace file.
    #[must_use]
    pub fn sidecar_path(trace_path: &Path) -> PathBuf {
        let mut name = trace_path.as_os_str().to_owned();
        name.push(".meta.json");
        PathBuf::from(name)
    }

    /// Write the sidecar next to `trace_path`.
    pub fn write_sidecar(&self, trace_path: &Path) -> io::Result<PathBuf> {
        let path = Self::sidecar_path(trace_path);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}
