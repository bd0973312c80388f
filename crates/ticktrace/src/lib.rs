// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! ticktrace -- fixed-rate robot telemetry sampling to plain-text
//! traces.
//!
//! ticktrace binds a list of named telemetry channels (joint
//! positions, motor currents, inertial sensors, battery state) to
//! fast-access slots in the robot's shared-memory region once per
//! session, then records one timestamped snapshot per tick of an
//! external fixed-period clock (~10 ms). The per-tick path is
//! allocation-free and lock-free; lifecycle is `start`/`stop` with a
//! single active session and full unwind on partial start failure.
//!
//! # Quick Start
//!
//! ```bash
//! # Feed a development telemetry board with synthetic values
//! ticktrace-feed --segment /ticktrace
//!
//! # Record the stock sensor set at 10 ms until Ctrl+C
//! ticktrace-record --builtin-list --output run.data
//! ```
//!
//! # Record Format
//!
//! One line per tick, no header row:
//!
//! ```text
//! <tick_time_ms> <sample_1> <sample_2> ... <sample_N>
//! ```
//!
//! Column order is the sensor-list order; a channel missing from the
//! telemetry region reads as `NaN`. Optional session metadata (channel
//! names, start time) goes to a `<output>.meta.json` sidecar.
//!
//! # Architecture
//!
//! - [`clock`]: the external tick source ([`clock::TickSource`]) and
//!   the thread-backed production implementation.
//! - [`telemetry`] + [`shm`]: the shared-memory telemetry interface
//!   and its POSIX board backend.
//! - [`registry`]: sensor-list parsing and slot resolution.
//! - [`snapshot`] + [`sink`]: the reusable per-tick buffer and the
//!   append-only trace writer.
//! - [`sampler`]: session lifecycle and the tick callback.
//! - [`actuator`]: setup-time device-control glue (never on the tick
//!   path).

pub mod actuator;
pub mod clock;
pub mod error;
pub mod registry;
pub mod sampler;
pub mod shm;
pub mod sink;
pub mod snapshot;
pub mod telemetry;

pub use clock::{ThreadTicker, TickRegistration, TickSource};
pub use error::SamplerError;
pub use registry::{ChannelRegistry, SensorList};
pub use sampler::{Sampler, SamplerConfig, SamplerStats};
pub use shm::TelemetryBoard;
pub use sink::TraceSink;
pub use telemetry::{SlotHandle, TelemetryMemory};
