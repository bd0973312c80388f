// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Sampler error taxonomy.
//!
//! Setup-path failures (`start`) are synchronous and carry one of four
//! kinds: configuration, device, I/O, or logic (invalid transition).
//! Hot-path failures never appear here -- they are counted in
//! [`SessionStats`](crate::sampler::SessionStats) instead, because no
//! error may propagate back into the real-time tick thread.

use thiserror::Error;

/// Errors surfaced by [`Sampler::start`](crate::sampler::Sampler::start).
///
/// `stop` never fails and therefore has no error type.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Missing or unreadable sensor list, unusable output path.
    #[error("configuration error: {0}")]
    Config(String),

    /// External clock or telemetry region unavailable or not ready.
    #[error("device error: {0}")]
    Device(String),

    /// Sink open or write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `start` called while a session is already running.
    ///
    /// The existing session is left untouched.
    #[error("sampler already active")]
    AlreadyActive,
}

impl From<crate::clock::ClockError> for SamplerError {
    fn from(e: crate::clock::ClockError) -> Self {
        SamplerError::Device(e.to_string())
    }
}

impl From<crate::telemetry::TelemetryError> for SamplerError {
    fn from(e: crate::telemetry::TelemetryError) -> Self {
        SamplerError::Device(e.to_string())
    }
}

impl From<crate::actuator::ActuatorError> for SamplerError {
    fn from(e: crate::actuator::ActuatorError) -> Self {
        SamplerError::Device(e.to_string())
    }
}
