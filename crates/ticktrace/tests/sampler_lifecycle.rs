// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Session lifecycle: start/stop discipline, unwind, idempotence, and
//! hot-path error tolerance, driven through fake clock and telemetry
//! collaborators.

mod common;

use common::{ArrayTelemetry, ManualClock, RecordingActuators};
use std::sync::Arc;
use tempfile::tempdir;
use ticktrace::{Sampler, SamplerConfig, SamplerError, SensorList};

fn two_channel_rig() -> (Arc<ManualClock>, Arc<ArrayTelemetry>, Sampler) {
    let clock = Arc::new(ManualClock::new(100));
    let memory = Arc::new(ArrayTelemetry::new(&[("A", 1.0), ("B", 2.0)]));
    let sampler = Sampler::new(clock.clone(), memory.clone());
    (clock, memory, sampler)
}

fn two_channel_list() -> SensorList {
    SensorList::Inline(vec!["A".into(), "B".into()])
}

#[test]
fn m_ticks_produce_m_records_of_n_fields() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.data");
    let (clock, _memory, sampler) = two_channel_rig();

    sampler
        .start(SamplerConfig::new(two_channel_list(), &path))
        .expect("start");
    assert!(sampler.is_running());

    for i in 0..5 {
        clock.set_time(100 + i * 10);
        assert!(clock.fire());
    }

    let stats = sampler.stats().expect("running stats");
    assert_eq!(stats.records_written, 5);
    assert_eq!(stats.ticks_skipped, 0);

    sampler.stop();
    assert!(!sampler.is_running());

    let text = std::fs::read_to_string(&path).expect("read trace");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    for line in lines {
        // tick timestamp + one field per channel
        assert_eq!(line.split(' ').count(), 3);
    }
}

#[test]
fn stop_is_idempotent() {
    let dir = tempdir().expect("tempdir");
    let (clock, _memory, sampler) = two_channel_rig();

    sampler
        .start(SamplerConfig::new(two_channel_list(), dir.path().join("run.data")))
        .expect("start");

    sampler.stop();
    assert!(!sampler.is_running());
    assert!(!clock.has_callback());

    // Second stop: no error, no panic, still idle.
    sampler.stop();
    assert!(!sampler.is_running());
}

#[test]
fn stop_without_start_is_noop() {
    let (_clock, _memory, sampler) = two_channel_rig();
    sampler.stop();
    assert!(!sampler.is_running());
}

#[test]
fn double_start_is_rejected_and_first_session_survives() {
    let dir = tempdir().expect("tempdir");
    let first = dir.path().join("first.data");
    let second = dir.path().join("second.data");
    let (clock, _memory, sampler) = two_channel_rig();

    sampler
        .start(SamplerConfig::new(two_channel_list(), &first))
        .expect("start");
    clock.fire();

    let err = sampler
        .start(SamplerConfig::new(two_channel_list(), &second))
        .unwrap_err();
    assert!(matches!(err, SamplerError::AlreadyActive));
    // Rejected before any setup: the second sink was never opened.
    assert!(!second.exists());

    // First session keeps recording untouched.
    clock.set_time(110);
    clock.fire();
    assert_eq!(sampler.stats().expect("stats").records_written, 2);

    sampler.stop();
    let text = std::fs::read_to_string(&first).expect("read trace");
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn failed_clock_registration_unwinds_to_idle() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.data");
    let (clock, _memory, sampler) = two_channel_rig();

    clock.set_register_fails(true);
    let err = sampler
        .start(SamplerConfig::new(two_channel_list(), &path))
        .unwrap_err();
    assert!(matches!(err, SamplerError::Device(_)));

    // The sink was opened, then closed by the unwind: file exists,
    // empty, and nothing is registered or running.
    assert!(path.exists());
    assert_eq!(std::fs::metadata(&path).expect("metadata").len(), 0);
    assert!(!sampler.is_running());
    assert!(!clock.has_callback());

    // Back in Idle: a later start succeeds.
    clock.set_register_fails(false);
    sampler
        .start(SamplerConfig::new(two_channel_list(), &path))
        .expect("restart after unwind");
    sampler.stop();
}

#[test]
fn missing_sensor_list_is_config_error_and_creates_no_sink() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.data");
    let (_clock, _memory, sampler) = two_channel_rig();

    let list = SensorList::File(dir.path().join("no-such-sensors.txt"));
    let err = sampler.start(SamplerConfig::new(list, &path)).unwrap_err();

    assert!(matches!(err, SamplerError::Config(_)));
    assert!(!path.exists());
    assert!(!sampler.is_running());
}

#[test]
fn clock_unavailable_at_start_is_device_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.data");
    let (clock, _memory, sampler) = two_channel_rig();

    clock.set_now_fails(true);
    let err = sampler
        .start(SamplerConfig::new(two_channel_list(), &path))
        .unwrap_err();

    assert!(matches!(err, SamplerError::Device(_)));
    assert!(!path.exists());
}

#[test]
fn clock_failure_on_one_tick_skips_that_record_only() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.data");
    let (clock, _memory, sampler) = two_channel_rig();

    sampler
        .start(SamplerConfig::new(two_channel_list(), &path))
        .expect("start");

    clock.fire();

    clock.set_now_fails(true);
    clock.fire(); // skipped, session survives

    clock.set_now_fails(false);
    clock.set_time(120);
    clock.fire();

    let stats = sampler.stats().expect("stats");
    assert_eq!(stats.records_written, 2);
    assert_eq!(stats.ticks_skipped, 1);
    assert!(sampler.is_running());

    sampler.stop();
    let text = std::fs::read_to_string(&path).expect("read trace");
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn dropping_the_sampler_stops_the_session() {
    let dir = tempdir().expect("tempdir");
    let clock = Arc::new(ManualClock::new(0));
    let memory = Arc::new(ArrayTelemetry::new(&[("A", 1.0)]));

    {
        let sampler = Sampler::new(clock.clone(), memory);
        sampler
            .start(SamplerConfig::new(
                SensorList::Inline(vec!["A".into()]),
                dir.path().join("run.data"),
            ))
            .expect("start");
        assert!(clock.has_callback());
    }

    // Implicit teardown unregistered and released the callback.
    assert!(!clock.has_callback());
}

#[test]
fn stop_can_come_from_another_thread() {
    let dir = tempdir().expect("tempdir");
    let (clock, _memory, sampler) = two_channel_rig();
    let sampler = Arc::new(sampler);

    sampler
        .start(SamplerConfig::new(two_channel_list(), dir.path().join("run.data")))
        .expect("start");
    clock.fire();

    let remote = Arc::clone(&sampler);
    std::thread::spawn(move || remote.stop())
        .join()
        .expect("stop thread");

    assert!(!sampler.is_running());
    assert!(!clock.has_callback());
}

#[test]
fn actuator_groups_are_registered_during_setup() {
    let dir = tempdir().expect("tempdir");
    let clock = Arc::new(ManualClock::new(0));
    let memory = Arc::new(ArrayTelemetry::new(&[("A", 1.0)]));
    let control = Arc::new(RecordingActuators::default());
    let sampler = Sampler::new(clock, memory).with_actuators(control.clone());

    sampler
        .start(
            SamplerConfig::new(
                SensorList::Inline(vec!["A".into()]),
                dir.path().join("run.data"),
            )
            .stiffness(0.2),
        )
        .expect("start");
    sampler.stop();

    let groups = control.groups.lock();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, "jointActuator");
    assert_eq!(groups[0].1.len(), 25);
    assert_eq!(groups[1].0, "jointStiffness");
    assert_eq!(groups[1].1.len(), 25);

    let merges = control.merges.lock();
    assert_eq!(merges.as_slice(), [("jointStiffness".to_string(), 0.2, 1000)]);
}
