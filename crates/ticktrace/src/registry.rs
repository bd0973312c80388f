// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Channel registry: sensor-list parsing and slot resolution.
//!
//! A sensor list names the telemetry channels to record, one key per
//! line, order-significant (it defines the column order of the output
//! trace). The registry reads the list and binds every key to a
//! fast-access slot in the telemetry memory, once per session.
//!
//! A key that does not exist in the memory region does not fail the
//! session: its slot stays unresolved and every snapshot reports NaN
//! in that column, keeping the record shape stable on a partially
//! populated robot. Each missing key is logged once here, at resolve
//! time.

use crate::error::SamplerError;
use crate::telemetry::{SlotHandle, TelemetryMemory};
use std::path::PathBuf;
use tracing::warn;

/// Source of the channel list for one session.
#[derive(Debug, Clone)]
pub enum SensorList {
    /// Newline-delimited text file, one key per line, blank lines
    /// skipped. A missing or unreadable file fails `start`.
    File(PathBuf),
    /// In-memory key list (e.g. [`default_sensor_keys`]).
    Inline(Vec<String>),
}

impl SensorList {
    fn keys(&self) -> Result<Vec<String>, SamplerError> {
        match self {
            SensorList::File(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    SamplerError::Config(format!(
                        "cannot read sensor list {}: {e}",
                        path.display()
                    ))
                })?;
                Ok(parse_sensor_keys(&text))
            }
            SensorList::Inline(keys) => Ok(keys.clone()),
        }
    }
}

/// Parse sensor-list text: one key per line, surrounding whitespace
/// trimmed, blank lines skipped. Duplicates and order are preserved.
#[must_use]
pub fn parse_sensor_keys(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// The channels of one session, bound to fast-access slots.
///
/// Built by [`ChannelRegistry::resolve`] at `start`; immutable for the
/// session's duration. Slots must not outlive the session -- the
/// underlying memory layout may change between sessions.
#[derive(Debug)]
pub struct ChannelRegistry {
    keys: Vec<String>,
    slots: Vec<SlotHandle>,
}

impl ChannelRegistry {
    /// Read the sensor list and bind every key to a telemetry slot.
    ///
    /// Fails on an unreadable list (`Config`) or an unusable telemetry
    /// region (`Device`); individual missing keys only warn.
    pub fn resolve(
        list: &SensorList,
        memory: &dyn TelemetryMemory,
    ) -> Result<Self, SamplerError> {
        let keys = list.keys()?;
        let slots = memory.bind(&keys)?;
        debug_assert_eq!(keys.len(), slots.len());

        for (key, slot) in keys.iter().zip(&slots) {
            if !slot.is_resolved() {
                warn!("channel not present in telemetry memory, will read as NaN: {key}");
            }
        }

        Ok(Self { keys, slots })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    #[must_use]
    pub fn slots(&self) -> &[SlotHandle] {
        &self.slots
    }
}

/// The stock leg/inertial/battery channel set sampled when no sensor
/// list is given: hip/knee/ankle currents and positions, inertial
/// accelerometer and gyro axes, battery cell voltage and current.
#[must_use]
pub fn default_sensor_keys() -> Vec<String> {
    const KEYS: &[&str] = &[
        "Device/SubDeviceList/RHipPitch/Position/Sensor/Value",
        "Device/SubDeviceList/LKneePitch/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/RKneePitch/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/RAnkleRoll/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/LAnkleRoll/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/RAnklePitch/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/LAnklePitch/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/RHipPitch/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/LHipPitch/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/RHipRoll/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/LHipRoll/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/RHipYawPitch/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/LHipYawPitch/ElectricCurrent/Sensor/Value",
        "Device/SubDeviceList/LKneePitch/Position/Sensor/Value",
        "Device/SubDeviceList/RKneePitch/Position/Sensor/Value",
        "Device/SubDeviceList/RAnkleRoll/Position/Sensor/Value",
        "Device/SubDeviceList/LAnkleRoll/Position/Sensor/Value",
        "Device/SubDeviceList/RAnklePitch/Position/Sensor/Value",
        "Device/SubDeviceList/LAnklePitch/Position/Sensor/Value",
        "Device/SubDeviceList/RHipPitch/Position/Sensor/Value",
        "Device/SubDeviceList/LHipPitch/Position/Sensor/Value",
        "Device/SubDeviceList/RHipRoll/Position/Sensor/Value",
        "Device/SubDeviceList/LHipRoll/Position/Sensor/Value",
        "Device/SubDeviceList/RHipYawPitch/Position/Sensor/Value",
        "Device/SubDeviceList/LHipYawPitch/Position/Sensor/Value",
        "Device/SubDeviceList/InertialSensor/AccX/Sensor/Value",
        "Device/SubDeviceList/InertialSensor/AccY/Sensor/Value",
        "Device/SubDeviceList/InertialSensor/GyrX/Sensor/Value",
        "Device/SubDeviceList/InertialSensor/GyrY/Sensor/Value",
        "Device/SubDeviceList/InertialSensor/GyrZ/Sensor/Value",
        "Device/SubDeviceList/Battery/Charge/Sensor/CellVoltageMin",
        "Device/SubDeviceList/Battery/Current/Sensor/Value",
    ];
    KEYS.iter().map(|k| (*k).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryError;
    use std::io::Write;

    struct MapMemory(Vec<&'static str>);

    impl TelemetryMemory for MapMemory {
        fn bind(&self, keys: &[String]) -> Result<Vec<SlotHandle>, TelemetryError> {
            Ok(keys
                .iter()
                .map(|k| match self.0.iter().position(|have| have == k) {
                    Some(ix) => SlotHandle::resolved(ix as u32),
                    None => SlotHandle::unresolved(),
                })
                .collect())
        }

        fn read_into(&self, slots: &[SlotHandle], out: &mut [f64]) {
            for (slot, v) in slots.iter().zip(out.iter_mut()) {
                *v = slot.index().map_or(f64::NAN, |ix| ix as f64);
            }
        }
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let keys = parse_sensor_keys("a\n\nb\n   \nc\n");
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_parse_preserves_order_and_duplicates() {
        let keys = parse_sensor_keys("b\na\nb\n");
        assert_eq!(keys, ["b", "a", "b"]);
    }

    #[test]
    fn test_parse_trims_carriage_returns() {
        let keys = parse_sensor_keys("a\r\nb\r\n");
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_resolve_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "x\ny\n").expect("write");

        let memory = MapMemory(vec!["x", "y"]);
        let list = SensorList::File(file.path().to_path_buf());
        let registry = ChannelRegistry::resolve(&list, &memory).expect("resolve");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.keys(), ["x", "y"]);
        assert!(registry.slots().iter().all(SlotHandle::is_resolved));
    }

    #[test]
    fn test_resolve_missing_file_is_config_error() {
        let memory = MapMemory(vec![]);
        let list = SensorList::File("/nonexistent/sensors.txt".into());
        let err = ChannelRegistry::resolve(&list, &memory).unwrap_err();
        assert!(matches!(err, SamplerError::Config(_)));
    }

    #[test]
    fn test_resolve_tolerates_missing_channels() {
        let memory = MapMemory(vec!["x"]);
        let list = SensorList::Inline(vec!["x".into(), "ghost".into()]);
        let registry = ChannelRegistry::resolve(&list, &memory).expect("resolve");

        assert_eq!(registry.len(), 2);
        assert!(registry.slots()[0].is_resolved());
        assert!(!registry.slots()[1].is_resolved());
    }

    #[test]
    fn test_default_sensor_keys_shape() {
        let keys = default_sensor_keys();
        assert_eq!(keys.len(), 32);
        assert!(keys
            .iter()
            .all(|k| k.starts_with("Device/SubDeviceList/")));
    }
}
