// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! Actuator-control glue (setup-time only).
//!
//! The sampler itself never commands actuators, but session setup may
//! register two named channel groups with the device-control runtime:
//! one over all joint position actuators, one over all joint stiffness
//! actuators. Having the groups in place lets an operator ramp joint
//! stiffness with a single command against the stiffness group.
//!
//! Joint naming goes through [`JointRole`], a closed set of named
//! roles mapped to device names by a single `match` -- there is no
//! positional coupling between an enum and an array literal to keep in
//! sync. None of this runs on the tick path.

use thiserror::Error;

/// Errors from the device-control runtime.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("actuator command failed: {0}")]
    Command(String),
}

/// Group name covering every joint position actuator.
pub const POSITION_GROUP: &str = "jointActuator";

/// Group name covering every joint stiffness actuator.
pub const STIFFNESS_GROUP: &str = "jointStiffness";

/// Device-control operations the sampler may invoke during setup.
pub trait ActuatorControl: Send + Sync {
    /// Register a named group of actuator channels for later bulk
    /// commands.
    fn create_group(&self, name: &str, keys: &[String]) -> Result<(), ActuatorError>;

    /// Linearly ramp every channel of a group to `value` over
    /// `ramp_ms` milliseconds.
    fn merge_group(&self, name: &str, value: f64, ramp_ms: u32) -> Result<(), ActuatorError>;
}

/// The robot's 25 controllable joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointRole {
    HeadPitch,
    HeadYaw,
    LAnklePitch,
    LAnkleRoll,
    LElbowRoll,
    LElbowYaw,
    LHand,
    LHipPitch,
    LHipRoll,
    LHipYawPitch,
    LKneePitch,
    LShoulderPitch,
    LShoulderRoll,
    LWristYaw,
    RAnklePitch,
    RAnkleRoll,
    RElbowRoll,
    RElbowYaw,
    RHand,
    RHipPitch,
    RHipRoll,
    RKneePitch,
    RShoulderPitch,
    RShoulderRoll,
    RWristYaw,
}

impl JointRole {
    /// Every joint, in group registration order.
    pub const ALL: [JointRole; 25] = [
        JointRole::HeadPitch,
        JointRole::HeadYaw,
        JointRole::LAnklePitch,
        JointRole::LAnkleRoll,
        JointRole::LElbowRoll,
        JointRole::LElbowYaw,
        JointRole::LHand,
        JointRole::LHipPitch,
        JointRole::LHipRoll,
        JointRole::LHipYawPitch,
        JointRole::LKneePitch,
        JointRole::LShoulderPitch,
        JointRole::LShoulderRoll,
        JointRole::LWristYaw,
        JointRole::RAnklePitch,
        JointRole::RAnkleRoll,
        JointRole::RElbowRoll,
        JointRole::RElbowYaw,
        JointRole::RHand,
        JointRole::RHipPitch,
        JointRole::RHipRoll,
        JointRole::RKneePitch,
        JointRole::RShoulderPitch,
        JointRole::RShoulderRoll,
        JointRole::RWristYaw,
    ];

    /// Device name segment for this joint.
    #[must_use]
    pub fn device_name(self) -> &'static str {
        match self {
            JointRole::HeadPitch => "HeadPitch",
            JointRole::HeadYaw => "HeadYaw",
            JointRole::LAnklePitch => "LAnklePitch",
            JointRole::LAnkleRoll => "LAnkleRoll",
            JointRole::LElbowRoll => "LElbowRoll",
            JointRole::LElbowYaw => "LElbowYaw",
            JointRole::LHand => "LHand",
            JointRole::LHipPitch => "LHipPitch",
            JointRole::LHipRoll => "LHipRoll",
            JointRole::LHipYawPitch => "LHipYawPitch",
            JointRole::LKneePitch => "LKneePitch",
            JointRole::LShoulderPitch => "LShoulderPitch",
            JointRole::LShoulderRoll => "LShoulderRoll",
            JointRole::LWristYaw => "LWristYaw",
            JointRole::RAnklePitch => "RAnklePitch",
            JointRole::RAnkleRoll => "RAnkleRoll",
            JointRole::RElbowRoll => "RElbowRoll",
            JointRole::RElbowYaw => "RElbowYaw",
            JointRole::RHand => "RHand",
            JointRole::RHipPitch => "RHipPitch",
            JointRole::RHipRoll => "RHipRoll",
            JointRole::RKneePitch => "RKneePitch",
            JointRole::RShoulderPitch => "RShoulderPitch",
            JointRole::RShoulderRoll => "RShoulderRoll",
            JointRole::RWristYaw => "RWristYaw",
        }
    }

    /// Full position actuator channel key for this joint.
    #[must_use]
    pub fn position_key(self) -> String {
        format!(
            "Device/SubDeviceList/{}/Position/Actuator/Value",
            self.device_name()
        )
    }

    /// Full stiffness actuator channel key for this joint.
    #[must_use]
    pub fn stiffness_key(self) -> String {
        format!(
            "Device/SubDeviceList/{}/Hardness/Actuator/Value",
            self.device_name()
        )
    }
}

/// Register the stock position and stiffness groups over all joints.
pub fn create_default_groups(control: &dyn ActuatorControl) -> Result<(), ActuatorError> {
    let positions: Vec<String> = JointRole::ALL.iter().map(|j| j.position_key()).collect();
    control.create_group(POSITION_GROUP, &positions)?;

    let stiffness: Vec<String> = JointRole::ALL.iter().map(|j| j.stiffness_key()).collect();
    control.create_group(STIFFNESS_GROUP, &stiffness)?;

    Ok(())
}

/// Ramp all joint stiffness to `value` over one second.
///
/// `1.0` is maximum stiffness; keep it low until the platform has been
/// tested.
pub fn set_stiffness(control: &dyn ActuatorControl, value: f64) -> Result<(), ActuatorError> {
    control.merge_group(STIFFNESS_GROUP, value, 1000)
}
