use serde::{Deserialize, Serialize};
use std::fmt;

pub const JOINT_COUNT: usize = 6;

/// Integer status returned by controller commands. Only zero is interpreted.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(transparent)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const SUCCESS: ResultCode = ResultCode(0);

    pub fn is_success(&self) -> bool {
        *self == ResultCode::SUCCESS
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ServiceState {
    Ready,
    Starting,
    Working,
    Closing,
    Closed,
    Unknown(i32),
}

impl From<i32> for ServiceState {
    fn from(value: i32) -> Self {
        match value {
            0 => ServiceState::Ready,
            1 => ServiceState::Starting,
            2 => ServiceState::Working,
            3 => ServiceState::Closing,
            4 => ServiceState::Closed,
            other => ServiceState::Unknown(other),
        }
    }
}

impl From<ServiceState> for i32 {
    fn from(state: ServiceState) -> Self {
        match state {
            ServiceState::Ready => 0,
            ServiceState::Starting => 1,
            ServiceState::Working => 2,
            ServiceState::Closing => 3,
            ServiceState::Closed => 4,
            ServiceState::Unknown(other) => other,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i32::from(*self))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WorkMode {
    Simulation,
    Real,
    Unknown(i32),
}

impl From<i32> for WorkMode {
    fn from(value: i32) -> Self {
        match value {
            0 => WorkMode::Simulation,
            1 => WorkMode::Real,
            other => WorkMode::Unknown(other),
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = match self {
            WorkMode::Simulation => 0,
            WorkMode::Real => 1,
            WorkMode::Unknown(other) => *other,
        };
        write!(f, "{raw}")
    }
}

/// Six joint angles in radians.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct JointVector(pub [f64; JOINT_COUNT]);

impl JointVector {
    /// Copy of this pose with a single joint shifted by `delta`.
    /// Panics if `index` is not a joint index.
    pub fn with_offset(&self, index: usize, delta: f64) -> JointVector {
        let mut joints = self.0;
        joints[index] += delta;
        JointVector(joints)
    }

    pub fn to_degrees(&self) -> [f64; JOINT_COUNT] {
        self.0.map(f64::to_degrees)
    }

    pub fn format_radians(&self) -> String {
        format_values(&self.0, 4)
    }

    pub fn format_degrees(&self) -> String {
        format_values(&self.to_degrees(), 2)
    }
}

fn format_values(values: &[f64], precision: usize) -> String {
    let items = values
        .iter()
        .map(|v| format!("{v:.precision$}"))
        .collect::<Vec<String>>()
        .join(", ");
    format!("[{items}]")
}

impl TryFrom<&[f64]> for JointVector {
    type Error = usize;

    /// Fails with the offending length.
    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let joints: [f64; JOINT_COUNT] = values.try_into().map_err(|_| values.len())?;
        Ok(JointVector(joints))
    }
}

/// Pose snapshot as the controller reports it.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct Waypoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ori: Option<Vec<f64>>,
}

impl Waypoint {
    pub fn from_joints(joints: JointVector) -> Self {
        Waypoint {
            joint: Some(joints.0.to_vec()),
            pos: None,
            ori: None,
        }
    }

    /// The joint field as a full joint vector, if present and six long.
    pub fn joints(&self) -> Option<JointVector> {
        self.joint
            .as_deref()
            .and_then(|values| JointVector::try_from(values).ok())
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MotionLimits {
    pub max_velocity: [f64; JOINT_COUNT],
    pub max_acceleration: [f64; JOINT_COUNT],
}

impl Default for MotionLimits {
    fn default() -> Self {
        MotionLimits {
            max_velocity: [0.2; JOINT_COUNT],
            max_acceleration: [0.3; JOINT_COUNT],
        }
    }
}
