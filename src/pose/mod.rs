//! Pose input model: joints, keypoints and validated frames.
//!
//! The pose model hands us loosely-typed keypoints keyed by name. Everything
//! downstream of [`FrameAdapter`] works on [`PoseFrame`], a fixed-size table
//! indexed by the closed [`Joint`] enum.

pub mod adapter;
pub mod geometry;
pub mod ring;
pub mod smoothing;

pub use adapter::{FrameAdapter, FrameRejection};
pub use ring::RingBuffer;
pub use smoothing::KeypointSmoother;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Body joints reported by single-person 2D pose models (17-point layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum Joint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl Joint {
    pub const COUNT: usize = 17;

    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::Nose,
        Joint::LeftEye,
        Joint::RightEye,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Name as spelled by the pose model
    pub fn name(self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEye => "left_eye",
            Joint::RightEye => "right_eye",
            Joint::LeftEar => "left_ear",
            Joint::RightEar => "right_ear",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Joint {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Joint::ALL
            .iter()
            .copied()
            .find(|joint| joint.name() == s)
            .ok_or(())
    }
}

/// One joint's image-space position and detection confidence
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    /// Horizontal pixel coordinate
    pub x: f32,
    /// Vertical pixel coordinate (grows downward)
    pub y: f32,
    /// Detection confidence (0.0-1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Whether the point is finite and at or above the confidence floor
    pub fn is_usable(&self, floor: f32) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.confidence >= floor
    }
}

/// Keypoint exactly as delivered by the pose model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawKeypoint {
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(alias = "confidence")]
    pub score: f32,
}

impl RawKeypoint {
    pub fn new(joint: Joint, x: f32, y: f32, score: f32) -> Self {
        Self {
            name: joint.name().to_string(),
            x,
            y,
            score,
        }
    }
}

/// One detection cycle from the pose model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawFrame {
    pub keypoints: Vec<RawKeypoint>,
    pub width: u32,
    pub height: u32,
}

/// Validated per-joint lookup for one frame
///
/// Joints listed as required by the active exercise are guaranteed usable;
/// other slots may hold zero-confidence placeholders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseFrame {
    joints: [Keypoint; Joint::COUNT],
    pub width: u32,
    pub height: u32,
}

impl PoseFrame {
    pub fn new(joints: [Keypoint; Joint::COUNT], width: u32, height: u32) -> Self {
        Self {
            joints,
            width,
            height,
        }
    }

    pub fn joint(&self, joint: Joint) -> Keypoint {
        self.joints[joint.index()]
    }

    pub fn set_joint(&mut self, joint: Joint, keypoint: Keypoint) {
        self.joints[joint.index()] = keypoint;
    }

    pub fn joints(&self) -> &[Keypoint; Joint::COUNT] {
        &self.joints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_names_roundtrip() {
        for joint in Joint::ALL {
            assert_eq!(joint.name().parse::<Joint>(), Ok(joint));
        }
        assert!("left_pinky".parse::<Joint>().is_err());
    }

    #[test]
    fn test_joint_index_matches_table_order() {
        for (idx, joint) in Joint::ALL.iter().enumerate() {
            assert_eq!(joint.index(), idx);
        }
    }

    #[test]
    fn test_keypoint_usable() {
        assert!(Keypoint::new(1.0, 2.0, 0.3).is_usable(0.3));
        assert!(!Keypoint::new(1.0, 2.0, 0.29).is_usable(0.3));
        assert!(!Keypoint::new(f32::NAN, 2.0, 0.9).is_usable(0.3));
    }

    #[test]
    fn test_raw_keypoint_accepts_confidence_alias() {
        let json = r#"{ "name": "nose", "x": 1.0, "y": 2.0, "confidence": 0.8 }"#;
        let raw: RawKeypoint = serde_json::from_str(json).unwrap();
        assert_eq!(raw.score, 0.8);
    }
}
