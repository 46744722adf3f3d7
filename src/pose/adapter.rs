//! Keypoint frame adapter - raw pose model output to a validated joint table.
//!
//! Every downstream stage assumes the joints it needs are present and above
//! the confidence floor. The adapter is the single place that check happens.

use std::fmt;

use super::{Joint, Keypoint, PoseFrame, RawFrame};

/// Frame unusable for the active exercise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRejection {
    /// Required joints that were absent, non-finite or below the floor
    pub missing: Vec<Joint>,
}

impl fmt::Display for FrameRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.missing.iter().map(|joint| joint.name()).collect();
        write!(f, "frame rejected, unusable joints: {}", names.join(", "))
    }
}

/// Validates raw frames against a confidence floor
#[derive(Debug, Clone, Copy)]
pub struct FrameAdapter {
    confidence_floor: f32,
}

impl FrameAdapter {
    pub fn new(confidence_floor: f32) -> Self {
        Self { confidence_floor }
    }

    pub fn confidence_floor(&self) -> f32 {
        self.confidence_floor
    }

    /// Build the joint table and check the required joints
    ///
    /// Unknown keypoint names are ignored. When a name repeats, the most
    /// confident detection wins. A frame with a zero dimension has no usable
    /// joints.
    ///
    /// # Returns
    /// * `Ok(PoseFrame)` - All required joints usable
    /// * `Err(FrameRejection)` - Lists every unusable required joint
    pub fn adapt(&self, raw: &RawFrame, required: &[Joint]) -> Result<PoseFrame, FrameRejection> {
        if (raw.width == 0 || raw.height == 0) && !required.is_empty() {
            return Err(FrameRejection {
                missing: required.to_vec(),
            });
        }

        let mut joints = [Keypoint::default(); Joint::COUNT];

        for raw_point in &raw.keypoints {
            let Ok(joint) = raw_point.name.parse::<Joint>() else {
                continue;
            };
            let slot = &mut joints[joint.index()];
            if raw_point.score > slot.confidence {
                *slot = Keypoint::new(raw_point.x, raw_point.y, raw_point.score);
            }
        }

        let missing: Vec<Joint> = required
            .iter()
            .copied()
            .filter(|joint| !joints[joint.index()].is_usable(self.confidence_floor))
            .collect();

        if missing.is_empty() {
            Ok(PoseFrame::new(joints, raw.width, raw.height))
        } else {
            Err(FrameRejection { missing })
        }
    }
}
