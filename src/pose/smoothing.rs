//! Time-constant exponential smoothing of keypoint positions.
//!
//! `alpha = 1 - exp(-dt / tau)` so the same physical motion is filtered the
//! same way at 15 fps and 60 fps.

use super::{Joint, Keypoint, PoseFrame};

#[derive(Debug, Clone)]
pub struct KeypointSmoother {
    time_constant_ms: f32,
    state: [Option<Keypoint>; Joint::COUNT],
    last_timestamp_ms: Option<u64>,
}

impl KeypointSmoother {
    pub fn new(time_constant_ms: f32) -> Self {
        Self {
            time_constant_ms,
            state: [None; Joint::COUNT],
            last_timestamp_ms: None,
        }
    }

    pub fn reset(&mut self) {
        self.state = [None; Joint::COUNT];
        self.last_timestamp_ms = None;
    }

    /// Smooth usable joints of `frame` in place
    ///
    /// Joints below `floor` keep their raw value and do not disturb the
    /// filter state.
    pub fn apply(&mut self, frame: &mut PoseFrame, timestamp_ms: u64, floor: f32) {
        if self.time_constant_ms <= 0.0 {
            return;
        }

        let dt_ms = self
            .last_timestamp_ms
            .map(|last| timestamp_ms.saturating_sub(last).max(1) as f32);
        self.last_timestamp_ms = Some(timestamp_ms);
        let alpha = dt_ms
            .map(|dt| 1.0 - (-dt / self.time_constant_ms).exp())
            .unwrap_or(1.0);

        for joint in Joint::ALL {
            let raw = frame.joint(joint);
            if !raw.is_usable(floor) {
                continue;
            }
            let smoothed = match self.state[joint.index()] {
                Some(prev) => Keypoint::new(
                    prev.x + alpha * (raw.x - prev.x),
                    prev.y + alpha * (raw.y - prev.y),
                    raw.confidence,
                ),
                None => raw,
            };
            self.state[joint.index()] = Some(smoothed);
            frame.set_joint(joint, smoothed);
        }
    }
}
