// JumpCalibration - ready-stance detection before jump tracking
//
// The user stands still with near-straight legs. Each usable frame is pushed
// into a rolling time window; the stance is "stable" while the hip and ankle
// positions barely move across that window and "ready" while it is stable
// and the knees are extended enough. Ready time fills progress, anything
// else drains it linearly. Reaching 100% latches the ground reference.

use crate::calibration::progress::{guidance_for, CalibrationSnapshot};
use crate::calibration::state::GroundReference;
use crate::config::CalibrationConfig;
use crate::error::CalibrationError;
use crate::pose::geometry::{average_ankle_y, average_knee_angle};
use crate::pose::{Joint, PoseFrame, RingBuffer};

/// Joints whose stillness decides stability
const STABILITY_JOINTS: [Joint; 4] = [
    Joint::LeftHip,
    Joint::RightHip,
    Joint::LeftAnkle,
    Joint::RightAnkle,
];

/// One usable frame retained in the stability window
#[derive(Debug, Clone, Copy)]
struct CalibrationSample {
    timestamp_ms: u64,
    positions: [(f32, f32); 4],
    ankle_y: f32,
}

impl CalibrationSample {
    fn from_frame(frame: &PoseFrame, timestamp_ms: u64) -> Self {
        let mut positions = [(0.0, 0.0); 4];
        for (slot, joint) in positions.iter_mut().zip(STABILITY_JOINTS.iter()) {
            let keypoint = frame.joint(*joint);
            *slot = (keypoint.x, keypoint.y);
        }
        Self {
            timestamp_ms,
            positions,
            ankle_y: average_ankle_y(frame),
        }
    }
}

/// Jump calibration procedure
///
/// Owned by the jump analyzer. Feed it every frame while no ground
/// reference exists: [`observe`](Self::observe) for usable frames and
/// [`mark_unusable`](Self::mark_unusable) for rejected ones.
pub struct JumpCalibration {
    config: CalibrationConfig,
    window: RingBuffer<CalibrationSample>,
    progress: f32,
    last_timestamp_ms: Option<u64>,
    not_ready_since_ms: Option<u64>,
    last_knee_angle: f32,
    is_stable: bool,
    usable: bool,
    reference: Option<GroundReference>,
}

impl JumpCalibration {
    pub fn new(config: CalibrationConfig) -> Self {
        let window = RingBuffer::new(config.window_capacity);
        Self {
            config,
            window,
            progress: 0.0,
            last_timestamp_ms: None,
            not_ready_since_ms: None,
            last_knee_angle: 0.0,
            is_stable: false,
            usable: false,
            reference: None,
        }
    }

    /// Feed one usable frame
    ///
    /// # Returns
    /// * `Some(GroundReference)` - This frame completed calibration
    /// * `None` - Still calibrating, or already complete
    pub fn observe(&mut self, frame: &PoseFrame, timestamp_ms: u64) -> Option<GroundReference> {
        if self.reference.is_some() {
            return None;
        }

        let dt_ms = self.step(timestamp_ms);
        self.usable = true;

        self.window.push(CalibrationSample::from_frame(frame, timestamp_ms));
        let window_ms = self.config.window_ms;
        self.window
            .evict_while(|sample| sample.timestamp_ms.saturating_add(window_ms) < timestamp_ms);

        self.last_knee_angle = average_knee_angle(frame);
        self.is_stable = self.window_is_stable(frame.height as f32);
        let ready = self.is_stable && self.last_knee_angle >= self.config.min_knee_angle;

        if ready {
            self.not_ready_since_ms = None;
            let hold_ms = self.config.hold_ms.max(1) as f32;
            self.progress = (self.progress + 100.0 * dt_ms / hold_ms).min(100.0);
        } else {
            let since = *self.not_ready_since_ms.get_or_insert(timestamp_ms);
            if timestamp_ms.saturating_sub(since) >= self.config.instability_timeout_ms {
                tracing::debug!(
                    "Calibration unstable for {}ms, restarting",
                    self.config.instability_timeout_ms
                );
                self.restart();
                self.not_ready_since_ms = Some(timestamp_ms);
                return None;
            }
            let decay = self.config.decay_per_second * dt_ms / 1000.0;
            self.progress = (self.progress - decay).max(0.0);
        }

        if self.progress >= 100.0 {
            return self.latch(timestamp_ms);
        }
        None
    }

    /// Required joints were unusable this frame: progress drops to zero
    pub fn mark_unusable(&mut self, timestamp_ms: u64) {
        if self.reference.is_some() {
            return;
        }
        self.last_timestamp_ms = Some(timestamp_ms);
        self.usable = false;
        self.restart();
    }

    /// Discard progress and any latched reference
    pub fn reset(&mut self) {
        self.restart();
        self.reference = None;
        self.last_timestamp_ms = None;
        self.usable = false;
        self.last_knee_angle = 0.0;
    }

    /// Current state for live display
    pub fn snapshot(&self) -> CalibrationSnapshot {
        let complete = self.reference.is_some();
        if !complete && !self.usable {
            return CalibrationSnapshot::idle(self.config.min_knee_angle);
        }
        let angle_ready = self.last_knee_angle >= self.config.min_knee_angle;
        CalibrationSnapshot {
            progress: if complete { 100.0 } else { self.progress },
            is_stable: self.is_stable,
            knee_angle: self.last_knee_angle,
            min_knee_angle: self.config.min_knee_angle,
            is_calibrating: !complete,
            guidance: guidance_for(complete, self.usable, self.is_stable, angle_ready),
        }
    }

    pub fn progress(&self) -> f32 {
        if self.reference.is_some() {
            100.0
        } else {
            self.progress
        }
    }

    pub fn is_complete(&self) -> bool {
        self.reference.is_some()
    }

    pub fn reference(&self) -> Option<GroundReference> {
        self.reference
    }

    /// Latched ground level
    ///
    /// # Returns
    /// * `Ok(f32)` - Ground level in pixels
    /// * `Err(CalibrationError::NotComplete)` - Calibration still running
    pub fn ground_level(&self) -> Result<f32, CalibrationError> {
        self.reference
            .map(|reference| reference.ground_level)
            .ok_or(CalibrationError::NotComplete)
    }

    /// Elapsed time since the previous frame, clamped to the max step
    fn step(&mut self, timestamp_ms: u64) -> f32 {
        let dt = match self.last_timestamp_ms {
            Some(previous) => timestamp_ms.saturating_sub(previous),
            None => 0,
        };
        self.last_timestamp_ms = Some(timestamp_ms);
        dt.min(self.config.max_step_ms) as f32
    }

    fn restart(&mut self) {
        self.progress = 0.0;
        self.window.clear();
        self.is_stable = false;
        self.not_ready_since_ms = None;
    }

    fn latch(&mut self, timestamp_ms: u64) -> Option<GroundReference> {
        let heights: Vec<f32> = self.window.iter().map(|sample| sample.ankle_y).collect();
        match GroundReference::from_window(&heights, self.config.min_samples, timestamp_ms) {
            Ok(reference) => {
                tracing::info!(
                    "Jump calibration complete: ground_level={:.1}px over {} samples",
                    reference.ground_level,
                    reference.sample_count
                );
                self.progress = 100.0;
                self.reference = Some(reference);
                Some(reference)
            }
            Err(err) => {
                crate::error::log_calibration_error(&err, "latch");
                self.progress = 99.0;
                None
            }
        }
    }

    /// Largest per-axis standard deviation over the stability joints,
    /// compared against a fraction of the frame height
    fn window_is_stable(&self, frame_height: f32) -> bool {
        let count = self.window.len();
        if count < self.config.min_samples.max(2) {
            return false;
        }

        let n = count as f32;
        let mut worst_std = 0.0f32;
        for joint in 0..STABILITY_JOINTS.len() {
            let (sum_x, sum_y) = self.window.iter().fold((0.0, 0.0), |acc, sample| {
                (acc.0 + sample.positions[joint].0, acc.1 + sample.positions[joint].1)
            });
            let (mean_x, mean_y) = (sum_x / n, sum_y / n);
            let (var_x, var_y) = self.window.iter().fold((0.0, 0.0), |acc, sample| {
                let dx = sample.positions[joint].0 - mean_x;
                let dy = sample.positions[joint].1 - mean_y;
                (acc.0 + dx * dx, acc.1 + dy * dy)
            });
            worst_std = worst_std.max((var_x / n).sqrt()).max((var_y / n).sqrt());
        }

        worst_std <= self.config.max_position_std_ratio * frame_height
    }
}
