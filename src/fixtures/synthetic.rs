//! Synthetic pose streams for fixtures and integration tests.
//!
//! Motion is defined in continuous time and sampled at the requested frame
//! rate, so the same parameters at 15 fps and 60 fps describes the same movement.
//! Jitter comes from a seeded `StdRng`, keeping every stream reproducible.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::analysis::ExerciseKind;
use crate::pose::{Joint, RawFrame, RawKeypoint};

use super::TimedFrame;

const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 720;

/// Pull-up timing (ms): rest, rise, hold at top, lower, rest
const PULL_UP_PHASES_MS: [f32; 5] = [400.0, 600.0, 200.0, 600.0, 200.0];
const PULL_UP_LEAD_MS: f32 = 300.0;
const PULL_UP_REST_LIFT: f32 = -0.3;
const PULL_UP_TOP_LIFT: f32 = 1.0;
const SHOULDER_Y: f32 = 300.0;
const ARM_SPAN_PX: f32 = 60.0;

/// Jump timing (ms): grounded, flight, landing crouch
const JUMP_PHASES_MS: [f32; 3] = [400.0, 400.0, 400.0];
const GROUND_Y: f32 = 600.0;
const SEGMENT_PX: f32 = 150.0;

const TAIL_MS: f32 = 500.0;

/// Confidence given to every keypoint of a dropout frame
const DROPOUT_CONFIDENCE: f32 = 0.1;

fn default_fps() -> f32 {
    30.0
}

fn default_reps() -> usize {
    3
}

fn default_seed() -> u64 {
    0x5EED_CAFE
}

fn default_jump_height() -> f32 {
    100.0
}

fn default_landing_knee_angle() -> f32 {
    110.0
}

fn default_calibration_ms() -> u64 {
    2000
}

/// Parameters of a generated motion stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(default = "default_reps")]
    pub reps: usize,
    /// Uniform positional noise amplitude per keypoint (pixels)
    #[serde(default)]
    pub jitter_px: f32,
    /// Every Nth frame drops below the confidence floor
    #[serde(default)]
    pub dropout_every: Option<usize>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Peak jump height above ground (pixels)
    #[serde(default = "default_jump_height")]
    pub jump_height_px: f32,
    /// Knee angle held through the landing (degrees)
    #[serde(default = "default_landing_knee_angle")]
    pub landing_knee_angle: f32,
    /// Still, upright stance before the first jump; dropouts skip it
    #[serde(default = "default_calibration_ms")]
    pub calibration_ms: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            reps: default_reps(),
            jitter_px: 0.0,
            dropout_every: None,
            seed: default_seed(),
            jump_height_px: default_jump_height(),
            landing_knee_angle: default_landing_knee_angle(),
            calibration_ms: default_calibration_ms(),
        }
    }
}

/// Samples a [`SyntheticSpec`] into frames
pub struct MotionGenerator {
    spec: SyntheticSpec,
    rng: StdRng,
}

impl MotionGenerator {
    pub fn new(spec: SyntheticSpec) -> Self {
        let rng = StdRng::seed_from_u64(spec.seed);
        Self { spec, rng }
    }

    /// Total stream length in milliseconds
    pub fn duration_ms(&self, exercise: ExerciseKind) -> f32 {
        let reps = self.spec.reps as f32;
        match exercise {
            ExerciseKind::PullUps => {
                PULL_UP_LEAD_MS + reps * PULL_UP_PHASES_MS.iter().sum::<f32>() + TAIL_MS
            }
            ExerciseKind::Jumps => {
                let calibration_ms = self.spec.calibration_ms as f32;
                calibration_ms + reps * JUMP_PHASES_MS.iter().sum::<f32>() + TAIL_MS
            }
        }
    }

    pub fn generate(&mut self, exercise: ExerciseKind) -> Vec<TimedFrame> {
        let fps = if self.spec.fps.is_finite() && self.spec.fps > 0.0 {
            self.spec.fps
        } else {
            default_fps()
        };
        let interval_ms = 1000.0 / fps;
        let duration = self.duration_ms(exercise);
        let count = (duration / interval_ms).floor() as usize + 1;

        let mut frames = Vec::with_capacity(count);
        for index in 0..count {
            let t_ms = index as f32 * interval_ms;
            let mut frame = match exercise {
                ExerciseKind::PullUps => self.pull_up_frame(t_ms),
                ExerciseKind::Jumps => self.jump_frame(t_ms),
            };
            if self.is_dropout(exercise, index, t_ms) {
                frame
                    .keypoints
                    .iter_mut()
                    .for_each(|keypoint| keypoint.score = DROPOUT_CONFIDENCE);
            }
            frames.push(TimedFrame {
                timestamp_ms: t_ms.round() as u64,
                frame,
            });
        }
        frames
    }

    fn is_dropout(&self, exercise: ExerciseKind, index: usize, t_ms: f32) -> bool {
        let Some(every) = self.spec.dropout_every.filter(|every| *every > 0) else {
            return false;
        };
        if exercise == ExerciseKind::Jumps && t_ms < self.spec.calibration_ms as f32 {
            return false;
        }
        index > 0 && index % every == 0
    }

    /// Wrist lift (upper-arm lengths) at time `t_ms`
    fn pull_up_lift(&self, t_ms: f32) -> f32 {
        let cycle: f32 = PULL_UP_PHASES_MS.iter().sum();
        let t = t_ms - PULL_UP_LEAD_MS;
        if t < 0.0 || t >= cycle * self.spec.reps as f32 {
            return PULL_UP_REST_LIFT;
        }

        let mut local = t % cycle;
        let [rest, rise, hold, lower, _] = PULL_UP_PHASES_MS;
        let span = PULL_UP_TOP_LIFT - PULL_UP_REST_LIFT;
        if local < rest {
            return PULL_UP_REST_LIFT;
        }
        local -= rest;
        if local < rise {
            return PULL_UP_REST_LIFT + span * local / rise;
        }
        local -= rise;
        if local < hold {
            return PULL_UP_TOP_LIFT;
        }
        local -= hold;
        if local < lower {
            return PULL_UP_TOP_LIFT - span * local / lower;
        }
        PULL_UP_REST_LIFT
    }

    fn pull_up_frame(&mut self, t_ms: f32) -> RawFrame {
        let lift = self.pull_up_lift(t_ms);
        let wrist_y = SHOULDER_Y - lift * ARM_SPAN_PX;
        let elbow_y = SHOULDER_Y - lift * ARM_SPAN_PX / 2.0;
        let center = FRAME_WIDTH as f32 / 2.0;

        let points = [
            (Joint::Nose, center, SHOULDER_Y - 80.0),
            (Joint::LeftShoulder, center - 60.0, SHOULDER_Y),
            (Joint::RightShoulder, center + 60.0, SHOULDER_Y),
            (Joint::LeftElbow, center - 120.0, elbow_y),
            (Joint::RightElbow, center + 120.0, elbow_y),
            (Joint::LeftWrist, center - 120.0, wrist_y),
            (Joint::RightWrist, center + 120.0, wrist_y),
            (Joint::LeftHip, center - 40.0, SHOULDER_Y + 220.0),
            (Joint::RightHip, center + 40.0, SHOULDER_Y + 220.0),
        ];
        self.build_frame(&points)
    }

    /// Height above ground and knee offset at time `t_ms`
    fn jump_pose(&self, t_ms: f32) -> (f32, f32) {
        let cycle: f32 = JUMP_PHASES_MS.iter().sum();
        let t = t_ms - self.spec.calibration_ms as f32;
        if t < 0.0 || t >= cycle * self.spec.reps as f32 {
            return (0.0, 0.0);
        }

        let [grounded, flight, _] = JUMP_PHASES_MS;
        let local = t % cycle;
        let crouch = knee_offset_for_angle(self.spec.landing_knee_angle);
        if local < grounded {
            (0.0, 0.0)
        } else if local < grounded + flight {
            let progress = (local - grounded) / flight;
            let height = self.spec.jump_height_px * 4.0 * progress * (1.0 - progress);
            // Knees tuck during the descent so touchdown already shows the landing bend
            let knees = if progress >= 0.5 { crouch } else { 0.0 };
            (height, knees)
        } else {
            (0.0, crouch)
        }
    }

    fn jump_frame(&mut self, t_ms: f32) -> RawFrame {
        let (height, knee_dx) = self.jump_pose(t_ms);
        let ankle_y = GROUND_Y - height;
        let knee_y = ankle_y - SEGMENT_PX;
        let hip_y = ankle_y - 2.0 * SEGMENT_PX;
        let center = FRAME_WIDTH as f32 / 2.0;

        let points = [
            (Joint::Nose, center, hip_y - 260.0),
            (Joint::LeftShoulder, center - 60.0, hip_y - 200.0),
            (Joint::RightShoulder, center + 60.0, hip_y - 200.0),
            (Joint::LeftHip, center - 40.0, hip_y),
            (Joint::RightHip, center + 40.0, hip_y),
            (Joint::LeftKnee, center - 40.0 + knee_dx, knee_y),
            (Joint::RightKnee, center + 40.0 + knee_dx, knee_y),
            (Joint::LeftAnkle, center - 40.0, ankle_y),
            (Joint::RightAnkle, center + 40.0, ankle_y),
        ];
        self.build_frame(&points)
    }

    fn build_frame(&mut self, points: &[(Joint, f32, f32)]) -> RawFrame {
        let jitter = self.spec.jitter_px.abs();
        let keypoints = points
            .iter()
            .map(|(joint, x, y)| {
                let (dx, dy) = if jitter > 0.0 {
                    (
                        self.rng.gen_range(-jitter..=jitter),
                        self.rng.gen_range(-jitter..=jitter),
                    )
                } else {
                    (0.0, 0.0)
                };
                RawKeypoint::new(*joint, x + dx, y + dy, 0.95)
            })
            .collect();

        RawFrame {
            keypoints,
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
        }
    }
}

/// Forward knee offset that yields `angle` degrees at the knee when hip and
/// ankle sit one segment above and below it
pub fn knee_offset_for_angle(angle: f32) -> f32 {
    if angle >= 179.9 {
        return 0.0;
    }
    let half = (angle.max(1.0) / 2.0).to_radians();
    SEGMENT_PX / half.tan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::geometry::average_knee_angle;
    use crate::pose::FrameAdapter;

    #[test]
    fn test_seeded_streams_are_reproducible() {
        let spec = SyntheticSpec {
            jitter_px: 2.0,
            ..SyntheticSpec::default()
        };
        let a = MotionGenerator::new(spec.clone()).generate(ExerciseKind::PullUps);
        let b = MotionGenerator::new(spec).generate(ExerciseKind::PullUps);
        assert_eq!(a, b);
    }

    #[test]
    fn test_frame_count_follows_fps() {
        let slow = MotionGenerator::new(SyntheticSpec {
            fps: 15.0,
            ..SyntheticSpec::default()
        })
        .generate(ExerciseKind::Jumps);
        let fast = MotionGenerator::new(SyntheticSpec {
            fps: 60.0,
            ..SyntheticSpec::default()
        })
        .generate(ExerciseKind::Jumps);
        assert!(fast.len() > 3 * slow.len());
        assert_eq!(slow[0].timestamp_ms, 0);
        assert_eq!(slow[1].timestamp_ms, 67);
    }

    #[test]
    fn test_pull_up_lift_profile() {
        let generator = MotionGenerator::new(SyntheticSpec::default());
        assert_eq!(generator.pull_up_lift(0.0), PULL_UP_REST_LIFT);
        assert_eq!(generator.pull_up_lift(PULL_UP_LEAD_MS + 1100.0), PULL_UP_TOP_LIFT);
        assert_eq!(generator.pull_up_lift(1.0e6), PULL_UP_REST_LIFT);
    }

    #[test]
    fn test_knee_offset_matches_angle() {
        for angle in [90.0f32, 110.0, 135.0] {
            let mut generator = MotionGenerator::new(SyntheticSpec {
                landing_knee_angle: angle,
                calibration_ms: 0,
                ..SyntheticSpec::default()
            });
            // Middle of the first landing crouch
            let raw = generator.jump_frame(1000.0);
            let frame = FrameAdapter::new(0.3)
                .adapt(&raw, ExerciseKind::Jumps.required_joints())
                .unwrap();
            assert!((average_knee_angle(&frame) - angle).abs() < 0.5);
        }
        assert_eq!(knee_offset_for_angle(180.0), 0.0);
    }

    #[test]
    fn test_dropouts_skip_calibration() {
        let frames = MotionGenerator::new(SyntheticSpec {
            dropout_every: Some(5),
            ..SyntheticSpec::default()
        })
        .generate(ExerciseKind::Jumps);

        for frame in &frames {
            let dropped = frame.frame.keypoints[0].score < 0.3;
            if frame.timestamp_ms < 2000 {
                assert!(!dropped);
            }
        }
        assert!(frames
            .iter()
            .any(|frame| frame.frame.keypoints[0].score < 0.3));
    }
}
