//! Events published by the exercise processor.
//!
//! Every processed frame yields zero or more of these. They are broadcast to
//! subscribers and also returned in the frame outcome.

use serde::{Deserialize, Serialize};

use crate::analysis::feedback::FeedbackCue;
use crate::analysis::{ExerciseKind, Phase};
use crate::calibration::CalibrationSnapshot;
use crate::engine::state::RepRecord;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ProcessorEvent {
    /// Rep count incremented
    RepCounted {
        exercise: ExerciseKind,
        rep_count: usize,
    },
    /// Coaching cue with its default text
    Feedback { cue: FeedbackCue, message: String },
    /// Running form score update
    FormScore {
        running_score: f32,
        frame_score: f32,
        /// Acute form issue on this frame
        pulse: bool,
    },
    RepRecorded(RepRecord),
    /// Instantaneous height above ground level (pixels)
    JumpHeight { height_px: f32 },
    Calibration(CalibrationSnapshot),
    PhaseChanged { from: Phase, to: Phase },
    ExerciseSwitched { from: ExerciseKind, to: ExerciseKind },
}

impl ProcessorEvent {
    pub fn feedback(cue: FeedbackCue) -> Self {
        ProcessorEvent::Feedback {
            cue,
            message: cue.message().to_string(),
        }
    }
}
