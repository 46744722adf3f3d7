// Analysis module - per-exercise phase detection, scoring and feedback
//
// Each exercise is an ExerciseAnalyzer strategy owned by the processor:
// - PullUpAnalyzer: resting → ascending → at-top → descending → resting
// - JumpAnalyzer: calibration, then grounded → airborne → landed → grounded
//
// Analyzers only see validated frames. They decide phase transitions and
// per-frame form deviation; the processor owns scoring, history and events.

use std::fmt;
use std::str::FromStr;

use crate::calibration::{CalibrationSnapshot, GroundReference};
use crate::config::AppConfig;
use crate::error::{CalibrationError, ProcessorError};
use crate::pose::{Joint, PoseFrame};

pub mod feedback;
pub mod height;
pub mod jump;
pub mod pull_up;
pub mod scoring;

use feedback::FeedbackCue;
use height::LandingQuality;
use jump::JumpAnalyzer;
use pull_up::PullUpAnalyzer;

/// Supported exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ExerciseKind {
    #[serde(rename = "pull-ups")]
    PullUps,
    #[serde(rename = "jumps")]
    Jumps,
}

impl ExerciseKind {
    /// Identifier used by callers and fixture files
    pub fn name(&self) -> &'static str {
        match self {
            ExerciseKind::PullUps => "pull-ups",
            ExerciseKind::Jumps => "jumps",
        }
    }

    /// Joints that must be usable for a frame to advance this exercise
    pub fn required_joints(&self) -> &'static [Joint] {
        match self {
            ExerciseKind::PullUps => &[
                Joint::LeftShoulder,
                Joint::RightShoulder,
                Joint::LeftElbow,
                Joint::RightElbow,
                Joint::LeftWrist,
                Joint::RightWrist,
            ],
            ExerciseKind::Jumps => &[
                Joint::LeftHip,
                Joint::RightHip,
                Joint::LeftKnee,
                Joint::RightKnee,
                Joint::LeftAnkle,
                Joint::RightAnkle,
            ],
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExerciseKind {
    type Err = ProcessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pull-ups" | "pull_ups" | "pullups" => Ok(ExerciseKind::PullUps),
            "jumps" => Ok(ExerciseKind::Jumps),
            _ => Err(ProcessorError::UnknownExercise {
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullUpPhase {
    Resting,
    Ascending,
    AtTop,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpPhase {
    Grounded,
    Airborne,
    Landed,
}

/// Current phase of the active exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "exercise", content = "phase")]
pub enum Phase {
    PullUp(PullUpPhase),
    Jump(JumpPhase),
}

impl Phase {
    /// Initial phase for an exercise
    pub fn initial(kind: ExerciseKind) -> Self {
        match kind {
            ExerciseKind::PullUps => Phase::PullUp(PullUpPhase::Resting),
            ExerciseKind::Jumps => Phase::Jump(JumpPhase::Grounded),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::PullUp(PullUpPhase::Resting) => "resting",
            Phase::PullUp(PullUpPhase::Ascending) => "ascending",
            Phase::PullUp(PullUpPhase::AtTop) => "at-top",
            Phase::PullUp(PullUpPhase::Descending) => "descending",
            Phase::Jump(JumpPhase::Grounded) => "grounded",
            Phase::Jump(JumpPhase::Airborne) => "airborne",
            Phase::Jump(JumpPhase::Landed) => "landed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PullUpDetails {
    /// Range-of-motion quality in [0,1]
    pub range_of_motion: f32,
    /// Highest wrist lift of the cycle, in upper-arm lengths
    pub peak_lift: f32,
    /// Widest elbow angle of the cycle (degrees)
    pub max_elbow_angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JumpDetails {
    /// Peak height above ground level (pixels)
    pub jump_height_px: f32,
    /// Knee angle at touchdown (degrees)
    pub landing_knee_angle: f32,
    pub landing_quality: LandingQuality,
    /// Landing score (0-100)
    pub landing_score: f32,
}

/// Exercise-specific part of a rep record
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "exercise")]
pub enum RepDetails {
    PullUp(PullUpDetails),
    Jump(JumpDetails),
}

impl RepDetails {
    /// Exercise quality in [0,1] blended into the rep score
    pub fn quality(&self) -> f32 {
        match self {
            RepDetails::PullUp(details) => details.range_of_motion,
            RepDetails::Jump(details) => details.landing_score / 100.0,
        }
    }

    /// Cue announcing the completed rep
    pub fn cue(&self) -> FeedbackCue {
        match self {
            RepDetails::PullUp(_) => FeedbackCue::PullUpCounted,
            RepDetails::Jump(details) => FeedbackCue::JumpCounted(details.landing_quality),
        }
    }
}

/// Outcome of advancing the phase machine by one usable frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseEvent {
    /// No transition
    Hold,
    /// Phase changed without completing a rep
    Transition { from: Phase, to: Phase },
    /// Partial cycle dropped back to rest; no rep
    Abandoned { from: Phase, to: Phase },
    /// Full cycle closed; exactly one rep
    RepCompleted {
        from: Phase,
        to: Phase,
        details: RepDetails,
    },
    /// Jump calibration latched its ground reference
    Calibrated(GroundReference),
}

impl PhaseEvent {
    /// Phase change carried by this event, if any
    pub fn transition(&self) -> Option<(Phase, Phase)> {
        match *self {
            PhaseEvent::Transition { from, to }
            | PhaseEvent::Abandoned { from, to }
            | PhaseEvent::RepCompleted { from, to, .. } => Some((from, to)),
            PhaseEvent::Hold | PhaseEvent::Calibrated(_) => None,
        }
    }
}

/// Per-frame form assessment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormCheck {
    /// Deviation from good form in [0,1]
    pub deviation: f32,
    /// Dominant issue, if the deviation is worth a cue
    pub issue: Option<FeedbackCue>,
}

impl FormCheck {
    pub fn clean() -> Self {
        Self {
            deviation: 0.0,
            issue: None,
        }
    }
}

/// Exercise-specific analysis strategy
///
/// Implementations must be frame-idempotent: a rejected frame never moves
/// the phase machine, and at most one transition happens per frame.
pub trait ExerciseAnalyzer: Send {
    fn kind(&self) -> ExerciseKind;

    fn required_joints(&self) -> &'static [Joint] {
        self.kind().required_joints()
    }

    fn phase(&self) -> Phase;

    /// Whether frames are currently being counted and scored
    fn is_tracking(&self) -> bool {
        true
    }

    /// Advance the phase machine with a validated frame
    fn advance(&mut self, frame: &PoseFrame, timestamp_ms: u64) -> PhaseEvent;

    /// Form deviation for a validated frame, given the event it produced
    fn form_check(&self, frame: &PoseFrame, event: &PhaseEvent) -> FormCheck;

    /// Required joints were unusable on this frame
    fn on_rejected(&mut self, _timestamp_ms: u64) {}

    /// Return the phase machine to its initial phase without a rep.
    /// Calibration survives.
    fn abort_cycle(&mut self);

    /// Full reset including calibration
    fn reset(&mut self);

    fn calibration(&self) -> Option<CalibrationSnapshot> {
        None
    }

    /// Instantaneous jump height (pixels), once calibrated
    fn jump_height(&self) -> Option<f32> {
        None
    }

    fn ground_reference(&self) -> Option<GroundReference> {
        None
    }

    /// Discard the ground reference and start calibrating again
    fn recalibrate(&mut self) -> Result<(), CalibrationError> {
        Err(CalibrationError::NotSupported {
            exercise: self.kind().name().to_string(),
        })
    }
}

/// Create the analyzer for an exercise
pub fn build_analyzer(kind: ExerciseKind, config: &AppConfig) -> Box<dyn ExerciseAnalyzer> {
    match kind {
        ExerciseKind::PullUps => Box::new(PullUpAnalyzer::new(config.pull_up.clone())),
        ExerciseKind::Jumps => Box::new(JumpAnalyzer::new(
            config.jump.clone(),
            config.calibration.clone(),
        )),
    }
}
