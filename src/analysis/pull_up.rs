// PullUpAnalyzer - four-phase pull-up state machine
//
// Signal is the wrist lift: how far the wrists sit above the shoulders,
// in upper-arm lengths, so thresholds hold at any camera distance.
// The at-top band uses separate enter/release thresholds (hysteresis) so
// a user hovering around the bar line does not flicker between phases.

use crate::analysis::feedback::FeedbackCue;
use crate::analysis::{
    ExerciseAnalyzer, ExerciseKind, FormCheck, Phase, PhaseEvent, PullUpDetails, PullUpPhase,
    RepDetails,
};
use crate::config::PullUpConfig;
use crate::pose::geometry::{
    average_shoulder_y, average_wrist_y, max_elbow_angle, upper_arm_length,
};
use crate::pose::{Joint, PoseFrame};

/// Upper arm shorter than this (pixels) is treated as a degenerate skeleton
const MIN_ARM_LENGTH_PX: f32 = 1.0;

pub struct PullUpAnalyzer {
    config: PullUpConfig,
    phase: PullUpPhase,
    peak_lift: f32,
    max_elbow: f32,
    last_rest_elbow: f32,
}

impl PullUpAnalyzer {
    pub fn new(config: PullUpConfig) -> Self {
        Self {
            config,
            phase: PullUpPhase::Resting,
            peak_lift: 0.0,
            max_elbow: 0.0,
            last_rest_elbow: 0.0,
        }
    }

    /// Wrist lift in upper-arm lengths, `None` for a degenerate skeleton
    pub fn lift(frame: &PoseFrame) -> Option<f32> {
        let arm = upper_arm_length(frame);
        if !arm.is_finite() || arm < MIN_ARM_LENGTH_PX {
            return None;
        }
        Some((average_shoulder_y(frame) - average_wrist_y(frame)) / arm)
    }

    fn range_of_motion(&self) -> f32 {
        let target = self.config.target_peak_lift.max(f32::EPSILON);
        let extension = self.config.extension_angle.max(f32::EPSILON);
        let lift_credit = (self.peak_lift / target).clamp(0.0, 1.0);
        let extension_credit = (self.max_elbow / extension).clamp(0.0, 1.0);
        0.6 * lift_credit + 0.4 * extension_credit
    }

    fn start_cycle(&mut self, lift: f32, elbow: f32) {
        self.peak_lift = lift;
        self.max_elbow = self.last_rest_elbow.max(elbow);
    }

    fn clear_cycle(&mut self) {
        self.peak_lift = 0.0;
        self.max_elbow = 0.0;
    }

    fn transition(&mut self, to: PullUpPhase) -> (Phase, Phase) {
        let from = Phase::PullUp(self.phase);
        self.phase = to;
        tracing::debug!("Pull-up phase {} -> {}", from, Phase::PullUp(to));
        (from, Phase::PullUp(to))
    }
}

impl ExerciseAnalyzer for PullUpAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::PullUps
    }

    fn phase(&self) -> Phase {
        Phase::PullUp(self.phase)
    }

    fn advance(&mut self, frame: &PoseFrame, _timestamp_ms: u64) -> PhaseEvent {
        let Some(lift) = Self::lift(frame) else {
            return PhaseEvent::Hold;
        };
        let elbow = max_elbow_angle(frame);

        if self.phase != PullUpPhase::Resting {
            self.peak_lift = self.peak_lift.max(lift);
            self.max_elbow = self.max_elbow.max(elbow);
        }

        match self.phase {
            PullUpPhase::Resting => {
                self.last_rest_elbow = elbow;
                if lift > self.config.ascend_lift {
                    self.start_cycle(lift, elbow);
                    let (from, to) = self.transition(PullUpPhase::Ascending);
                    return PhaseEvent::Transition { from, to };
                }
            }
            PullUpPhase::Ascending => {
                if lift >= self.config.top_lift {
                    let (from, to) = self.transition(PullUpPhase::AtTop);
                    return PhaseEvent::Transition { from, to };
                }
                if lift < self.config.rest_lift {
                    self.clear_cycle();
                    self.last_rest_elbow = elbow;
                    let (from, to) = self.transition(PullUpPhase::Resting);
                    return PhaseEvent::Abandoned { from, to };
                }
            }
            PullUpPhase::AtTop => {
                if lift < self.config.top_release {
                    let (from, to) = self.transition(PullUpPhase::Descending);
                    return PhaseEvent::Transition { from, to };
                }
            }
            PullUpPhase::Descending => {
                if lift >= self.config.top_lift {
                    let (from, to) = self.transition(PullUpPhase::AtTop);
                    return PhaseEvent::Transition { from, to };
                }
                if lift < self.config.rest_lift {
                    let details = PullUpDetails {
                        range_of_motion: self.range_of_motion(),
                        peak_lift: self.peak_lift,
                        max_elbow_angle: self.max_elbow,
                    };
                    self.clear_cycle();
                    self.last_rest_elbow = elbow;
                    let (from, to) = self.transition(PullUpPhase::Resting);
                    return PhaseEvent::RepCompleted {
                        from,
                        to,
                        details: RepDetails::PullUp(details),
                    };
                }
            }
        }

        PhaseEvent::Hold
    }

    /// Deviation from uneven wrist height (one arm leading)
    fn form_check(&self, frame: &PoseFrame, _event: &PhaseEvent) -> FormCheck {
        let arm = upper_arm_length(frame);
        if !arm.is_finite() || arm < MIN_ARM_LENGTH_PX {
            return FormCheck::clean();
        }
        let asymmetry =
            (frame.joint(Joint::LeftWrist).y - frame.joint(Joint::RightWrist).y).abs() / arm;
        let tolerance = self.config.asymmetry_tolerance.max(f32::EPSILON);
        let deviation = (asymmetry / tolerance).clamp(0.0, 1.0);

        FormCheck {
            deviation,
            issue: (deviation > 0.0).then_some(FeedbackCue::UnevenPull),
        }
    }

    fn abort_cycle(&mut self) {
        self.phase = PullUpPhase::Resting;
        self.clear_cycle();
    }

    fn reset(&mut self) {
        self.abort_cycle();
        self.last_rest_elbow = 0.0;
    }
}
