// Progress tracking for the jump ready-stance calibration
//
// This module provides the snapshot type streamed to the UI while the user
// holds the calibration stance, plus the guidance cue derived from it.

/// What the user should do next to finish calibrating
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CalibrationGuidance {
    /// Required joints are not visible
    StepIntoFrame,
    /// Neither still nor upright enough
    MoveLessStandStraighter,
    /// Still, but knees too bent
    StandStraighter,
    /// Upright, but moving too much
    HoldStill,
    /// Stance accepted, keep holding until progress completes
    KeepHolding,
    /// Ground level latched
    Ready,
}

impl CalibrationGuidance {
    /// Get human-readable prompt for display
    pub fn prompt(&self) -> &'static str {
        match self {
            CalibrationGuidance::StepIntoFrame => {
                "Step back so your hips, knees and ankles are visible"
            }
            CalibrationGuidance::MoveLessStandStraighter => "Move less and stand straighter",
            CalibrationGuidance::StandStraighter => "Stand straighter!",
            CalibrationGuidance::HoldStill => "Good angle! Stay still!",
            CalibrationGuidance::KeepHolding => "Great pose! Hold still...",
            CalibrationGuidance::Ready => "Perfect! Ready to jump!",
        }
    }
}

/// Calibration status for live display
///
/// Reset whenever calibration restarts (exercise switch, explicit
/// recalibration, leaving the frame, or a prolonged unstable stretch).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationSnapshot {
    /// Progress percentage (0-100)
    pub progress: f32,
    /// Whether hips and ankles are currently still
    pub is_stable: bool,
    /// Current mean knee angle in degrees
    pub knee_angle: f32,
    /// Knee angle required for a ready stance
    pub min_knee_angle: f32,
    /// Whether calibration is still running
    pub is_calibrating: bool,
    /// Suggested prompt for the user
    pub guidance: CalibrationGuidance,
}

impl CalibrationSnapshot {
    /// Snapshot for a calibration that has not seen any usable frame yet
    pub fn idle(min_knee_angle: f32) -> Self {
        Self {
            progress: 0.0,
            is_stable: false,
            knee_angle: 0.0,
            min_knee_angle,
            is_calibrating: true,
            guidance: CalibrationGuidance::StepIntoFrame,
        }
    }

    /// Get progress as a whole percentage (0-100)
    pub fn percentage(&self) -> u8 {
        self.progress.clamp(0.0, 100.0).round() as u8
    }

    /// Whether the current stance satisfies the angle requirement
    pub fn angle_ready(&self) -> bool {
        self.knee_angle >= self.min_knee_angle
    }
}

/// Pick the guidance cue for a calibration state
pub fn guidance_for(
    complete: bool,
    usable: bool,
    is_stable: bool,
    angle_ready: bool,
) -> CalibrationGuidance {
    if complete {
        CalibrationGuidance::Ready
    } else if !usable {
        CalibrationGuidance::StepIntoFrame
    } else if is_stable && angle_ready {
        CalibrationGuidance::KeepHolding
    } else if is_stable {
        CalibrationGuidance::StandStraighter
    } else if angle_ready {
        CalibrationGuidance::HoldStill
    } else {
        CalibrationGuidance::MoveLessStandStraighter
    }
}
