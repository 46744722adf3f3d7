//! Post-session analytics computed from rep records.

use serde::{Deserialize, Serialize};

use crate::analysis::height::GOOD_LANDING_ANGLE;
use crate::analysis::{ExerciseKind, RepDetails};
use crate::engine::state::RepRecord;

/// Landing and height aggregates over a jump session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpAnalytics {
    pub average_jump_height_px: f32,
    pub best_jump_height_px: f32,
    pub average_landing_angle: f32,
    /// Smallest (deepest) landing knee angle
    pub best_landing_angle: f32,
    /// Largest (stiffest) landing knee angle
    pub worst_landing_angle: f32,
    /// Percentage of landings under the good-landing angle
    pub landing_success_rate: f32,
    pub average_landing_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullUpAnalytics {
    pub average_range_of_motion: f32,
    pub best_peak_lift: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub exercise: ExerciseKind,
    pub rep_count: usize,
    /// Mean rep score, `None` for an empty session
    pub average_score: Option<f32>,
    pub best_score: Option<f32>,
    pub jump: Option<JumpAnalytics>,
    pub pull_up: Option<PullUpAnalytics>,
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

impl SessionSummary {
    pub fn from_records(exercise: ExerciseKind, records: &[RepRecord]) -> Self {
        let scores: Vec<f32> = records.iter().map(|record| record.score).collect();

        let jumps: Vec<_> = records
            .iter()
            .filter_map(|record| match record.details {
                RepDetails::Jump(details) => Some(details),
                RepDetails::PullUp(_) => None,
            })
            .collect();
        let pulls: Vec<_> = records
            .iter()
            .filter_map(|record| match record.details {
                RepDetails::PullUp(details) => Some(details),
                RepDetails::Jump(_) => None,
            })
            .collect();

        let jump = (!jumps.is_empty()).then(|| {
            let heights: Vec<f32> = jumps.iter().map(|d| d.jump_height_px).collect();
            let angles: Vec<f32> = jumps.iter().map(|d| d.landing_knee_angle).collect();
            let landing_scores: Vec<f32> = jumps.iter().map(|d| d.landing_score).collect();
            let successes = angles
                .iter()
                .filter(|angle| **angle < GOOD_LANDING_ANGLE)
                .count();
            JumpAnalytics {
                average_jump_height_px: mean(&heights),
                best_jump_height_px: heights.iter().copied().fold(0.0, f32::max),
                average_landing_angle: mean(&angles),
                best_landing_angle: angles.iter().copied().fold(f32::INFINITY, f32::min),
                worst_landing_angle: angles.iter().copied().fold(0.0, f32::max),
                landing_success_rate: 100.0 * successes as f32 / angles.len() as f32,
                average_landing_score: mean(&landing_scores),
            }
        });

        let pull_up = (!pulls.is_empty()).then(|| {
            let rom: Vec<f32> = pulls.iter().map(|d| d.range_of_motion).collect();
            PullUpAnalytics {
                average_range_of_motion: mean(&rom),
                best_peak_lift: pulls.iter().map(|d| d.peak_lift).fold(0.0, f32::max),
            }
        });

        Self {
            exercise,
            rep_count: records.len(),
            average_score: (!scores.is_empty()).then(|| mean(&scores)),
            best_score: scores.iter().copied().reduce(f32::max),
            jump,
            pull_up,
        }
    }
}
