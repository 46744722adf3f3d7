//! Telemetry event types describing processing health for CLI reporting
//! and diagnostics subscribers.

use serde::{Deserialize, Serialize};

use crate::analysis::ExerciseKind;
use crate::pose::Joint;

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    FixtureLoad,
    ConfigInvalid,
    Unknown,
}

/// Metric events covering frame latency, rejections and session milestones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    Latency {
        avg_ms: f32,
        max_ms: f32,
        sample_count: usize,
        /// Frames in the window that exceeded the per-frame budget
        over_budget: usize,
    },
    FrameRejected {
        exercise: ExerciseKind,
        missing: Vec<Joint>,
    },
    RepCompleted {
        exercise: ExerciseKind,
        rep_count: usize,
        score: f32,
    },
    CalibrationLatched {
        ground_level: f32,
        sample_count: usize,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
