// ExerciseState - per-session state owned by the processor
//
// Mutated only by ExerciseProcessor in response to frames. Every rep the
// phase machine completes appends exactly one RepRecord; rep_count is the
// number of records ever appended, while the retained history is bounded.

use crate::analysis::{ExerciseKind, Phase, RepDetails};
use crate::calibration::CalibrationSnapshot;
use crate::pose::RingBuffer;

/// Immutable result of one completed repetition
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RepRecord {
    /// 1-based rep number within the session
    pub index: usize,
    pub exercise: ExerciseKind,
    /// Rep score (0-100)
    pub score: f32,
    /// Timestamp of the frame that completed the rep
    pub timestamp_ms: u64,
    pub details: RepDetails,
}

#[derive(Debug, Clone)]
pub struct ExerciseState {
    exercise: ExerciseKind,
    phase: Phase,
    rep_count: usize,
    running_score: f32,
    score_total: f64,
    history: RingBuffer<RepRecord>,
    calibration: Option<CalibrationSnapshot>,
    ground_level: Option<f32>,
    jump_height: Option<f32>,
}

impl ExerciseState {
    pub fn new(exercise: ExerciseKind, history_capacity: usize) -> Self {
        Self {
            exercise,
            phase: Phase::initial(exercise),
            rep_count: 0,
            running_score: 100.0,
            score_total: 0.0,
            history: RingBuffer::new(history_capacity),
            calibration: None,
            ground_level: None,
            jump_height: None,
        }
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.exercise
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rep_count(&self) -> usize {
        self.rep_count
    }

    /// Smoothed running form score (0-100)
    pub fn running_score(&self) -> f32 {
        self.running_score
    }

    /// Mean rep score over the session, `None` before the first rep
    pub fn average_score(&self) -> Option<f32> {
        (self.rep_count > 0).then(|| (self.score_total / self.rep_count as f64) as f32)
    }

    /// Retained rep records, oldest first
    pub fn records(&self) -> Vec<RepRecord> {
        self.history.to_vec()
    }

    pub fn last_record(&self) -> Option<&RepRecord> {
        self.history.back()
    }

    pub fn calibration(&self) -> Option<CalibrationSnapshot> {
        self.calibration
    }

    pub fn ground_level(&self) -> Option<f32> {
        self.ground_level
    }

    pub fn jump_height(&self) -> Option<f32> {
        self.jump_height
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_running_score(&mut self, score: f32) {
        self.running_score = score;
    }

    pub(crate) fn set_calibration(&mut self, snapshot: Option<CalibrationSnapshot>) {
        self.calibration = snapshot;
    }

    pub(crate) fn set_ground_level(&mut self, ground_level: Option<f32>) {
        self.ground_level = ground_level;
    }

    pub(crate) fn set_jump_height(&mut self, height: Option<f32>) {
        self.jump_height = height;
    }

    /// Append the record for a completed rep and return it
    pub(crate) fn record_rep(
        &mut self,
        score: f32,
        timestamp_ms: u64,
        details: RepDetails,
    ) -> RepRecord {
        self.rep_count += 1;
        self.score_total += score as f64;
        let record = RepRecord {
            index: self.rep_count,
            exercise: self.exercise,
            score,
            timestamp_ms,
            details,
        };
        self.history.push(record);
        record
    }
}
