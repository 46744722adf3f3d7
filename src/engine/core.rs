//! ExerciseProcessor: per-frame orchestration of the analysis pipeline.
//!
//! One call to [`ExerciseProcessor::process_frame`] runs the whole chain
//! (adapter, smoothing, phase machine, scoring, calibration/height) to
//! completion before returning. Resulting events are broadcast to
//! subscribers and returned in the [`FrameOutcome`].

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::analysis::feedback::{FeedbackCue, FeedbackLimiter};
use crate::analysis::scoring::{FormScorer, FrameScore};
use crate::analysis::{build_analyzer, ExerciseAnalyzer, ExerciseKind, Phase, PhaseEvent};
use crate::config::AppConfig;
use crate::engine::events::ProcessorEvent;
use crate::engine::state::{ExerciseState, RepRecord};
use crate::engine::summary::SessionSummary;
use crate::error::{log_processor_error, CalibrationError, ProcessorError};
use crate::pose::{
    FrameAdapter, FrameRejection, Joint, KeypointSmoother, PoseFrame, RawFrame, RingBuffer,
};
use crate::telemetry::{self, FRAME_BUDGET_MS};

/// Everything the caller supplies for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    /// Monotonic capture timestamp in milliseconds
    pub timestamp_ms: u64,
    pub frame: RawFrame,
    pub exercise: ExerciseKind,
    /// Frames are ignored, state untouched, while the session is paused
    pub active: bool,
}

/// Result of one processed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub phase: Phase,
    pub running_score: f32,
    /// Scoring for this frame, absent while a jump session is calibrating
    pub score: Option<FrameScore>,
    /// Record appended on this frame, if a rep completed
    pub rep: Option<RepRecord>,
    pub events: Vec<ProcessorEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Session inactive
    Ignored,
    /// Required joints unusable; phase and scoring held
    Rejected {
        missing: Vec<Joint>,
        events: Vec<ProcessorEvent>,
    },
    Processed(FrameReport),
}

impl FrameOutcome {
    pub fn events(&self) -> &[ProcessorEvent] {
        match self {
            FrameOutcome::Ignored => &[],
            FrameOutcome::Rejected { events, .. } => events,
            FrameOutcome::Processed(report) => &report.events,
        }
    }

    pub fn rep(&self) -> Option<&RepRecord> {
        match self {
            FrameOutcome::Processed(report) => report.rep.as_ref(),
            _ => None,
        }
    }
}

/// Orchestrates one exercise session
///
/// Owns all per-exercise state; switching exercises rebuilds it before the
/// next frame is looked at, so nothing leaks across exercises.
pub struct ExerciseProcessor {
    config: AppConfig,
    adapter: FrameAdapter,
    smoother: KeypointSmoother,
    analyzer: Box<dyn ExerciseAnalyzer>,
    scorer: FormScorer,
    limiter: FeedbackLimiter,
    state: ExerciseState,
    trail: RingBuffer<PoseFrame>,
    last_usable_ms: Option<u64>,
    events_tx: broadcast::Sender<ProcessorEvent>,
}

impl ExerciseProcessor {
    /// Create a processor for a validated configuration
    ///
    /// # Returns
    /// * `Ok(ExerciseProcessor)` - Ready for frames
    /// * `Err(ProcessorError::InvalidConfig)` - A config value is out of range
    pub fn new(config: AppConfig, exercise: ExerciseKind) -> Result<Self, ProcessorError> {
        if let Err(err) = config.validate() {
            log_processor_error(&err, "ExerciseProcessor::new");
            return Err(err);
        }

        let (events_tx, _) = broadcast::channel(config.session.event_channel_capacity.max(1));
        tracing::info!("Exercise processor created for {}", exercise);

        Ok(Self {
            adapter: FrameAdapter::new(config.frame.confidence_floor),
            smoother: KeypointSmoother::new(config.frame.smoothing_time_constant_ms),
            analyzer: build_analyzer(exercise, &config),
            scorer: FormScorer::new(config.scoring.clone()),
            limiter: FeedbackLimiter::new(config.session.feedback_interval_ms),
            state: ExerciseState::new(exercise, config.session.rep_history_capacity),
            trail: RingBuffer::new(config.frame.trail_length),
            last_usable_ms: None,
            events_tx,
            config,
        })
    }

    /// Create a processor from an exercise identifier such as `"jumps"`
    ///
    /// # Returns
    /// * `Err(ProcessorError::UnknownExercise)` - Identifier not supported
    pub fn for_exercise(config: AppConfig, exercise: &str) -> Result<Self, ProcessorError> {
        let kind = exercise
            .parse::<ExerciseKind>()
            .inspect_err(|err| log_processor_error(err, "ExerciseProcessor::for_exercise"))?;
        Self::new(config, kind)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProcessorEvent> {
        self.events_tx.subscribe()
    }

    pub fn state(&self) -> &ExerciseState {
        &self.state
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.state.exercise()
    }

    /// Recently accepted frames, oldest first
    pub fn trail(&self) -> Vec<PoseFrame> {
        self.trail.to_vec()
    }

    /// Session analytics over the retained rep history
    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary::from_records(self.exercise(), &self.state.records());
        // History is bounded; the count is not
        summary.rep_count = self.state.rep_count();
        summary
    }

    /// Process the next frame
    ///
    /// Never fails for noisy or missing data: those frames come back as
    /// [`FrameOutcome::Rejected`].
    pub fn process_frame(&mut self, input: &FrameInput) -> FrameOutcome {
        if !input.active {
            return FrameOutcome::Ignored;
        }

        let started = Instant::now();
        let mut events = Vec::new();
        if input.exercise != self.exercise() {
            events.push(self.rebuild(input.exercise));
        }

        let outcome = match self
            .adapter
            .adapt(&input.frame, self.analyzer.required_joints())
        {
            Ok(frame) => self.process_usable(frame, input.timestamp_ms, events),
            Err(rejection) => self.process_rejected(rejection, input.timestamp_ms, events),
        };

        for event in outcome.events() {
            let _ = self.events_tx.send(event.clone());
        }

        let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;
        if elapsed_ms > FRAME_BUDGET_MS {
            tracing::warn!(
                "Frame at {}ms took {:.2}ms (budget {}ms)",
                input.timestamp_ms,
                elapsed_ms,
                FRAME_BUDGET_MS
            );
        }
        telemetry::hub().record_frame_latency(elapsed_ms);

        outcome
    }

    /// Switch to another exercise, resetting all per-exercise state
    pub fn switch_exercise(&mut self, exercise: ExerciseKind) {
        let event = self.rebuild(exercise);
        let _ = self.events_tx.send(event);
    }

    /// Restart the current exercise from scratch
    pub fn reset(&mut self) {
        let exercise = self.exercise();
        self.rebuild(exercise);
    }

    /// Drop the jump ground level and calibrate again
    ///
    /// # Returns
    /// * `Err(CalibrationError::NotSupported)` - Active exercise has no calibration
    pub fn recalibrate(&mut self) -> Result<(), CalibrationError> {
        if let Err(err) = self.analyzer.recalibrate() {
            crate::error::log_calibration_error(&err, "recalibrate");
            return Err(err);
        }

        self.scorer.discard_cycle();
        self.state.set_phase(self.analyzer.phase());
        self.state.set_ground_level(None);
        self.state.set_jump_height(None);
        self.state.set_calibration(self.analyzer.calibration());
        if let Some(snapshot) = self.analyzer.calibration() {
            let _ = self.events_tx.send(ProcessorEvent::Calibration(snapshot));
        }
        Ok(())
    }

    fn rebuild(&mut self, exercise: ExerciseKind) -> ProcessorEvent {
        let from = self.exercise();
        tracing::info!("Resetting exercise state: {} -> {}", from, exercise);

        self.analyzer = build_analyzer(exercise, &self.config);
        self.smoother.reset();
        self.scorer.reset();
        self.limiter.clear();
        self.trail.clear();
        self.last_usable_ms = None;
        self.state = ExerciseState::new(exercise, self.config.session.rep_history_capacity);
        self.state.set_calibration(self.analyzer.calibration());

        ProcessorEvent::ExerciseSwitched { from, to: exercise }
    }

    fn feedback(&mut self, cue: FeedbackCue, timestamp_ms: u64, events: &mut Vec<ProcessorEvent>) {
        if self.limiter.should_emit(cue, timestamp_ms) {
            events.push(ProcessorEvent::feedback(cue));
        }
    }

    fn process_usable(
        &mut self,
        mut frame: PoseFrame,
        timestamp_ms: u64,
        mut events: Vec<ProcessorEvent>,
    ) -> FrameOutcome {
        self.smoother
            .apply(&mut frame, timestamp_ms, self.adapter.confidence_floor());
        self.last_usable_ms = Some(timestamp_ms);
        self.trail.push(frame);

        let initial = Phase::initial(self.exercise());
        let event = self.analyzer.advance(&frame, timestamp_ms);

        if let Some((from, to)) = event.transition() {
            self.state.set_phase(to);
            events.push(ProcessorEvent::PhaseChanged { from, to });
            if from == initial {
                // New cycle: frames spent at rest do not count towards it
                self.scorer.discard_cycle();
            }
        }

        match event {
            PhaseEvent::Calibrated(reference) => {
                self.state.set_ground_level(Some(reference.ground_level));
                telemetry::hub().record_calibration(&reference);
                self.feedback(FeedbackCue::CalibrationComplete, timestamp_ms, &mut events);
            }
            PhaseEvent::Abandoned { .. } => {
                self.scorer.discard_cycle();
                if self.exercise() == ExerciseKind::PullUps {
                    self.feedback(FeedbackCue::PartialRep, timestamp_ms, &mut events);
                }
            }
            _ => {}
        }

        let mut score = None;
        if self.analyzer.is_tracking() && !matches!(event, PhaseEvent::Calibrated(_)) {
            let check = self.analyzer.form_check(&frame, &event);
            let frame_score = self.scorer.score_frame(check.deviation);
            self.state.set_running_score(frame_score.running_score);
            events.push(ProcessorEvent::FormScore {
                running_score: frame_score.running_score,
                frame_score: frame_score.frame_score,
                pulse: frame_score.pulse,
            });
            if frame_score.pulse {
                if let Some(issue) = check.issue {
                    self.feedback(issue, timestamp_ms, &mut events);
                }
            }
            score = Some(frame_score);
        }

        let mut rep = None;
        if let PhaseEvent::RepCompleted { details, .. } = event {
            let rep_score = self.scorer.finalize_rep(details.quality());
            let record = self.state.record_rep(rep_score, timestamp_ms, details);
            tracing::info!(
                "{} rep #{} completed: score={:.1}",
                record.exercise,
                record.index,
                record.score
            );
            telemetry::hub().record_rep(record.exercise, record.index, record.score);

            events.push(ProcessorEvent::RepCounted {
                exercise: record.exercise,
                rep_count: self.state.rep_count(),
            });
            events.push(ProcessorEvent::RepRecorded(record));
            self.feedback(details.cue(), timestamp_ms, &mut events);
            rep = Some(record);
        }

        self.publish_jump_state(&event, &mut events);

        FrameOutcome::Processed(FrameReport {
            phase: self.state.phase(),
            running_score: self.state.running_score(),
            score,
            rep,
            events,
        })
    }

    fn process_rejected(
        &mut self,
        rejection: FrameRejection,
        timestamp_ms: u64,
        mut events: Vec<ProcessorEvent>,
    ) -> FrameOutcome {
        tracing::debug!("{} at {}ms", rejection, timestamp_ms);
        telemetry::hub().record_rejection(self.exercise(), &rejection.missing);

        self.trail.clear();
        self.analyzer.on_rejected(timestamp_ms);
        self.feedback(FeedbackCue::Reposition, timestamp_ms, &mut events);

        if let (Some(limit), Some(last)) =
            (self.config.session.occlusion_reset_ms, self.last_usable_ms)
        {
            let initial = Phase::initial(self.exercise());
            let from = self.analyzer.phase();
            if timestamp_ms.saturating_sub(last) >= limit && from != initial {
                tracing::debug!("Occluded for {}ms, dropping partial cycle", limit);
                self.analyzer.abort_cycle();
                self.scorer.discard_cycle();
                self.state.set_phase(initial);
                events.push(ProcessorEvent::PhaseChanged { from, to: initial });
            }
        }

        if let Some(snapshot) = self.analyzer.calibration() {
            if snapshot.is_calibrating {
                self.state.set_calibration(Some(snapshot));
                events.push(ProcessorEvent::Calibration(snapshot));
            }
        }

        FrameOutcome::Rejected {
            missing: rejection.missing,
            events,
        }
    }

    /// Calibration snapshot while calibrating (and on the latch frame),
    /// instantaneous height afterwards
    fn publish_jump_state(&mut self, event: &PhaseEvent, events: &mut Vec<ProcessorEvent>) {
        let Some(snapshot) = self.analyzer.calibration() else {
            return;
        };
        self.state.set_calibration(Some(snapshot));
        if snapshot.is_calibrating || matches!(event, PhaseEvent::Calibrated(_)) {
            events.push(ProcessorEvent::Calibration(snapshot));
        }

        let height = self.analyzer.jump_height();
        self.state.set_jump_height(height);
        if let Some(height_px) = height {
            events.push(ProcessorEvent::JumpHeight { height_px });
        }
    }
}
