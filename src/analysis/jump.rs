// JumpAnalyzer - calibration gate plus grounded/airborne/landed machine
//
// Nothing is counted until the ready stance has latched a ground level.
// After that, ankle height above ground drives the cycle:
//   grounded --(height > threshold)--> airborne
//   airborne --(height <= threshold)--> landed   (landing captured here)
//   landed   --(settle window elapsed)--> grounded  (rep finalized)
// A takeoff during the settle window closes the pending rep and goes
// straight back to airborne, so a quick rebound is tracked at any frame rate.

use crate::analysis::feedback::FeedbackCue;
use crate::analysis::height::{JumpHeightEstimator, LandingQuality, GOOD_LANDING_ANGLE};
use crate::analysis::{
    ExerciseAnalyzer, ExerciseKind, FormCheck, JumpDetails, JumpPhase, Phase, PhaseEvent,
    RepDetails,
};
use crate::calibration::{CalibrationSnapshot, GroundReference, JumpCalibration};
use crate::config::{CalibrationConfig, JumpConfig};
use crate::error::CalibrationError;
use crate::pose::geometry::{average_ankle_y, average_knee_angle, horizontal_span};
use crate::pose::{Joint, PoseFrame};

/// Ankle spread (pixels) below which knee cave-in is not judged
const MIN_ANKLE_SPAN_PX: f32 = 1.0;

pub struct JumpAnalyzer {
    config: JumpConfig,
    calibration: JumpCalibration,
    estimator: JumpHeightEstimator,
    phase: JumpPhase,
    landed_at_ms: u64,
    pending: Option<JumpDetails>,
}

impl JumpAnalyzer {
    pub fn new(config: JumpConfig, calibration: CalibrationConfig) -> Self {
        Self {
            config,
            calibration: JumpCalibration::new(calibration),
            estimator: JumpHeightEstimator::new(),
            phase: JumpPhase::Grounded,
            landed_at_ms: 0,
            pending: None,
        }
    }

    fn transition(&mut self, to: JumpPhase) -> (Phase, Phase) {
        let from = Phase::Jump(self.phase);
        self.phase = to;
        tracing::debug!("Jump phase {} -> {}", from, Phase::Jump(to));
        (from, Phase::Jump(to))
    }

    /// Close the pending rep and move to `next`
    fn finalize(&mut self, next: JumpPhase) -> PhaseEvent {
        let (from, to) = self.transition(next);
        match self.pending.take() {
            Some(details) => PhaseEvent::RepCompleted {
                from,
                to,
                details: RepDetails::Jump(details),
            },
            None if next == JumpPhase::Airborne => PhaseEvent::Transition { from, to },
            None => PhaseEvent::Abandoned { from, to },
        }
    }

    fn knee_cave_in(&self, frame: &PoseFrame) -> f32 {
        let ankle_span = horizontal_span(frame, Joint::LeftAnkle, Joint::RightAnkle);
        if !ankle_span.is_finite() || ankle_span < MIN_ANKLE_SPAN_PX {
            return 0.0;
        }
        let knee_span = horizontal_span(frame, Joint::LeftKnee, Joint::RightKnee);
        let tolerance = self.config.valgus_tolerance.max(f32::EPSILON);
        (((ankle_span - knee_span) / ankle_span) / tolerance).clamp(0.0, 1.0)
    }
}

impl ExerciseAnalyzer for JumpAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Jumps
    }

    fn phase(&self) -> Phase {
        Phase::Jump(self.phase)
    }

    fn is_tracking(&self) -> bool {
        self.calibration.is_complete()
    }

    fn advance(&mut self, frame: &PoseFrame, timestamp_ms: u64) -> PhaseEvent {
        if !self.calibration.is_complete() {
            return match self.calibration.observe(frame, timestamp_ms) {
                Some(reference) => {
                    self.estimator.set_reference(reference);
                    PhaseEvent::Calibrated(reference)
                }
                None => PhaseEvent::Hold,
            };
        }

        let Some(height) = self.estimator.update(average_ankle_y(frame)) else {
            return PhaseEvent::Hold;
        };
        let threshold = self.config.airborne_threshold_px;

        match self.phase {
            JumpPhase::Grounded => {
                if height > threshold {
                    self.estimator.start_jump();
                    let (from, to) = self.transition(JumpPhase::Airborne);
                    return PhaseEvent::Transition { from, to };
                }
            }
            JumpPhase::Airborne => {
                if height <= threshold {
                    let knee_angle = average_knee_angle(frame);
                    let quality = LandingQuality::classify(knee_angle);
                    tracing::debug!(
                        "Touchdown at {:.1} deg knee angle: {} landing",
                        knee_angle,
                        quality.display_name()
                    );
                    self.pending = Some(JumpDetails {
                        jump_height_px: self.estimator.peak(),
                        landing_knee_angle: knee_angle,
                        landing_quality: quality,
                        landing_score: quality.score(),
                    });
                    self.landed_at_ms = timestamp_ms;
                    let (from, to) = self.transition(JumpPhase::Landed);
                    return PhaseEvent::Transition { from, to };
                }
            }
            JumpPhase::Landed => {
                if height > threshold {
                    self.estimator.start_jump();
                    return self.finalize(JumpPhase::Airborne);
                }
                if timestamp_ms.saturating_sub(self.landed_at_ms) >= self.config.settle_ms {
                    return self.finalize(JumpPhase::Grounded);
                }
            }
        }

        PhaseEvent::Hold
    }

    /// Knee cave-in on every frame, plus a stiff-landing penalty at touchdown
    fn form_check(&self, frame: &PoseFrame, event: &PhaseEvent) -> FormCheck {
        let cave_in = self.knee_cave_in(frame);
        let touchdown = matches!(
            event,
            PhaseEvent::Transition {
                to: Phase::Jump(JumpPhase::Landed),
                ..
            }
        );

        if touchdown && average_knee_angle(frame) >= GOOD_LANDING_ANGLE {
            return FormCheck {
                deviation: (cave_in + 1.0).min(1.0),
                issue: Some(FeedbackCue::StiffLanding),
            };
        }

        FormCheck {
            deviation: cave_in,
            issue: (cave_in > 0.0).then_some(FeedbackCue::KneesCaving),
        }
    }

    fn on_rejected(&mut self, timestamp_ms: u64) {
        if !self.calibration.is_complete() {
            self.calibration.mark_unusable(timestamp_ms);
        }
    }

    fn abort_cycle(&mut self) {
        self.phase = JumpPhase::Grounded;
        self.pending = None;
        self.landed_at_ms = 0;
    }

    fn reset(&mut self) {
        self.abort_cycle();
        self.calibration.reset();
        self.estimator.clear();
    }

    fn calibration(&self) -> Option<CalibrationSnapshot> {
        Some(self.calibration.snapshot())
    }

    fn jump_height(&self) -> Option<f32> {
        self.estimator
            .reference()
            .map(|_| self.estimator.current())
    }

    fn ground_reference(&self) -> Option<GroundReference> {
        self.estimator.reference()
    }

    fn recalibrate(&mut self) -> Result<(), CalibrationError> {
        tracing::info!("Jump recalibration requested");
        self.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;

    const GROUND: f32 = 600.0;

    /// Legs with ankles at `ankle_y`; `knee_dx` pushes both knees forward
    /// (0 = straight, 60 ≈ 136°, 100 ≈ 113°)
    fn legs(ankle_y: f32, knee_dx: f32) -> PoseFrame {
        let mut frame = PoseFrame::new([Keypoint::default(); Joint::COUNT], 640, 720);
        frame.set_joint(Joint::LeftHip, Keypoint::new(300.0, ankle_y - 300.0, 1.0));
        frame.set_joint(Joint::RightHip, Keypoint::new(340.0, ankle_y - 300.0, 1.0));
        frame.set_joint(
            Joint::LeftKnee,
            Keypoint::new(300.0 + knee_dx, ankle_y - 150.0, 1.0),
        );
        frame.set_joint(
            Joint::RightKnee,
            Keypoint::new(340.0 + knee_dx, ankle_y - 150.0, 1.0),
        );
        frame.set_joint(Joint::LeftAnkle, Keypoint::new(300.0, ankle_y, 1.0));
        frame.set_joint(Joint::RightAnkle, Keypoint::new(340.0, ankle_y, 1.0));
        frame
    }

    /// Calibrate on a straight stance; returns the next free timestamp
    fn calibrated() -> (JumpAnalyzer, u64) {
        let mut analyzer = JumpAnalyzer::new(JumpConfig::default(), CalibrationConfig::default());
        let mut ts = 0;
        while !analyzer.is_tracking() {
            analyzer.advance(&legs(GROUND, 0.0), ts);
            ts += 33;
            assert!(ts < 5000, "calibration never completed");
        }
        (analyzer, ts)
    }

    /// One jump: takeoff, flight peaking at `peak`, landing with `knee_dx`, settle
    fn jump(analyzer: &mut JumpAnalyzer, ts: &mut u64, peak: f32, knee_dx: f32) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        for height in [40.0, peak, 40.0] {
            events.push(analyzer.advance(&legs(GROUND - height, 0.0), *ts));
            *ts += 33;
        }
        events.push(analyzer.advance(&legs(GROUND - 5.0, knee_dx), *ts));
        *ts += 33;
        for _ in 0..8 {
            events.push(analyzer.advance(&legs(GROUND, knee_dx), *ts));
            *ts += 33;
        }
        events
    }

    fn completed(events: &[PhaseEvent]) -> Vec<JumpDetails> {
        events
            .iter()
            .filter_map(|event| match event {
                PhaseEvent::RepCompleted {
                    details: RepDetails::Jump(details),
                    ..
                } => Some(*details),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_no_tracking_before_calibration() {
        let mut analyzer = JumpAnalyzer::new(JumpConfig::default(), CalibrationConfig::default());
        // Ankles far above any ground, but nothing latched yet
        let event = analyzer.advance(&legs(200.0, 0.0), 0);
        assert_eq!(event, PhaseEvent::Hold);
        assert_eq!(analyzer.phase(), Phase::Jump(JumpPhase::Grounded));
        assert_eq!(analyzer.jump_height(), None);
    }

    #[test]
    fn test_calibration_latches_ground() {
        let (analyzer, _) = calibrated();
        let reference = analyzer.ground_reference().unwrap();
        assert!((reference.ground_level - GROUND).abs() < 1e-3);
        assert_eq!(analyzer.jump_height(), Some(0.0));
        assert_eq!(analyzer.calibration().unwrap().progress, 100.0);
    }

    #[test]
    fn test_single_jump_counts_once() {
        let (mut analyzer, mut ts) = calibrated();
        let events = jump(&mut analyzer, &mut ts, 120.0, 100.0);
        let reps = completed(&events);
        assert_eq!(reps.len(), 1);
        assert!((reps[0].jump_height_px - 120.0).abs() < 1e-3);
        assert_eq!(reps[0].landing_quality, LandingQuality::Best);
        assert_eq!(reps[0].landing_score, 100.0);
        assert_eq!(analyzer.phase(), Phase::Jump(JumpPhase::Grounded));
    }

    #[test]
    fn test_landing_classification() {
        let (mut analyzer, mut ts) = calibrated();
        let good = completed(&jump(&mut analyzer, &mut ts, 80.0, 60.0));
        let poor = completed(&jump(&mut analyzer, &mut ts, 80.0, 0.0));
        assert_eq!(good[0].landing_quality, LandingQuality::Good);
        assert_eq!(poor[0].landing_quality, LandingQuality::Poor);
        assert_eq!(poor[0].landing_score, 40.0);
    }

    #[test]
    fn test_small_hop_below_threshold_not_counted() {
        let (mut analyzer, mut ts) = calibrated();
        let mut events = Vec::new();
        for height in [10.0, 25.0, 30.0, 10.0, 0.0] {
            events.push(analyzer.advance(&legs(GROUND - height, 0.0), ts));
            ts += 33;
        }
        assert!(completed(&events).is_empty());
        assert_eq!(analyzer.phase(), Phase::Jump(JumpPhase::Grounded));
    }

    #[test]
    fn test_takeoff_during_settle_finalizes_first() {
        let (mut analyzer, mut ts) = calibrated();
        let mut events = Vec::new();
        for height in [60.0, 100.0, 5.0, 60.0, 100.0, 5.0] {
            events.push(analyzer.advance(&legs(GROUND - height, 100.0), ts));
            ts += 33;
        }
        // Second takeoff closed the first rep; the second is still settling
        assert_eq!(completed(&events).len(), 1);
        assert_eq!(analyzer.phase(), Phase::Jump(JumpPhase::Landed));
        assert!(events.contains(&PhaseEvent::RepCompleted {
            from: Phase::Jump(JumpPhase::Landed),
            to: Phase::Jump(JumpPhase::Airborne),
            details: RepDetails::Jump(completed(&events)[0]),
        }));
    }

    /// Two hops sampled from continuous motion: 400ms peaking at 100px,
    /// then a 150ms rebound peaking at 50px starting 50ms after touchdown
    fn double_hop_height(t_ms: u64) -> f32 {
        let hop = |start: f32, duration: f32, peak: f32| {
            let p = (t_ms as f32 - start) / duration;
            if (0.0..=1.0).contains(&p) {
                4.0 * peak * p * (1.0 - p)
            } else {
                0.0
            }
        };
        hop(0.0, 400.0, 100.0).max(hop(450.0, 150.0, 50.0))
    }

    #[test]
    fn test_quick_rebound_counts_at_any_frame_rate() {
        for step_ms in [16u64, 66] {
            let (mut analyzer, start) = calibrated();
            let mut events = Vec::new();
            let mut t = 0;
            while t <= 1300 {
                let height = double_hop_height(t);
                events.push(analyzer.advance(&legs(GROUND - height, 100.0), start + t));
                t += step_ms;
            }
            let reps = completed(&events);
            assert_eq!(reps.len(), 2, "{}ms frames counted {} reps", step_ms, reps.len());
            assert!(reps[0].jump_height_px > reps[1].jump_height_px);
            assert_eq!(analyzer.phase(), Phase::Jump(JumpPhase::Grounded));
        }
    }

    #[test]
    fn test_height_never_negative() {
        let (mut analyzer, mut ts) = calibrated();
        analyzer.advance(&legs(GROUND + 40.0, 0.0), ts);
        ts += 33;
        assert_eq!(analyzer.jump_height(), Some(0.0));
        analyzer.advance(&legs(GROUND - 70.0, 0.0), ts);
        assert_eq!(analyzer.jump_height(), Some(70.0));
    }

    #[test]
    fn test_stiff_landing_penalized_on_touchdown() {
        let (analyzer, _) = calibrated();
        let touchdown = PhaseEvent::Transition {
            from: Phase::Jump(JumpPhase::Airborne),
            to: Phase::Jump(JumpPhase::Landed),
        };
        let stiff = analyzer.form_check(&legs(GROUND, 0.0), &touchdown);
        assert_eq!(stiff.deviation, 1.0);
        assert_eq!(stiff.issue, Some(FeedbackCue::StiffLanding));

        let soft = analyzer.form_check(&legs(GROUND, 100.0), &touchdown);
        assert_eq!(soft.deviation, 0.0);
        assert!(soft.issue.is_none());
    }

    #[test]
    fn test_knee_cave_in() {
        let (analyzer, _) = calibrated();
        let mut frame = legs(GROUND, 0.0);
        // Ankles 40px apart, knees pulled to 28px apart: 30% narrower
        frame.set_joint(Joint::LeftKnee, Keypoint::new(306.0, GROUND - 150.0, 1.0));
        frame.set_joint(Joint::RightKnee, Keypoint::new(334.0, GROUND - 150.0, 1.0));
        let check = analyzer.form_check(&frame, &PhaseEvent::Hold);
        assert!((check.deviation - 1.0).abs() < 1e-3);
        assert_eq!(check.issue, Some(FeedbackCue::KneesCaving));
    }

    #[test]
    fn test_rejection_resets_calibration_only_before_latch() {
        let mut analyzer = JumpAnalyzer::new(JumpConfig::default(), CalibrationConfig::default());
        for i in 0..20u64 {
            analyzer.advance(&legs(GROUND, 0.0), i * 33);
        }
        assert!(analyzer.calibration().unwrap().progress > 0.0);
        analyzer.on_rejected(20 * 33);
        assert_eq!(analyzer.calibration().unwrap().progress, 0.0);

        let (mut analyzer, ts) = calibrated();
        analyzer.on_rejected(ts);
        assert!(analyzer.is_tracking());
    }

    #[test]
    fn test_recalibrate_clears_reference() {
        let (mut analyzer, _) = calibrated();
        assert!(analyzer.recalibrate().is_ok());
        assert!(!analyzer.is_tracking());
        assert!(analyzer.ground_reference().is_none());
        assert_eq!(analyzer.calibration().unwrap().progress, 0.0);
    }
}
