//! End-to-end scenarios for the frame processing pipeline
//!
//! Covers:
//! - Pull-up rep counting from hand-placed and synthetic streams
//! - Frame-rate independence (15 fps vs 60 fps)
//! - Robustness to single noisy or partially occluded frames
//! - Jump calibration progress, ground latch and height estimation

use rep_coach::analysis::{ExerciseKind, JumpPhase, Phase};
use rep_coach::config::AppConfig;
use rep_coach::engine::{ExerciseProcessor, FrameInput, FrameOutcome, ProcessorEvent};
use rep_coach::fixtures::{FixtureProcessor, MotionGenerator, SyntheticSpec, TimedFrame};
use rep_coach::pose::{Joint, RawFrame, RawKeypoint};

fn input(timestamp_ms: u64, frame: RawFrame, exercise: ExerciseKind) -> FrameInput {
    FrameInput {
        timestamp_ms,
        frame,
        exercise,
        active: true,
    }
}

/// Upper body with wrists `lift` upper-arm lengths above the shoulders
fn pull_up_frame(lift: f32, hip_confidence: f32) -> RawFrame {
    let shoulder_y = 300.0;
    let wrist_y = shoulder_y - lift * 60.0;
    RawFrame {
        keypoints: vec![
            RawKeypoint::new(Joint::LeftShoulder, 260.0, shoulder_y, 1.0),
            RawKeypoint::new(Joint::RightShoulder, 380.0, shoulder_y, 1.0),
            RawKeypoint::new(Joint::LeftElbow, 200.0, shoulder_y, 1.0),
            RawKeypoint::new(Joint::RightElbow, 440.0, shoulder_y, 1.0),
            RawKeypoint::new(Joint::LeftWrist, 200.0, wrist_y, 1.0),
            RawKeypoint::new(Joint::RightWrist, 440.0, wrist_y, 1.0),
            RawKeypoint::new(Joint::LeftHip, 280.0, 520.0, hip_confidence),
            RawKeypoint::new(Joint::RightHip, 360.0, 520.0, hip_confidence),
        ],
        width: 640,
        height: 720,
    }
}

/// Upright legs with ankles at `ankle_y`
fn stance_frame(ankle_y: f32, confidence: f32) -> RawFrame {
    let mut keypoints = Vec::new();
    for (left, right, y) in [
        (Joint::LeftHip, Joint::RightHip, ankle_y - 300.0),
        (Joint::LeftKnee, Joint::RightKnee, ankle_y - 150.0),
        (Joint::LeftAnkle, Joint::RightAnkle, ankle_y),
    ] {
        keypoints.push(RawKeypoint::new(left, 280.0, y, confidence));
        keypoints.push(RawKeypoint::new(right, 360.0, y, confidence));
    }
    RawFrame {
        keypoints,
        width: 640,
        height: 720,
    }
}

/// Stance with hips at their own confidence, knees and ankles fully visible
fn stance_with_hips(ankle_y: f32, hip_confidence: f32) -> RawFrame {
    let mut frame = stance_frame(ankle_y, 1.0);
    for keypoint in &mut frame.keypoints {
        if keypoint.name.ends_with("_hip") {
            keypoint.score = hip_confidence;
        }
    }
    frame
}

/// Feed a stable stance until the ground level latches; returns the next timestamp
fn calibrate_jumps(processor: &mut ExerciseProcessor) -> u64 {
    let mut ts = 0;
    while processor.state().ground_level().is_none() {
        let ankle_y = if (ts / 33) % 2 == 0 { 599.5 } else { 600.5 };
        processor.process_frame(&input(ts, stance_frame(ankle_y, 1.0), ExerciseKind::Jumps));
        ts += 33;
        assert!(ts < 5000, "calibration never completed");
    }
    ts
}

fn synthetic(exercise: ExerciseKind, spec: SyntheticSpec) -> Vec<TimedFrame> {
    MotionGenerator::new(spec).generate(exercise)
}

fn replay(exercise: ExerciseKind, frames: &[TimedFrame]) -> ExerciseProcessor {
    let mut processor = ExerciseProcessor::new(AppConfig::default(), exercise).unwrap();
    for timed in frames {
        processor.process_frame(&input(timed.timestamp_ms, timed.frame.clone(), exercise));
    }
    processor
}

#[test]
fn test_ten_up_ten_down_counts_one_rep() {
    let mut processor =
        ExerciseProcessor::new(AppConfig::default(), ExerciseKind::PullUps).unwrap();
    let lifts = [1.0f32; 10].into_iter().chain([-1.0f32; 10]);
    for (i, lift) in lifts.enumerate() {
        processor.process_frame(&input(
            i as u64 * 33,
            pull_up_frame(lift, 1.0),
            ExerciseKind::PullUps,
        ));
    }

    let state = processor.state();
    assert_eq!(state.rep_count(), 1);
    let records = state.records();
    assert_eq!(records.len(), 1);
    assert!((0.0..=100.0).contains(&records[0].score));
}

#[test]
fn test_low_hip_confidence_does_not_interrupt_pull_up() {
    let mut processor =
        ExerciseProcessor::new(AppConfig::default(), ExerciseKind::PullUps).unwrap();
    let lifts = [-0.5, 0.2, 0.35, 0.6, 0.9, 1.0, 1.0, 0.3, -0.2, -0.5, -0.5];
    for (i, lift) in lifts.iter().enumerate() {
        let hip_confidence = if i == 2 { 0.1 } else { 1.0 };
        let outcome = processor.process_frame(&input(
            i as u64 * 33,
            pull_up_frame(*lift, hip_confidence),
            ExerciseKind::PullUps,
        ));
        assert!(
            !matches!(outcome, FrameOutcome::Rejected { .. }),
            "hips are not required for pull-ups"
        );
    }
    assert_eq!(processor.state().rep_count(), 1);
}

#[test]
fn test_pull_up_count_is_frame_rate_independent() {
    let slow = replay(
        ExerciseKind::PullUps,
        &synthetic(
            ExerciseKind::PullUps,
            SyntheticSpec {
                fps: 15.0,
                ..SyntheticSpec::default()
            },
        ),
    );
    let fast = replay(
        ExerciseKind::PullUps,
        &synthetic(
            ExerciseKind::PullUps,
            SyntheticSpec {
                fps: 60.0,
                ..SyntheticSpec::default()
            },
        ),
    );
    assert_eq!(slow.state().rep_count(), 3);
    assert_eq!(fast.state().rep_count(), slow.state().rep_count());
}

#[test]
fn test_jump_count_is_frame_rate_independent() {
    let slow = replay(
        ExerciseKind::Jumps,
        &synthetic(
            ExerciseKind::Jumps,
            SyntheticSpec {
                fps: 15.0,
                ..SyntheticSpec::default()
            },
        ),
    );
    let fast = replay(
        ExerciseKind::Jumps,
        &synthetic(
            ExerciseKind::Jumps,
            SyntheticSpec {
                fps: 60.0,
                ..SyntheticSpec::default()
            },
        ),
    );
    assert_eq!(slow.state().rep_count(), 3);
    assert_eq!(fast.state().rep_count(), slow.state().rep_count());
    let slow_ground = slow.state().ground_level().unwrap();
    let fast_ground = fast.state().ground_level().unwrap();
    assert!((slow_ground - fast_ground).abs() < 1.0);
}

#[test]
fn test_single_noisy_frame_is_absorbed() {
    let mut config = AppConfig::default();
    config.frame.smoothing_time_constant_ms = 0.0;
    let clean = synthetic(ExerciseKind::PullUps, SyntheticSpec::default());

    // One frame mid-stream with wildly uneven wrists but an unchanged mean
    let noisy_index = clean.len() / 2;
    let mut noisy = clean.clone();
    for keypoint in noisy[noisy_index].frame.keypoints.iter_mut() {
        if keypoint.name == "left_wrist" {
            keypoint.y += 40.0;
        } else if keypoint.name == "right_wrist" {
            keypoint.y -= 40.0;
        }
    }

    let run = |frames: &[TimedFrame]| {
        let mut processor = ExerciseProcessor::new(config.clone(), ExerciseKind::PullUps).unwrap();
        let mut scores = Vec::new();
        for timed in frames {
            processor.process_frame(&input(
                timed.timestamp_ms,
                timed.frame.clone(),
                ExerciseKind::PullUps,
            ));
            scores.push(processor.state().running_score());
        }
        (processor.state().rep_count(), scores)
    };

    let (clean_count, clean_scores) = run(&clean);
    let (noisy_count, noisy_scores) = run(&noisy);
    assert_eq!(clean_count, noisy_count);
    assert!(
        (noisy_scores[noisy_index] - noisy_scores[noisy_index - 1]).abs()
            <= config.scoring.max_step_per_frame + 1e-4
    );
    assert!((noisy_scores[noisy_index] - clean_scores[noisy_index]).abs() <= 2.0 + 1e-4);
}

#[test]
fn test_scores_stay_in_bounds_under_jitter() {
    for exercise in [ExerciseKind::PullUps, ExerciseKind::Jumps] {
        let frames = synthetic(
            exercise,
            SyntheticSpec {
                jitter_px: 25.0,
                dropout_every: Some(4),
                ..SyntheticSpec::default()
            },
        );
        let mut processor = ExerciseProcessor::new(AppConfig::default(), exercise).unwrap();
        for timed in &frames {
            let outcome =
                processor.process_frame(&input(timed.timestamp_ms, timed.frame.clone(), exercise));
            let running = processor.state().running_score();
            assert!((0.0..=100.0).contains(&running), "running score {running}");
            if let Some(rep) = outcome.rep() {
                assert!((0.0..=100.0).contains(&rep.score), "rep score {}", rep.score);
            }
        }
    }
}

#[test]
fn test_calibration_latches_mean_ankle_height() {
    let mut processor = ExerciseProcessor::new(AppConfig::default(), ExerciseKind::Jumps).unwrap();
    let mut progress = Vec::new();
    for i in 0..45u64 {
        // Sub-pixel sway keeps the stance stable
        let ankle_y = if i % 2 == 0 { 599.5 } else { 600.5 };
        processor.process_frame(&input(i * 33, stance_frame(ankle_y, 1.0), ExerciseKind::Jumps));
        if let Some(snapshot) = processor.state().calibration() {
            progress.push(snapshot.progress);
        }
    }

    assert!(progress.windows(2).all(|pair| pair[1] >= pair[0]));
    let snapshot = processor.state().calibration().unwrap();
    assert!(!snapshot.is_calibrating);
    assert_eq!(snapshot.percentage(), 100);
    let ground = processor.state().ground_level().unwrap();
    assert!((ground - 600.0).abs() < 1.0, "ground {ground}");
    assert_eq!(processor.state().phase(), Phase::Jump(JumpPhase::Grounded));
}

#[test]
fn test_unusable_frame_resets_calibration_progress() {
    let mut processor = ExerciseProcessor::new(AppConfig::default(), ExerciseKind::Jumps).unwrap();
    for i in 0..15u64 {
        processor.process_frame(&input(i * 33, stance_frame(600.0, 1.0), ExerciseKind::Jumps));
    }
    let before = processor.state().calibration().unwrap();
    assert!(before.progress > 0.0 && before.is_calibrating);

    let outcome =
        processor.process_frame(&input(15 * 33, stance_frame(600.0, 0.1), ExerciseKind::Jumps));
    assert!(matches!(outcome, FrameOutcome::Rejected { .. }));
    let after = processor.state().calibration().unwrap();
    assert_eq!(after.progress, 0.0);
    assert!(after.is_calibrating);
}

#[test]
fn test_jump_height_is_never_negative() {
    let frames = synthetic(
        ExerciseKind::Jumps,
        SyntheticSpec {
            jitter_px: 3.0,
            ..SyntheticSpec::default()
        },
    );
    let mut processor = ExerciseProcessor::new(AppConfig::default(), ExerciseKind::Jumps).unwrap();
    let mut peak: f32 = 0.0;
    for timed in &frames {
        let outcome = processor.process_frame(&input(
            timed.timestamp_ms,
            timed.frame.clone(),
            ExerciseKind::Jumps,
        ));
        for event in outcome.events() {
            if let ProcessorEvent::JumpHeight { height_px } = event {
                assert!(*height_px >= 0.0);
                peak = peak.max(*height_px);
            }
        }
    }
    assert!(peak > 50.0, "peak {peak}");
}

#[test]
fn test_rejected_frames_mid_flight_keep_the_jump() {
    let mut processor = ExerciseProcessor::new(AppConfig::default(), ExerciseKind::Jumps).unwrap();
    let mut ts = calibrate_jumps(&mut processor);

    for _ in 0..3 {
        processor.process_frame(&input(ts, stance_frame(480.0, 1.0), ExerciseKind::Jumps));
        ts += 33;
    }
    assert_eq!(processor.state().phase(), Phase::Jump(JumpPhase::Airborne));

    for _ in 0..5 {
        let outcome =
            processor.process_frame(&input(ts, stance_with_hips(480.0, 0.1), ExerciseKind::Jumps));
        assert!(matches!(outcome, FrameOutcome::Rejected { .. }));
        ts += 33;
    }
    assert_eq!(processor.state().phase(), Phase::Jump(JumpPhase::Airborne));

    for ankle_y in [480.0, 520.0] {
        processor.process_frame(&input(ts, stance_frame(ankle_y, 1.0), ExerciseKind::Jumps));
        ts += 33;
    }
    for _ in 0..15 {
        processor.process_frame(&input(ts, stance_frame(600.0, 1.0), ExerciseKind::Jumps));
        ts += 33;
    }

    assert_eq!(processor.state().rep_count(), 1);
    assert_eq!(processor.state().phase(), Phase::Jump(JumpPhase::Grounded));
}

#[test]
fn test_quick_rebound_counts_at_low_and_high_frame_rates() {
    // Continuous motion: a 400ms hop peaking at 100px, then a 150ms
    // rebound peaking at 50px that leaves the ground 50ms after touchdown
    let height_at = |t: u64| {
        let hop = |start: f32, duration: f32, peak: f32| {
            let p = (t as f32 - start) / duration;
            if (0.0..=1.0).contains(&p) {
                4.0 * peak * p * (1.0 - p)
            } else {
                0.0
            }
        };
        hop(0.0, 400.0, 100.0).max(hop(450.0, 150.0, 50.0))
    };

    let mut config = AppConfig::default();
    config.frame.smoothing_time_constant_ms = 0.0;
    for step_ms in [16u64, 66] {
        let mut processor = ExerciseProcessor::new(config.clone(), ExerciseKind::Jumps).unwrap();
        let start = calibrate_jumps(&mut processor);
        let mut t = 0;
        while t <= 1300 {
            let frame = stance_frame(600.0 - height_at(t), 1.0);
            processor.process_frame(&input(start + t, frame, ExerciseKind::Jumps));
            t += step_ms;
        }
        assert_eq!(processor.state().rep_count(), 2, "{}ms frames", step_ms);
    }
}

#[test]
fn test_jump_session_summary() {
    let run = FixtureProcessor::new(AppConfig::default())
        .run_frames(
            ExerciseKind::Jumps,
            &synthetic(ExerciseKind::Jumps, SyntheticSpec::default()),
        )
        .unwrap();

    let summary = run.summary;
    assert_eq!(summary.rep_count, 3);
    let jump = summary.jump.unwrap();
    assert_eq!(jump.landing_success_rate, 100.0);
    assert!(jump.average_landing_angle < 120.0);
    assert_eq!(jump.average_landing_score, 100.0);
    assert!(summary.pull_up.is_none());
}

#[test]
fn test_switching_exercise_starts_fresh() {
    let mut processor =
        ExerciseProcessor::new(AppConfig::default(), ExerciseKind::PullUps).unwrap();
    for (i, lift) in [1.0f32, 1.0, -1.0, -1.0].iter().enumerate() {
        processor.process_frame(&input(
            i as u64 * 33,
            pull_up_frame(*lift, 1.0),
            ExerciseKind::PullUps,
        ));
    }
    assert_eq!(processor.state().rep_count(), 1);

    let outcome =
        processor.process_frame(&input(200, stance_frame(600.0, 1.0), ExerciseKind::Jumps));
    assert!(outcome
        .events()
        .iter()
        .any(|event| matches!(event, ProcessorEvent::ExerciseSwitched { .. })));
    assert_eq!(processor.exercise(), ExerciseKind::Jumps);
    assert_eq!(processor.state().rep_count(), 0);
    assert!(processor.state().ground_level().is_none());
}
