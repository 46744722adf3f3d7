// FormScorer - running form score and per-rep score
//
// Analyzers turn each frame into a deviation in [0,1] (0 = textbook form).
// The scorer keeps two signals apart: a smoothed running score that can only
// move a bounded amount per frame, and an instantaneous pulse that flags an
// acute problem on the current frame.

use crate::config::ScoringConfig;

/// Scoring result for one accepted frame
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameScore {
    /// Deviation after clamping to [0,1]
    pub deviation: f32,
    /// Unsmoothed score of this frame (0-100)
    pub frame_score: f32,
    /// Smoothed running score (0-100)
    pub running_score: f32,
    /// Acute form issue on this frame
    pub pulse: bool,
}

pub struct FormScorer {
    config: ScoringConfig,
    running: f32,
    cycle_total: f64,
    cycle_frames: u32,
}

impl FormScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            running: 100.0,
            cycle_total: 0.0,
            cycle_frames: 0,
        }
    }

    /// Fold one frame's deviation into the running score
    pub fn score_frame(&mut self, deviation: f32) -> FrameScore {
        let deviation = if deviation.is_finite() {
            deviation.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let frame_score = 100.0 * (1.0 - deviation);

        let limit = self.config.max_step_per_frame.abs();
        let step = ((frame_score - self.running) * self.config.smoothing).clamp(-limit, limit);
        self.running = (self.running + step).clamp(0.0, 100.0);

        self.cycle_total += frame_score as f64;
        self.cycle_frames += 1;

        FrameScore {
            deviation,
            frame_score,
            running_score: self.running,
            pulse: deviation >= self.config.pulse_threshold,
        }
    }

    /// Close the current cycle and compute its rep score
    ///
    /// # Arguments
    /// * `quality` - Exercise-specific quality of the rep in [0,1]
    pub fn finalize_rep(&mut self, quality: f32) -> f32 {
        let form = if self.cycle_frames > 0 {
            (self.cycle_total / self.cycle_frames as f64) as f32
        } else {
            self.running
        };
        let quality = if quality.is_finite() {
            quality.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let blend = self.config.rep_blend.clamp(0.0, 1.0);
        self.discard_cycle();
        (blend * form + (1.0 - blend) * 100.0 * quality).clamp(0.0, 100.0)
    }

    /// Drop frames accumulated for an abandoned partial rep
    pub fn discard_cycle(&mut self) {
        self.cycle_total = 0.0;
        self.cycle_frames = 0;
    }

    pub fn running_score(&self) -> f32 {
        self.running
    }

    pub fn reset(&mut self) {
        self.running = 100.0;
        self.discard_cycle();
    }
}
