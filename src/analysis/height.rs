//! Jump height estimation and landing classification
//!
//! Heights are measured in pixels above the latched ground level. Converting
//! to physical units needs a camera calibration factor and happens outside
//! this crate.

use crate::calibration::GroundReference;

/// Knee flexion below this angle at touchdown is the best landing
pub const BEST_LANDING_ANGLE: f32 = 120.0;

/// Knee flexion below this angle at touchdown is a good landing
pub const GOOD_LANDING_ANGLE: f32 = 140.0;

/// Landing quality classified from knee flexion at touchdown
///
/// Thresholds are fixed, never tuned per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingQuality {
    /// Deep knee bend absorbing the impact (< 120°)
    Best,
    /// Adequate knee bend (< 140°)
    Good,
    /// Stiff-legged landing
    Poor,
}

impl LandingQuality {
    pub fn classify(knee_angle: f32) -> Self {
        if knee_angle < BEST_LANDING_ANGLE {
            LandingQuality::Best
        } else if knee_angle < GOOD_LANDING_ANGLE {
            LandingQuality::Good
        } else {
            LandingQuality::Poor
        }
    }

    /// Landing score (0-100) recorded with the rep
    pub fn score(&self) -> f32 {
        match self {
            LandingQuality::Best => 100.0,
            LandingQuality::Good => 75.0,
            LandingQuality::Poor => 40.0,
        }
    }

    /// Whether this landing counts towards the success rate
    pub fn is_success(&self) -> bool {
        !matches!(self, LandingQuality::Poor)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LandingQuality::Best => "best",
            LandingQuality::Good => "good",
            LandingQuality::Poor => "poor",
        }
    }
}

/// Tracks instantaneous and per-jump peak height against a ground reference
#[derive(Debug, Clone, Default)]
pub struct JumpHeightEstimator {
    reference: Option<GroundReference>,
    current: f32,
    peak: f32,
}

impl JumpHeightEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reference(&mut self, reference: GroundReference) {
        self.reference = Some(reference);
        self.current = 0.0;
        self.peak = 0.0;
    }

    pub fn reference(&self) -> Option<GroundReference> {
        self.reference
    }

    pub fn clear(&mut self) {
        self.reference = None;
        self.current = 0.0;
        self.peak = 0.0;
    }

    /// Update from the current mean ankle y
    ///
    /// Returns the instantaneous height, or `None` before calibration.
    /// Height is never negative: ankles at or below ground read as 0.
    pub fn update(&mut self, ankle_y: f32) -> Option<f32> {
        let reference = self.reference?;
        self.current = reference.height_of(ankle_y);
        self.peak = self.peak.max(self.current);
        Some(self.current)
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    /// Highest height seen since the last [`start_jump`](Self::start_jump)
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Begin tracking a new takeoff; the peak restarts from the current height
    pub fn start_jump(&mut self) {
        self.peak = self.current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(ground: f32) -> GroundReference {
        GroundReference::from_window(&[ground; 5], 5, 0).unwrap()
    }

    #[test]
    fn test_landing_thresholds() {
        assert_eq!(LandingQuality::classify(90.0), LandingQuality::Best);
        assert_eq!(LandingQuality::classify(119.9), LandingQuality::Best);
        assert_eq!(LandingQuality::classify(120.0), LandingQuality::Good);
        assert_eq!(LandingQuality::classify(120.0).display_name(), "good");
        assert_eq!(LandingQuality::classify(139.9), LandingQuality::Good);
        assert_eq!(LandingQuality::classify(140.0), LandingQuality::Poor);
        assert_eq!(LandingQuality::classify(175.0), LandingQuality::Poor);
    }

    #[test]
    fn test_landing_scores() {
        assert_eq!(LandingQuality::Best.score(), 100.0);
        assert_eq!(LandingQuality::Good.score(), 75.0);
        assert_eq!(LandingQuality::Poor.score(), 40.0);
        assert!(LandingQuality::Good.is_success());
        assert!(!LandingQuality::Poor.is_success());
    }

    #[test]
    fn test_uncalibrated_has_no_height() {
        let mut estimator = JumpHeightEstimator::new();
        assert_eq!(estimator.update(400.0), None);
        assert_eq!(estimator.current(), 0.0);
    }

    #[test]
    fn test_height_never_negative() {
        let mut estimator = JumpHeightEstimator::new();
        estimator.set_reference(reference(600.0));
        assert_eq!(estimator.update(600.0), Some(0.0));
        assert_eq!(estimator.update(640.0), Some(0.0));
        assert_eq!(estimator.update(520.0), Some(80.0));
    }

    #[test]
    fn test_peak_tracks_single_jump() {
        let mut estimator = JumpHeightEstimator::new();
        estimator.set_reference(reference(600.0));
        for y in [560.0, 500.0, 480.0, 530.0] {
            estimator.update(y);
        }
        assert_eq!(estimator.peak(), 120.0);

        estimator.update(600.0);
        estimator.start_jump();
        estimator.update(550.0);
        assert_eq!(estimator.peak(), 50.0);
    }
}
