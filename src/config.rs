//! Configuration management for analysis tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling threshold iteration without recompilation. Parameters for frame
//! validation, the per-exercise phase machines, jump calibration, and form
//! scoring can be adjusted via the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ProcessorError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub pull_up: PullUpConfig,
    #[serde(default)]
    pub jump: JumpConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Keypoint validation and smoothing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Minimum keypoint confidence for a joint to count as usable
    pub confidence_floor: f32,
    /// Exponential smoothing time constant in milliseconds (0 disables)
    pub smoothing_time_constant_ms: f32,
    /// Number of accepted frames retained for trail rendering
    pub trail_length: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.3,
            smoothing_time_constant_ms: 40.0,
            trail_length: 20,
        }
    }
}

/// Pull-up phase thresholds, expressed in upper-arm lengths of wrist lift
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullUpConfig {
    /// Lift above which a resting user is considered ascending
    pub ascend_lift: f32,
    /// Lift at which the top of the rep ("chin over bar") is reached
    pub top_lift: f32,
    /// Lift below which the top position is released into descent
    pub top_release: f32,
    /// Lift below which the user is back at rest
    pub rest_lift: f32,
    /// Peak lift that earns full range-of-motion credit
    pub target_peak_lift: f32,
    /// Elbow angle (degrees) that counts as full extension
    pub extension_angle: f32,
    /// Wrist height asymmetry (upper-arm lengths) mapped to full deviation
    pub asymmetry_tolerance: f32,
}

impl Default for PullUpConfig {
    fn default() -> Self {
        Self {
            ascend_lift: 0.15,
            top_lift: 0.5,
            top_release: 0.4,
            rest_lift: 0.0,
            target_peak_lift: 0.8,
            extension_angle: 160.0,
            asymmetry_tolerance: 0.5,
        }
    }
}

/// Jump phase parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpConfig {
    /// Ankle rise (pixels) above ground level that counts as airborne
    pub airborne_threshold_px: f32,
    /// Time after touchdown before the user is considered grounded again
    pub settle_ms: u64,
    /// Relative knee cave-in mapped to full deviation
    pub valgus_tolerance: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            airborne_threshold_px: 30.0,
            settle_ms: 200,
            valgus_tolerance: 0.3,
        }
    }
}

/// Jump calibration (ready stance) parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Rolling stability window length in milliseconds
    pub window_ms: u64,
    /// Hard cap on retained window samples
    pub window_capacity: usize,
    /// Samples required before stability can be judged
    pub min_samples: usize,
    /// Knee angle (degrees) at or above which the stance is ready
    pub min_knee_angle: f32,
    /// Maximum positional std-dev of hips/ankles, as a fraction of frame height
    pub max_position_std_ratio: f32,
    /// Continuous ready time needed to reach 100% progress
    pub hold_ms: u64,
    /// Progress percentage lost per second while not ready
    pub decay_per_second: f32,
    /// Continuous not-ready time after which calibration restarts
    pub instability_timeout_ms: u64,
    /// Largest timestamp step credited to a single frame
    pub max_step_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window_ms: 1500,
            window_capacity: 120,
            min_samples: 5,
            min_knee_angle: 150.0,
            max_position_std_ratio: 0.01,
            hold_ms: 1000,
            decay_per_second: 40.0,
            instability_timeout_ms: 4000,
            max_step_ms: 100,
        }
    }
}

/// Form scoring parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Fraction of the gap to the frame score closed per frame
    pub smoothing: f32,
    /// Largest change of the running score allowed per frame
    pub max_step_per_frame: f32,
    /// Instantaneous deviation that raises the pulse warning
    pub pulse_threshold: f32,
    /// Weight of the cycle's frame scores in the rep score
    pub rep_blend: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.15,
            max_step_per_frame: 2.0,
            pulse_threshold: 0.6,
            rep_blend: 0.5,
        }
    }
}

/// Session-level bookkeeping parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of rep records retained
    pub rep_history_capacity: usize,
    /// Reset the phase machine after this long without a usable frame
    /// (disabled when absent)
    #[serde(default)]
    pub occlusion_reset_ms: Option<u64>,
    /// Minimum interval between two identical feedback cues
    pub feedback_interval_ms: u64,
    /// Event channel capacity for subscribers
    pub event_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rep_history_capacity: 512,
            occlusion_reset_ms: None,
            feedback_interval_ms: 3000,
            event_channel_capacity: 256,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Check every parameter against its accepted range
    ///
    /// # Returns
    /// * `Ok(())` - Configuration usable
    /// * `Err(ProcessorError::InvalidConfig)` - First offending value
    pub fn validate(&self) -> Result<(), ProcessorError> {
        let frame = &self.frame;
        if !(0.0..=1.0).contains(&frame.confidence_floor) {
            return Err(invalid(format!(
                "frame.confidence_floor {} out of range [0, 1]",
                frame.confidence_floor
            )));
        }
        if !(frame.smoothing_time_constant_ms >= 0.0) {
            return Err(invalid(format!(
                "frame.smoothing_time_constant_ms {} must be >= 0",
                frame.smoothing_time_constant_ms
            )));
        }

        let pull_up = &self.pull_up;
        if !(pull_up.rest_lift < pull_up.ascend_lift
            && pull_up.ascend_lift < pull_up.top_lift
            && pull_up.rest_lift < pull_up.top_release
            && pull_up.top_release < pull_up.top_lift)
        {
            return Err(invalid(format!(
                "pull_up thresholds must satisfy rest < ascend < top and rest < release < top \
                 (rest={}, ascend={}, release={}, top={})",
                pull_up.rest_lift, pull_up.ascend_lift, pull_up.top_release, pull_up.top_lift
            )));
        }
        if !positive(pull_up.target_peak_lift)
            || !positive(pull_up.extension_angle)
            || !positive(pull_up.asymmetry_tolerance)
        {
            return Err(invalid(
                "pull_up target_peak_lift, extension_angle and asymmetry_tolerance must be > 0"
                    .to_string(),
            ));
        }

        if !positive(self.jump.airborne_threshold_px) || !positive(self.jump.valgus_tolerance) {
            return Err(invalid(format!(
                "jump airborne_threshold_px {} and valgus_tolerance {} must be finite and > 0",
                self.jump.airborne_threshold_px, self.jump.valgus_tolerance
            )));
        }

        let cal = &self.calibration;
        if cal.window_capacity == 0 || cal.min_samples == 0 || cal.min_samples > cal.window_capacity
        {
            return Err(invalid(format!(
                "calibration.min_samples {} must be in [1, window_capacity={}]",
                cal.min_samples, cal.window_capacity
            )));
        }
        if cal.hold_ms == 0 || cal.window_ms == 0 {
            return Err(invalid("calibration hold_ms and window_ms must be > 0".to_string()));
        }
        if !positive(cal.max_position_std_ratio) {
            return Err(invalid(format!(
                "calibration.max_position_std_ratio {} must be finite and > 0",
                cal.max_position_std_ratio
            )));
        }
        if !(0.0..=180.0).contains(&cal.min_knee_angle)
            || !(cal.decay_per_second.is_finite() && cal.decay_per_second >= 0.0)
        {
            return Err(invalid(format!(
                "calibration.min_knee_angle {} or decay_per_second {} out of range",
                cal.min_knee_angle, cal.decay_per_second
            )));
        }

        let scoring = &self.scoring;
        if !(scoring.smoothing > 0.0 && scoring.smoothing <= 1.0)
            || !positive(scoring.max_step_per_frame)
            || !(0.0..=1.0).contains(&scoring.rep_blend)
            || !(0.0..=1.0).contains(&scoring.pulse_threshold)
        {
            return Err(invalid(
                "scoring.smoothing must be in (0, 1], max_step_per_frame > 0, \
                 rep_blend and pulse_threshold in [0, 1]"
                    .to_string(),
            ));
        }

        if self.session.rep_history_capacity == 0 || self.session.event_channel_capacity == 0 {
            return Err(invalid("session capacities must be > 0".to_string()));
        }

        Ok(())
    }
}

fn invalid(reason: String) -> ProcessorError {
    ProcessorError::InvalidConfig { reason }
}

/// Finite and strictly positive; NaN fails
fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}
