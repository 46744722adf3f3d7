// GroundReference - latched spatial reference for jump tracking
//
// Once the ready stance has been held long enough, the mean ankle height over
// the stability window becomes the ground level that jump heights are
// measured from. It is only replaced by an explicit recalibration.

use crate::error::CalibrationError;

/// Ground level latched at the end of calibration
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroundReference {
    /// Mean ankle y (pixels, image coordinates) over the stable window
    pub ground_level: f32,
    /// Number of window samples the mean was taken over
    pub sample_count: usize,
    /// Timestamp of the frame that completed calibration
    pub latched_at_ms: u64,
}

impl GroundReference {
    /// Compute the reference from window ankle heights
    ///
    /// # Arguments
    /// * `ankle_heights` - Mean ankle y of every window sample
    /// * `min_samples` - Minimum samples needed for a trustworthy mean
    /// * `latched_at_ms` - Timestamp of the completing frame
    ///
    /// # Returns
    /// * `Ok(GroundReference)` - Reference latched
    /// * `Err(CalibrationError::InsufficientSamples)` - Too few samples
    pub fn from_window(
        ankle_heights: &[f32],
        min_samples: usize,
        latched_at_ms: u64,
    ) -> Result<Self, CalibrationError> {
        if ankle_heights.is_empty() || ankle_heights.len() < min_samples {
            return Err(CalibrationError::InsufficientSamples {
                required: min_samples.max(1),
                collected: ankle_heights.len(),
            });
        }

        let ground_level = ankle_heights.iter().sum::<f32>() / ankle_heights.len() as f32;
        Ok(Self {
            ground_level,
            sample_count: ankle_heights.len(),
            latched_at_ms,
        })
    }

    /// Height of an ankle position above the ground level, never negative
    pub fn height_of(&self, ankle_y: f32) -> f32 {
        (self.ground_level - ankle_y).max(0.0)
    }
}
