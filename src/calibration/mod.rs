// Calibration module - ready-stance detection for jump tracking
//
// This module provides three components:
// 1. JumpCalibration: rolling-window stability and knee-angle readiness
// 2. CalibrationSnapshot: live progress and guidance for display
// 3. GroundReference: the ground level latched when calibration completes
//
// The calibration workflow:
// 1. Jump analyzer feeds every frame to JumpCalibration
// 2. Progress fills while the stance is still and upright, decays otherwise
// 3. At 100% the mean ankle height over the window becomes the ground level

pub mod procedure;
pub mod progress;
pub mod state;

pub use procedure::JumpCalibration;
pub use progress::{CalibrationGuidance, CalibrationSnapshot};
pub use state::GroundReference;
