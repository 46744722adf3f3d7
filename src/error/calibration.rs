// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2003
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Ground level requested before calibration completed
    pub const NOT_COMPLETE: i32 = 2001;

    /// Active exercise has no calibration phase
    pub const NOT_SUPPORTED: i32 = 2002;

    /// Calibration window holds too few samples to latch a reference
    pub const INSUFFICIENT_SAMPLES: i32 = 2003;
}

/// Log a calibration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=JumpCalibration, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// Losing stability mid-calibration is not an error; progress decays
/// instead. These cover explicit control requests that cannot be honored.
///
/// Error code range: 2001-2003
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Calibration not complete
    NotComplete,

    /// Exercise does not calibrate
    NotSupported { exercise: String },

    /// Not enough window samples to compute a reference
    InsufficientSamples { required: usize, collected: usize },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::NotComplete => CalibrationErrorCodes::NOT_COMPLETE,
            CalibrationError::NotSupported { .. } => CalibrationErrorCodes::NOT_SUPPORTED,
            CalibrationError::InsufficientSamples { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_SAMPLES
            }
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::NotComplete => "Calibration not complete".to_string(),
            CalibrationError::NotSupported { exercise } => {
                format!("Exercise '{}' has no calibration phase", exercise)
            }
            CalibrationError::InsufficientSamples {
                required,
                collected,
            } => {
                format!("Insufficient samples: need {}, got {}", required, collected)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
