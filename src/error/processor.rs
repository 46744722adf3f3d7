// Processor error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Processor error code constants
///
/// Single source of truth for the numeric codes reported to callers.
///
/// Error code range: 1001-1002
pub struct ProcessorErrorCodes {}

impl ProcessorErrorCodes {
    /// Exercise identifier does not name a supported exercise
    pub const UNKNOWN_EXERCISE: i32 = 1001;

    /// Configuration value out of its accepted range
    pub const INVALID_CONFIG: i32 = 1002;
}

/// Log a processor error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_processor_error(err: &ProcessorError, context: &str) {
    error!(
        "Processor error in {}: code={}, component=ExerciseProcessor, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors surfaced while building or driving an exercise processor
///
/// These are programmer/configuration errors. Noisy or missing keypoints
/// never produce one of these; they are handled inside frame processing.
///
/// Error code range: 1001-1002
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorError {
    /// Exercise identifier is not one of the supported exercises
    UnknownExercise { name: String },

    /// A configuration value is out of range
    InvalidConfig { reason: String },
}

impl ErrorCode for ProcessorError {
    fn code(&self) -> i32 {
        match self {
            ProcessorError::UnknownExercise { .. } => ProcessorErrorCodes::UNKNOWN_EXERCISE,
            ProcessorError::InvalidConfig { .. } => ProcessorErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            ProcessorError::UnknownExercise { name } => {
                format!("Unknown exercise '{}' (expected 'pull-ups' or 'jumps')", name)
            }
            ProcessorError::InvalidConfig { reason } => {
                format!("Invalid configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProcessorError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ProcessorError {}
