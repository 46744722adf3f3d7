// Error types for the rep coaching core
//
// This module defines structured error types for processor construction and
// calibration control, each carrying a stable numeric code so embedding UIs
// can map failures without string matching.

mod calibration;
mod processor;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use processor::{log_processor_error, ProcessorError, ProcessorErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the embedding boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
