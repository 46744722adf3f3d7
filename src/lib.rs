// Rep Coach Core - pose-driven exercise analysis
// Per-frame keypoint validation, phase detection, rep scoring and jump calibration

// Module declarations
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod pose;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::ExerciseKind;
pub use config::AppConfig;
pub use engine::{
    ExerciseProcessor, FrameInput, FrameOutcome, ProcessorEvent, RepRecord, SessionSummary,
};
pub use error::{CalibrationError, ErrorCode, ProcessorError};
pub use pose::{Joint, RawFrame, RawKeypoint};

use tracing_subscriber::EnvFilter;

/// Install the process-wide fmt subscriber
///
/// Filter comes from `RUST_LOG` (default `info`). `log` records are bridged
/// through the subscriber. Calling this more than once is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
