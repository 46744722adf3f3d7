//! Engine module housing the exercise processor.
//!
//! `core` holds the `ExerciseProcessor` orchestration layer, `state` the
//! per-session state and rep records, `events` the broadcast event type and
//! `summary` the post-session analytics.

pub mod core;
pub mod events;
pub mod state;
pub mod summary;

pub use self::core::{ExerciseProcessor, FrameInput, FrameOutcome, FrameReport};
pub use events::ProcessorEvent;
pub use state::{ExerciseState, RepRecord};
pub use summary::{JumpAnalytics, PullUpAnalytics, SessionSummary};
