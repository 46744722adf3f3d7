// Feedback cues and per-cue rate limiting
//
// Cues are structured; the text is only a default rendering for callers that
// have no copy of their own. Form cues repeat at most once per interval so a
// persistent issue does not flood the user, while rep cues always fire.

use std::collections::HashMap;

use crate::analysis::height::LandingQuality;

/// Coaching cue emitted alongside frame results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "cue", content = "quality")]
pub enum FeedbackCue {
    /// Required joints left the frame or lost confidence
    Reposition,
    /// Jump ground level latched
    CalibrationComplete,
    /// Pull-up abandoned before reaching the top
    PartialRep,
    /// One side of a pull-up is leading
    UnevenPull,
    /// Knees collapsing inward on a jump
    KneesCaving,
    /// Touchdown with nearly straight legs
    StiffLanding,
    /// Pull-up counted
    PullUpCounted,
    /// Jump counted, with its landing quality
    JumpCounted(LandingQuality),
}

impl FeedbackCue {
    /// Rep cues bypass the rate limiter
    pub fn is_rep_cue(&self) -> bool {
        matches!(self, FeedbackCue::PullUpCounted | FeedbackCue::JumpCounted(_))
    }

    pub fn message(&self) -> &'static str {
        match self {
            FeedbackCue::Reposition => "Step back so your whole body is in view",
            FeedbackCue::CalibrationComplete => "Calibrated! Start jumping",
            FeedbackCue::PartialRep => "Pull all the way up to count the rep",
            FeedbackCue::UnevenPull => "Keep your shoulders level",
            FeedbackCue::KneesCaving => "Push your knees out",
            FeedbackCue::StiffLanding => "Bend your knees when you land",
            FeedbackCue::PullUpCounted => "Nice rep!",
            FeedbackCue::JumpCounted(LandingQuality::Best) => "Perfect landing!",
            FeedbackCue::JumpCounted(LandingQuality::Good) => "Good landing, sink a little deeper",
            FeedbackCue::JumpCounted(LandingQuality::Poor) => "Land softer, bend your knees",
        }
    }
}

/// Suppresses repeats of the same cue inside a time interval
#[derive(Debug)]
pub struct FeedbackLimiter {
    last_emitted_ms: HashMap<FeedbackCue, u64>,
    interval_ms: u64,
}

impl FeedbackLimiter {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            last_emitted_ms: HashMap::new(),
            interval_ms,
        }
    }

    pub fn clear(&mut self) {
        self.last_emitted_ms.clear();
    }

    /// Decide whether `cue` may be emitted at `timestamp_ms`, recording it if so
    pub fn should_emit(&mut self, cue: FeedbackCue, timestamp_ms: u64) -> bool {
        if cue.is_rep_cue() {
            return true;
        }

        let past_rate_limit = self
            .last_emitted_ms
            .get(&cue)
            .map(|last| timestamp_ms.saturating_sub(*last) >= self.interval_ms)
            .unwrap_or(true);

        if past_rate_limit {
            self.last_emitted_ms.insert(cue, timestamp_ms);
        }
        past_rate_limit
    }
}
