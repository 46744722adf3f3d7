//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes frame latency, rejections, rep completions and
//! calibration milestones into a bounded history plus a broadcast stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

use crate::analysis::ExerciseKind;
use crate::calibration::GroundReference;
use crate::pose::Joint;

pub mod events;

pub use events::{DiagnosticError, MetricEvent};

/// Per-frame processing budget in milliseconds
pub const FRAME_BUDGET_MS: f32 = 5.0;

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        let history_capacity = history_capacity.max(1);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = lock(&self.history);
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = lock(&self.history);
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Rolling summary of the latency window
#[derive(Debug, Clone, Copy, PartialEq)]
struct LatencyStats {
    avg_ms: f32,
    max_ms: f32,
    count: usize,
    over_budget: usize,
}

/// Latency tracker maintains a rolling window to compute avg/max latency.
struct LatencyTracker {
    samples: VecDeque<f32>,
    max_samples: usize,
}

impl LatencyTracker {
    fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn observe(&mut self, value: f32) -> LatencyStats {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value.abs());

        let count = self.samples.len();
        let sum: f32 = self.samples.iter().copied().sum();
        let max = self
            .samples
            .iter()
            .copied()
            .fold(0.0_f32, |acc, next| acc.max(next));
        let over_budget = self
            .samples
            .iter()
            .filter(|sample| **sample > FRAME_BUDGET_MS)
            .count();
        LatencyStats {
            avg_ms: if count == 0 { 0.0 } else { sum / count as f32 },
            max_ms: max,
            count,
            over_budget,
        }
    }
}

/// Top-level hub wrapping the collector plus the latency window.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    latency: Mutex<LatencyTracker>,
    /// Emit a latency summary every N frames
    latency_report_every: u64,
    frames_observed: AtomicU64,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize, latency_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            latency: Mutex::new(LatencyTracker::new(latency_window)),
            latency_report_every: latency_window.max(1) as u64,
            frames_observed: AtomicU64::new(0),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    /// Record one frame's processing time
    ///
    /// A latency summary is published once per window, and immediately for
    /// a frame over budget.
    pub fn record_frame_latency(&self, elapsed_ms: f32) {
        let stats = lock(&self.latency).observe(elapsed_ms);
        let frames = self.frames_observed.fetch_add(1, Ordering::Relaxed) + 1;

        if frames % self.latency_report_every == 0 || elapsed_ms > FRAME_BUDGET_MS {
            self.collector.publish(MetricEvent::Latency {
                avg_ms: stats.avg_ms,
                max_ms: stats.max_ms,
                sample_count: stats.count,
                over_budget: stats.over_budget,
            });
        }
    }

    pub fn record_rejection(&self, exercise: ExerciseKind, missing: &[Joint]) {
        self.collector.publish(MetricEvent::FrameRejected {
            exercise,
            missing: missing.to_vec(),
        });
    }

    pub fn record_rep(&self, exercise: ExerciseKind, rep_count: usize, score: f32) {
        self.collector.publish(MetricEvent::RepCompleted {
            exercise,
            rep_count,
            score,
        });
    }

    pub fn record_calibration(&self, reference: &GroundReference) {
        self.collector.publish(MetricEvent::CalibrationLatched {
            ground_level: reference.ground_level,
            sample_count: reference.sample_count,
        });
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 32)
    }
}
