//! Fixture utilities for the deterministic CLI harness.
//!
//! This module discovers fixture files, loads recorded or synthetic pose
//! streams, parses optional expectation JSON, and replays the stream through
//! an `ExerciseProcessor`. Fixtures live in `fixtures/<name>.json`, with
//! expectations alongside in `fixtures/<name>.expect.json`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analysis::ExerciseKind;
use crate::config::AppConfig;
use crate::engine::{
    ExerciseProcessor, FrameInput, FrameOutcome, ProcessorEvent, RepRecord, SessionSummary,
};
use crate::pose::RawFrame;

pub mod synthetic;

pub use synthetic::{MotionGenerator, SyntheticSpec};

/// Default location for fixture JSON assets.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

const EXPECT_SUFFIX: &str = ".expect.json";

/// A raw frame with its capture timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedFrame {
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub frame: RawFrame,
}

/// Where a fixture's frames come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FixtureSource {
    /// Recorded frame list
    Frames { frames: Vec<TimedFrame> },
    /// Generated on load
    Synthetic(SyntheticSpec),
}

/// On-disk fixture schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureFile {
    pub exercise: ExerciseKind,
    #[serde(default)]
    pub description: Option<String>,
    pub source: FixtureSource,
}

impl FixtureFile {
    /// Materialize the frame stream
    pub fn frames(&self) -> Vec<TimedFrame> {
        match &self.source {
            FixtureSource::Frames { frames } => frames.clone(),
            FixtureSource::Synthetic(spec) => {
                MotionGenerator::new(spec.clone()).generate(self.exercise)
            }
        }
    }
}

/// Metadata describing an available fixture.
#[derive(Clone, Debug)]
pub struct FixtureMetadata {
    pub name: String,
    pub path: PathBuf,
    pub expect_path: Option<PathBuf>,
}

/// Loaded fixture with its materialized frames.
pub struct FixtureData {
    pub metadata: FixtureMetadata,
    pub exercise: ExerciseKind,
    pub frames: Vec<TimedFrame>,
    pub expectations: Option<FixtureExpectations>,
}

fn default_ground_tolerance() -> f32 {
    5.0
}

/// JSON expectation schema for fixture verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureExpectations {
    pub fixture: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rep_count: Option<usize>,
    /// Every rep score must be at least this
    #[serde(default)]
    pub min_rep_score: Option<f32>,
    /// Every rep score must be at most this
    #[serde(default)]
    pub max_rep_score: Option<f32>,
    /// Expected latched ground level (pixels)
    #[serde(default)]
    pub ground_level: Option<f32>,
    #[serde(default = "default_ground_tolerance")]
    pub ground_tolerance_px: f32,
}

impl FixtureExpectations {
    pub fn verify(&self, actual: &FixtureRun) -> std::result::Result<(), ExpectationDiff> {
        let mut failures = Vec::new();

        if let Some(expected) = self.rep_count {
            if actual.rep_count != expected {
                failures.push(ExpectationFailure {
                    check: "rep_count".to_string(),
                    expected: json!(expected),
                    actual: json!(actual.rep_count),
                });
            }
        }

        for rep in &actual.reps {
            if let Some(min) = self.min_rep_score {
                if rep.score < min {
                    failures.push(ExpectationFailure {
                        check: format!("rep[{}].score >= min", rep.index),
                        expected: json!(min),
                        actual: json!(rep.score),
                    });
                }
            }
            if let Some(max) = self.max_rep_score {
                if rep.score > max {
                    failures.push(ExpectationFailure {
                        check: format!("rep[{}].score <= max", rep.index),
                        expected: json!(max),
                        actual: json!(rep.score),
                    });
                }
            }
        }

        if let Some(expected) = self.ground_level {
            let within = actual
                .ground_level
                .map(|ground| (ground - expected).abs() <= self.ground_tolerance_px)
                .unwrap_or(false);
            if !within {
                failures.push(ExpectationFailure {
                    check: "ground_level".to_string(),
                    expected: json!({
                        "ground_level": expected,
                        "tolerance_px": self.ground_tolerance_px,
                    }),
                    actual: json!(actual.ground_level),
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExpectationDiff { failures })
        }
    }
}

/// Outcome of comparing actual results with expectations.
#[derive(Debug)]
pub struct ExpectationDiff {
    pub failures: Vec<ExpectationFailure>,
}

impl ExpectationDiff {
    pub fn to_json(&self) -> Value {
        json!({
            "failures": self.failures.iter().map(|failure| {
                json!({
                    "check": failure.check,
                    "expected": failure.expected,
                    "actual": failure.actual,
                })
            }).collect::<Vec<_>>()
        })
    }
}

/// Detailed diff entry for a single failure.
#[derive(Debug)]
pub struct ExpectationFailure {
    pub check: String,
    pub expected: Value,
    pub actual: Value,
}

/// Catalog responsible for discovering fixtures on disk.
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all fixtures by their metadata.
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut fixtures = Vec::new();
        if !self.root.exists() {
            return Ok(fixtures);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let is_fixture = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.ends_with(".json") && !name.ends_with(EXPECT_SUFFIX))
                .unwrap_or(false);
            if is_fixture {
                fixtures.push(self.metadata_for_path(&path)?);
            }
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// Load fixture frames + expectations for provided name or path.
    pub fn load(&self, fixture: &str, override_expect: Option<PathBuf>) -> Result<FixtureData> {
        let path = self.resolve_fixture_path(fixture)?;
        let metadata = self.metadata_for_path(&path)?;

        let contents =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let file: FixtureFile = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;

        let expectation_path = override_expect.or(metadata.expect_path.clone());
        let expectations = match expectation_path {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("reading expectation {}", path.display()))?;
                Some(
                    serde_json::from_str(&json)
                        .with_context(|| format!("parsing {}", path.display()))?,
                )
            }
            None => None,
        };

        log::debug!(
            "[Fixtures] Loaded {} ({}, {:?})",
            metadata.name,
            file.exercise,
            file.description
        );

        Ok(FixtureData {
            metadata,
            exercise: file.exercise,
            frames: file.frames(),
            expectations,
        })
    }

    fn resolve_fixture_path(&self, fixture: &str) -> Result<PathBuf> {
        let as_path = Path::new(fixture);
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }

        let candidate = self.root.join(format!("{fixture}.json"));
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }

    fn metadata_for_path(&self, path: &Path) -> Result<FixtureMetadata> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("Invalid fixture name for {}", path.display()))?
            .to_string();
        let expect_path = path.with_file_name(format!("{name}{EXPECT_SUFFIX}"));
        Ok(FixtureMetadata {
            name,
            path: path.to_path_buf(),
            expect_path: expect_path.exists().then_some(expect_path),
        })
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

/// Aggregated result of replaying a fixture
#[derive(Debug, Clone, Serialize)]
pub struct FixtureRun {
    pub exercise: ExerciseKind,
    pub frame_count: usize,
    pub rejected_frames: usize,
    pub rep_count: usize,
    pub running_score: f32,
    pub ground_level: Option<f32>,
    pub reps: Vec<RepRecord>,
    pub summary: SessionSummary,
    #[serde(skip)]
    pub events: Vec<(u64, ProcessorEvent)>,
}

/// Replays fixture frames through a fresh processor.
pub struct FixtureProcessor {
    config: AppConfig,
}

impl FixtureProcessor {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, data: &FixtureData) -> Result<FixtureRun> {
        self.run_frames(data.exercise, &data.frames)
    }

    pub fn run_frames(&self, exercise: ExerciseKind, frames: &[TimedFrame]) -> Result<FixtureRun> {
        let mut processor = ExerciseProcessor::new(self.config.clone(), exercise)
            .map_err(|err| anyhow!("{err}"))?;

        let mut rejected_frames = 0;
        let mut reps = Vec::new();
        let mut events = Vec::new();
        for timed in frames {
            let outcome = processor.process_frame(&FrameInput {
                timestamp_ms: timed.timestamp_ms,
                frame: timed.frame.clone(),
                exercise,
                active: true,
            });
            if matches!(outcome, FrameOutcome::Rejected { .. }) {
                rejected_frames += 1;
            }
            if let Some(rep) = outcome.rep() {
                reps.push(*rep);
            }
            events.extend(
                outcome
                    .events()
                    .iter()
                    .cloned()
                    .map(|event| (timed.timestamp_ms, event)),
            );
        }

        let state = processor.state();
        Ok(FixtureRun {
            exercise,
            frame_count: frames.len(),
            rejected_frames,
            rep_count: state.rep_count(),
            running_score: state.running_score(),
            ground_level: state.ground_level(),
            reps,
            summary: processor.summary(),
            events,
        })
    }
}
