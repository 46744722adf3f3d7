use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rep_coach::analysis::ExerciseKind;
use rep_coach::config::AppConfig;
use rep_coach::engine::ProcessorEvent;
use rep_coach::fixtures::{
    ExpectationDiff, FixtureCatalog, FixtureData, FixtureFile, FixtureProcessor, FixtureRun,
    FixtureSource, MotionGenerator, SyntheticSpec,
};
use rep_coach::telemetry::{self, DiagnosticError};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "rep_coach_cli",
    about = "Deterministic pose fixture harness for the rep coaching core"
)]
struct Cli {
    /// Override directory containing fixture assets (defaults to ./fixtures)
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    /// JSON config file; falls back to defaults when missing or invalid
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit processing logs to stderr
    #[arg(long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a fixture and optionally compare against expectations
    Replay {
        #[arg(long)]
        fixture: String,
        #[arg(long)]
        expect: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Stream processor events for a fixture to stdout as JSON lines
    Stream {
        #[arg(long)]
        fixture: String,
    },
    /// Generate a fixture of recorded synthetic frames
    Synth {
        #[arg(long)]
        exercise: ExerciseKind,
        #[arg(long, default_value_t = 3)]
        reps: usize,
        #[arg(long, default_value_t = 30.0)]
        fps: f32,
        #[arg(long, default_value_t = 0x5EED_CAFE)]
        seed: u64,
        /// Positional noise amplitude (pixels)
        #[arg(long, default_value_t = 0.0)]
        jitter: f32,
        #[arg(long)]
        dropout_every: Option<usize>,
        /// Destination file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List available fixtures on disk
    DumpFixtures,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    if cli.verbose {
        rep_coach::init_logging();
    }

    let catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_default();
    let config = cli
        .config
        .map(AppConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Replay {
            fixture,
            expect,
            output,
        } => run_replay(&catalog, config, &fixture, expect, output),
        Commands::Stream { fixture } => run_stream(&catalog, config, &fixture),
        Commands::Synth {
            exercise,
            reps,
            fps,
            seed,
            jitter,
            dropout_every,
            output,
        } => {
            let spec = SyntheticSpec {
                fps,
                reps,
                jitter_px: jitter,
                dropout_every,
                seed,
                ..SyntheticSpec::default()
            };
            run_synth(exercise, spec, output)
        }
        Commands::DumpFixtures => run_dump(&catalog),
    }
}

fn load_fixture(
    catalog: &FixtureCatalog,
    fixture: &str,
    override_expect: Option<PathBuf>,
) -> Result<FixtureData> {
    catalog.load(fixture, override_expect).inspect_err(|err| {
        telemetry::hub().record_error(DiagnosticError::FixtureLoad, format!("{fixture}: {err}"));
    })
}

fn run_replay(
    catalog: &FixtureCatalog,
    config: AppConfig,
    fixture: &str,
    override_expect: Option<PathBuf>,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let data = load_fixture(catalog, fixture, override_expect)?;
    let actual = FixtureProcessor::new(config)
        .run(&data)
        .with_context(|| format!("processing fixture {}", fixture))?;

    emit_report(&data.metadata.name, &actual, output_path)?;

    if let Some(expectations) = data.expectations {
        match expectations.verify(&actual) {
            Ok(()) => Ok(ExitCode::from(0)),
            Err(diff) => {
                emit_diff(&diff)?;
                Ok(ExitCode::from(2))
            }
        }
    } else {
        Ok(ExitCode::from(0))
    }
}

fn run_stream(catalog: &FixtureCatalog, config: AppConfig, fixture: &str) -> Result<ExitCode> {
    let data = load_fixture(catalog, fixture, None)?;
    let actual = FixtureProcessor::new(config)
        .run(&data)
        .with_context(|| format!("processing fixture {}", fixture))?;

    for (timestamp_ms, event) in &actual.events {
        let line = StreamLine {
            timestamp_ms: *timestamp_ms,
            event,
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    Ok(ExitCode::from(0))
}

fn run_synth(
    exercise: ExerciseKind,
    spec: SyntheticSpec,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let description = format!(
        "synthetic {} x{} at {} fps (seed {:#x})",
        exercise, spec.reps, spec.fps, spec.seed
    );
    let frames = MotionGenerator::new(spec).generate(exercise);
    let file = FixtureFile {
        exercise,
        description: Some(description),
        source: FixtureSource::Frames { frames },
    };
    let json = serde_json::to_string_pretty(&file)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("[Synth] Wrote {}", path.display());
    } else {
        println!("{json}");
    }
    Ok(ExitCode::from(0))
}

fn run_dump(catalog: &FixtureCatalog) -> Result<ExitCode> {
    let fixtures = catalog.discover()?;
    if fixtures.is_empty() {
        println!("No fixtures found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in fixtures {
        if let Some(expect) = metadata.expect_path {
            println!("{} -> {}", metadata.name, expect.display());
        } else {
            println!("{}", metadata.name);
        }
    }
    Ok(ExitCode::from(0))
}

fn emit_report(fixture: &str, run: &FixtureRun, output_path: Option<PathBuf>) -> Result<()> {
    let report = FixtureReportPayload { fixture, run };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn emit_diff(diff: &ExpectationDiff) -> Result<()> {
    let json = serde_json::to_string_pretty(&diff.to_json())?;
    eprintln!("{json}");
    Ok(())
}

#[derive(Serialize)]
struct FixtureReportPayload<'a> {
    fixture: &'a str,
    run: &'a FixtureRun,
}

#[derive(Serialize)]
struct StreamLine<'a> {
    timestamp_ms: u64,
    event: &'a ProcessorEvent,
}
