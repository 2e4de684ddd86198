//! Kindle Runtime
//!
//! Headless binary that loads a game directory and runs its script for a
//! fixed number of frames, driven by an optional input recording.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use kindle_asset::{GameData, WorldData};
use kindle_core::time::tick_seconds;
use kindle_script::demo::load_shooter;
use kindle_script::{JsHost, NativeHost, Simulation};
use kindle_services::{InputRecording, Key, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScriptKind {
    /// `main.js` from the game directory
    Js,
    /// The built-in native shooter
    Native,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Kindle headless script runner")]
struct Cli {
    /// Game directory holding game.json, world.json and main.js
    #[arg(long, default_value = "demos/shooter")]
    game: PathBuf,

    /// Which script implementation to run
    #[arg(long, value_enum, default_value_t = ScriptKind::Js)]
    script: ScriptKind,

    /// Override frame count (uses settings default when omitted)
    #[arg(long)]
    frames: Option<u64>,

    /// Settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Input recording to replay
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Write the key changes seen during the run to this file
    #[arg(long)]
    record: Option<PathBuf>,
}

/// Outcome of a run.
struct RunReport {
    recorded: InputRecording,
    frames_run: u64,
    crashed: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    init_logging(&settings);

    tracing::info!("Kindle v{}", kindle_core::VERSION);

    let game = GameData::load(&cli.game.join("game.json")).context("loading game data")?;
    let world = WorldData::load(&cli.game.join("world.json")).context("loading world data")?;
    let replay = cli
        .replay
        .as_deref()
        .map(InputRecording::load)
        .transpose()
        .context("loading replay")?
        .unwrap_or_default();
    let frames = cli.frames.unwrap_or(settings.simulation.frames);

    let report = match cli.script {
        ScriptKind::Js => {
            let script = cli.game.join("main.js");
            let mut host = JsHost::load_file(&game, &world, &script)
                .with_context(|| format!("loading {}", script.display()))?;
            run(&mut host, &replay, frames, &settings)
        }
        ScriptKind::Native => {
            let mut host = NativeHost::load(&game, &world, load_shooter)
                .context("loading native shooter")?;
            run(&mut host, &replay, frames, &settings)
        }
    };

    if let Some(path) = &cli.record {
        report
            .recorded
            .save(path)
            .with_context(|| format!("writing recording {}", path.display()))?;
        tracing::info!(path = %path.display(), events = report.recorded.len(), "saved input recording");
    }

    if let Some(failure) = report.crashed {
        anyhow::bail!("script stopped after {} frames: {failure}", report.frames_run);
    }
    tracing::info!(frames = report.frames_run, "run complete");
    Ok(())
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run<H: Simulation>(
    host: &mut H,
    replay: &InputRecording,
    frames: u64,
    settings: &Settings,
) -> RunReport {
    let dt = tick_seconds(settings.simulation.tick_rate_hz);
    let summary_every = settings.simulation.summary_every;
    let mut recorded = InputRecording::new();
    let mut last_states: Vec<(Key, f32)> = host.with_world(|world| world.key_states());

    for frame in 0..frames {
        let states = host.with_world(|world| {
            replay.apply(frame, &mut world.input);
            world.key_states()
        });
        for &(key, state) in &states {
            let before = last_states.iter().find(|(k, _)| *k == key).map(|(_, s)| *s);
            if before != Some(state) {
                recorded.record(frame, key, state);
            }
        }
        last_states = states;

        match host.frame(dt) {
            Ok(stats) => {
                tracing::trace!(
                    frame,
                    duration_us = stats.duration.as_micros() as u64,
                    inits = stats.inits_run,
                    "frame"
                );
            }
            Err(err) => {
                tracing::error!(frame, "{err}");
                return RunReport {
                    recorded,
                    frames_run: frame,
                    crashed: Some(err.to_string()),
                };
            }
        }

        if let Some(failure) = host.crashed() {
            return RunReport {
                recorded,
                frames_run: frame + 1,
                crashed: Some(failure.to_string()),
            };
        }

        if summary_every > 0 && (frame + 1) % summary_every == 0 {
            let summary = host.with_world(|world| world.summary());
            tracing::info!("{summary}");
        }
    }

    let summary = host.with_world(|world| world.summary());
    tracing::info!("final {summary}");
    RunReport {
        recorded,
        frames_run: frames,
        crashed: None,
    }
}
