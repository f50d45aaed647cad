//! Exercise Form Engine replay tool
//!
//! Replays recorded pose frames (one JSON `FrameRecord` per line) through an
//! exercise session and prints the per-frame results and the session summary.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use exercise_engine::{EngineConfig, ExerciseSession, ExerciseType, Frame, FrameRecord};

#[derive(Parser, Debug)]
#[command(name = "exercise-replay")]
#[command(about = "Replay recorded pose frames through an exercise analyzer", long_about = None)]
struct Args {
    /// Exercise to analyze (pushup, pullup, situp)
    #[arg(short = 'e', long)]
    exercise: String,

    /// Recorded frames as JSON lines, or "-" for stdin
    #[arg(short = 'f', long, default_value = "-")]
    frames: String,

    /// Threshold overrides (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print only the session summary
    #[arg(long)]
    summary_only: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn open_frames(source: &str) -> Result<Box<dyn BufRead>> {
    if source == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(source).with_context(|| format!("Failed to open frame recording {source}"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let exercise: ExerciseType = args.exercise.parse()?;
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let reader = open_frames(&args.frames)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut session = ExerciseSession::new(exercise, &config);
    let mut first_timestamp = None;
    let mut last_timestamp = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: FrameRecord = serde_json::from_str(&line)
            .with_context(|| format!("Malformed frame record on line {}", line_no + 1))?;
        let frame = Frame::from(record);

        if first_timestamp.is_none() {
            first_timestamp = Some(frame.timestamp_ms);
            session.begin(frame.timestamp_ms);
        }
        last_timestamp = last_timestamp.max(frame.timestamp_ms);

        let result = session.process(&frame);
        if !args.summary_only {
            writeln!(out, "{}", serde_json::to_string(result)?)?;
        }
    }

    if first_timestamp.is_none() {
        log::warn!("No frames in {}", args.frames);
    }

    let summary = session.finish(last_timestamp);
    writeln!(out, "{}", summary.to_json()?)?;
    Ok(())
}
