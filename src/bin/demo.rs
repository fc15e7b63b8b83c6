//! demo - end-to-end synthetic run for Passenger Watch
//!
//! Drives the full cycle over the `stub://` cabin scene with the motion
//! fallback classifier and prints a summary.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use passenger_watch::api::StatusBoard;
use passenger_watch::config::SourceSettings;
use passenger_watch::ingest::{FrameSource, SceneSchedule, SyntheticSource};
use passenger_watch::{
    AlertStateMachine, ClassifierDispatcher, FileAlertLog, LumaBlobDetector, Pipeline,
    PipelineConfig, WatchConfig, WatchSession,
};

const DEFAULT_ALERT_LOG: &str = "demo_alerts.log";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to process.
    #[arg(long, default_value_t = 150)]
    frames: u64,
    /// Pace frames at this rate (0 = as fast as possible).
    #[arg(long, default_value_t = 0)]
    fps: u32,
    /// Frames per calm phase.
    #[arg(long, default_value_t = 45)]
    calm_frames: u64,
    /// Frames per agitated phase.
    #[arg(long, default_value_t = 30)]
    agitated_frames: u64,
    /// Optional deterministic seed for the synthetic scene.
    #[arg(long)]
    seed: Option<u64>,
    /// Alert log path.
    #[arg(long, default_value = DEFAULT_ALERT_LOG)]
    alert_log: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.calm_frames + args.agitated_frames == 0 {
        return Err(anyhow!("at least one of --calm-frames/--agitated-frames must be >= 1"));
    }

    stage("build pipeline (motion fallback)");
    let cfg = WatchConfig::default();
    let dispatcher = ClassifierDispatcher::fallback_only(cfg.violence_threshold);
    let pipeline = Pipeline::new(PipelineConfig::from(&cfg), dispatcher)?;
    let alerts = AlertStateMachine::new(Box::new(FileAlertLog::new(&args.alert_log)));
    let mut session = WatchSession::new(
        Box::new(LumaBlobDetector::new(cfg.confidence_threshold)),
        pipeline,
        alerts,
        StatusBoard::new(),
    );

    stage("generate synthetic cabin frames");
    let mut source = SyntheticSource::new(
        SourceSettings {
            url: "stub://demo".to_string(),
            width: 320,
            height: 240,
            target_fps: args.fps.max(1),
        },
        SceneSchedule {
            calm_frames: args.calm_frames,
            agitated_frames: args.agitated_frames,
        },
        args.seed,
    )?;
    source.connect()?;

    let frame_interval = (args.fps > 0).then(|| Duration::from_millis(1000 / u64::from(args.fps)));
    let mut skipped = 0u64;
    for _ in 0..args.frames {
        let cycle_start = Instant::now();
        let frame = source.next_frame()?;
        let report = session.step(&frame)?;
        if report.skipped.is_some() {
            skipped += 1;
        }
        if let Some(remaining) =
            frame_interval.and_then(|interval| interval.checked_sub(cycle_start.elapsed()))
        {
            std::thread::sleep(remaining);
        }
    }

    let stats = session.alert_stats();
    let last = session.pipeline().last_classification();
    println!("demo summary:");
    println!("  frames processed: {}", args.frames);
    println!("  frames skipped: {}", skipped);
    println!("  frames classified: {}", session.frames_classified());
    println!("  alerts raised: {}", stats.total_alerts);
    println!("  alert log: {}", args.alert_log.display());
    println!(
        "  final status: {} ({}, probability {:.2})",
        stats.current_status, last.label, last.probability
    );
    if session.alert_log_failures() > 0 {
        println!("  alert log failures: {}", session.alert_log_failures());
    }
    println!("next steps:");
    println!("  cat {}", args.alert_log.display());
    Ok(())
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
