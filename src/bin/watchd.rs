//! watchd - Passenger Watch daemon
//!
//! This daemon:
//! 1. Loads configuration (`WATCH_CONFIG` or `--config`, then env overrides)
//! 2. Loads the primary sequence model, or selects the motion fallback
//! 3. Pulls frames from the configured source, one cycle per frame
//! 4. Appends one alert line per `Normal → Active` transition to the alert log
//! 5. Serves read-only stats on a loopback HTTP port

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use passenger_watch::api::{ApiConfig, ApiServer, StatusBoard};
use passenger_watch::detect::load_primary_model;
use passenger_watch::ingest::{open_source, SceneSchedule};
use passenger_watch::ui::{StatusLine, UiMode};
use passenger_watch::{
    AlertStateMachine, ClassifierDispatcher, FileAlertLog, LumaBlobDetector, Pipeline,
    PipelineConfig, WatchConfig, WatchSession,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (.toml or JSON). Overrides WATCH_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stop after this many frames (0 = run until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    max_frames: u64,
    /// Status line style.
    #[arg(long, value_enum, default_value_t = UiMode::Auto)]
    ui: UiMode,
    /// Do not start the stats API.
    #[arg(long)]
    no_api: bool,
    /// Seed for the synthetic source.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => WatchConfig::load_from(Some(path.as_path()))?,
        None => WatchConfig::load()?,
    };
    let spec = cfg.model_input_spec();

    let model = match load_primary_model(&cfg.model.path, spec, cfg.model.output) {
        Ok(model) => Some(model),
        Err(err) => {
            log::warn!("{}", err);
            None
        }
    };
    let dispatcher = ClassifierDispatcher::from_availability(model, spec, cfg.violence_threshold);
    let pipeline = Pipeline::new(PipelineConfig::from(&cfg), dispatcher)?;
    let alerts = AlertStateMachine::new(Box::new(FileAlertLog::new(&cfg.alert_log_path)));
    let board = StatusBoard::new();
    let mut session = WatchSession::new(
        Box::new(LumaBlobDetector::new(cfg.confidence_threshold)),
        pipeline,
        alerts,
        board.clone(),
    );

    let api_handle = if args.no_api {
        None
    } else {
        let handle = ApiServer::new(
            ApiConfig {
                addr: cfg.api_addr.clone(),
            },
            board,
        )
        .spawn()?;
        log::info!("stats api listening on {}", handle.addr);
        Some(handle)
    };

    let mut source = open_source(&cfg.source, SceneSchedule::default(), args.seed)?;
    source.connect()?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let frame_interval = Duration::from_millis(1000 / u64::from(cfg.source.target_fps));
    let mut status_line = StatusLine::new(
        args.ui,
        std::io::stderr().is_terminal(),
        u64::from(cfg.source.target_fps),
    );
    let mut last_health_log = Instant::now();
    let mut frames = 0u64;

    log::info!(
        "watchd running. classifier={} threshold={} alert log {}",
        session.pipeline().dispatcher().classifier_name(),
        session.pipeline().dispatcher().threshold(),
        cfg.alert_log_path.display()
    );

    while !stop.load(Ordering::SeqCst) {
        if args.max_frames != 0 && frames >= args.max_frames {
            break;
        }
        let cycle_start = Instant::now();
        let frame = source.next_frame()?;
        frames += 1;

        session.step(&frame)?;
        status_line.update(&session.board().snapshot());

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = source.stats();
            log::info!(
                "source health={} frames={} url={}",
                source.is_healthy(),
                stats.frames_captured,
                stats.url
            );
            last_health_log = Instant::now();
        }

        if let Some(remaining) = frame_interval.checked_sub(cycle_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    let stats = session.alert_stats();
    status_line.finish(&format!(
        "stopped after {} frames: total_alerts={} current_status={}",
        frames, stats.total_alerts, stats.current_status
    ));
    if session.alert_log_failures() > 0 {
        log::error!(
            "{} alert record(s) could not be written to {}",
            session.alert_log_failures(),
            cfg.alert_log_path.display()
        );
    }

    if let Some(handle) = api_handle {
        handle.stop().map_err(|e| anyhow!("stats api shutdown failed: {}", e))?;
    }
    Ok(())
}
