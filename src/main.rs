//! Beauty Camera - command line demo
//!
//! Usage: `beauty-camera <image> [settings.json]`
//!
//! Opens a still through the passthrough engine, applies smoothing and writes
//! a capture to the configured directory.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use beauty_camera::telemetry::{init_logging, LogConfig};
use beauty_camera::{AppSettings, PanelConfig, PassthroughProcessor, PreviewSession};

fn run() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(image) = args.next().map(PathBuf::from) else {
        bail!("usage: beauty-camera <image> [settings.json]");
    };

    let settings = match args.next().map(PathBuf::from) {
        Some(path) => AppSettings::load_from_file(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => AppSettings::load(),
    };
    tracing::info!(capture_dir = %settings.capture_dir().display(), "Settings loaded");

    let mut session = PreviewSession::new(
        Box::new(PassthroughProcessor::new()),
        settings,
        PanelConfig::builtin(),
    );

    if !session.open_image(&image) {
        let reason = session
            .poll_status(Instant::now())
            .map(|m| m.text.clone())
            .unwrap_or_default();
        bail!("failed to open {}: {}", image.display(), reason);
    }

    session.select_tab("beauty");
    session.select_function("smooth");
    session.move_slider(70);

    let path = session.capture().context("capture failed")?;
    println!("{}", path.display());

    let stats = session.processing_stats();
    tracing::info!(
        frames = session.counters().presented,
        avg_ms = stats.avg_ms,
        "Done"
    );
    session.shutdown();
    Ok(())
}

fn main() {
    let log_config = LogConfig::default();
    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    if let Err(e) = run() {
        tracing::error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
