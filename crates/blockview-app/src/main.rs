//! The `blockview` binary.
//!
//! Run with: `cargo run -p blockview-app -- --frames 60 --effect edge`

use std::path::PathBuf;
use std::process::ExitCode;

use blockview_config::{CliArgs, Config};
use clap::Parser;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(|| Config::default_dir().ok())
        .unwrap_or_else(|| PathBuf::from(".blockview"));

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    blockview_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(
        "blockview {}: {}x{}, stereo {}, post effect {} ({:?})",
        env!("CARGO_PKG_VERSION"),
        config.window.width,
        config.window.height,
        config.render.stereoscopic,
        config.render.post_effect,
        config.render.effect,
    );

    match blockview_app::run(&config, args.screenshot.as_deref()) {
        Ok(stats) => {
            info!(
                "done: {} frames, {} updates, {} passes, {} blocks drawn, {} HUD frames",
                stats.frames, stats.updates, stats.passes, stats.blocks_drawn, stats.hud_frames
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
