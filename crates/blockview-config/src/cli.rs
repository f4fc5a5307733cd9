//! Command-line arguments for the viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, EffectSetting};

/// Blockview command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "blockview", about = "Voxel world viewer")]
pub struct CliArgs {
    /// Surface width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Surface height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Render both stereo eyes.
    #[arg(long)]
    pub stereo: Option<bool>,

    /// Post effect: none, edge or wobbles.
    #[arg(long, value_parser = parse_effect)]
    pub effect: Option<EffectSetting>,

    /// Snapshot file to load on startup and save on exit.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Number of frames to produce before exiting.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the last frame to this PNG file. Needs a GPU adapter.
    #[arg(long)]
    pub screenshot: Option<PathBuf>,
}

fn parse_effect(s: &str) -> Result<EffectSetting, String> {
    match s.to_ascii_lowercase().as_str() {
        "none" => Ok(EffectSetting::None),
        "edge" => Ok(EffectSetting::Edge),
        "wobbles" => Ok(EffectSetting::Wobbles),
        other => Err(format!("unknown effect '{other}'")),
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(stereo) = args.stereo {
            self.render.stereoscopic = stereo;
            // Stereo output goes straight to the surface.
            if stereo {
                self.render.post_effect = false;
            }
        }
        if let Some(effect) = args.effect {
            self.render.effect = effect;
        }
        if let Some(ref path) = args.snapshot {
            self.world.snapshot_path = Some(path.clone());
        }
        if let Some(frames) = args.frames {
            self.debug.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
