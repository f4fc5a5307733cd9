//! Viewer settings with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted settings inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Camera and frame composition settings.
    pub render: RenderConfig,
    /// Overlay settings.
    pub hud: HudConfig,
    /// World simulation and persistence settings.
    pub world: WorldConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Enable vsync.
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Post-processing effect selected at startup.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EffectSetting {
    /// Pass the rendered frame through untouched.
    #[default]
    None,
    /// Edge detection.
    Edge,
    /// Time-based wobble distortion.
    Wobbles,
}

/// Camera and frame composition configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Render two eye passes per frame.
    pub stereoscopic: bool,
    /// Distance between the two stereo eyes in world units.
    pub eye_separation: f32,
    /// Distance to the focal plane in world units.
    pub focal_distance: f32,
    /// Vertical field of view in degrees.
    pub field_of_view: f32,
    /// Capture the frame offscreen and run it through the post-effect pass.
    pub post_effect: bool,
    /// Effect applied by the post-effect pass.
    pub effect: EffectSetting,
    /// Ambient brightness, 0.0 - 1.0.
    pub brightness: f32,
}

/// HUD overlay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HudConfig {
    /// Draw the overlay.
    pub enabled: bool,
    /// Worker sleep in milliseconds while the overlay is hidden.
    pub idle_sleep_ms: u64,
    /// Mouse sensitivity multiplier.
    pub mouse_sensitivity: f32,
}

/// World simulation and snapshot configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Snapshot to load on startup and save on exit.
    pub snapshot_path: Option<PathBuf>,
    /// Gzip-wrap snapshots on save.
    pub compress_snapshots: bool,
    /// Simulation rate in Hz.
    pub update_rate: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Number of frames the headless runner produces before exiting.
    pub frames: u32,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            vsync: true,
            title: "Blockview".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            stereoscopic: false,
            eye_separation: 0.1,
            focal_distance: 10.0,
            field_of_view: 60.0,
            post_effect: true,
            effect: EffectSetting::None,
            brightness: 0.25,
        }
    }
}

impl Default for HudConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_sleep_ms: 100,
            mouse_sensitivity: 1.0,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            compress_snapshots: true,
            update_rate: 60,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            frames: 120,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Default config directory (`<platform config dir>/blockview`).
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join("blockview"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE_NAME), serialized)
            .map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-read the file; `Some` only if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = std::fs::read_to_string(config_dir.join(CONFIG_FILE_NAME))
            .map_err(ConfigError::ReadError)?;
        let fresh: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &fresh != self {
            log::info!("Config reloaded with changes");
            Ok(Some(fresh))
        } else {
            Ok(None)
        }
    }
}
