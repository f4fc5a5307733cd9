//! Configuration system for the viewer.
//!
//! Settings persist to disk as RON, can be overridden from the command line via
//! clap, and tolerate missing or unknown fields.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, Config, DebugConfig, EffectSetting, HudConfig, RenderConfig, WindowConfig,
    WorldConfig,
};
pub use error::ConfigError;
