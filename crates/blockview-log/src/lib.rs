//! Structured logging for the viewer.
//!
//! Installs a `tracing` subscriber with console output and, in debug builds, a JSON
//! log file. The filter honours `RUST_LOG` first, then the configured log level.

use blockview_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "blockview.log";

/// Resolve the filter string from an optional config.
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => {
            format!("{},wgpu=warn,naga=warn", config.debug.log_level)
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (debug builds only)
/// * `debug_build` - enables the file layer
/// * `config` - source of the log level override
///
/// Must be called at most once per process.
///
/// ```no_run
/// use blockview_config::Config;
/// use blockview_log::init_logging;
///
/// let config = Config::default();
/// init_logging(None, false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let directive = filter_directive(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    // The HUD worker is a named thread, so thread names are worth printing.
    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_without_config() {
        let directive = filter_directive(None);
        assert_eq!(directive, DEFAULT_FILTER);
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn test_config_level_is_used() {
        let mut config = Config::default();
        config.debug.log_level = "debug".to_string();
        let directive = filter_directive(Some(&config));
        assert!(directive.starts_with("debug"));
        assert!(directive.contains("wgpu=warn"));
    }

    #[test]
    fn test_empty_config_level_falls_back() {
        let mut config = Config::default();
        config.debug.log_level.clear();
        assert_eq!(filter_directive(Some(&config)), DEFAULT_FILTER);
    }

    #[test]
    fn test_subsystem_filters_parse() {
        for filter in [
            "info",
            "debug,blockview_voxel=trace",
            "warn,blockview_render=debug,blockview_hud=trace",
        ] {
            assert!(EnvFilter::try_new(filter).is_ok(), "failed to parse {filter}");
        }
    }

    #[test]
    fn test_log_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        assert_eq!(path.file_name().unwrap(), "blockview.log");
    }
}
