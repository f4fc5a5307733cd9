use std::path::PathBuf;

use blockview_config::ConfigError;
use blockview_hud::HudError;
use blockview_render::{RenderContextError, RenderError};
use blockview_voxel::SnapshotError;

/// Errors that end a viewer run.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("GPU initialization: {0}")]
    Context(#[from] RenderContextError),

    #[error("rendering: {0}")]
    Render(#[from] RenderError),

    #[error("HUD: {0}")]
    Hud(#[from] HudError),

    #[error("snapshot {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("screenshot {}: {source}", path.display())]
    Screenshot {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
