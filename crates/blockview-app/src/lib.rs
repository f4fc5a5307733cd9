//! Block viewer application.
//!
//! Builds the scene (or loads it from a snapshot), picks a renderer, and drives
//! the fixed-timestep loop for the configured number of frames. Without a GPU
//! adapter the frame protocol still runs against the recording backend.

pub mod error;
pub mod game_loop;
pub mod persistence;
pub mod scene;
pub mod setup;
pub mod viewer;

use std::path::Path;
use std::sync::Arc;

use blockview_config::Config;
use blockview_render::{RecordingBackend, RenderBackend, WgpuBackend, init_render_context_blocking};
use blockview_voxel::BlockRegistry;
use tracing::{info, warn};

pub use error::AppError;
pub use game_loop::GameLoop;
pub use scene::{Scene, ViewerCommand};
pub use viewer::{RunStats, Viewer};

/// Build the starting scene: the configured snapshot if it exists, else the demo.
pub fn load_scene(config: &Config, registry: Arc<BlockRegistry>) -> Result<Scene, AppError> {
    let mut scene = Scene::new(registry, &config.render);
    match &config.world.snapshot_path {
        Some(path) if path.exists() => persistence::load_snapshot(&mut scene, path)?,
        _ => scene.populate(),
    }
    Ok(scene)
}

fn drive<B: RenderBackend>(
    config: &Config,
    scene: Scene,
    backend: B,
) -> Result<(B, RunStats), AppError> {
    let mut viewer = Viewer::new(config, scene, backend)?;
    info!(
        "rendering {} frames at {}x{}",
        config.debug.frames, config.window.width, config.window.height
    );
    viewer.run_frames(config.debug.frames)?;
    viewer.save_snapshot()?;
    Ok(viewer.shutdown())
}

/// Run the viewer headless. With a GPU, the last frame can be written to
/// `screenshot` as a PNG.
pub fn run(config: &Config, screenshot: Option<&Path>) -> Result<RunStats, AppError> {
    let registry = Arc::new(BlockRegistry::with_defaults());
    let scene = load_scene(config, Arc::clone(&registry))?;
    let (width, height) = (config.window.width, config.window.height);

    match init_render_context_blocking() {
        Ok(ctx) => {
            let backend = WgpuBackend::new(ctx, &registry, width, height)?;
            let (backend, stats) = drive(config, scene, backend)?;
            if let Some(path) = screenshot {
                let image = backend.capture()?;
                image.save(path).map_err(|source| AppError::Screenshot {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!("saved screenshot to {}", path.display());
            }
            Ok(stats)
        }
        Err(e) => {
            warn!("no GPU adapter ({e}); recording frames instead");
            if screenshot.is_some() {
                warn!("screenshot skipped: it needs a GPU adapter");
            }
            let (_, stats) = drive(config, scene, RecordingBackend::new())?;
            Ok(stats)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
