//! The viewer: scene, renderer and HUD worker driven by the fixed-timestep loop.

use std::path::PathBuf;
use std::time::Duration;

use blockview_config::Config;
use blockview_hud::{HudWorker, Pointer};
use blockview_render::{FrameStats, RenderBackend, render_frame};

use crate::error::AppError;
use crate::game_loop::GameLoop;
use crate::persistence;
use crate::scene::{Scene, ViewerCommand};

/// Totals for a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub updates: u64,
    pub passes: u64,
    pub blocks_drawn: u64,
    pub hud_frames: u64,
}

pub struct Viewer<B: RenderBackend> {
    scene: Scene,
    backend: B,
    hud: Option<HudWorker>,
    game_loop: GameLoop,
    width: u32,
    height: u32,
    pointer: Pointer,
    snapshot_path: Option<PathBuf>,
    compress_snapshots: bool,
    quit: bool,
    stats: RunStats,
}

impl<B: RenderBackend> Viewer<B> {
    /// Wire `scene` to `backend`, starting the HUD worker if the HUD is enabled.
    pub fn new(config: &Config, mut scene: Scene, mut backend: B) -> Result<Self, AppError> {
        let (width, height) = (config.window.width, config.window.height);
        backend.resize(width, height, scene.post_effects())?;
        scene.set_mouse_sensitivity(config.hud.mouse_sensitivity);

        let hud = if config.hud.enabled {
            Some(HudWorker::spawn(Duration::from_millis(
                config.hud.idle_sleep_ms,
            ))?)
        } else {
            scene.set_hud_visible(false);
            None
        };

        Ok(Self {
            scene,
            backend,
            hud,
            game_loop: GameLoop::with_rate(config.world.update_rate),
            width,
            height,
            pointer: Pointer::default(),
            snapshot_path: config.world.snapshot_path.clone(),
            compress_snapshots: config.world.compress_snapshots,
            quit: false,
            stats: RunStats::default(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Whether a quit was requested from the pause menu.
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn set_pointer(&mut self, pointer: Pointer) {
        self.pointer = pointer;
    }

    /// Apply one input. Turning post effects back on brings the offscreen
    /// framebuffer up to the current size.
    pub fn apply(&mut self, command: ViewerCommand) -> Result<(), AppError> {
        let post_before = self.scene.post_effects();
        self.scene.apply(command);
        if !post_before && self.scene.post_effects() {
            self.backend.resize(self.width, self.height, true)?;
        }
        Ok(())
    }

    /// New output size. Framebuffers follow only while post effects are on.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), AppError> {
        self.width = width;
        self.height = height;
        self.backend
            .resize(width, height, self.scene.post_effects())?;
        Ok(())
    }

    /// Run one frame that took `frame_time` seconds.
    pub fn frame(&mut self, frame_time: f64) -> Result<FrameStats, AppError> {
        if let Some(hud) = &self.hud {
            for action in hud.drain_actions() {
                self.quit |= self.scene.apply_pause_action(action);
            }
        }

        let aspect = self.width as f32 / self.height.max(1) as f32;
        self.game_loop.begin_frame(frame_time);
        while let Some((step, _)) = self.game_loop.next_step() {
            self.scene.advance(step, aspect);
        }

        let frame_stats = self.render()?;
        self.game_loop.end_frame();

        self.stats.frames = self.game_loop.frame_count();
        self.stats.updates = self.game_loop.update_count();
        self.stats.passes += u64::from(frame_stats.passes);
        self.stats.blocks_drawn += u64::from(frame_stats.blocks_drawn);
        Ok(frame_stats)
    }

    fn render(&mut self) -> Result<FrameStats, AppError> {
        let hud_state = self.scene.hud_state(self.width, self.height, self.pointer);
        let overlay = match self.hud.as_mut() {
            Some(hud) => {
                hud.update(hud_state);
                if hud_state.wants_frame() {
                    hud.latest()
                } else {
                    None
                }
            }
            None => None,
        };
        let settings = self.scene.frame_settings(self.width, self.height);
        Ok(render_frame(
            &mut self.backend,
            self.scene.world(),
            self.scene.camera(),
            &settings,
            overlay,
        )?)
    }

    /// Run `frames` frames of one simulation step each, stopping early on quit.
    pub fn run_frames(&mut self, frames: u32) -> Result<RunStats, AppError> {
        let step = self.game_loop.step();
        for _ in 0..frames {
            if self.quit {
                tracing::info!("quit requested");
                break;
            }
            self.frame(step)?;
        }
        Ok(self.stats)
    }

    /// Save to the configured snapshot path, if any.
    pub fn save_snapshot(&self) -> Result<Option<usize>, AppError> {
        match &self.snapshot_path {
            Some(path) => {
                persistence::save_snapshot(&self.scene, path, self.compress_snapshots).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Stop the HUD worker and hand back the backend.
    pub fn shutdown(mut self) -> (B, RunStats) {
        if let Some(mut hud) = self.hud.take() {
            self.stats.hud_frames = hud.frames_drawn();
            hud.shutdown();
        }
        (self.backend, self.stats)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_render::{ClearMode, Command, PassTarget, RecordingBackend};
    use blockview_voxel::{BlockRegistry, MaterialId, WorldPos};
    use std::sync::Arc;

    fn config(hud: bool) -> Config {
        let mut config = Config::default();
        config.window.width = 320;
        config.window.height = 200;
        config.hud.enabled = hud;
        config
    }

    fn viewer(config: &Config) -> Viewer<RecordingBackend> {
        let mut scene = Scene::new(
            Arc::new(BlockRegistry::with_defaults()),
            &config.render,
        );
        scene.populate();
        Viewer::new(config, scene, RecordingBackend::new()).unwrap()
    }

    fn passes(commands: &[Command]) -> Vec<(PassTarget, ClearMode)> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::BeginScenePass { target, clear } => Some((*target, *clear)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_new_sizes_backend() {
        let viewer = viewer(&config(false));
        assert_eq!(viewer.backend().size(), (320, 200));
        assert!(!viewer.scene().hud_visible());
    }

    #[test]
    fn test_frames_update_and_render() {
        let mut viewer = viewer(&config(false));
        let stats = viewer.run_frames(5).unwrap();
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.updates, 5);
        assert_eq!(stats.passes, 5);
        assert!(stats.blocks_drawn > 0);
        assert_eq!(viewer.backend().frames, 5);
        assert!(viewer.scene().time() > 0.0);
    }

    #[test]
    fn test_stereo_toggle_renders_two_passes_on_screen() {
        let mut viewer = viewer(&config(false));
        viewer.apply(ViewerCommand::ToggleStereo).unwrap();
        viewer.backend_mut().clear();
        let step = viewer.game_loop.step();
        viewer.frame(step).unwrap();
        assert_eq!(
            passes(&viewer.backend().commands),
            vec![
                (PassTarget::Screen, ClearMode::All),
                (PassTarget::Screen, ClearMode::Accumulate)
            ]
        );
    }

    #[test]
    fn test_sand_falls_during_run() {
        let mut viewer = viewer(&config(false));
        let pos = WorldPos::new(-20, 6, -20);
        viewer.scene_mut().world_mut().set_material(pos, MaterialId::SAND);
        viewer.run_frames(120).unwrap();
        assert_eq!(viewer.scene().world().material_at(pos), MaterialId::AIR);
    }

    #[test]
    fn test_post_effects_back_on_resyncs_framebuffer() {
        let mut viewer = viewer(&config(false));
        viewer.apply(ViewerCommand::ToggleStereo).unwrap();
        viewer.resize(800, 600).unwrap();
        assert_eq!(viewer.backend().size(), (320, 200));
        viewer.apply(ViewerCommand::TogglePostEffect).unwrap();
        assert_eq!(viewer.backend().size(), (800, 600));
    }

    #[test]
    fn test_resize_forwards_post_flag() {
        let mut viewer = viewer(&config(false));
        viewer.resize(640, 480).unwrap();
        assert_eq!(viewer.backend().size(), (640, 480));
        assert!(
            viewer
                .backend()
                .commands
                .contains(&Command::Resize { width: 640, height: 480 })
        );
    }

    #[test]
    fn test_hud_overlay_reaches_backend() {
        let mut viewer = viewer(&config(true));
        let step = viewer.game_loop.step();
        let mut composited = false;
        for _ in 0..500 {
            viewer.frame(step).unwrap();
            if viewer
                .backend()
                .commands
                .iter()
                .any(|c| matches!(c, Command::CompositeHud { width: 320, height: 200 }))
            {
                composited = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(composited);
        let (_, stats) = viewer.shutdown();
        assert!(stats.hud_frames > 0);
    }

    #[test]
    fn test_save_snapshot_to_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut with_path = config(false);
        with_path.world.snapshot_path = Some(dir.path().join("scene.bvs"));
        let written = viewer(&with_path).save_snapshot().unwrap();
        assert!(written.is_some_and(|n| n > 0));
        assert!(dir.path().join("scene.bvs").exists());

        assert_eq!(viewer(&config(false)).save_snapshot().unwrap(), None);
    }
}
