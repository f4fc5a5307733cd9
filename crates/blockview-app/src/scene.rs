//! Viewer scene: the world, the player camera and the display toggles.

use std::sync::Arc;

use blockview_config::{EffectSetting, RenderConfig};
use blockview_hud::{HudState, PauseAction, Pointer};
use blockview_render::{FrameSettings, PlayerCamera, PostEffect};
use blockview_voxel::{BlockRegistry, World};

use crate::setup;

/// World units moved per movement command.
pub const MOVE_SPEED: f32 = 0.075;
/// Degrees turned per pixel of pointer motion.
pub const LOOK_SPEED: f32 = 0.2;
/// Focal distance factor per focus command.
pub const FOCUS_STEP: f32 = 1.1;
/// Eye separation change per eye command.
pub const EYE_STEP: f32 = 0.005;

/// A discrete viewer input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewerCommand {
    MoveForwards,
    MoveBackwards,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    /// Pointer moved by `(dx, dy)` pixels; positive values turn left and up.
    Look { dx: f32, dy: f32 },
    ZoomIn,
    ZoomOut,
    ResetCamera,
    ToggleStereo,
    TogglePostEffect,
    ToggleHud,
    CycleEffect,
    TogglePause,
    FocusFarther,
    FocusNearer,
    WidenEyes,
    NarrowEyes,
}

pub fn post_effect_from(setting: EffectSetting) -> PostEffect {
    match setting {
        EffectSetting::None => PostEffect::None,
        EffectSetting::Edge => PostEffect::Edge,
        EffectSetting::Wobbles => PostEffect::Wobbles,
    }
}

pub struct Scene {
    world: World,
    camera: PlayerCamera,
    brightness: f32,
    paused: bool,
    hud_visible: bool,
    post_effects: bool,
    effect: PostEffect,
    mouse_sensitivity: f32,
    time: f64,
    paused_time: f64,
    orbit_light: Option<usize>,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("camera", &self.camera)
            .field("brightness", &self.brightness)
            .field("paused", &self.paused)
            .field("hud_visible", &self.hud_visible)
            .field("post_effects", &self.post_effects)
            .field("effect", &self.effect)
            .field("mouse_sensitivity", &self.mouse_sensitivity)
            .field("time", &self.time)
            .field("paused_time", &self.paused_time)
            .field("orbit_light", &self.orbit_light)
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// An empty scene configured from `render`.
    pub fn new(registry: Arc<BlockRegistry>, render: &RenderConfig) -> Self {
        let mut camera = PlayerCamera::default();
        setup::reset_camera(&mut camera);
        camera.eye_separation = render.eye_separation;
        camera.set_focus(render.focal_distance);
        camera.set_zoom(render.field_of_view);
        camera.stereoscopic = render.stereoscopic;

        Self {
            world: World::new(registry),
            camera,
            brightness: render.brightness.clamp(0.0, 1.0),
            paused: false,
            hud_visible: true,
            post_effects: render.post_effect && !render.stereoscopic,
            effect: post_effect_from(render.effect),
            mouse_sensitivity: 1.0,
            time: 0.0,
            paused_time: 0.0,
            orbit_light: None,
        }
    }

    /// Add the demo lights and terrain.
    pub fn populate(&mut self) {
        self.orbit_light = setup::add_scene_lights(&mut self.world);
        setup::build_terrain(&mut self.world);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn camera(&self) -> &PlayerCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PlayerCamera {
        &mut self.camera
    }

    /// Swap in a loaded world and camera. The current aspect ratio is kept.
    pub fn replace(&mut self, world: World, mut camera: PlayerCamera) {
        camera.update(self.camera.aspect_ratio());
        self.world = world;
        self.camera = camera;
        self.orbit_light = setup::find_orbit_light(&self.world);
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = brightness.clamp(0.0, 1.0);
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn hud_visible(&self) -> bool {
        self.hud_visible
    }

    pub fn set_hud_visible(&mut self, visible: bool) {
        self.hud_visible = visible;
    }

    pub fn post_effects(&self) -> bool {
        self.post_effects
    }

    pub fn effect(&self) -> PostEffect {
        self.effect
    }

    pub fn set_mouse_sensitivity(&mut self, factor: f32) {
        self.mouse_sensitivity = factor.max(0.0);
    }

    /// Unpaused simulated seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn orbit_light(&self) -> Option<usize> {
        self.orbit_light
    }

    /// Flip stereo rendering. Turning it on turns post effects off.
    pub fn toggle_stereo(&mut self) {
        self.camera.stereoscopic = !self.camera.stereoscopic;
        if self.camera.stereoscopic {
            self.post_effects = false;
        }
    }

    /// Flip the post-effect pass. Turning it on turns stereo off.
    pub fn toggle_post_effects(&mut self) {
        self.post_effects = !self.post_effects;
        if self.post_effects {
            self.camera.stereoscopic = false;
        }
    }

    pub fn cycle_effect(&mut self) {
        self.effect = self.effect.next();
        tracing::debug!("post effect: {:?}", self.effect);
    }

    /// Advance the clocks by `dt` and update the world unless paused.
    pub fn advance(&mut self, dt: f64, aspect_ratio: f32) {
        if self.paused {
            self.paused_time += dt;
            return;
        }
        self.time += dt;
        self.update(self.time, dt, aspect_ratio);
    }

    /// One simulation step at `time`: move the orbiting light, run block
    /// physics, then update the camera.
    pub fn update(&mut self, time: f64, dt: f64, aspect_ratio: f32) {
        if let Some(slot) = self.orbit_light
            && let Some(light) = self.world.lights_mut().get_mut(slot)
        {
            light.position = setup::orbit_position(time);
        }
        self.world.lights_mut().set_viewer(self.camera.position());
        self.world.update(dt as f32);
        self.camera.update(aspect_ratio);
    }

    /// Apply one input. Movement and camera input are ignored while paused.
    pub fn apply(&mut self, command: ViewerCommand) {
        if command == ViewerCommand::TogglePause {
            self.paused = !self.paused;
            return;
        }
        if self.paused {
            return;
        }

        match command {
            ViewerCommand::ToggleStereo => self.toggle_stereo(),
            ViewerCommand::TogglePostEffect => self.toggle_post_effects(),
            ViewerCommand::ToggleHud => self.hud_visible = !self.hud_visible,
            ViewerCommand::CycleEffect => self.cycle_effect(),
            _ => self.steer(command),
        }
    }

    fn steer(&mut self, command: ViewerCommand) {
        let camera = &mut self.camera;
        let stereo = camera.stereoscopic;
        match command {
            ViewerCommand::MoveForwards => camera.move_forwards(MOVE_SPEED),
            ViewerCommand::MoveBackwards => camera.move_backwards(MOVE_SPEED),
            ViewerCommand::MoveLeft => camera.move_left(MOVE_SPEED),
            ViewerCommand::MoveRight => camera.move_right(MOVE_SPEED),
            ViewerCommand::MoveUp => camera.move_up(MOVE_SPEED),
            ViewerCommand::MoveDown => camera.move_down(MOVE_SPEED),
            ViewerCommand::Look { dx, dy } => {
                let factor = LOOK_SPEED * self.mouse_sensitivity;
                camera.rotate_right(-dx * factor);
                camera.rotate_up(dy * factor);
            }
            ViewerCommand::ZoomIn => camera.set_zoom(camera.field_of_view() - 1.0),
            ViewerCommand::ZoomOut => camera.set_zoom(camera.field_of_view() + 1.0),
            ViewerCommand::ResetCamera => setup::reset_camera(camera),
            ViewerCommand::FocusFarther if stereo => {
                camera.set_focus(camera.focal_distance() * FOCUS_STEP)
            }
            ViewerCommand::FocusNearer if stereo => {
                camera.set_focus(camera.focal_distance() / FOCUS_STEP)
            }
            ViewerCommand::WidenEyes if stereo => camera.eye_separation += EYE_STEP,
            ViewerCommand::NarrowEyes if stereo => camera.eye_separation -= EYE_STEP,
            _ => {}
        }
    }

    /// Apply a pause menu click. Returns `true` when the user asked to quit.
    pub fn apply_pause_action(&mut self, action: PauseAction) -> bool {
        match action {
            PauseAction::Resume => self.paused = false,
            PauseAction::CycleEffect => self.cycle_effect(),
            PauseAction::ToggleStereo => self.toggle_stereo(),
            PauseAction::Quit => return true,
        }
        false
    }

    pub fn frame_settings(&self, width: u32, height: u32) -> FrameSettings {
        FrameSettings {
            time: self.time as f32,
            width,
            height,
            paused: self.paused,
            brightness: self.brightness,
            post_effects: self.post_effects,
            effect: self.effect,
        }
    }

    /// HUD input for this frame. The HUD clock keeps running while paused.
    pub fn hud_state(&self, width: u32, height: u32, pointer: Pointer) -> HudState {
        HudState {
            width,
            height,
            time: self.time + self.paused_time,
            visible: self.hud_visible,
            paused: self.paused,
            stereo: self.camera.stereoscopic,
            position: self.camera.position(),
            horizontal_angle: self.camera.horizontal_angle(),
            vertical_angle: self.camera.vertical_angle(),
            pointer,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
