//! Per-frame render protocol.
//!
//! [`render_frame`] turns a world, its light pool and a camera into the ordered
//! sequence of backend calls that make up one frame:
//!
//! 1. upload the light pool and frame-wide uniforms,
//! 2. one scene pass, or two for a stereoscopic camera (left eye clears color and
//!    depth, right eye clears depth only and accumulates into the same color),
//! 3. the post-effect pass when post effects are enabled (scene passes then target
//!    the offscreen framebuffer instead of the screen),
//! 4. the HUD overlay, composited once on top of everything.
//!
//! The GPU implementation lives in [`crate::backend`]; tests drive the protocol
//! through [`crate::recording::RecordingBackend`].

use blockview_lighting::LightPool;
use blockview_voxel::{BlockInfo, BlockKind, RenderableBlock, World};
use image::RgbaImage;

use crate::camera::{EyeView, PlayerCamera};
use crate::error::RenderError;
use crate::uniforms::{UniformSlot, UniformValue};

/// Full-screen effect applied by the post pass. The discriminant is the shader's effect id.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PostEffect {
    #[default]
    None = 0,
    Edge = 1,
    Wobbles = 2,
}

impl PostEffect {
    /// Next effect in the `None → Edge → Wobbles → None` cycle.
    pub fn next(self) -> Self {
        match self {
            PostEffect::None => PostEffect::Edge,
            PostEffect::Edge => PostEffect::Wobbles,
            PostEffect::Wobbles => PostEffect::None,
        }
    }
}

/// What a scene pass clears before drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClearMode {
    /// Clear color and depth.
    All,
    /// Clear depth only and add the pass's color to what is already there.
    Accumulate,
}

/// Where scene passes draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassTarget {
    /// The post-effect framebuffer.
    Offscreen,
    /// The presented image.
    Screen,
}

/// Operations the frame protocol needs from a renderer.
pub trait RenderBackend {
    /// Upload the light pool for this frame.
    fn bind_lights(&mut self, lights: &LightPool);

    fn set_uniform(&mut self, slot: UniformSlot, value: UniformValue);

    fn begin_scene_pass(&mut self, target: PassTarget, clear: ClearMode)
    -> Result<(), RenderError>;

    fn draw_block(&mut self, block: &RenderableBlock, info: &BlockInfo);

    fn end_scene_pass(&mut self) -> Result<(), RenderError>;

    /// Sample the offscreen framebuffer through `effect` onto the screen.
    fn post_effect(&mut self, effect: PostEffect) -> Result<(), RenderError>;

    /// Upload `overlay` and blend it over the screen.
    fn composite_hud(&mut self, overlay: &RgbaImage);

    /// New output size in pixels. Framebuffers are reallocated only while post
    /// effects are on.
    fn resize(&mut self, width: u32, height: u32, post_effects: bool) -> Result<(), RenderError>;

    fn finish_frame(&mut self) -> Result<(), RenderError>;
}

/// Frame-wide inputs that do not come from the world or camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSettings {
    pub time: f32,
    pub width: u32,
    pub height: u32,
    pub paused: bool,
    /// Ambient brightness in `0..=1`.
    pub brightness: f32,
    pub post_effects: bool,
    pub effect: PostEffect,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            time: 0.0,
            width: 1280,
            height: 720,
            paused: false,
            brightness: 0.25,
            post_effects: true,
            effect: PostEffect::None,
        }
    }
}

/// Counters for one rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub passes: u32,
    pub blocks_drawn: u32,
}

/// Render one frame of `world` as seen by `camera`.
///
/// `overlay` is the most recent finished HUD image, if any.
pub fn render_frame<B: RenderBackend + ?Sized>(
    backend: &mut B,
    world: &World,
    camera: &PlayerCamera,
    settings: &FrameSettings,
    overlay: Option<&RgbaImage>,
) -> Result<FrameStats, RenderError> {
    let mut stats = FrameStats::default();

    backend.bind_lights(world.lights());
    backend.set_uniform(
        UniformSlot::LightCount,
        UniformValue::Int(world.lights().span() as i32),
    );
    backend.set_uniform(UniformSlot::WindowTime, UniformValue::Float(settings.time));
    backend.set_uniform(UniformSlot::WindowWidth, UniformValue::Float(settings.width as f32));
    backend.set_uniform(UniformSlot::WindowHeight, UniformValue::Float(settings.height as f32));
    backend.set_uniform(UniformSlot::WindowPaused, UniformValue::Bool(settings.paused));
    backend.set_uniform(
        UniformSlot::AmbientBrightness,
        UniformValue::Float(settings.brightness.clamp(0.0, 1.0)),
    );

    let target = if settings.post_effects {
        PassTarget::Offscreen
    } else {
        PassTarget::Screen
    };

    for (index, eye) in camera.eye_views().iter().enumerate() {
        let clear = if index == 0 {
            ClearMode::All
        } else {
            ClearMode::Accumulate
        };
        bind_eye(backend, eye, camera.focal_distance());
        backend.begin_scene_pass(target, clear)?;
        for block in world.render_blocks() {
            let info = world.registry().get(block.material());
            if !info.visible && matches!(block.kind(), BlockKind::Cube) {
                continue;
            }
            backend.draw_block(block, info);
            stats.blocks_drawn += 1;
        }
        backend.end_scene_pass()?;
        stats.passes += 1;
    }

    if settings.post_effects {
        backend.set_uniform(UniformSlot::PostEffect, UniformValue::Int(settings.effect as i32));
        backend.post_effect(settings.effect)?;
    }

    if let Some(overlay) = overlay {
        backend.composite_hud(overlay);
    }

    backend.finish_frame()?;
    Ok(stats)
}

fn bind_eye<B: RenderBackend + ?Sized>(backend: &mut B, eye: &EyeView, focal_distance: f32) {
    backend.set_uniform(UniformSlot::CameraProjection, UniformValue::Mat4(eye.projection));
    backend.set_uniform(UniformSlot::CameraModelView, UniformValue::Mat4(eye.view));
    backend.set_uniform(
        UniformSlot::CameraModelNormals,
        UniformValue::Mat4(eye.view.inverse().transpose()),
    );
    backend.set_uniform(UniformSlot::CameraPosition, UniformValue::Vec3(eye.position));
    backend.set_uniform(UniformSlot::CameraTarget, UniformValue::Vec3(eye.target));
    backend.set_uniform(UniformSlot::CameraFocalDistance, UniformValue::Float(focal_distance));
    backend.set_uniform(UniformSlot::CameraEyeType, UniformValue::Int(eye.mode as i32));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
