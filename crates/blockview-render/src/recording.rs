//! A [`RenderBackend`] that records calls instead of drawing.
//!
//! Used by the frame protocol tests and by headless runs with no GPU adapter.

use blockview_lighting::LightPool;
use blockview_voxel::{BlockInfo, MaterialId, RenderableBlock, WorldPos};
use image::RgbaImage;

use crate::error::RenderError;
use crate::frame::{ClearMode, PassTarget, PostEffect, RenderBackend};
use crate::uniforms::{SceneUniforms, UniformSlot, UniformValue};

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BindLights { span: usize, active: usize },
    SetUniform(UniformSlot, UniformValue),
    BeginScenePass { target: PassTarget, clear: ClearMode },
    DrawBlock { pos: WorldPos, material: MaterialId },
    EndScenePass,
    PostEffect(PostEffect),
    CompositeHud { width: u32, height: u32 },
    Resize { width: u32, height: u32 },
    FinishFrame,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::BindLights { .. } => "bind_lights",
            Command::SetUniform(..) => "set_uniform",
            Command::BeginScenePass { .. } => "begin_scene_pass",
            Command::DrawBlock { .. } => "draw_block",
            Command::EndScenePass => "end_scene_pass",
            Command::PostEffect(_) => "post_effect",
            Command::CompositeHud { .. } => "composite_hud",
            Command::Resize { .. } => "resize",
            Command::FinishFrame => "finish_frame",
        }
    }
}

/// Records every call and mirrors uniform writes into a [`SceneUniforms`] block.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub commands: Vec<Command>,
    pub uniforms: SceneUniforms,
    pub frames: u64,
    /// Make the next scene pass fail with an incomplete target.
    pub fail_scene_pass: bool,
    pass_open: bool,
    size: (u32, u32),
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output size after the last applied resize.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn bind_lights(&mut self, lights: &LightPool) {
        self.commands.push(Command::BindLights {
            span: lights.span(),
            active: lights.active_count(),
        });
    }

    fn set_uniform(&mut self, slot: UniformSlot, value: UniformValue) {
        self.uniforms.set(slot, value);
        self.commands.push(Command::SetUniform(slot, value));
    }

    fn begin_scene_pass(
        &mut self,
        target: PassTarget,
        clear: ClearMode,
    ) -> Result<(), RenderError> {
        if self.fail_scene_pass {
            return Err(RenderError::IncompleteTarget {
                label: "recording",
                reason: "simulated failure".to_string(),
            });
        }
        if self.pass_open {
            return Err(RenderError::PassAlreadyOpen);
        }
        self.pass_open = true;
        self.commands.push(Command::BeginScenePass { target, clear });
        Ok(())
    }

    fn draw_block(&mut self, block: &RenderableBlock, _info: &BlockInfo) {
        self.commands.push(Command::DrawBlock {
            pos: block.pos(),
            material: block.material(),
        });
    }

    fn end_scene_pass(&mut self) -> Result<(), RenderError> {
        if !self.pass_open {
            return Err(RenderError::NoOpenPass);
        }
        self.pass_open = false;
        self.commands.push(Command::EndScenePass);
        Ok(())
    }

    fn post_effect(&mut self, effect: PostEffect) -> Result<(), RenderError> {
        self.commands.push(Command::PostEffect(effect));
        Ok(())
    }

    fn composite_hud(&mut self, overlay: &RgbaImage) {
        self.commands.push(Command::CompositeHud {
            width: overlay.width(),
            height: overlay.height(),
        });
    }

    fn resize(&mut self, width: u32, height: u32, post_effects: bool) -> Result<(), RenderError> {
        if width < crate::target::MIN_TARGET_SIZE
            || height < crate::target::MIN_TARGET_SIZE
            || !post_effects
        {
            return Ok(());
        }
        self.size = (width, height);
        self.commands.push(Command::Resize { width, height });
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<(), RenderError> {
        self.frames += 1;
        self.commands.push(Command::FinishFrame);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_writes_are_mirrored() {
        let mut backend = RecordingBackend::new();
        backend.set_uniform(UniformSlot::AmbientBrightness, UniformValue::Float(0.75));
        assert_eq!(backend.uniforms.ambient_brightness, 0.75);
        assert_eq!(backend.commands.len(), 1);
    }

    #[test]
    fn test_nested_pass_rejected() {
        let mut backend = RecordingBackend::new();
        backend
            .begin_scene_pass(PassTarget::Screen, ClearMode::All)
            .unwrap();
        assert!(matches!(
            backend.begin_scene_pass(PassTarget::Screen, ClearMode::All),
            Err(RenderError::PassAlreadyOpen)
        ));
        backend.end_scene_pass().unwrap();
        assert!(matches!(backend.end_scene_pass(), Err(RenderError::NoOpenPass)));
    }

    #[test]
    fn test_resize_skips_tiny_sizes_and_disabled_post() {
        let mut backend = RecordingBackend::new();
        backend.resize(9, 600, true).unwrap();
        backend.resize(800, 600, false).unwrap();
        assert!(backend.commands.is_empty());
        backend.resize(800, 600, true).unwrap();
        assert_eq!(backend.size(), (800, 600));
    }
}
