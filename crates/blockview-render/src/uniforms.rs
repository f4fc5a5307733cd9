//! Fixed uniform and vertex-attribute slot table shared with the shaders.
//!
//! Host code never builds shader text; it only writes values into numbered slots.
//! [`SceneUniforms`] is the uniform block those slots land in.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Vertex attribute locations.
pub mod attribute {
    pub const SCENE_POSITION: u32 = 1;
    pub const SCENE_NORMAL: u32 = 2;
    pub const SCENE_COLOR: u32 = 3;
    pub const SCENE_TANGENT: u32 = 4;
    pub const SCENE_BITANGENT: u32 = 5;
    /// First location used by per-instance block data.
    pub const SCENE_INSTANCE: u32 = 6;

    /// xy = clip position, zw = texture coordinate.
    pub const HUD_POSITION: u32 = 1;

    pub const POST_POSITION: u32 = 1;
}

/// Numbered uniform slots.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformSlot {
    TextureSize = 6,
    WindowTime = 10,
    WindowWidth = 11,
    WindowHeight = 12,
    WindowPaused = 13,
    CameraPosition = 20,
    CameraTarget = 21,
    CameraFocalDistance = 22,
    CameraEyeType = 23,
    CameraProjection = 30,
    CameraModelView = 31,
    CameraModelNormals = 32,
    AmbientBrightness = 40,
    LightCount = 41,
    PostEffect = 50,
}

impl UniformSlot {
    pub const ALL: [UniformSlot; 15] = [
        UniformSlot::TextureSize,
        UniformSlot::WindowTime,
        UniformSlot::WindowWidth,
        UniformSlot::WindowHeight,
        UniformSlot::WindowPaused,
        UniformSlot::CameraPosition,
        UniformSlot::CameraTarget,
        UniformSlot::CameraFocalDistance,
        UniformSlot::CameraEyeType,
        UniformSlot::CameraProjection,
        UniformSlot::CameraModelView,
        UniformSlot::CameraModelNormals,
        UniformSlot::AmbientBrightness,
        UniformSlot::LightCount,
        UniformSlot::PostEffect,
    ];

    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| *slot as u32 == raw)
    }
}

/// A value bound to a [`UniformSlot`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec3(Vec3),
    Mat4(Mat4),
}

/// Uniform block shared by the scene and post-effect shaders. 256 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub projection: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
    pub model_normals: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub time: f32,
    pub camera_target: [f32; 3],
    pub focal_distance: f32,
    pub width: f32,
    pub height: f32,
    pub paused: u32,
    pub eye_type: i32,
    pub ambient_brightness: f32,
    pub light_count: u32,
    pub post_effect: u32,
    pub texture_size: u32,
}

impl Default for SceneUniforms {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            model_view: Mat4::IDENTITY.to_cols_array_2d(),
            model_normals: Mat4::IDENTITY.to_cols_array_2d(),
            camera_position: [0.0; 3],
            time: 0.0,
            camera_target: [0.0; 3],
            focal_distance: 10.0,
            width: 1.0,
            height: 1.0,
            paused: 0,
            eye_type: 0,
            ambient_brightness: 0.25,
            light_count: 0,
            post_effect: 0,
            texture_size: 16,
        }
    }
}

impl SceneUniforms {
    /// Write `value` into `slot`. Returns false, leaving the block unchanged, when the
    /// value's type does not fit the slot.
    pub fn set(&mut self, slot: UniformSlot, value: UniformValue) -> bool {
        use UniformSlot as S;
        use UniformValue as V;

        match (slot, value) {
            (S::TextureSize, V::Int(v)) => self.texture_size = v.max(0) as u32,
            (S::WindowTime, V::Float(v)) => self.time = v,
            (S::WindowWidth, V::Float(v)) => self.width = v,
            (S::WindowHeight, V::Float(v)) => self.height = v,
            (S::WindowPaused, V::Bool(v)) => self.paused = v as u32,
            (S::CameraPosition, V::Vec3(v)) => self.camera_position = v.to_array(),
            (S::CameraTarget, V::Vec3(v)) => self.camera_target = v.to_array(),
            (S::CameraFocalDistance, V::Float(v)) => self.focal_distance = v,
            (S::CameraEyeType, V::Int(v)) => self.eye_type = v,
            (S::CameraProjection, V::Mat4(m)) => self.projection = m.to_cols_array_2d(),
            (S::CameraModelView, V::Mat4(m)) => self.model_view = m.to_cols_array_2d(),
            (S::CameraModelNormals, V::Mat4(m)) => self.model_normals = m.to_cols_array_2d(),
            (S::AmbientBrightness, V::Float(v)) => self.ambient_brightness = v,
            (S::LightCount, V::Int(v)) => self.light_count = v.max(0) as u32,
            (S::PostEffect, V::Int(v)) => self.post_effect = v.max(0) as u32,
            (slot, value) => {
                log::warn!("uniform slot {slot:?} ({}) cannot hold {value:?}", slot as u32);
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
