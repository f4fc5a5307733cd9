//! Rendering for the block viewer: the stereo player camera, the uniform slot
//! table, the per-frame pass protocol, and its wgpu and recording backends.

pub mod backend;
pub mod buffer;
pub mod camera;
pub mod depth;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod overlay;
pub mod pipeline;
pub mod post;
pub mod recording;
pub mod shader;
pub mod target;
pub mod texture;
pub mod uniforms;

pub use backend::WgpuBackend;
pub use buffer::{BlockInstance, BufferAllocator, IndexData, MeshBuffer, SceneVertex, unit_cube};
pub use camera::{EyeView, PlayerCamera, StereoMode, ViewType};
pub use error::{RenderContextError, RenderError};
pub use frame::{
    ClearMode, FrameSettings, FrameStats, PassTarget, PostEffect, RenderBackend, render_frame,
};
pub use gpu::{RenderContext, init_render_context_blocking};
pub use recording::{Command, RecordingBackend};
pub use shader::ShaderLibrary;
pub use target::RenderTarget;
pub use uniforms::{SceneUniforms, UniformSlot, UniformValue};
