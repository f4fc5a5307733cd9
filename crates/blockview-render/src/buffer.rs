//! Vertex, instance and index buffers for block, post-effect and HUD drawing.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::uniforms::attribute;

/// Vertex and index data ready for GPU rendering.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub index_format: wgpu::IndexFormat,
}

impl MeshBuffer {
    /// Bind vertex and index buffers to a render pass.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), self.index_format);
    }

    /// Draw `instances` copies of the mesh.
    pub fn draw_instanced(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        instances: std::ops::Range<u32>,
    ) {
        render_pass.draw_indexed(0..self.index_count, 0, instances);
    }
}

/// Index data that can be either u16 or u32 format.
pub enum IndexData<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl IndexData<'_> {
    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            IndexData::U16(_) => wgpu::IndexFormat::Uint16,
            IndexData::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            IndexData::U16(data) => data.len() as u32,
            IndexData::U32(data) => data.len() as u32,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexData::U16(data) => bytemuck::cast_slice(data),
            IndexData::U32(data) => bytemuck::cast_slice(data),
        }
    }
}

/// GPU buffer allocator for creating vertex, instance and index buffers.
pub struct BufferAllocator<'a> {
    device: &'a wgpu::Device,
}

impl<'a> BufferAllocator<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    /// Create a complete mesh buffer from vertex and index data.
    pub fn create_mesh(&self, label: &str, vertices: &[u8], indices: IndexData) -> MeshBuffer {
        use wgpu::util::DeviceExt;

        let vertex_buffer = self.create_vertex_buffer(&format!("{label}-vertices"), vertices);
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}-indices")),
                contents: indices.as_bytes(),
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: indices.count(),
            index_format: indices.format(),
        }
    }

    pub fn create_vertex_buffer(&self, label: &str, data: &[u8]) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;

        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Empty vertex buffer with room for `capacity` block instances.
    pub fn create_instance_buffer(&self, capacity: usize) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("block-instances"),
            size: (capacity.max(1) * std::mem::size_of::<BlockInstance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }
}

/// Scene vertex. `color.xy` carries the face texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl SceneVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        attribute::SCENE_POSITION => Float32x3,
        attribute::SCENE_NORMAL => Float32x3,
        attribute::SCENE_COLOR => Float32x4,
        attribute::SCENE_TANGENT => Float32x3,
        attribute::SCENE_BITANGENT => Float32x3
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SceneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-block instance data.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BlockInstance {
    /// Model matrix columns.
    pub model: [[f32; 4]; 4],
    /// x = texture layer, y = opacity, z = 1 if the block glows, w unused.
    pub params: [f32; 4],
}

impl BlockInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        attribute::SCENE_INSTANCE => Float32x4,
        attribute::SCENE_INSTANCE + 1 => Float32x4,
        attribute::SCENE_INSTANCE + 2 => Float32x4,
        attribute::SCENE_INSTANCE + 3 => Float32x4,
        attribute::SCENE_INSTANCE + 4 => Float32x4
    ];

    pub fn new(model: Mat4, layer: u32, opacity: f32, glow: bool) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            params: [layer as f32, opacity, if glow { 1.0 } else { 0.0 }, 0.0],
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BlockInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Overlay vertex: xy = clip position, zw = texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct HudVertex {
    pub position: [f32; 4],
}

impl HudVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
        wgpu::vertex_attr_array![attribute::HUD_POSITION => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<HudVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Two triangles covering the screen, texture origin at the top left.
    pub fn screen_quad() -> [HudVertex; 6] {
        let v = |x: f32, y: f32, u: f32, t: f32| HudVertex {
            position: [x, y, u, t],
        };
        [
            v(-1.0, -1.0, 0.0, 1.0),
            v(1.0, -1.0, 1.0, 1.0),
            v(1.0, 1.0, 1.0, 0.0),
            v(-1.0, -1.0, 0.0, 1.0),
            v(1.0, 1.0, 1.0, 0.0),
            v(-1.0, 1.0, 0.0, 0.0),
        ]
    }
}

/// Post-effect vertex, a clip-space position.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PostVertex {
    pub position: [f32; 2],
}

impl PostVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
        wgpu::vertex_attr_array![attribute::POST_POSITION => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PostVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// One triangle that covers the whole viewport.
    pub fn fullscreen_triangle() -> [PostVertex; 3] {
        [
            PostVertex {
                position: [-1.0, -1.0],
            },
            PostVertex {
                position: [3.0, -1.0],
            },
            PostVertex {
                position: [-1.0, 3.0],
            },
        ]
    }
}

/// Unit cube centered on the origin, 4 vertices per face, counter-clockwise.
pub fn unit_cube() -> (Vec<SceneVertex>, Vec<u16>) {
    // (normal, tangent) per face; bitangent = normal × tangent.
    let faces = [
        (Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_X, Vec3::Z),
        (Vec3::Y, Vec3::X),
        (Vec3::NEG_Y, Vec3::X),
        (Vec3::Z, Vec3::X),
        (Vec3::NEG_Z, Vec3::NEG_X),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, tangent) in faces {
        let bitangent = normal.cross(tangent);
        let base = vertices.len() as u16;
        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let position = normal * 0.5 + tangent * (u - 0.5) + bitangent * (v - 0.5);
            vertices.push(SceneVertex {
                position: position.to_array(),
                normal: normal.to_array(),
                color: [u, 1.0 - v, 0.0, 1.0],
                tangent: tangent.to_array(),
                bitangent: bitangent.to_array(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
