//! GPU storage buffer mirroring the light pool.

use crate::light::{LightGpu, LightHeader};
use crate::pool::{LightPool, MAX_LIGHTS};

/// Storage buffer holding a [`LightHeader`] followed by [`MAX_LIGHTS`] slots.
pub struct LightBuffer {
    pub buffer: wgpu::Buffer,
}

impl LightBuffer {
    /// Total buffer size in bytes.
    pub const SIZE: u64 = std::mem::size_of::<LightHeader>() as u64
        + (MAX_LIGHTS as u64 * std::mem::size_of::<LightGpu>() as u64);

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("light-pool"),
            size: Self::SIZE,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer }
    }

    /// Write the whole slot array. Called once per frame before any scene pass.
    pub fn upload(&self, queue: &wgpu::Queue, pool: &LightPool) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[pool.header()]));
        queue.write_buffer(
            &self.buffer,
            std::mem::size_of::<LightHeader>() as u64,
            bytemuck::cast_slice(&pool.gpu_slots()),
        );
    }

    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}
