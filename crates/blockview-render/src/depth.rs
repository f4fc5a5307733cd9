//! Reverse-Z depth buffer shared by every scene pass.
//!
//! The near plane maps to 1.0 and the far plane to 0.0, matching
//! [`PlayerCamera::projection_matrix`](crate::camera::PlayerCamera::projection_matrix).
//! Each scene pass clears depth, including the second eye of a stereo frame.

pub struct DepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Far plane under reverse-Z.
    pub const CLEAR_VALUE: f32 = 0.0;

    /// Closer fragments have larger depth values.
    pub const COMPARE_FUNCTION: wgpu::CompareFunction = wgpu::CompareFunction::GreaterEqual;

    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scene-depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// Reallocate for a new size. No-op if the size is unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        *self = Self::new(device, width, height);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Attachment that clears to the far plane and keeps the result.
    pub fn attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(Self::CLEAR_VALUE),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }
    }

    /// Pipeline depth state for scene geometry.
    pub fn stencil_state() -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: Self::FORMAT,
            depth_write_enabled: true,
            depth_compare: Self::COMPARE_FUNCTION,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::test_context;

    #[test]
    fn test_reverse_z_constants() {
        assert_eq!(DepthBuffer::FORMAT, wgpu::TextureFormat::Depth32Float);
        assert_eq!(DepthBuffer::CLEAR_VALUE, 0.0);
        assert_eq!(
            DepthBuffer::COMPARE_FUNCTION,
            wgpu::CompareFunction::GreaterEqual
        );
        let state = DepthBuffer::stencil_state();
        assert!(state.depth_write_enabled);
        assert_eq!(state.depth_compare, DepthBuffer::COMPARE_FUNCTION);
    }

    #[test]
    fn test_resize_updates_dimensions() {
        let Some(ctx) = test_context() else {
            return;
        };
        let mut depth = DepthBuffer::new(&ctx.device, 800, 600);
        assert_eq!((depth.width(), depth.height()), (800, 600));
        depth.resize(&ctx.device, 1920, 1080);
        assert_eq!((depth.width(), depth.height()), (1920, 1080));
        assert!(
            depth
                .texture
                .usage()
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        );
    }
}
