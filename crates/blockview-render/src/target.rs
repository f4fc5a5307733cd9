//! Color + depth render targets with completeness checks.
//!
//! A [`RenderTarget`] bundles a color texture, a linear depth texture written as a
//! color attachment (sampled by the edge effect), and the reverse-Z
//! [`DepthBuffer`]. The offscreen target feeds the post-effect pass; the present
//! target is the image the frame ends in.
//!
//! Every (re)configuration is verified. A target that fails verification is a
//! fatal [`RenderError::IncompleteTarget`].

use crate::depth::DepthBuffer;
use crate::error::RenderError;
use crate::gpu::RenderContext;

/// Resize requests smaller than this in either dimension are ignored.
pub const MIN_TARGET_SIZE: u32 = 10;

pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const PRESENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
pub const DEPTH_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

/// Clear color for the first scene pass of a frame.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// Checks a created texture against what was requested.
pub fn verify_texture(
    ctx: &RenderContext,
    label: &'static str,
    texture: &wgpu::Texture,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> Result<(), RenderError> {
    let incomplete = |reason: String| RenderError::IncompleteTarget { label, reason };

    if width == 0 || height == 0 {
        return Err(incomplete(format!("zero-sized attachment {width}x{height}")));
    }
    let max = ctx.max_texture_dimension();
    if width > max || height > max {
        return Err(incomplete(format!(
            "{width}x{height} exceeds the device limit of {max}"
        )));
    }
    if !ctx.supports_target_format(format) {
        return Err(incomplete(format!(
            "{format:?} is not renderable and sampleable on this adapter"
        )));
    }
    if texture.format() != format || texture.width() != width || texture.height() != height {
        return Err(incomplete(format!(
            "created {:?} {}x{}, requested {format:?} {width}x{height}",
            texture.format(),
            texture.width(),
            texture.height()
        )));
    }
    Ok(())
}

fn color_texture(
    device: &wgpu::Device,
    label: &'static str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// Color, linear depth and depth buffer of one size.
pub struct RenderTarget {
    label: &'static str,
    format: wgpu::TextureFormat,
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_color: wgpu::Texture,
    pub depth_color_view: wgpu::TextureView,
    pub depth: DepthBuffer,
}

impl RenderTarget {
    /// Allocate and verify a target.
    pub fn new(
        ctx: &RenderContext,
        label: &'static str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let color = color_texture(&ctx.device, label, format, width, height);
        verify_texture(ctx, label, &color, format, width, height)?;
        let depth_color =
            color_texture(&ctx.device, "linear-depth", DEPTH_COLOR_FORMAT, width, height);
        verify_texture(ctx, label, &depth_color, DEPTH_COLOR_FORMAT, width, height)?;
        let depth = DepthBuffer::new(&ctx.device, width, height);
        verify_texture(ctx, label, &depth.texture, DepthBuffer::FORMAT, width, height)?;

        log::info!("configured {label} target {width}x{height} ({format:?})");
        Ok(Self {
            label,
            format,
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
            depth_color_view: depth_color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_color,
            depth,
        })
    }

    /// Offscreen framebuffer sampled by the post-effect pass.
    pub fn offscreen(ctx: &RenderContext, width: u32, height: u32) -> Result<Self, RenderError> {
        Self::new(ctx, "offscreen", OFFSCREEN_FORMAT, width, height)
    }

    /// Final image of a frame.
    pub fn present(ctx: &RenderContext, width: u32, height: u32) -> Result<Self, RenderError> {
        Self::new(ctx, "present", PRESENT_FORMAT, width, height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    /// Reallocate at a new size, verifying the result. Same-size calls are no-ops.
    pub fn resize(
        &mut self,
        ctx: &RenderContext,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        if self.width() == width && self.height() == height {
            return Ok(());
        }
        *self = Self::new(ctx, self.label, self.format, width, height)?;
        Ok(())
    }

    /// Color attachments for a scene pass. `clear` clears color before drawing.
    pub fn scene_attachments(&self, clear: bool) -> [Option<wgpu::RenderPassColorAttachment<'_>>; 2] {
        let load = |color: wgpu::Color| {
            if clear {
                wgpu::LoadOp::Clear(color)
            } else {
                wgpu::LoadOp::Load
            }
        };
        [
            Some(wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            }),
            Some(wgpu::RenderPassColorAttachment {
                view: &self.depth_color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            }),
        ]
    }

    /// Color attachment that keeps existing contents, for overlays and the post pass.
    pub fn overlay_attachment(&self, clear: bool) -> wgpu::RenderPassColorAttachment<'_> {
        wgpu::RenderPassColorAttachment {
            view: &self.color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: if clear {
                    wgpu::LoadOp::Clear(CLEAR_COLOR)
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        }
    }
}

/// Whether a resize request should reallocate targets.
pub fn should_resize(width: u32, height: u32, post_effects: bool) -> bool {
    post_effects && width >= MIN_TARGET_SIZE && height >= MIN_TARGET_SIZE
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::test_context;

    #[test]
    fn test_resize_threshold() {
        assert!(!should_resize(9, 100, true));
        assert!(!should_resize(100, 9, true));
        assert!(!should_resize(800, 600, false));
        assert!(should_resize(10, 10, true));
    }

    #[test]
    fn test_offscreen_target_is_complete() {
        let Some(ctx) = test_context() else {
            return;
        };
        let target = RenderTarget::offscreen(&ctx, 64, 32).unwrap();
        assert_eq!((target.width(), target.height()), (64, 32));
        assert_eq!(target.format(), OFFSCREEN_FORMAT);
        assert_eq!(target.depth.width(), 64);
    }

    #[test]
    fn test_oversized_target_is_fatal() {
        let Some(ctx) = test_context() else {
            return;
        };
        let max = ctx.max_texture_dimension();
        let color = color_texture(&ctx.device, "probe", PRESENT_FORMAT, 16, 16);
        let err = verify_texture(&ctx, "probe", &color, PRESENT_FORMAT, max + 1, 16).unwrap_err();
        assert!(matches!(err, RenderError::IncompleteTarget { label: "probe", .. }));
    }

    #[test]
    fn test_mismatched_texture_is_fatal() {
        let Some(ctx) = test_context() else {
            return;
        };
        let color = color_texture(&ctx.device, "probe", PRESENT_FORMAT, 16, 16);
        assert!(verify_texture(&ctx, "probe", &color, PRESENT_FORMAT, 32, 16).is_err());
        assert!(verify_texture(&ctx, "probe", &color, PRESENT_FORMAT, 0, 16).is_err());
        assert!(verify_texture(&ctx, "probe", &color, PRESENT_FORMAT, 16, 16).is_ok());
    }

    #[test]
    fn test_resize_reallocates() {
        let Some(ctx) = test_context() else {
            return;
        };
        let mut target = RenderTarget::present(&ctx, 32, 32).unwrap();
        target.resize(&ctx, 48, 40).unwrap();
        assert_eq!((target.width(), target.height()), (48, 40));
        assert_eq!(target.depth.height(), 40);
    }
}
