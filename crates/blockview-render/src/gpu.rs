//! GPU device initialization.
//!
//! Provides a headless [`RenderContext`] that owns the wgpu instance, adapter,
//! device and queue. The presented image is an owned texture (see
//! [`crate::target::RenderTarget::present`]) rather than a window surface.

use crate::error::RenderContextError;

/// Owns all GPU state: instance, adapter, device, and queue.
pub struct RenderContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl RenderContext {
    /// Initialize the GPU asynchronously.
    pub async fn new() -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Ok(adapter) => adapter,
            Err(_) => return Err(RenderContextError::NoAdapter),
        };

        let info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("blockview-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Whether `format` can be both rendered to and sampled on this adapter.
    pub fn supports_target_format(&self, format: wgpu::TextureFormat) -> bool {
        let features = self.adapter.get_texture_format_features(format);
        features.allowed_usages.contains(
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

/// Initialize the GPU synchronously using `pollster`.
pub fn init_render_context_blocking() -> Result<RenderContext, RenderContextError> {
    pollster::block_on(RenderContext::new())
}

/// Optional context for tests; `None` when the machine has no adapter.
#[cfg(test)]
pub(crate) fn test_context() -> Option<RenderContext> {
    init_render_context_blocking().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
