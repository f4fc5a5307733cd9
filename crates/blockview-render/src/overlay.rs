//! Alpha-blended HUD quad drawn over the finished frame.

use image::RgbaImage;

use crate::buffer::{BufferAllocator, HudVertex};
use crate::target::{PRESENT_FORMAT, RenderTarget};
use crate::texture::HudTexture;

pub struct HudOverlay {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    sampler: wgpu::Sampler,
    quad: wgpu::Buffer,
    texture: Option<(HudTexture, wgpu::BindGroup)>,
}

impl HudOverlay {
    pub fn new(device: &wgpu::Device, shader: &wgpu::ShaderModule) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hud-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hud-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("hud-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[HudVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: PRESENT_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("hud-sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let quad = BufferAllocator::new(device)
            .create_vertex_buffer("hud-quad", bytemuck::cast_slice(&HudVertex::screen_quad()));

        Self {
            bind_group_layout,
            pipeline,
            sampler,
            quad,
            texture: None,
        }
    }

    /// Copy `image` to the GPU, reallocating the texture if its size changed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, image: &RgbaImage) {
        let stale = self
            .texture
            .as_ref()
            .is_none_or(|(texture, _)| !texture.matches(image));
        if stale {
            let texture = HudTexture::new(device, image.width(), image.height());
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("hud-bind-group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            log::debug!("hud texture {}x{}", image.width(), image.height());
            self.texture = Some((texture, bind_group));
        }
        if let Some((texture, _)) = &self.texture {
            texture.upload(queue, image);
        }
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    /// Blend the last uploaded HUD over `output`.
    pub fn execute(&self, encoder: &mut wgpu::CommandEncoder, output: &RenderTarget) {
        let Some((_, bind_group)) = &self.texture else {
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("hud-pass"),
            color_attachments: &[Some(output.overlay_attachment(false))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..6, 0..1);
    }
}
