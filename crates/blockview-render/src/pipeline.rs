//! Scene pipelines: textured, lit, instanced blocks.
//!
//! Each color format gets two variants. The opaque variant draws the first pass
//! of a frame with ordinary alpha blending; the accumulate variant draws the
//! second stereo eye and adds its color to what the first eye left behind.

use std::num::NonZeroU64;

use rustc_hash::FxHashMap;

use crate::buffer::{BlockInstance, SceneVertex};
use crate::depth::DepthBuffer;
use crate::frame::ClearMode;
use crate::target::DEPTH_COLOR_FORMAT;
use crate::uniforms::SceneUniforms;

/// Color blend for the second eye: `dst + src * src_alpha`.
pub const ACCUMULATE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Max,
    },
};

pub fn blend_for(clear: ClearMode) -> wgpu::BlendState {
    match clear {
        ClearMode::All => wgpu::BlendState::ALPHA_BLENDING,
        ClearMode::Accumulate => ACCUMULATE_BLEND,
    }
}

/// Bind group layouts and pipeline variants for block drawing.
pub struct ScenePipelines {
    pub frame_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    pipelines: FxHashMap<(wgpu::TextureFormat, ClearMode), wgpu::RenderPipeline>,
}

impl ScenePipelines {
    /// Build both variants for every format in `formats`.
    pub fn new(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        formats: &[wgpu::TextureFormat],
    ) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene-frame-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<SceneUniforms>() as u64
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene-material-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
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
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[&frame_layout, &material_layout],
            immediate_size: 0,
        });

        let mut pipelines = FxHashMap::default();
        for &format in formats {
            for clear in [ClearMode::All, ClearMode::Accumulate] {
                let pipeline = create_scene_pipeline(device, &layout, shader, format, clear);
                pipelines.insert((format, clear), pipeline);
            }
        }

        Self {
            frame_layout,
            material_layout,
            layout,
            pipelines,
        }
    }

    pub fn get(
        &self,
        format: wgpu::TextureFormat,
        clear: ClearMode,
    ) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&(format, clear))
    }

    pub fn layout(&self) -> &wgpu::PipelineLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

fn create_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    clear: ClearMode,
) -> wgpu::RenderPipeline {
    let label = match clear {
        ClearMode::All => "scene-pipeline",
        ClearMode::Accumulate => "scene-accumulate-pipeline",
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[SceneVertex::layout(), BlockInstance::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(DepthBuffer::stencil_state()),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[
                Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(blend_for(clear)),
                    write_mask: wgpu::ColorWrites::ALL,
                }),
                Some(wgpu::ColorTargetState {
                    format: DEPTH_COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::RED,
                }),
            ],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
