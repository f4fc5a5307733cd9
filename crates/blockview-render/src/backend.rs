//! wgpu implementation of [`RenderBackend`].
//!
//! Draw calls are batched per scene pass into instance lists and encoded when
//! the pass ends. Each pass is submitted on its own because the camera
//! uniforms differ between the two eyes of a stereo frame, and
//! `Queue::write_buffer` only takes effect at the next submit.

use std::sync::Arc;

use blockview_lighting::{LightBuffer, LightPool};
use blockview_voxel::{BlockInfo, BlockKind, BlockRegistry, DEFAULT_TEXTURE_SIZE, RenderableBlock};
use glam::Mat4;
use image::RgbaImage;
use rustc_hash::FxHashMap;

use crate::buffer::{BlockInstance, BufferAllocator, IndexData, MeshBuffer, SceneVertex, unit_cube};
use crate::error::RenderError;
use crate::frame::{ClearMode, PassTarget, PostEffect, RenderBackend};
use crate::gpu::RenderContext;
use crate::overlay::HudOverlay;
use crate::pipeline::ScenePipelines;
use crate::post::PostPipeline;
use crate::shader::{HUD_SHADER, POST_SHADER, SCENE_SHADER, ShaderLibrary};
use crate::target::{MIN_TARGET_SIZE, OFFSCREEN_FORMAT, PRESENT_FORMAT, RenderTarget, should_resize};
use crate::texture::MaterialTextures;
use crate::uniforms::{SceneUniforms, UniformSlot, UniformValue};

const INITIAL_INSTANCE_CAPACITY: usize = 1024;

/// Instances collected between `begin_scene_pass` and `end_scene_pass`.
struct OpenPass {
    target: PassTarget,
    clear: ClearMode,
    cubes: Vec<BlockInstance>,
    custom: FxHashMap<String, Vec<BlockInstance>>,
}

/// Model matrix of a block: translate to its position, then scale and rotate.
pub fn block_model(block: &RenderableBlock) -> Mat4 {
    let transform = block.transform();
    Mat4::from_translation(transform.position) * Mat4::from_mat3(transform.linear())
}

/// Headless GPU renderer.
pub struct WgpuBackend {
    ctx: RenderContext,
    library: ShaderLibrary,
    uniforms: SceneUniforms,
    uniform_buffer: wgpu::Buffer,
    lights: LightBuffer,
    frame_bind_group: wgpu::BindGroup,
    materials: MaterialTextures,
    material_bind_group: wgpu::BindGroup,
    scene: ScenePipelines,
    post: PostPipeline,
    hud: HudOverlay,
    offscreen: RenderTarget,
    present: RenderTarget,
    cube: MeshBuffer,
    meshes: FxHashMap<String, MeshBuffer>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    open_pass: Option<OpenPass>,
    frames: u64,
}

impl WgpuBackend {
    /// Build every GPU resource for a `width`×`height` output.
    ///
    /// Fails with [`RenderError::IncompleteTarget`] if either framebuffer cannot
    /// be configured at that size.
    pub fn new(
        ctx: RenderContext,
        registry: &BlockRegistry,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let library = ShaderLibrary::with_builtins(&ctx.device);
        let missing = |name: &str| RenderError::IncompleteTarget {
            label: "shader",
            reason: format!("built-in program '{name}' is missing"),
        };
        let scene_shader = library.get(SCENE_SHADER).ok_or_else(|| missing(SCENE_SHADER))?;
        let post_shader = library.get(POST_SHADER).ok_or_else(|| missing(POST_SHADER))?;
        let hud_shader = library.get(HUD_SHADER).ok_or_else(|| missing(HUD_SHADER))?;

        let scene = ScenePipelines::new(
            &ctx.device,
            &scene_shader,
            &[OFFSCREEN_FORMAT, PRESENT_FORMAT],
        );
        let mut post = PostPipeline::new(&ctx.device, &post_shader);
        let hud = HudOverlay::new(&ctx.device, &hud_shader);

        let mut uniforms = SceneUniforms::default();
        uniforms.set(
            UniformSlot::TextureSize,
            UniformValue::Int(DEFAULT_TEXTURE_SIZE as i32),
        );
        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights = LightBuffer::new(&ctx.device);
        let frame_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene-frame-bind-group"),
            layout: &scene.frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights.binding(),
                },
            ],
        });

        let materials =
            MaterialTextures::new(&ctx.device, &ctx.queue, registry, DEFAULT_TEXTURE_SIZE);
        let material_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene-material-bind-group"),
            layout: &scene.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&materials.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&materials.sampler),
                },
            ],
        });

        let offscreen = RenderTarget::offscreen(&ctx, width, height)?;
        let present = RenderTarget::present(&ctx, width, height)?;
        post.rebind(&ctx.device, &uniform_buffer, &offscreen);

        let (vertices, indices) = unit_cube();
        let allocator = BufferAllocator::new(&ctx.device);
        let cube = allocator.create_mesh(
            "unit-cube",
            bytemuck::cast_slice(&vertices),
            IndexData::U16(&indices),
        );
        let instance_buffer = allocator.create_instance_buffer(INITIAL_INSTANCE_CAPACITY);

        Ok(Self {
            ctx,
            library,
            uniforms,
            uniform_buffer,
            lights,
            frame_bind_group,
            materials,
            material_bind_group,
            scene,
            post,
            hud,
            offscreen,
            present,
            cube,
            meshes: FxHashMap::default(),
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            open_pass: None,
            frames: 0,
        })
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn shaders(&self) -> &ShaderLibrary {
        &self.library
    }

    pub fn uniforms(&self) -> &SceneUniforms {
        &self.uniforms
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> (u32, u32) {
        (self.present.width(), self.present.height())
    }

    /// Upload a mesh that custom blocks can reference by name.
    pub fn register_mesh(&mut self, name: &str, vertices: &[SceneVertex], indices: &[u16]) {
        let mesh = BufferAllocator::new(&self.ctx.device).create_mesh(
            name,
            bytemuck::cast_slice(vertices),
            IndexData::U16(indices),
        );
        if self.meshes.insert(name.to_string(), mesh).is_some() {
            log::info!("Replaced mesh '{name}'");
        }
    }

    /// Reload one material's diffuse layer.
    pub fn update_material_texture(
        &self,
        registry: &BlockRegistry,
        material: blockview_voxel::MaterialId,
    ) {
        self.materials
            .update_material(&self.ctx.queue, registry, material);
    }

    fn target(&self, target: PassTarget) -> &RenderTarget {
        match target {
            PassTarget::Offscreen => &self.offscreen,
            PassTarget::Screen => &self.present,
        }
    }

    fn ensure_instance_capacity(&mut self, needed: usize) {
        if needed <= self.instance_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        self.instance_buffer =
            BufferAllocator::new(&self.ctx.device).create_instance_buffer(capacity);
        self.instance_capacity = capacity;
        log::debug!("instance buffer grown to {capacity}");
    }

    fn write_uniforms(&self) {
        self.ctx
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Read the presented image back to the CPU. Blocks until the GPU is idle.
    pub fn capture(&self) -> Result<RgbaImage, RenderError> {
        if self.open_pass.is_some() {
            return Err(RenderError::PassAlreadyOpen);
        }
        let texture = &self.present.color;
        let (w, h) = (texture.width(), texture.height());
        let unpadded = w * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let readback = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("capture-readback"),
            size: u64::from(padded * h),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.encoder("capture");
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(h),
                },
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit([encoder.finish()]);

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.ctx
            .device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| RenderError::Readback(e.to_string()))?;
        rx.recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * h) as usize);
        for row in 0..h {
            let start = (row * padded) as usize;
            pixels.extend_from_slice(&mapped[start..start + unpadded as usize]);
        }
        drop(mapped);
        readback.unmap();

        RgbaImage::from_raw(w, h, pixels)
            .ok_or_else(|| RenderError::Readback(format!("short readback for {w}x{h}")))
    }
}

impl RenderBackend for WgpuBackend {
    fn bind_lights(&mut self, lights: &LightPool) {
        self.lights.upload(&self.ctx.queue, lights);
    }

    fn set_uniform(&mut self, slot: UniformSlot, value: UniformValue) {
        self.uniforms.set(slot, value);
    }

    fn begin_scene_pass(
        &mut self,
        target: PassTarget,
        clear: ClearMode,
    ) -> Result<(), RenderError> {
        if self.open_pass.is_some() {
            return Err(RenderError::PassAlreadyOpen);
        }
        // Post effects may have been switched on since the last resize.
        if target == PassTarget::Offscreen {
            let (w, h) = self.size();
            if (self.offscreen.width(), self.offscreen.height()) != (w, h) {
                self.offscreen.resize(&self.ctx, w, h)?;
                self.post
                    .rebind(&self.ctx.device, &self.uniform_buffer, &self.offscreen);
            }
        }
        self.open_pass = Some(OpenPass {
            target,
            clear,
            cubes: Vec::new(),
            custom: FxHashMap::default(),
        });
        Ok(())
    }

    fn draw_block(&mut self, block: &RenderableBlock, info: &BlockInfo) {
        let Some(pass) = self.open_pass.as_mut() else {
            log::warn!("draw_block outside a scene pass");
            return;
        };
        let opacity = if info.translucent { 0.6 } else { 1.0 };
        let instance = BlockInstance::new(
            block_model(block),
            block.material().0,
            opacity,
            info.is_glowing(),
        );
        match block.kind() {
            BlockKind::Cube => pass.cubes.push(instance),
            BlockKind::Custom(mesh) => pass
                .custom
                .entry(mesh.name.clone())
                .or_default()
                .push(instance),
        }
    }

    fn end_scene_pass(&mut self) -> Result<(), RenderError> {
        let pass = self.open_pass.take().ok_or(RenderError::NoOpenPass)?;

        // One instance buffer per pass: cubes first, then each custom mesh.
        let mut instances = pass.cubes;
        let cube_range = 0..instances.len() as u32;
        let mut custom_ranges = Vec::with_capacity(pass.custom.len());
        for (name, list) in pass.custom {
            if !self.meshes.contains_key(&name) {
                log::debug!("no mesh registered as '{name}'; {} blocks skipped", list.len());
                continue;
            }
            let start = instances.len() as u32;
            instances.extend(list);
            custom_ranges.push((name, start..instances.len() as u32));
        }

        self.ensure_instance_capacity(instances.len());
        self.write_uniforms();
        if !instances.is_empty() {
            self.ctx
                .queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let target = self.target(pass.target);
        let pipeline = self.scene.get(target.format(), pass.clear).ok_or_else(|| {
            RenderError::IncompleteTarget {
                label: "scene",
                reason: format!("no pipeline for {:?}", target.format()),
            }
        })?;

        let mut encoder = self.encoder("scene");
        {
            let attachments = target.scene_attachments(pass.clear == ClearMode::All);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-pass"),
                color_attachments: &attachments,
                depth_stencil_attachment: Some(target.depth.attachment()),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            render_pass.set_bind_group(1, &self.material_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            if !cube_range.is_empty() {
                self.cube.bind(&mut render_pass);
                self.cube.draw_instanced(&mut render_pass, cube_range);
            }
            for (name, range) in custom_ranges {
                if let Some(mesh) = self.meshes.get(&name) {
                    mesh.bind(&mut render_pass);
                    mesh.draw_instanced(&mut render_pass, range);
                }
            }
        }
        self.ctx.queue.submit([encoder.finish()]);
        Ok(())
    }

    fn post_effect(&mut self, effect: PostEffect) -> Result<(), RenderError> {
        if self.open_pass.is_some() {
            return Err(RenderError::PassAlreadyOpen);
        }
        self.uniforms.post_effect = effect as u32;
        self.write_uniforms();
        let mut encoder = self.encoder("post");
        self.post.execute(&mut encoder, &self.present);
        self.ctx.queue.submit([encoder.finish()]);
        Ok(())
    }

    fn composite_hud(&mut self, overlay: &RgbaImage) {
        if overlay.width() == 0 || overlay.height() == 0 {
            return;
        }
        self.hud.upload(&self.ctx.device, &self.ctx.queue, overlay);
        let mut encoder = self.encoder("hud");
        self.hud.execute(&mut encoder, &self.present);
        self.ctx.queue.submit([encoder.finish()]);
    }

    fn resize(&mut self, width: u32, height: u32, post_effects: bool) -> Result<(), RenderError> {
        if width < MIN_TARGET_SIZE || height < MIN_TARGET_SIZE {
            log::debug!("ignoring resize to {width}x{height}");
            return Ok(());
        }
        self.present.resize(&self.ctx, width, height)?;
        if should_resize(width, height, post_effects) {
            self.offscreen.resize(&self.ctx, width, height)?;
            self.post
                .rebind(&self.ctx.device, &self.uniform_buffer, &self.offscreen);
        }
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<(), RenderError> {
        if self.open_pass.is_some() {
            return Err(RenderError::PassAlreadyOpen);
        }
        self.frames += 1;
        if let Err(e) = self.ctx.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {e}");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
