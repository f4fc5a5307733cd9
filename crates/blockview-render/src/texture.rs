//! GPU textures: the per-material diffuse array and the HUD overlay upload.
//!
//! [`MaterialTextures`] builds one `D2Array` layer per registry entry, indexed by
//! [`MaterialId`]. Materials whose diffuse image cannot be loaded get a flat
//! checker tile so a missing asset never stops the world from drawing.

use blockview_voxel::{BlockInfo, BlockRegistry, MaterialId, TextureRole, TextureSet};
use image::{Rgba, RgbaImage};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

pub const MATERIAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
pub const HUD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn bytes_per_row(width: u32) -> u32 {
    width * 4
}

/// Write one RGBA image into layer `layer` of `texture`.
fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, layer: u32, image: &RgbaImage) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(bytes_per_row(image.width())),
            rows_per_image: Some(image.height()),
        },
        wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        },
    );
}

/// Diffuse layer for a material: its diffuse file when loadable, otherwise a checker tile.
pub fn material_layer(id: MaterialId, info: &BlockInfo, size: u32) -> RgbaImage {
    let diffuse: Vec<_> = info
        .textures
        .iter()
        .filter(|s| s.role == TextureRole::Diffuse)
        .cloned()
        .collect();
    if !diffuse.is_empty() {
        match TextureSet::load(&diffuse, size) {
            Ok(set) => {
                if let Some(layer) = set.layer(TextureRole::Diffuse) {
                    return layer.clone();
                }
            }
            Err(e) => log::warn!("material {} ({}): {e}; using fallback", id.0, info.name),
        }
    }
    fallback_layer(info, size)
}

fn fallback_layer(info: &BlockInfo, size: u32) -> RgbaImage {
    let base = match info.glow {
        Some(glow) => glow.color.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8),
        None => {
            let mut hasher = FxHasher::default();
            info.name.hash(&mut hasher);
            let h = hasher.finish();
            [96 + (h & 0x7f) as u8, 96 + ((h >> 8) & 0x7f) as u8, 96 + ((h >> 16) & 0x7f) as u8]
        }
    };
    let alpha = if info.translucent { 160 } else { 255 };
    let cell = (size / 4).max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        let dark = ((x / cell) + (y / cell)) % 2 == 1;
        let [r, g, b] = base.map(|c| if dark { c - c / 5 } else { c });
        Rgba([r, g, b, alpha])
    })
}

/// One texture array layer per material.
pub struct MaterialTextures {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    size: u32,
}

impl MaterialTextures {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        registry: &BlockRegistry,
        size: u32,
    ) -> Self {
        let layers = registry.len().max(1) as u32;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("material-array"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MATERIAL_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (id, info) in registry.iter() {
            write_layer(queue, &texture, id.0, &material_layer(id, info, size));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("material-array-view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        // Block faces are pixel art.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sampler-nearest"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        log::info!("Created material array ({size}x{size}, {layers} layers)");
        Self {
            texture,
            view,
            sampler,
            size,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn layers(&self) -> u32 {
        self.texture.depth_or_array_layers()
    }

    /// Reload one material's layer, e.g. after its files changed on disk.
    pub fn update_material(
        &self,
        queue: &wgpu::Queue,
        registry: &BlockRegistry,
        id: MaterialId,
    ) {
        if id.0 >= self.layers() {
            log::warn!("material {} has no layer in the array", id.0);
            return;
        }
        if let Some(info) = registry.try_get(id) {
            write_layer(queue, &self.texture, id.0, &material_layer(id, info, self.size));
        }
    }
}

/// GPU copy of the latest HUD bitmap. Reallocated when the bitmap size changes.
pub struct HudTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl HudTexture {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("hud-texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HUD_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn matches(&self, image: &RgbaImage) -> bool {
        self.texture.width() == image.width() && self.texture.height() == image.height()
    }

    pub fn upload(&self, queue: &wgpu::Queue, image: &RgbaImage) {
        write_layer(queue, &self.texture, 0, image);
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
    fn test_missing_diffuse_falls_back_to_checker() {
        let registry = BlockRegistry::with_defaults();
        let stone = registry.get(MaterialId::STONE);
        let layer = material_layer(MaterialId::STONE, stone, 16);
        assert_eq!(layer.dimensions(), (16, 16));
        assert_ne!(layer.get_pixel(0, 0), layer.get_pixel(4, 0));
        assert_eq!(layer.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_fallback_uses_glow_color_and_translucency() {
        let registry = BlockRegistry::with_defaults();
        let glow = material_layer(MaterialId::GLOWSTONE, registry.get(MaterialId::GLOWSTONE), 8);
        assert_eq!(glow.get_pixel(0, 0)[0], 255);
        let water = material_layer(MaterialId::WATER, registry.get(MaterialId::WATER), 8);
        assert!(water.get_pixel(0, 0)[3] < 255);
    }

    #[test]
    fn test_diffuse_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        RgbaImage::from_pixel(32, 32, Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();
        let info = BlockInfo::new(
            "red",
            vec![blockview_voxel::TextureSource {
                path,
                role: TextureRole::Diffuse,
            }],
        );
        let layer = material_layer(MaterialId(8), &info, 16);
        assert_eq!(layer.dimensions(), (16, 16));
        assert_eq!(*layer.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_material_array_has_layer_per_material() {
        let Some(ctx) = test_context() else {
            return;
        };
        let registry = BlockRegistry::with_defaults();
        let textures = MaterialTextures::new(&ctx.device, &ctx.queue, &registry, 16);
        assert_eq!(textures.layers(), registry.len() as u32);
        assert_eq!(textures.size(), 16);
    }
}
