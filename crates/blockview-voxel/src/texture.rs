//! Block texture sets: validated image layers per material, and the reference
//! counted material → texture handle cache the world keeps for the renderer.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::MaterialId;

/// Smallest accepted layer size in pixels.
pub const MIN_TEXTURE_SIZE: u32 = 1;
/// Largest accepted layer size in pixels.
pub const MAX_TEXTURE_SIZE: u32 = 16384;
/// Layer size used when none is configured.
pub const DEFAULT_TEXTURE_SIZE: u32 = 16;

/// What a texture layer is sampled for. The discriminant is the layer index.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TextureRole {
    Diffuse = 0,
    AmbientOcclusion = 1,
    Displacement = 2,
    Glow = 3,
    Normal = 4,
    Gloss = 5,
    Specular = 6,
    SubsurfaceScattering = 7,
    Reflection = 8,
    Parallax = 9,
    Details = 10,
    Flow = 11,
}

impl TextureRole {
    /// Number of roles, i.e. layers in a full texture array.
    pub const COUNT: usize = 12;

    /// Short file-name suffix used by the stock resources.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::Diffuse => "diff",
            Self::AmbientOcclusion => "ambt",
            Self::Displacement => "disp",
            Self::Glow => "glow",
            Self::Normal => "norm",
            Self::Gloss => "glos",
            Self::Specular => "spec",
            Self::SubsurfaceScattering => "subs",
            Self::Reflection => "refl",
            Self::Parallax => "prlx",
            Self::Details => "detl",
            Self::Flow => "flow",
        }
    }
}

/// One image file and the role it plays.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureSource {
    pub path: PathBuf,
    pub role: TextureRole,
}

/// Reasons a texture set cannot be built.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture for role {0:?} has an empty path")]
    EmptyPath(TextureRole),
    #[error("texture file not found: {0}")]
    Missing(PathBuf),
    #[error("texture {path} is {width}x{height}, expected a square image")]
    NotSquare {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    #[error("texture role {0:?} listed more than once")]
    DuplicateRole(TextureRole),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
}

/// Clamp a requested layer size into the supported range.
pub fn clamp_texture_size(size: u32) -> u32 {
    size.clamp(MIN_TEXTURE_SIZE, MAX_TEXTURE_SIZE)
}

/// Square RGBA layers of one size, keyed by role.
#[derive(Clone, Debug)]
pub struct TextureSet {
    size: u32,
    layers: Vec<(TextureRole, image::RgbaImage)>,
}

impl TextureSet {
    /// Load and resize every source. All inputs are validated before any decode.
    pub fn load(sources: &[TextureSource], size: u32) -> Result<Self, TextureError> {
        validate_sources(sources)?;
        let size = clamp_texture_size(size);
        let mut layers = Vec::with_capacity(sources.len());
        for source in sources {
            let image = image::open(&source.path)?.to_rgba8();
            layers.push((source.role, fit_layer(&source.path, image, size)?));
        }
        Ok(Self { size, layers })
    }

    /// Build from already decoded images.
    pub fn from_images(
        images: Vec<(TextureRole, image::RgbaImage)>,
        size: u32,
    ) -> Result<Self, TextureError> {
        let size = clamp_texture_size(size);
        let mut layers: Vec<(TextureRole, image::RgbaImage)> = Vec::with_capacity(images.len());
        for (role, image) in images {
            if layers.iter().any(|(r, _)| *r == role) {
                return Err(TextureError::DuplicateRole(role));
            }
            let label = PathBuf::from(format!("<{role:?}>"));
            layers.push((role, fit_layer(&label, image, size)?));
        }
        Ok(Self { size, layers })
    }

    /// Side length of every layer.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn layer(&self, role: TextureRole) -> Option<&image::RgbaImage> {
        self.layers.iter().find(|(r, _)| *r == role).map(|(_, i)| i)
    }

    pub fn roles(&self) -> impl Iterator<Item = TextureRole> + '_ {
        self.layers.iter().map(|(r, _)| *r)
    }
}

fn validate_sources(sources: &[TextureSource]) -> Result<(), TextureError> {
    for (i, source) in sources.iter().enumerate() {
        if source.path.as_os_str().is_empty() {
            return Err(TextureError::EmptyPath(source.role));
        }
        if sources[..i].iter().any(|s| s.role == source.role) {
            return Err(TextureError::DuplicateRole(source.role));
        }
        if !source.path.is_file() {
            return Err(TextureError::Missing(source.path.clone()));
        }
    }
    Ok(())
}

fn fit_layer(
    path: &Path,
    image: image::RgbaImage,
    size: u32,
) -> Result<image::RgbaImage, TextureError> {
    if image.width() != image.height() {
        return Err(TextureError::NotSquare {
            path: path.to_path_buf(),
            width: image.width(),
            height: image.height(),
        });
    }
    if image.width() == size {
        return Ok(image);
    }
    Ok(image::imageops::resize(
        &image,
        size,
        size,
        image::imageops::FilterType::Nearest,
    ))
}

// ---------------------------------------------------------------------------
// Handle cache
// ---------------------------------------------------------------------------

/// Opaque handle a render backend maps to a GPU texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Reference counted material → handle table.
///
/// Blocks acquire the handle for their material when it is assigned and release
/// it when the material changes or the block is disposed. Handles whose count
/// reaches zero are queued for the renderer to drop.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: FxHashMap<MaterialId, (TextureHandle, u32)>,
    retired: Vec<(MaterialId, TextureHandle)>,
    next: u32,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, material: MaterialId) -> TextureHandle {
        let next = &mut self.next;
        let entry = self.entries.entry(material).or_insert_with(|| {
            let handle = TextureHandle(*next);
            *next += 1;
            (handle, 0)
        });
        entry.1 += 1;
        entry.0
    }

    pub fn release(&mut self, material: MaterialId) {
        let Some(entry) = self.entries.get_mut(&material) else {
            return;
        };
        entry.1 -= 1;
        if entry.1 == 0 {
            let handle = entry.0;
            self.entries.remove(&material);
            self.retired.push((material, handle));
        }
    }

    pub fn handle(&self, material: MaterialId) -> Option<TextureHandle> {
        self.entries.get(&material).map(|(h, _)| *h)
    }

    pub fn ref_count(&self, material: MaterialId) -> u32 {
        self.entries.get(&material).map_or(0, |(_, n)| *n)
    }

    /// Number of live handles.
    pub fn live(&self) -> usize {
        self.entries.len()
    }

    /// Handles released since the last call.
    pub fn drain_retired(&mut self) -> Vec<(MaterialId, TextureHandle)> {
        std::mem::take(&mut self.retired)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
