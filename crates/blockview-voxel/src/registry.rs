//! Block registry: maps compact [`MaterialId`] values to [`BlockInfo`] metadata.
//!
//! The registry is built once at startup and handed to the world by reference
//! counting. Air is always ID 0.

use std::collections::HashMap;
use std::path::PathBuf;

use blockview_lighting::Light;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::texture::{TextureRole, TextureSource};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Material identifier stored in every block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl MaterialId {
    pub const AIR: Self = Self(0);
    pub const DEBUG: Self = Self(1);
    pub const STONE: Self = Self(2);
    pub const GRASS: Self = Self(3);
    pub const SAND: Self = Self(4);
    pub const DIAMOND: Self = Self(5);
    pub const WATER: Self = Self(6);
    pub const GLOWSTONE: Self = Self(7);

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

/// Light emitted by a glowing material.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlowInfo {
    /// Linear RGB color.
    pub color: [f32; 3],
    pub intensity: f32,
    pub falloff: f32,
}

/// Immutable per-material descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Display name, unique within a registry.
    pub name: String,
    /// Texture layers bound when a block takes this material.
    #[serde(default)]
    pub textures: Vec<TextureSource>,
    /// Blocks of this material fall when unsupported.
    #[serde(default)]
    pub gravity: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub liquid: bool,
    #[serde(default)]
    pub translucent: bool,
    /// Present if placing this material allocates a point light.
    #[serde(default)]
    pub glow: Option<GlowInfo>,
}

fn default_visible() -> bool {
    true
}

impl BlockInfo {
    /// Visible, solid, non-glowing material with the given textures.
    pub fn new(name: &str, textures: Vec<TextureSource>) -> Self {
        Self {
            name: name.to_string(),
            textures,
            gravity: false,
            visible: true,
            liquid: false,
            translucent: false,
            glow: None,
        }
    }

    pub fn with_gravity(mut self) -> Self {
        self.gravity = true;
        self
    }

    pub fn with_glow(mut self, glow: GlowInfo) -> Self {
        self.glow = Some(glow);
        self
    }

    pub fn is_glowing(&self) -> bool {
        self.glow.is_some()
    }

    /// Point light centered on a block of this material, if it glows.
    pub fn associated_light(&self, center: Vec3) -> Option<Light> {
        self.glow.map(|g| {
            Light::point(center, Vec3::from_array(g.color), g.intensity, g.falloff)
        })
    }
}

/// Errors raised while building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A material with the same name has already been registered.
    #[error("duplicate block name: {0}")]
    DuplicateName(String),
    /// The RON source could not be parsed.
    #[error("failed to parse block list: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Dense table where `index == MaterialId.0`, plus a name index.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: Vec<BlockInfo>,
    name_to_id: HashMap<String, MaterialId>,
}

impl BlockRegistry {
    /// Registry containing only Air.
    pub fn new() -> Self {
        let air = BlockInfo {
            visible: false,
            ..BlockInfo::new("air", Vec::new())
        };
        let mut name_to_id = HashMap::new();
        name_to_id.insert(air.name.clone(), MaterialId::AIR);
        Self {
            blocks: vec![air],
            name_to_id,
        }
    }

    /// The stock catalogue, with IDs matching the [`MaterialId`] constants.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            BlockInfo::new("debug", layered("debug", &[TextureRole::Diffuse])),
            BlockInfo::new("stone", layered("stone", PBR_LAYERS)),
            BlockInfo::new("grass", layered("grass", PBR_LAYERS)),
            BlockInfo::new("sand", layered("sand", PBR_LAYERS)).with_gravity(),
            BlockInfo::new("diamond", layered("diamond", PBR_LAYERS)),
            BlockInfo {
                liquid: true,
                translucent: true,
                ..BlockInfo::new(
                    "water",
                    layered("water", &[TextureRole::Diffuse, TextureRole::Flow]),
                )
            },
            BlockInfo::new(
                "glowstone",
                layered("glowstone", &[TextureRole::Diffuse, TextureRole::Glow]),
            )
            .with_glow(GlowInfo {
                color: [1.0, 0.85, 0.55],
                intensity: 4.0,
                falloff: Light::DEFAULT_FALLOFF,
            }),
        ];
        for info in defaults {
            // Names in the stock table are distinct.
            if let Err(e) = registry.register(info) {
                tracing::error!("stock block table: {e}");
            }
        }
        registry
    }

    /// Registry with Air followed by the materials listed in a RON sequence.
    pub fn from_ron(source: &str) -> Result<Self, RegistryError> {
        let infos: Vec<BlockInfo> = ron::from_str(source)?;
        let mut registry = Self::new();
        for info in infos {
            registry.register(info)?;
        }
        Ok(registry)
    }

    /// Register a material and return its ID (sequential, starting at 1).
    pub fn register(&mut self, info: BlockInfo) -> Result<MaterialId, RegistryError> {
        if self.name_to_id.contains_key(&info.name) {
            return Err(RegistryError::DuplicateName(info.name));
        }
        let id = MaterialId(self.blocks.len() as u32);
        self.name_to_id.insert(info.name.clone(), id);
        self.blocks.push(info);
        Ok(id)
    }

    /// Descriptor for a material.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this registry.
    pub fn get(&self, id: MaterialId) -> &BlockInfo {
        &self.blocks[id.0 as usize]
    }

    pub fn try_get(&self, id: MaterialId) -> Option<&BlockInfo> {
        self.blocks.get(id.0 as usize)
    }

    pub fn contains(&self, id: MaterialId) -> bool {
        (id.0 as usize) < self.blocks.len()
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<MaterialId> {
        self.name_to_id.get(name).copied()
    }

    /// Number of registered materials, Air included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// `true` if only Air is registered.
    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &BlockInfo)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, info)| (MaterialId(i as u32), info))
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const PBR_LAYERS: &[TextureRole] = &[
    TextureRole::Diffuse,
    TextureRole::Displacement,
    TextureRole::AmbientOcclusion,
    TextureRole::Specular,
    TextureRole::Normal,
];

fn layered(name: &str, roles: &[TextureRole]) -> Vec<TextureSource> {
    roles
        .iter()
        .map(|&role| TextureSource {
            path: PathBuf::from(format!("resources/{name}-{}.png", role.file_suffix())),
            role,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_is_id_zero() {
        let registry = BlockRegistry::new();
        assert_eq!(registry.lookup_by_name("air"), Some(MaterialId::AIR));
        assert!(!registry.get(MaterialId::AIR).visible);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_ids_match_constants() {
        let registry = BlockRegistry::with_defaults();
        let expected = [
            ("debug", MaterialId::DEBUG),
            ("stone", MaterialId::STONE),
            ("grass", MaterialId::GRASS),
            ("sand", MaterialId::SAND),
            ("diamond", MaterialId::DIAMOND),
            ("water", MaterialId::WATER),
            ("glowstone", MaterialId::GLOWSTONE),
        ];
        for (name, id) in expected {
            assert_eq!(registry.lookup_by_name(name), Some(id), "{name}");
        }
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn test_flags() {
        let registry = BlockRegistry::with_defaults();
        assert!(registry.get(MaterialId::SAND).gravity);
        assert!(!registry.get(MaterialId::STONE).gravity);
        assert!(registry.get(MaterialId::WATER).liquid);
        assert!(registry.get(MaterialId::WATER).translucent);
        assert!(registry.get(MaterialId::GLOWSTONE).is_glowing());
        assert!(!registry.get(MaterialId::DIAMOND).is_glowing());
    }

    #[test]
    fn test_associated_light_only_for_glowing() {
        let registry = BlockRegistry::with_defaults();
        let center = Vec3::new(1.0, 2.0, 3.0);
        let light = registry
            .get(MaterialId::GLOWSTONE)
            .associated_light(center)
            .expect("glowstone emits light");
        assert_eq!(light.position, center);
        assert_eq!(light.mode, blockview_lighting::LightMode::Point);
        assert!(registry.get(MaterialId::STONE).associated_light(center).is_none());
    }

    #[test]
    fn test_texture_paths() {
        let registry = BlockRegistry::with_defaults();
        let stone = registry.get(MaterialId::STONE);
        assert_eq!(stone.textures.len(), 5);
        assert_eq!(stone.textures[0].path, PathBuf::from("resources/stone-diff.png"));
        assert_eq!(stone.textures[0].role, TextureRole::Diffuse);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = BlockRegistry::new();
        registry.register(BlockInfo::new("stone", Vec::new())).unwrap();
        let result = registry.register(BlockInfo::new("stone", Vec::new()));
        assert!(matches!(result, Err(RegistryError::DuplicateName(n)) if n == "stone"));
    }

    #[test]
    fn test_try_get_out_of_range() {
        let registry = BlockRegistry::with_defaults();
        assert!(registry.try_get(MaterialId(99)).is_none());
        assert!(!registry.contains(MaterialId(8)));
    }

    #[test]
    #[should_panic]
    fn test_get_undefined_material_panics() {
        BlockRegistry::new().get(MaterialId(3));
    }

    #[test]
    fn test_from_ron() {
        let source = r#"[
            (name: "marble", textures: [(path: "resources/marble.png", role: Diffuse)]),
            (name: "lamp", glow: Some((color: (1.0, 1.0, 1.0), intensity: 2.0, falloff: 0.02))),
            (name: "gravel", gravity: true),
        ]"#;
        let registry = BlockRegistry::from_ron(source).unwrap();
        assert_eq!(registry.len(), 4);
        let lamp = registry.lookup_by_name("lamp").unwrap();
        assert!(registry.get(lamp).is_glowing());
        assert!(registry.get(lamp).visible);
        assert!(registry.get(registry.lookup_by_name("gravel").unwrap()).gravity);
    }

    #[test]
    fn test_from_ron_invalid() {
        assert!(matches!(
            BlockRegistry::from_ron("[(nom: 1)]"),
            Err(RegistryError::Parse(_))
        ));
    }
}
