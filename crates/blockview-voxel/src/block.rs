//! Per-block entity: material, transform, bounding box, fall state, and the light
//! and texture resources its material holds.

use blockview_lighting::{LightOwner, LightPool};
use glam::{Mat3, Vec3};

use crate::coords::WorldPos;
use crate::registry::{BlockRegistry, MaterialId};
use crate::texture::{TextureCache, TextureHandle};

/// Gravitational acceleration applied by the fall integrator.
pub const GRAVITY: f32 = 9.81;
/// Upper bound on the fall velocity before integration.
pub const FALL_CAP: f32 = 0.025;
/// Velocity an unsupported block starts falling with.
pub const FALL_START: f32 = 0.001;

/// Position, orientation, and scale of a block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub direction: Vec3,
    /// Euler angles in radians: x about Z, y about Y, z about X.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    /// Unrotated unit transform centered on a block.
    pub fn at(pos: WorldPos) -> Self {
        Self {
            position: pos.as_vec3(),
            direction: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    /// Scale and rotation part, `S · Rz(rot.x) · Ry(rot.y) · Rx(rot.z)`.
    pub fn linear(&self) -> Mat3 {
        Mat3::from_diagonal(self.scale)
            * Mat3::from_rotation_z(self.rotation.x)
            * Mat3::from_rotation_y(self.rotation.y)
            * Mat3::from_rotation_x(self.rotation.z)
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Bounds of the transformed unit cube.
    pub fn of_unit_cube(transform: &Transform) -> Self {
        let linear = transform.linear();
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 != 0 { -0.5 } else { 0.5 },
                if i & 2 != 0 { -0.5 } else { 0.5 },
                if i & 4 != 0 { -0.5 } else { 0.5 },
            );
            let p = linear * corner + transform.position;
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Geometry a block is drawn with.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockKind {
    /// Textured unit cube.
    Cube,
    /// Externally provided mesh, referenced by name.
    Custom(CustomMesh),
}

/// Reference to a mesh loaded by the render side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomMesh {
    pub name: String,
}

/// Mutable world state a material change touches.
pub(crate) struct BlockContext<'a> {
    pub registry: &'a BlockRegistry,
    pub lights: &'a mut LightPool,
    pub textures: &'a mut TextureCache,
}

/// One voxel instance. Owned by its chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderableBlock {
    pos: WorldPos,
    material: MaterialId,
    kind: BlockKind,
    transform: Transform,
    aabb: Option<Aabb>,
    velocity: f32,
    light: Option<usize>,
    texture: Option<TextureHandle>,
}

impl RenderableBlock {
    /// Default air cube at `pos`. Holds no resources.
    pub fn air(pos: WorldPos) -> Self {
        Self {
            pos,
            material: MaterialId::AIR,
            kind: BlockKind::Cube,
            transform: Transform::at(pos),
            aabb: None,
            velocity: 0.0,
            light: None,
            texture: None,
        }
    }

    /// Air block drawn with a custom mesh. Custom blocks never carry a bounding box.
    pub fn custom(pos: WorldPos, mesh: CustomMesh) -> Self {
        Self {
            kind: BlockKind::Custom(mesh),
            ..Self::air(pos)
        }
    }

    pub fn pos(&self) -> WorldPos {
        self.pos
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn aabb(&self) -> Option<&Aabb> {
        self.aabb.as_ref()
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Light pool slot held for a glowing material.
    pub fn light_slot(&self) -> Option<usize> {
        self.light
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Any material other than air is solid.
    pub fn is_solid(&self) -> bool {
        !self.material.is_air()
    }

    pub fn is_falling(&self) -> bool {
        self.velocity > 0.0
    }

    /// Bounding box center, or the block coordinates if there is no box.
    pub fn center(&self) -> Vec3 {
        self.aabb.map_or(self.pos.as_vec3(), |b| b.center())
    }

    pub fn has_collision(&self, point: Vec3) -> bool {
        self.aabb.is_some_and(|b| b.contains(point))
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.transform.rotation = rotation;
        self.refresh_aabb();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
        self.refresh_aabb();
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.transform.direction = direction;
    }

    /// Offset the drawn position without changing the owning cell.
    pub fn translate(&mut self, delta: Vec3) {
        self.transform.position += delta;
        self.refresh_aabb();
    }

    /// Replace the material, moving light and texture resources along with it.
    ///
    /// Returns the owner of a light evicted from the pool to make room, so the
    /// caller can clear that block's slot.
    pub(crate) fn assign_material(
        &mut self,
        material: MaterialId,
        ctx: &mut BlockContext<'_>,
    ) -> Option<LightOwner> {
        self.release_resources(ctx);
        self.material = material;

        let info = ctx.registry.get(material);
        if info.visible {
            self.texture = Some(ctx.textures.acquire(material));
        }
        self.refresh_aabb();

        let light = info.associated_light(self.center())?;
        let owner = LightOwner {
            block: self.pos.to_array(),
            center: self.center(),
        };
        match ctx.lights.add(light, Some(owner)) {
            Some(allocation) => {
                self.light = Some(allocation.slot);
                allocation.evicted
            }
            None => {
                tracing::debug!("light pool full, block {:?} stays unlit", self.pos);
                None
            }
        }
    }

    /// Free the light slot and texture handle. The material is left unchanged.
    pub(crate) fn release_resources(&mut self, ctx: &mut BlockContext<'_>) {
        if let Some(slot) = self.light.take() {
            ctx.lights.remove(slot);
        }
        if self.texture.take().is_some() {
            ctx.textures.release(self.material);
        }
    }

    /// Forget a light slot that was taken over by another block.
    pub(crate) fn drop_light_slot(&mut self) {
        self.light = None;
    }

    pub(crate) fn set_velocity(&mut self, velocity: f32) {
        let was_falling = self.is_falling();
        self.velocity = velocity;
        if was_falling != self.is_falling() {
            self.refresh_aabb();
        }
    }

    /// Restore persisted state without touching pooled resources.
    pub(crate) fn restore(&mut self, transform: Transform, velocity: f32, aabb: Option<Aabb>) {
        self.transform = transform;
        self.velocity = velocity;
        self.aabb = aabb;
    }

    /// Solid, resting cubes carry a box; everything else does not.
    fn refresh_aabb(&mut self) {
        self.aabb = match self.kind {
            BlockKind::Cube if self.is_solid() && !self.is_falling() => {
                Some(Aabb::of_unit_cube(&self.transform))
            }
            _ => None,
        };
    }

    /// Velocity after one integrator step of `dt` seconds.
    pub fn next_fall_velocity(&self, dt: f32) -> f32 {
        let v = self.velocity.max(FALL_START).min(FALL_CAP);
        v * (1.0 + dt * GRAVITY * v)
    }

    pub(crate) fn carry_transform_to(&self, target: WorldPos) -> Transform {
        let offset = self.transform.position - self.pos.as_vec3();
        Transform {
            position: target.as_vec3() + offset,
            ..self.transform
        }
    }

    pub(crate) fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.refresh_aabb();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    struct Fixture {
        registry: BlockRegistry,
        lights: LightPool,
        textures: TextureCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: BlockRegistry::with_defaults(),
                lights: LightPool::new(),
                textures: TextureCache::new(),
            }
        }

        fn ctx(&mut self) -> BlockContext<'_> {
            BlockContext {
                registry: &self.registry,
                lights: &mut self.lights,
                textures: &mut self.textures,
            }
        }
    }

    #[test]
    fn test_air_block_owns_nothing() {
        let block = RenderableBlock::air(WorldPos::new(1, 2, 3));
        assert!(!block.is_solid());
        assert!(block.aabb().is_none());
        assert!(block.light_slot().is_none());
        assert_eq!(block.center(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_unit_cube_aabb() {
        let mut fx = Fixture::new();
        let mut block = RenderableBlock::air(WorldPos::new(4, 0, -2));
        block.assign_material(MaterialId::STONE, &mut fx.ctx());
        let aabb = block.aabb().copied().expect("solid block has a box");
        assert!((aabb.min - Vec3::new(3.5, -0.5, -2.5)).length() < 1e-5);
        assert!((aabb.max - Vec3::new(4.5, 0.5, -1.5)).length() < 1e-5);
        assert!(block.has_collision(Vec3::new(4.0, 0.2, -2.0)));
        assert!(!block.has_collision(Vec3::new(5.0, 0.0, -2.0)));
    }

    #[test]
    fn test_rotated_aabb_grows() {
        let mut fx = Fixture::new();
        let mut block = RenderableBlock::air(WorldPos::new(0, 0, 0));
        block.assign_material(MaterialId::STONE, &mut fx.ctx());
        block.set_rotation(Vec3::new(0.0, FRAC_PI_4, 0.0));
        let aabb = block.aabb().unwrap();
        let half = 0.5 * std::f32::consts::SQRT_2;
        assert!((aabb.max.x - half).abs() < 1e-5);
        assert!((aabb.max.y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_scaled_aabb() {
        let mut fx = Fixture::new();
        let mut block = RenderableBlock::air(WorldPos::new(0, 0, 0));
        block.assign_material(MaterialId::GRASS, &mut fx.ctx());
        block.set_scale(Vec3::new(2.0, 1.0, 1.0));
        assert!((block.aabb().unwrap().max.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_becoming_air_clears_aabb() {
        let mut fx = Fixture::new();
        let mut block = RenderableBlock::air(WorldPos::new(0, 0, 0));
        block.assign_material(MaterialId::STONE, &mut fx.ctx());
        block.assign_material(MaterialId::AIR, &mut fx.ctx());
        assert!(block.aabb().is_none());
        assert!(block.texture().is_none());
        assert_eq!(fx.textures.live(), 0);
    }

    #[test]
    fn test_glowing_material_allocates_light() {
        let mut fx = Fixture::new();
        let mut block = RenderableBlock::air(WorldPos::new(2, 3, 4));
        block.assign_material(MaterialId::GLOWSTONE, &mut fx.ctx());
        let slot = block.light_slot().expect("glowstone holds a light");
        assert_eq!(fx.lights.active_count(), 1);
        assert_eq!(fx.lights.owner(slot).map(|o| o.block), Some([2, 3, 4]));
        assert_eq!(fx.lights.get(slot).unwrap().position, Vec3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_material_change_frees_light() {
        let mut fx = Fixture::new();
        let mut block = RenderableBlock::air(WorldPos::new(0, 0, 0));
        block.assign_material(MaterialId::GLOWSTONE, &mut fx.ctx());
        let free_before = blockview_lighting::MAX_LIGHTS - fx.lights.active_count();
        block.assign_material(MaterialId::STONE, &mut fx.ctx());
        let free_after = blockview_lighting::MAX_LIGHTS - fx.lights.active_count();
        assert_eq!(free_after, free_before + 1);
        assert!(block.light_slot().is_none());
        assert_eq!(fx.lights.first_free_index(), 0);
    }

    #[test]
    fn test_full_pool_leaves_block_unlit() {
        let mut fx = Fixture::new();
        for _ in 0..blockview_lighting::MAX_LIGHTS {
            fx.lights.add(
                blockview_lighting::Light::environment(Vec3::ONE, 0.1),
                None,
            );
        }
        let mut block = RenderableBlock::air(WorldPos::new(0, 0, 0));
        let evicted = block.assign_material(MaterialId::GLOWSTONE, &mut fx.ctx());
        assert!(evicted.is_none());
        assert!(block.light_slot().is_none());
        assert!(block.is_solid());
    }

    #[test]
    fn test_fall_velocity_integrator() {
        let mut block = RenderableBlock::air(WorldPos::new(0, 0, 0));
        let v0 = block.next_fall_velocity(1.0 / 60.0);
        assert!(v0 > FALL_START && v0 < FALL_CAP);
        block.velocity = 1.0;
        let capped = block.next_fall_velocity(0.5);
        assert!((capped - FALL_CAP * (1.0 + 0.5 * GRAVITY * FALL_CAP)).abs() < 1e-7);
    }

    #[test]
    fn test_falling_block_has_no_aabb() {
        let mut fx = Fixture::new();
        let mut block = RenderableBlock::air(WorldPos::new(0, 0, 0));
        block.assign_material(MaterialId::SAND, &mut fx.ctx());
        block.set_velocity(0.01);
        assert!(block.aabb().is_none());
        block.set_velocity(0.0);
        assert!(block.aabb().is_some());
    }

    #[test]
    fn test_custom_block_has_no_aabb() {
        let mut fx = Fixture::new();
        let mut block = RenderableBlock::custom(
            WorldPos::new(0, 0, 0),
            CustomMesh {
                name: "teapot".to_string(),
            },
        );
        block.assign_material(MaterialId::DIAMOND, &mut fx.ctx());
        assert!(block.aabb().is_none());
        assert!(matches!(block.kind(), BlockKind::Custom(m) if m.name == "teapot"));
    }
}
