//! The block world: lazily created chunks addressed by unbounded world
//! coordinates, plus the light pool and texture cache its blocks draw on.

use std::sync::Arc;

use blockview_lighting::{LightOwner, LightPool};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::block::{BlockContext, BlockKind, CustomMesh, RenderableBlock};
use crate::chunk::Chunk;
use crate::coords::{ChunkCoord, WorldPos};
use crate::registry::{BlockRegistry, MaterialId};
use crate::texture::TextureCache;

/// Owns every chunk, indexed by chunk coordinate.
///
/// Chunks live in a flat vector in creation order, which is the surface
/// [`update`](Self::update) and [`render_blocks`](Self::render_blocks) walk;
/// the map only resolves coordinates to positions in that vector. A chunk left
/// with no stored blocks after a removal is dropped.
pub struct World {
    chunks: Vec<Chunk>,
    index: FxHashMap<ChunkCoord, usize>,
    registry: Arc<BlockRegistry>,
    lights: LightPool,
    textures: TextureCache,
}

impl World {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self {
            chunks: Vec::new(),
            index: FxHashMap::default(),
            registry,
            lights: LightPool::new(),
            textures: TextureCache::new(),
        }
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn lights(&self) -> &LightPool {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut LightPool {
        &mut self.lights
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.index.get(&coord).map(|&i| &self.chunks[i])
    }

    /// Chunks in creation order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Total solid blocks across all chunks.
    pub fn block_count(&self) -> usize {
        self.chunks.iter().map(Chunk::block_count).sum()
    }

    /// Block at `pos` if one is stored. Never creates chunks or blocks.
    pub fn get(&self, pos: WorldPos) -> Option<&RenderableBlock> {
        let (coord, local) = pos.split();
        self.chunk(coord)?.get(local)
    }

    /// Block at `pos`, creating the chunk and a default air block as needed.
    ///
    /// Material changes go through [`set_material`](Self::set_material); the
    /// returned reference is for transform edits.
    pub fn at(&mut self, pos: WorldPos) -> &mut RenderableBlock {
        let (coord, local) = pos.split();
        chunk_entry(&mut self.chunks, &mut self.index, coord).get_or_create(local)
    }

    /// Material at `pos`; air where nothing is stored.
    pub fn material_at(&self, pos: WorldPos) -> MaterialId {
        self.get(pos).map_or(MaterialId::AIR, RenderableBlock::material)
    }

    pub fn is_solid_at(&self, pos: WorldPos) -> bool {
        self.get(pos).is_some_and(RenderableBlock::is_solid)
    }

    /// Assign a material, moving light and texture resources and keeping the
    /// owning chunk's population in step.
    ///
    /// # Panics
    ///
    /// Panics if `material` is not defined in the world's registry.
    pub fn set_material(&mut self, pos: WorldPos, material: MaterialId) {
        let (coord, local) = pos.split();
        let chunk = chunk_entry(&mut self.chunks, &mut self.index, coord);
        let was_solid = chunk.get(local).is_some_and(RenderableBlock::is_solid);
        let mut ctx = BlockContext {
            registry: &self.registry,
            lights: &mut self.lights,
            textures: &mut self.textures,
        };
        let evicted = chunk.get_or_create(local).assign_material(material, &mut ctx);
        chunk.track_population(was_solid, !material.is_air());

        if let Some(owner) = evicted {
            forget_light(&mut self.chunks, &self.index, owner);
        }
    }

    /// Dispose the block at `pos` and empty its slot. The next access yields air.
    pub fn remove_block(&mut self, pos: WorldPos) {
        if let Some(mut block) = self.take_block(pos) {
            let mut ctx = BlockContext {
                registry: &self.registry,
                lights: &mut self.lights,
                textures: &mut self.textures,
            };
            block.release_resources(&mut ctx);
        }
    }

    /// Replace whatever occupies `pos` with a custom-mesh block.
    pub fn place_custom_block(&mut self, pos: WorldPos, mesh: CustomMesh) -> &mut RenderableBlock {
        self.remove_block(pos);
        let (coord, local) = pos.split();
        let chunk = chunk_entry(&mut self.chunks, &mut self.index, coord);
        chunk.insert(RenderableBlock::custom(pos, mesh));
        chunk.get_or_create(local)
    }

    /// Remove every block and light.
    pub fn clear(&mut self) {
        for chunk in &mut self.chunks {
            for mut block in chunk.drain() {
                let mut ctx = BlockContext {
                    registry: &self.registry,
                    lights: &mut self.lights,
                    textures: &mut self.textures,
                };
                block.release_resources(&mut ctx);
            }
        }
        self.chunks.clear();
        self.index.clear();
        self.lights.clear();
    }

    /// Advance block simulation by `dt` seconds.
    ///
    /// Unsupported blocks that fall move down one cell per tick; a block that
    /// moved this tick is not stepped again from its new cell.
    pub fn update(&mut self, dt: f32) {
        let mut candidates: Vec<WorldPos> = self
            .chunks
            .iter()
            .flat_map(Chunk::iter)
            .filter(|b| b.is_falling() || (b.is_solid() && self.registry.get(b.material()).gravity))
            .map(RenderableBlock::pos)
            .collect();
        candidates.sort_by_key(|p| (p.y, p.x, p.z));

        let mut moved_into = FxHashSet::default();
        for pos in candidates {
            if moved_into.contains(&pos) {
                continue;
            }
            if let Some(target) = self.step_fall(pos, dt) {
                moved_into.insert(target);
            }
        }
    }

    /// Visible blocks, chunk by chunk in creation order.
    pub fn render_blocks(&self) -> impl Iterator<Item = &RenderableBlock> {
        self.chunks
            .iter()
            .flat_map(Chunk::iter)
            .filter(|b| b.texture().is_some() || matches!(b.kind(), BlockKind::Custom(_)))
    }

    /// Apply one gravity step to the block at `pos`, returning the cell it moved to.
    ///
    /// The block drops by whole cells and stops above the first solid cell on
    /// the way down. A block at the bottom of the coordinate range stays put.
    fn step_fall(&mut self, pos: WorldPos, dt: f32) -> Option<WorldPos> {
        let block = self.get(pos)?;
        let resting = match pos.below() {
            Some(below) => self.is_solid_at(below),
            None => true,
        };
        if resting {
            if block.is_falling() {
                self.at(pos).set_velocity(0.0);
            }
            return None;
        }

        let velocity = block.next_fall_velocity(dt);
        let fall = (velocity.ceil() as i64).max(1);
        let lowest = pos.y.saturating_sub(fall);
        let mut target_y = pos.y;
        while target_y > lowest && !self.is_solid_at(WorldPos::new(pos.x, target_y - 1, pos.z)) {
            target_y -= 1;
        }
        if target_y == pos.y {
            self.at(pos).set_velocity(velocity);
            return None;
        }

        let target = WorldPos::new(pos.x, target_y, pos.z);
        self.move_block(pos, target);
        Some(target)
    }

    /// Move material and transform from one cell to another, emptying the source.
    fn move_block(&mut self, from: WorldPos, to: WorldPos) {
        let Some(original) = self.get(from) else {
            return;
        };
        let material = original.material();
        let transform = original.carry_transform_to(to);
        self.remove_block(from);

        self.at(to).set_transform(transform);
        self.set_material(to, material);
        self.at(to).set_velocity(0.0);
        tracing::trace!("block {:?} fell to {:?}", from, to);
    }

    /// Detach the block at `pos` from its chunk, updating the population count.
    fn take_block(&mut self, pos: WorldPos) -> Option<RenderableBlock> {
        let (coord, local) = pos.split();
        let &i = self.index.get(&coord)?;
        let chunk = &mut self.chunks[i];
        let block = chunk.take(local)?;
        chunk.track_population(block.is_solid(), false);
        if chunk.block_count() == 0 && chunk.stored_len() == 0 {
            self.drop_chunk(i);
        }
        Some(block)
    }

    /// Forget the empty chunk at position `i`, keeping creation order.
    fn drop_chunk(&mut self, i: usize) {
        let chunk = self.chunks.remove(i);
        self.index.remove(&chunk.coord());
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        tracing::debug!("dropped empty chunk {:?}", chunk.coord());
    }
}

/// Chunk at `coord`, created sparse if absent.
fn chunk_entry<'a>(
    chunks: &'a mut Vec<Chunk>,
    index: &mut FxHashMap<ChunkCoord, usize>,
    coord: ChunkCoord,
) -> &'a mut Chunk {
    let i = *index.entry(coord).or_insert_with(|| {
        chunks.push(Chunk::new(coord));
        tracing::debug!("created chunk {:?}", coord);
        chunks.len() - 1
    });
    &mut chunks[i]
}

/// Clear the light slot of a block whose light was evicted from the pool.
fn forget_light(chunks: &mut [Chunk], index: &FxHashMap<ChunkCoord, usize>, owner: LightOwner) {
    let (coord, local) = WorldPos::from_array(owner.block).split();
    if let Some(block) = index
        .get(&coord)
        .and_then(|&i| chunks[i].get_mut(local))
    {
        block.drop_light_slot();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::StorageKind;
    use crate::coords::CHUNK_SWITCH_COUNT;
    use blockview_lighting::{Light, MAX_LIGHTS};
    use glam::Vec3;

    fn world() -> World {
        World::new(Arc::new(BlockRegistry::with_defaults()))
    }

    #[test]
    fn test_set_then_remove_reads_air() {
        let mut world = world();
        let pos = WorldPos::new(0, 15, 0);
        world.set_material(pos, MaterialId::DEBUG);
        assert_eq!(world.at(pos).material(), MaterialId::DEBUG);

        world.remove_block(pos);
        assert_eq!(world.material_at(pos), MaterialId::AIR);
        let fresh = world.at(pos);
        assert!(!fresh.is_solid());
        assert!(fresh.aabb().is_none());
    }

    #[test]
    fn test_get_does_not_materialize() {
        let world = world();
        assert!(world.get(WorldPos::new(3, 3, 3)).is_none());
        assert!(world.chunks().is_empty());
    }

    #[test]
    fn test_at_creates_chunk_once() {
        let mut world = world();
        world.at(WorldPos::new(1, 1, 1));
        world.at(WorldPos::new(2, 2, 2));
        world.at(WorldPos::new(-1, 0, 0));
        assert_eq!(world.chunks().len(), 2);
        assert!(world.chunk(ChunkCoord::new(-1, 0, 0)).is_some());
    }

    #[test]
    fn test_negative_coordinates_resolve() {
        let mut world = world();
        let pos = WorldPos::new(-1, -17, -32);
        world.set_material(pos, MaterialId::STONE);
        let chunk = world.chunk(ChunkCoord::new(-1, -2, -2)).unwrap();
        assert_eq!(chunk.block_count(), 1);
        assert_eq!(world.get(pos).unwrap().pos(), pos);
    }

    #[test]
    fn test_world_switches_chunk_storage() {
        let mut world = world();
        for x in 0..16 {
            for z in 0..16 {
                world.set_material(WorldPos::new(x, 0, z), MaterialId::STONE);
            }
        }
        let coord = ChunkCoord::new(0, 0, 0);
        assert_eq!(world.chunk(coord).unwrap().block_count(), CHUNK_SWITCH_COUNT);
        assert_eq!(world.chunk(coord).unwrap().storage_kind(), StorageKind::Dense);

        world.set_material(WorldPos::new(7, 0, 7), MaterialId::AIR);
        assert_eq!(world.chunk(coord).unwrap().storage_kind(), StorageKind::Sparse);
        assert_eq!(world.material_at(WorldPos::new(8, 0, 7)), MaterialId::STONE);

        world.set_material(WorldPos::new(7, 0, 7), MaterialId::GRASS);
        assert_eq!(world.chunk(coord).unwrap().storage_kind(), StorageKind::Dense);
        world.remove_block(WorldPos::new(0, 0, 0));
        assert_eq!(world.chunk(coord).unwrap().storage_kind(), StorageKind::Sparse);
    }

    #[test]
    fn test_restating_material_keeps_count() {
        let mut world = world();
        let pos = WorldPos::new(4, 4, 4);
        world.set_material(pos, MaterialId::STONE);
        world.set_material(pos, MaterialId::GRASS);
        assert_eq!(world.block_count(), 1);
        assert_eq!(world.textures().ref_count(MaterialId::STONE), 0);
        assert_eq!(world.textures().ref_count(MaterialId::GRASS), 1);
    }

    #[test]
    fn test_glow_change_frees_light() {
        let mut world = world();
        let pos = WorldPos::new(1, 2, 3);
        world.set_material(pos, MaterialId::GLOWSTONE);
        assert_eq!(world.lights().active_count(), 1);
        let free_before = MAX_LIGHTS - world.lights().active_count();

        world.set_material(pos, MaterialId::STONE);
        assert_eq!(MAX_LIGHTS - world.lights().active_count(), free_before + 1);
        assert_eq!(world.lights().first_free_index(), 0);
    }

    #[test]
    fn test_remove_block_frees_light() {
        let mut world = world();
        let pos = WorldPos::new(0, 0, 0);
        world.set_material(pos, MaterialId::GLOWSTONE);
        world.remove_block(pos);
        assert_eq!(world.lights().active_count(), 0);
        assert_eq!(world.textures().live(), 0);
    }

    #[test]
    fn test_eviction_clears_evicted_block_slot() {
        let mut world = world();
        world.lights_mut().set_viewer(Vec3::ZERO);
        for i in 0..MAX_LIGHTS as i64 {
            world.set_material(WorldPos::new(100 + i, 0, 0), MaterialId::GLOWSTONE);
        }
        let farthest = WorldPos::new(100 + MAX_LIGHTS as i64 - 1, 0, 0);
        assert!(world.get(farthest).unwrap().light_slot().is_some());

        let near = WorldPos::new(1, 0, 0);
        world.set_material(near, MaterialId::GLOWSTONE);
        let slot = world.get(near).unwrap().light_slot().expect("closer block takes a slot");
        assert!(world.get(farthest).unwrap().light_slot().is_none());
        assert_eq!(world.lights().owner(slot).map(|o| o.block), Some([1, 0, 0]));
        assert_eq!(world.lights().active_count(), MAX_LIGHTS);
    }

    #[test]
    fn test_far_glow_in_full_pool_stays_unlit() {
        let mut world = world();
        for i in 0..MAX_LIGHTS as i64 {
            world.set_material(WorldPos::new(i, 0, 0), MaterialId::GLOWSTONE);
        }
        let far = WorldPos::new(10_000, 0, 0);
        world.set_material(far, MaterialId::GLOWSTONE);
        assert!(world.get(far).unwrap().light_slot().is_none());
        assert!(world.is_solid_at(far));
    }

    #[test]
    fn test_gravity_block_on_solid_does_not_move() {
        let mut world = world();
        world.set_material(WorldPos::new(0, 0, 0), MaterialId::STONE);
        world.set_material(WorldPos::new(0, 1, 0), MaterialId::SAND);
        world.update(1.0 / 60.0);
        assert_eq!(world.material_at(WorldPos::new(0, 1, 0)), MaterialId::SAND);
        assert_eq!(world.get(WorldPos::new(0, 1, 0)).unwrap().velocity(), 0.0);
        assert!(world.get(WorldPos::new(0, 1, 0)).unwrap().aabb().is_some());
    }

    #[test]
    fn test_gravity_block_settles_on_floor() {
        let mut world = world();
        let floor = WorldPos::new(5, 0, 5);
        let start = WorldPos::new(5, 10, 5);
        world.set_material(floor, MaterialId::STONE);
        world.set_material(start, MaterialId::SAND);

        for _ in 0..20 {
            world.update(1.0 / 60.0);
        }
        assert_eq!(world.material_at(start), MaterialId::AIR);
        assert_eq!(world.material_at(WorldPos::new(5, 1, 5)), MaterialId::SAND);
        assert_eq!(world.material_at(floor), MaterialId::STONE);
        assert_eq!(world.block_count(), 2);
        for y in 2..=10 {
            assert!(!world.is_solid_at(WorldPos::new(5, y, 5)), "y = {y}");
        }
    }

    #[test]
    fn test_falling_column_stacks() {
        let mut world = world();
        world.set_material(WorldPos::new(0, 0, 0), MaterialId::STONE);
        world.set_material(WorldPos::new(0, 5, 0), MaterialId::SAND);
        world.set_material(WorldPos::new(0, 6, 0), MaterialId::SAND);
        for _ in 0..20 {
            world.update(1.0 / 60.0);
        }
        assert_eq!(world.material_at(WorldPos::new(0, 1, 0)), MaterialId::SAND);
        assert_eq!(world.material_at(WorldPos::new(0, 2, 0)), MaterialId::SAND);
        assert_eq!(world.block_count(), 3);
    }

    #[test]
    fn test_block_moves_one_cell_per_tick() {
        let mut world = world();
        world.set_material(WorldPos::new(0, 20, 0), MaterialId::SAND);
        world.update(1.0 / 60.0);
        assert!(world.is_solid_at(WorldPos::new(0, 19, 0)));
        assert!(!world.is_solid_at(WorldPos::new(0, 20, 0)));
    }

    #[test]
    fn test_falling_block_crosses_chunk_boundary() {
        let mut world = world();
        world.set_material(WorldPos::new(3, -1, 3), MaterialId::STONE);
        world.set_material(WorldPos::new(3, 1, 3), MaterialId::SAND);
        world.update(1.0 / 60.0);
        assert_eq!(world.material_at(WorldPos::new(3, 0, 3)), MaterialId::SAND);
        assert_eq!(world.chunk(ChunkCoord::new(0, 0, 0)).unwrap().block_count(), 1);
        assert_eq!(world.chunk(ChunkCoord::new(0, -1, 0)).unwrap().block_count(), 1);
    }

    #[test]
    fn test_falling_block_stops_on_floor_at_large_height() {
        let mut world = world();
        let base = 1_i64 << 60;
        world.set_material(WorldPos::new(0, base + 50, 0), MaterialId::STONE);
        world.set_material(WorldPos::new(0, base + 100, 0), MaterialId::SAND);
        world.update(1.0 / 60.0);
        assert!(world.is_solid_at(WorldPos::new(0, base + 99, 0)));

        for _ in 0..60 {
            world.update(1.0 / 60.0);
        }
        assert_eq!(
            world.material_at(WorldPos::new(0, base + 51, 0)),
            MaterialId::SAND
        );
        assert_eq!(world.block_count(), 2);
        assert!(!world.is_solid_at(WorldPos::new(0, base, 0)));
    }

    #[test]
    fn test_block_at_bottom_of_range_stays() {
        let mut world = world();
        let bottom = WorldPos::new(0, i64::MIN, 0);
        let above = WorldPos::new(3, i64::MIN + 1, 3);
        world.set_material(bottom, MaterialId::SAND);
        world.set_material(above, MaterialId::SAND);

        world.update(1.0 / 60.0);
        world.update(1.0 / 60.0);
        assert_eq!(world.material_at(bottom), MaterialId::SAND);
        assert_eq!(world.get(bottom).unwrap().velocity(), 0.0);
        assert_eq!(
            world.material_at(WorldPos::new(3, i64::MIN, 3)),
            MaterialId::SAND
        );
        assert_eq!(world.material_at(above), MaterialId::AIR);
    }

    #[test]
    fn test_emptied_chunk_is_dropped() {
        let mut world = world();
        let a = WorldPos::new(0, 0, 0);
        let b = WorldPos::new(40, 0, 0);
        let c = WorldPos::new(80, 0, 0);
        for pos in [a, b, c] {
            world.set_material(pos, MaterialId::STONE);
        }
        world.remove_block(b);

        assert_eq!(world.chunks().len(), 2);
        assert!(world.chunk(ChunkCoord::new(2, 0, 0)).is_none());
        assert_eq!(world.material_at(c), MaterialId::STONE);
        world.set_material(c.offset(0, 1, 0), MaterialId::STONE);
        assert_eq!(world.chunk(ChunkCoord::new(5, 0, 0)).unwrap().block_count(), 2);
        let order: Vec<ChunkCoord> = world.chunks().iter().map(Chunk::coord).collect();
        assert_eq!(order, vec![ChunkCoord::new(0, 0, 0), ChunkCoord::new(5, 0, 0)]);
    }

    #[test]
    fn test_long_fall_keeps_chunk_count_bounded() {
        let mut world = world();
        world.set_material(WorldPos::new(0, 100, 0), MaterialId::SAND);
        for _ in 0..80 {
            world.update(1.0 / 60.0);
        }
        assert!(world.is_solid_at(WorldPos::new(0, 20, 0)));
        assert_eq!(world.chunks().len(), 1);
    }

    #[test]
    fn test_non_gravity_block_stays() {
        let mut world = world();
        world.set_material(WorldPos::new(0, 10, 0), MaterialId::STONE);
        world.update(1.0 / 60.0);
        assert!(world.is_solid_at(WorldPos::new(0, 10, 0)));
    }

    #[test]
    fn test_custom_block_replaces_occupant() {
        let mut world = world();
        let pos = WorldPos::new(2, 2, 2);
        world.set_material(pos, MaterialId::GLOWSTONE);
        world.place_custom_block(
            pos,
            CustomMesh {
                name: "lamp".to_string(),
            },
        );
        assert_eq!(world.lights().active_count(), 0);
        assert_eq!(world.block_count(), 0);
        assert!(world.render_blocks().any(|b| b.pos() == pos));
    }

    #[test]
    fn test_render_blocks_skips_air() {
        let mut world = world();
        world.at(WorldPos::new(0, 0, 0));
        world.set_material(WorldPos::new(1, 0, 0), MaterialId::STONE);
        world.set_material(WorldPos::new(40, 0, 0), MaterialId::GRASS);
        let drawn: Vec<WorldPos> = world.render_blocks().map(RenderableBlock::pos).collect();
        assert_eq!(drawn, vec![WorldPos::new(1, 0, 0), WorldPos::new(40, 0, 0)]);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut world = world();
        world
            .lights_mut()
            .add(Light::environment(Vec3::ONE, 0.25), None);
        world.set_material(WorldPos::new(0, 0, 0), MaterialId::GLOWSTONE);
        world.set_material(WorldPos::new(0, 1, 0), MaterialId::STONE);
        world.clear();
        assert!(world.chunks().is_empty());
        assert_eq!(world.lights().active_count(), 0);
        assert_eq!(world.textures().live(), 0);
        assert_eq!(world.block_count(), 0);
    }
}
