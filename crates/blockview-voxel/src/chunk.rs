//! 16³ block container with two storage representations.
//!
//! A chunk starts sparse (a map of occupied slots) and switches to a dense slot
//! array once its population of solid blocks reaches [`CHUNK_SWITCH_COUNT`],
//! switching back when it drops below. Block values move between the two
//! representations unchanged.

use rustc_hash::FxHashMap;

use crate::block::RenderableBlock;
use crate::coords::{CHUNK_SWITCH_COUNT, CHUNK_VOLUME, ChunkCoord, LocalPos};

/// Which representation a chunk currently uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Sparse,
    Dense,
}

#[derive(Clone, Debug)]
enum Storage {
    Sparse(FxHashMap<LocalPos, RenderableBlock>),
    Dense(Box<[Option<RenderableBlock>]>),
}

/// A cube of [`CHUNK_VOLUME`] block slots.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    storage: Storage,
    /// Stored blocks whose material is not air.
    block_count: usize,
}

impl Chunk {
    /// Empty sparse chunk.
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            storage: Storage::Sparse(FxHashMap::default()),
            block_count: 0,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn storage_kind(&self) -> StorageKind {
        match self.storage {
            Storage::Sparse(_) => StorageKind::Sparse,
            Storage::Dense(_) => StorageKind::Dense,
        }
    }

    /// Number of solid blocks, as reported through [`track_population`](Self::track_population).
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of stored block entities, air included.
    pub fn stored_len(&self) -> usize {
        match &self.storage {
            Storage::Sparse(map) => map.len(),
            Storage::Dense(slots) => slots.iter().filter(|s| s.is_some()).count(),
        }
    }

    /// Block at `local` without materializing it.
    pub fn get(&self, local: LocalPos) -> Option<&RenderableBlock> {
        match &self.storage {
            Storage::Sparse(map) => map.get(&local),
            Storage::Dense(slots) => slots[local.index()].as_ref(),
        }
    }

    pub fn get_mut(&mut self, local: LocalPos) -> Option<&mut RenderableBlock> {
        match &mut self.storage {
            Storage::Sparse(map) => map.get_mut(&local),
            Storage::Dense(slots) => slots[local.index()].as_mut(),
        }
    }

    /// Block at `local`, creating a default air block if the slot is empty.
    pub fn get_or_create(&mut self, local: LocalPos) -> &mut RenderableBlock {
        let pos = self.coord.world_pos(local);
        match &mut self.storage {
            Storage::Sparse(map) => map
                .entry(local)
                .or_insert_with(|| RenderableBlock::air(pos)),
            Storage::Dense(slots) => {
                slots[local.index()].get_or_insert_with(|| RenderableBlock::air(pos))
            }
        }
    }

    /// Store `block` in the slot matching its position, returning the previous occupant.
    pub fn insert(&mut self, block: RenderableBlock) -> Option<RenderableBlock> {
        let (coord, local) = block.pos().split();
        debug_assert_eq!(coord, self.coord, "block stored in the wrong chunk");
        match &mut self.storage {
            Storage::Sparse(map) => map.insert(local, block),
            Storage::Dense(slots) => slots[local.index()].replace(block),
        }
    }

    /// Remove and return the block at `local`.
    pub fn take(&mut self, local: LocalPos) -> Option<RenderableBlock> {
        match &mut self.storage {
            Storage::Sparse(map) => map.remove(&local),
            Storage::Dense(slots) => slots[local.index()].take(),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &RenderableBlock> + '_> {
        match &self.storage {
            Storage::Sparse(map) => Box::new(map.values()),
            Storage::Dense(slots) => Box::new(slots.iter().flatten()),
        }
    }

    pub fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut RenderableBlock> + '_> {
        match &mut self.storage {
            Storage::Sparse(map) => Box::new(map.values_mut()),
            Storage::Dense(slots) => Box::new(slots.iter_mut().flatten()),
        }
    }

    /// Remove every block, leaving an empty sparse chunk.
    pub fn drain(&mut self) -> Vec<RenderableBlock> {
        let storage = std::mem::replace(&mut self.storage, Storage::Sparse(FxHashMap::default()));
        self.block_count = 0;
        match storage {
            Storage::Sparse(map) => map.into_values().collect(),
            Storage::Dense(slots) => slots.into_vec().into_iter().flatten().collect(),
        }
    }

    /// Record the solidity of a slot before and after a write, switching storage
    /// when the population crosses [`CHUNK_SWITCH_COUNT`].
    pub fn track_population(&mut self, was_solid: bool, is_solid: bool) {
        match (was_solid, is_solid) {
            (false, true) => self.block_count += 1,
            (true, false) => self.block_count -= 1,
            _ => return,
        }
        self.transition();
    }

    /// Move every block into the representation matching the current count.
    fn transition(&mut self) {
        let target = if self.block_count >= CHUNK_SWITCH_COUNT {
            StorageKind::Dense
        } else {
            StorageKind::Sparse
        };
        if target == self.storage_kind() {
            return;
        }
        debug_assert_eq!(
            self.block_count,
            self.iter().filter(|b| b.is_solid()).count(),
            "chunk population out of sync with stored blocks"
        );

        let old = std::mem::replace(&mut self.storage, Storage::Sparse(FxHashMap::default()));
        self.storage = match old {
            Storage::Sparse(map) => {
                let mut slots: Box<[Option<RenderableBlock>]> =
                    std::iter::repeat_with(|| None).take(CHUNK_VOLUME).collect();
                for (local, block) in map {
                    slots[local.index()] = Some(block);
                }
                Storage::Dense(slots)
            }
            Storage::Dense(slots) => {
                let mut map = FxHashMap::default();
                for (index, slot) in slots.into_vec().into_iter().enumerate() {
                    if let Some(block) = slot {
                        map.insert(LocalPos::from_index(index), block);
                    }
                }
                Storage::Sparse(map)
            }
        };
        tracing::debug!(
            "chunk {:?} switched to {:?} at {} blocks",
            self.coord,
            target,
            self.block_count
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockContext;
    use crate::coords::WorldPos;
    use crate::registry::{BlockRegistry, MaterialId};
    use crate::texture::TextureCache;
    use blockview_lighting::LightPool;
    use glam::Vec3;

    /// Fill slots `range` of chunk (0,0,0) with stone, tracking population as the world does.
    fn fill(chunk: &mut Chunk, range: std::ops::Range<usize>) {
        let registry = BlockRegistry::with_defaults();
        let mut lights = LightPool::new();
        let mut textures = TextureCache::new();
        let mut ctx = BlockContext {
            registry: &registry,
            lights: &mut lights,
            textures: &mut textures,
        };
        for index in range {
            let local = LocalPos::from_index(index);
            let block = chunk.get_or_create(local);
            block.assign_material(MaterialId::STONE, &mut ctx);
            block.set_rotation(Vec3::new(index as f32 * 0.01, 0.0, 0.0));
            chunk.track_population(false, true);
        }
    }

    #[test]
    fn test_new_chunk_is_sparse_and_empty() {
        let chunk = Chunk::new(ChunkCoord::new(1, -2, 3));
        assert_eq!(chunk.storage_kind(), StorageKind::Sparse);
        assert_eq!(chunk.block_count(), 0);
        assert!(chunk.get(LocalPos::new(0, 0, 0)).is_none());
    }

    #[test]
    fn test_get_or_create_materializes_air() {
        let coord = ChunkCoord::new(-1, 0, 0);
        let mut chunk = Chunk::new(coord);
        let local = LocalPos::new(15, 3, 2);
        let block = chunk.get_or_create(local);
        assert!(!block.is_solid());
        assert_eq!(block.pos(), WorldPos::new(-1, 3, 2));
        assert_eq!(chunk.stored_len(), 1);
        assert_eq!(chunk.block_count(), 0);
    }

    #[test]
    fn test_switch_to_dense_at_threshold() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        fill(&mut chunk, 0..CHUNK_SWITCH_COUNT - 1);
        assert_eq!(chunk.storage_kind(), StorageKind::Sparse);
        fill(&mut chunk, CHUNK_SWITCH_COUNT - 1..CHUNK_SWITCH_COUNT);
        assert_eq!(chunk.storage_kind(), StorageKind::Dense);
        assert_eq!(chunk.block_count(), CHUNK_SWITCH_COUNT);
    }

    #[test]
    fn test_transition_preserves_blocks_both_ways() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        fill(&mut chunk, 0..CHUNK_SWITCH_COUNT - 1);
        let before: Vec<RenderableBlock> = (0..CHUNK_SWITCH_COUNT - 1)
            .map(|i| chunk.get(LocalPos::from_index(i)).unwrap().clone())
            .collect();

        fill(&mut chunk, CHUNK_SWITCH_COUNT - 1..CHUNK_SWITCH_COUNT);
        assert_eq!(chunk.storage_kind(), StorageKind::Dense);
        for (i, block) in before.iter().enumerate() {
            assert_eq!(chunk.get(LocalPos::from_index(i)), Some(block));
        }

        let last = LocalPos::from_index(CHUNK_SWITCH_COUNT - 1);
        chunk.take(last);
        chunk.track_population(true, false);
        assert_eq!(chunk.storage_kind(), StorageKind::Sparse);
        assert_eq!(chunk.stored_len(), CHUNK_SWITCH_COUNT - 1);
        for (i, block) in before.iter().enumerate() {
            assert_eq!(chunk.get(LocalPos::from_index(i)), Some(block));
        }
    }

    #[test]
    fn test_air_entries_do_not_count() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        for index in 0..CHUNK_SWITCH_COUNT + 10 {
            chunk.get_or_create(LocalPos::from_index(index));
        }
        assert_eq!(chunk.storage_kind(), StorageKind::Sparse);
        assert_eq!(chunk.stored_len(), CHUNK_SWITCH_COUNT + 10);
    }

    #[test]
    fn test_unchanged_solidity_is_ignored() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        chunk.track_population(false, false);
        chunk.track_population(true, true);
        assert_eq!(chunk.block_count(), 0);
    }

    #[test]
    fn test_drain_empties_dense_chunk() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        fill(&mut chunk, 0..CHUNK_SWITCH_COUNT + 4);
        assert_eq!(chunk.storage_kind(), StorageKind::Dense);
        let blocks = chunk.drain();
        assert_eq!(blocks.len(), CHUNK_SWITCH_COUNT + 4);
        assert_eq!(chunk.storage_kind(), StorageKind::Sparse);
        assert_eq!(chunk.block_count(), 0);
        assert_eq!(chunk.iter().count(), 0);
    }

    #[test]
    fn test_iter_mut_reaches_every_block() {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 0));
        fill(&mut chunk, 0..CHUNK_SWITCH_COUNT);
        let mut n = 0;
        for block in chunk.iter_mut() {
            block.translate(Vec3::Y);
            n += 1;
        }
        assert_eq!(n, CHUNK_SWITCH_COUNT);
    }
}
