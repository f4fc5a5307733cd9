//! World, chunk, and chunk-local block coordinates.
//!
//! World coordinates are unbounded `i64` triples. Chunk coordinates use floored
//! division so that negative blocks land in negative chunks, and local
//! coordinates use the matching floored remainder, always in `0..CHUNK_SIZE`.

use glam::Vec3;

/// Side length of a chunk in blocks.
pub const CHUNK_SIZE: i64 = 16;

/// Number of block slots in a chunk (16³).
pub const CHUNK_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Population at which a chunk switches from sparse to dense storage (one Y-slice).
pub const CHUNK_SWITCH_COUNT: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Position of a single block in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl WorldPos {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// The block directly beneath this one, or `None` at the bottom of the
    /// coordinate range.
    pub fn below(self) -> Option<Self> {
        Some(Self::new(self.x, self.y.checked_sub(1)?, self.z))
    }

    /// Offset position, saturating at the edges of the coordinate range.
    pub fn offset(self, dx: i64, dy: i64, dz: i64) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    /// Chunk containing this block and the block's slot inside it.
    pub fn split(self) -> (ChunkCoord, LocalPos) {
        (
            ChunkCoord::new(
                self.x.div_euclid(CHUNK_SIZE),
                self.y.div_euclid(CHUNK_SIZE),
                self.z.div_euclid(CHUNK_SIZE),
            ),
            LocalPos::new(
                self.x.rem_euclid(CHUNK_SIZE) as u8,
                self.y.rem_euclid(CHUNK_SIZE) as u8,
                self.z.rem_euclid(CHUNK_SIZE) as u8,
            ),
        )
    }

    /// Block coordinates as a float vector (the unit cube's center).
    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    pub fn to_array(self) -> [i64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array([x, y, z]: [i64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<(i64, i64, i64)> for WorldPos {
    fn from((x, y, z): (i64, i64, i64)) -> Self {
        Self::new(x, y, z)
    }
}

/// Chunk-grid coordinates (world coordinates floor-divided by [`CHUNK_SIZE`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl ChunkCoord {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// World position of a slot in this chunk.
    pub fn world_pos(self, local: LocalPos) -> WorldPos {
        WorldPos::new(
            self.x * CHUNK_SIZE + local.x as i64,
            self.y * CHUNK_SIZE + local.y as i64,
            self.z * CHUNK_SIZE + local.z as i64,
        )
    }
}

/// Slot inside a chunk; each axis is in `0..CHUNK_SIZE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPos {
    pub fn new(x: u8, y: u8, z: u8) -> Self {
        debug_assert!(
            (x as i64) < CHUNK_SIZE && (y as i64) < CHUNK_SIZE && (z as i64) < CHUNK_SIZE
        );
        Self { x, y, z }
    }

    /// Row-major index into a dense slot array (x fastest, then z, then y).
    pub fn index(self) -> usize {
        let n = CHUNK_SIZE as usize;
        self.x as usize + self.z as usize * n + self.y as usize * n * n
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize) -> Self {
        let n = CHUNK_SIZE as usize;
        Self::new(
            (index % n) as u8,
            (index / (n * n)) as u8,
            ((index / n) % n) as u8,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_one_maps_to_previous_chunk() {
        let (chunk, local) = WorldPos::new(-1, -1, -1).split();
        assert_eq!(chunk, ChunkCoord::new(-1, -1, -1));
        assert_eq!(local, LocalPos::new(15, 15, 15));
    }

    #[test]
    fn test_floor_division_invariant() {
        for v in -100i64..100 {
            let (chunk, local) = WorldPos::new(v, 0, 0).split();
            assert_eq!(chunk.x, (v as f64 / CHUNK_SIZE as f64).floor() as i64);
            assert!((local.x as i64) < CHUNK_SIZE);
            assert_eq!(v - CHUNK_SIZE * chunk.x, local.x as i64);
        }
    }

    #[test]
    fn test_chunk_boundaries() {
        assert_eq!(WorldPos::new(15, 16, -16).split().0, ChunkCoord::new(0, 1, -1));
        assert_eq!(WorldPos::new(-17, 0, 0).split(), (ChunkCoord::new(-2, 0, 0), LocalPos::new(15, 0, 0)));
    }

    #[test]
    fn test_split_then_world_pos_roundtrips() {
        for pos in [
            WorldPos::new(0, 15, 0),
            WorldPos::new(-33, 7, 1_000_000),
            WorldPos::new(i64::MIN / 2, -1, 16),
        ] {
            let (chunk, local) = pos.split();
            assert_eq!(chunk.world_pos(local), pos);
        }
    }

    #[test]
    fn test_local_index_covers_volume() {
        let mut seen = vec![false; CHUNK_VOLUME];
        for y in 0..16u8 {
            for z in 0..16u8 {
                for x in 0..16u8 {
                    let local = LocalPos::new(x, y, z);
                    let index = local.index();
                    assert!(!seen[index], "index {index} produced twice");
                    seen[index] = true;
                    assert_eq!(LocalPos::from_index(index), local);
                }
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_below_and_offset_at_range_edges() {
        let bottom = WorldPos::new(0, i64::MIN, 0);
        assert_eq!(bottom.below(), None);
        assert_eq!(
            WorldPos::new(1, 5, 1).below(),
            Some(WorldPos::new(1, 4, 1))
        );
        assert_eq!(bottom.offset(0, -3, 0), bottom);
        assert_eq!(
            WorldPos::new(i64::MAX, 0, 0).offset(1, 2, -2),
            WorldPos::new(i64::MAX, 2, -2)
        );
    }

    #[test]
    fn test_switch_count_is_one_slice() {
        assert_eq!(CHUNK_SWITCH_COUNT, 256);
        assert_eq!(CHUNK_VOLUME, 4096);
    }
}
