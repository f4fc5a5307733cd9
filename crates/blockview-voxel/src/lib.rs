//! Block world storage: registry, coordinates, sparse/dense chunks, per-block
//! entities with light and texture bookkeeping, and binary snapshots.

pub mod block;
pub mod chunk;
pub mod coords;
pub mod registry;
pub mod snapshot;
pub mod texture;
pub mod world;

pub use block::{Aabb, BlockKind, CustomMesh, FALL_CAP, FALL_START, GRAVITY, RenderableBlock, Transform};
pub use chunk::{Chunk, StorageKind};
pub use coords::{CHUNK_SIZE, CHUNK_SWITCH_COUNT, CHUNK_VOLUME, ChunkCoord, LocalPos, WorldPos};
pub use registry::{BlockInfo, BlockRegistry, GlowInfo, MaterialId, RegistryError};
pub use snapshot::{BlockRecord, SnapshotError, SnapshotReader, SnapshotWriter};
pub use texture::{
    DEFAULT_TEXTURE_SIZE, TextureCache, TextureError, TextureHandle, TextureRole, TextureSet,
    TextureSource,
};
pub use world::World;
