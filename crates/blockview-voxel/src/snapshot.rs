//! Binary snapshots of world state.
//!
//! ## Layout
//!
//! All values are little-endian. A world section is a light collection followed
//! by a block collection; each collection is an `i32` count and that many records.
//!
//! Light record (52 bytes):
//!
//! | Size | Field |
//! |------|-------|
//! | 12 | position (3 × `f32`) |
//! | 12 | direction (3 × `f32`) |
//! | 16 | color R, G, B and intensity as A (4 × `f32`) |
//! | 4 | exponent (`f32`) |
//! | 4 | falloff (`f32`) |
//! | 4 | mode (`i32`: Ambient 0, Point 1, Spot 2, Directional 3) |
//!
//! Block record (81 or 105 bytes):
//!
//! | Size | Field |
//! |------|-------|
//! | 24 | world coordinates (3 × `i64`) |
//! | 4 | material id (`i32`) |
//! | 4 | fall velocity (`f32`) |
//! | 48 | position, direction, rotation, scale (4 × 3 × `f32`) |
//! | 1 | `0xFF` if a bounding box follows, `0x00` otherwise |
//! | 24 | box min and max (2 × 3 × `f32`), only after `0xFF` |
//!
//! Only lights without an owning block are written; block lights are recreated
//! from materials on load. Custom-mesh blocks are not persisted.
//!
//! A finished stream may be gzip-wrapped; [`decode`] detects the wrapper by its
//! magic bytes.

use std::io::{Read, Write};

use blockview_lighting::{Light, LightMode};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use glam::Vec3;
use thiserror::Error;

use crate::block::{Aabb, BlockKind, RenderableBlock, Transform};
use crate::coords::WorldPos;
use crate::registry::MaterialId;
use crate::world::World;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const AABB_PRESENT: u8 = 0xFF;
const AABB_ABSENT: u8 = 0x00;

/// Size of one light record in bytes.
pub const LIGHT_RECORD_LEN: usize = 52;
/// Size of a block record without a bounding box.
pub const BLOCK_RECORD_MIN_LEN: usize = 81;

/// Errors that can occur while reading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("negative record count: {0}")]
    NegativeCount(i32),
    #[error("invalid bounding box marker: {0:#04x}")]
    InvalidMarker(u8),
    #[error("invalid light mode: {0}")]
    InvalidLightMode(i32),
    #[error("invalid {field}: {value}")]
    InvalidEnum { field: &'static str, value: i32 },
    #[error("unknown material id: {0}")]
    UnknownMaterial(i32),
    #[error("{0} unread bytes after the last record")]
    TrailingBytes(usize),
    #[error("compression error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Primitive IO
// ---------------------------------------------------------------------------

/// Append-only little-endian byte sink.
#[derive(Debug, Default)]
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_vec3(&mut self, v: Vec3) {
        for c in v.to_array() {
            self.put_f32(c);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a snapshot byte slice.
#[derive(Debug)]
pub struct SnapshotReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SnapshotReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], SnapshotError> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(SnapshotError::Truncated {
                expected: end,
                actual: self.data.len(),
            })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, SnapshotError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn bool(&mut self) -> Result<bool, SnapshotError> {
        Ok(self.u8()? != 0)
    }

    pub fn i32(&mut self) -> Result<i32, SnapshotError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn i64(&mut self) -> Result<i64, SnapshotError> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    pub fn f32(&mut self) -> Result<f32, SnapshotError> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    pub fn vec3(&mut self) -> Result<Vec3, SnapshotError> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    /// Read a collection count, rejecting counts the remaining bytes cannot hold.
    pub fn count(&mut self, min_record_len: usize) -> Result<usize, SnapshotError> {
        let raw = self.i32()?;
        let count = usize::try_from(raw).map_err(|_| SnapshotError::NegativeCount(raw))?;
        let needed = count.saturating_mul(min_record_len);
        if needed > self.remaining() {
            return Err(SnapshotError::Truncated {
                expected: self.pos + needed,
                actual: self.data.len(),
            });
        }
        Ok(count)
    }

    /// Fail if any bytes are left.
    pub fn finish(self) -> Result<(), SnapshotError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(SnapshotError::TrailingBytes(n)),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

pub fn write_light(w: &mut SnapshotWriter, light: &Light) {
    w.put_vec3(light.position);
    w.put_vec3(light.direction);
    w.put_vec3(light.color);
    w.put_f32(light.intensity);
    w.put_f32(light.exponent);
    w.put_f32(light.falloff);
    w.put_i32(light.mode as i32);
}

pub fn read_light(r: &mut SnapshotReader<'_>) -> Result<Light, SnapshotError> {
    let position = r.vec3()?;
    let direction = r.vec3()?;
    let color = r.vec3()?;
    let intensity = r.f32()?;
    let exponent = r.f32()?;
    let falloff = r.f32()?;
    let raw_mode = r.i32()?;
    let mode = LightMode::from_raw(raw_mode).ok_or(SnapshotError::InvalidLightMode(raw_mode))?;
    Ok(Light {
        position,
        direction,
        color,
        intensity,
        exponent,
        falloff,
        mode,
    })
}

/// Persisted state of one block.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockRecord {
    pub pos: WorldPos,
    pub material: MaterialId,
    pub velocity: f32,
    pub transform: Transform,
    pub aabb: Option<Aabb>,
}

impl BlockRecord {
    pub fn of(block: &RenderableBlock) -> Self {
        Self {
            pos: block.pos(),
            material: block.material(),
            velocity: block.velocity(),
            transform: *block.transform(),
            aabb: block.aabb().copied(),
        }
    }

    pub fn write(&self, w: &mut SnapshotWriter) {
        w.put_i64(self.pos.x);
        w.put_i64(self.pos.y);
        w.put_i64(self.pos.z);
        w.put_i32(self.material.0 as i32);
        w.put_f32(self.velocity);
        w.put_vec3(self.transform.position);
        w.put_vec3(self.transform.direction);
        w.put_vec3(self.transform.rotation);
        w.put_vec3(self.transform.scale);
        match self.aabb {
            Some(aabb) => {
                w.put_u8(AABB_PRESENT);
                w.put_vec3(aabb.min);
                w.put_vec3(aabb.max);
            }
            None => w.put_u8(AABB_ABSENT),
        }
    }

    pub fn read(r: &mut SnapshotReader<'_>) -> Result<Self, SnapshotError> {
        let pos = WorldPos::new(r.i64()?, r.i64()?, r.i64()?);
        let raw_material = r.i32()?;
        let material = u32::try_from(raw_material)
            .map(MaterialId)
            .map_err(|_| SnapshotError::UnknownMaterial(raw_material))?;
        let velocity = r.f32()?;
        let transform = Transform {
            position: r.vec3()?,
            direction: r.vec3()?,
            rotation: r.vec3()?,
            scale: r.vec3()?,
        };
        let aabb = match r.u8()? {
            AABB_PRESENT => Some(Aabb {
                min: r.vec3()?,
                max: r.vec3()?,
            }),
            AABB_ABSENT => None,
            other => return Err(SnapshotError::InvalidMarker(other)),
        };
        Ok(Self {
            pos,
            material,
            velocity,
            transform,
            aabb,
        })
    }
}

// ---------------------------------------------------------------------------
// World sections
// ---------------------------------------------------------------------------

impl World {
    /// Append the unowned lights and all solid cube blocks.
    pub fn write_snapshot(&self, w: &mut SnapshotWriter) {
        let lights: Vec<&Light> = self.lights().unowned().collect();
        w.put_i32(lights.len() as i32);
        for light in lights {
            write_light(w, light);
        }

        let blocks: Vec<BlockRecord> = self
            .chunks()
            .iter()
            .flat_map(|c| c.iter())
            .filter(|b| b.is_solid() && matches!(b.kind(), BlockKind::Cube))
            .map(BlockRecord::of)
            .collect();
        w.put_i32(blocks.len() as i32);
        for record in &blocks {
            record.write(w);
        }
    }

    /// Replace the world's contents with a section read from `r`.
    ///
    /// The whole section is parsed and checked before the world is touched, so
    /// a failed read leaves the current contents in place.
    pub fn read_snapshot(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        let light_count = r.count(LIGHT_RECORD_LEN)?;
        let mut lights = Vec::with_capacity(light_count);
        for _ in 0..light_count {
            lights.push(read_light(r)?);
        }

        let block_count = r.count(BLOCK_RECORD_MIN_LEN)?;
        let mut blocks = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            let record = BlockRecord::read(r)?;
            if !self.registry().contains(record.material) {
                return Err(SnapshotError::UnknownMaterial(record.material.0 as i32));
            }
            blocks.push(record);
        }

        self.clear();
        for light in lights {
            if self.lights_mut().add(light, None).is_none() {
                tracing::warn!("snapshot holds more lights than the pool; extra lights dropped");
                break;
            }
        }
        for record in &blocks {
            self.at(record.pos).restore(record.transform, 0.0, None);
            self.set_material(record.pos, record.material);
            self.at(record.pos)
                .restore(record.transform, record.velocity, record.aabb);
        }
        tracing::info!(
            "loaded snapshot: {} lights, {} blocks",
            self.lights().active_count(),
            blocks.len()
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Finish a snapshot stream, gzip-wrapping it if `compress` is set.
pub fn encode(payload: Vec<u8>, compress: bool) -> Result<Vec<u8>, SnapshotError> {
    if !compress {
        return Ok(payload);
    }
    let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::default());
    encoder.write_all(&payload)?;
    Ok(encoder.finish()?)
}

/// Raw snapshot bytes, unwrapping gzip if present.
pub fn decode(bytes: &[u8]) -> Result<Vec<u8>, SnapshotError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
