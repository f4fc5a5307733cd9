//! Scene snapshots on disk.
//!
//! A scene snapshot is the camera record followed by the world section
//! (lights, then blocks), optionally gzip-wrapped. Loading parses into a fresh
//! world and only replaces the scene once the whole stream has been read.

use std::path::Path;

use blockview_render::PlayerCamera;
use blockview_voxel::snapshot::{decode, encode};
use blockview_voxel::{SnapshotError, SnapshotReader, SnapshotWriter, World};

use crate::error::AppError;
use crate::scene::Scene;

/// Serialize the scene's camera and world.
pub fn encode_scene(scene: &Scene, compress: bool) -> Result<Vec<u8>, SnapshotError> {
    let mut w = SnapshotWriter::new();
    scene.camera().write(&mut w);
    scene.world().write_snapshot(&mut w);
    encode(w.into_bytes(), compress)
}

/// Replace the scene's camera and world with the contents of `bytes`.
///
/// On error the scene is left untouched.
pub fn decode_scene(scene: &mut Scene, bytes: &[u8]) -> Result<(), SnapshotError> {
    let raw = decode(bytes)?;
    let mut r = SnapshotReader::new(&raw);
    let camera = PlayerCamera::read(&mut r)?;
    let mut world = World::new(scene.world().registry().clone());
    world.read_snapshot(&mut r)?;
    r.finish()?;
    scene.replace(world, camera);
    Ok(())
}

/// Write a snapshot of `scene` to `path`, returning the number of bytes written.
pub fn save_snapshot(scene: &Scene, path: &Path, compress: bool) -> Result<usize, AppError> {
    let bytes = encode_scene(scene, compress).map_err(|source| AppError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| AppError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, &bytes).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        "saved snapshot to {} ({} bytes, compressed: {compress})",
        path.display(),
        bytes.len()
    );
    Ok(bytes.len())
}

/// Load the snapshot at `path` into `scene`.
pub fn load_snapshot(scene: &mut Scene, path: &Path) -> Result<(), AppError> {
    let bytes = std::fs::read(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_scene(scene, &bytes).map_err(|source| AppError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        "loaded snapshot from {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_config::RenderConfig;
    use blockview_voxel::{BlockRegistry, MaterialId, WorldPos};
    use glam::Vec3;
    use std::sync::Arc;

    fn demo_scene() -> Scene {
        let mut scene = Scene::new(
            Arc::new(BlockRegistry::with_defaults()),
            &RenderConfig::default(),
        );
        scene.populate();
        scene
    }

    fn empty_scene() -> Scene {
        Scene::new(
            Arc::new(BlockRegistry::with_defaults()),
            &RenderConfig::default(),
        )
    }

    #[test]
    fn test_scene_round_trip_restores_world_and_camera() {
        let mut original = demo_scene();
        original.world_mut().set_material(WorldPos::new(3, 4, 5), MaterialId::GLOWSTONE);
        original.camera_mut().move_to(Vec3::new(2.0, 3.0, 4.0));
        original.camera_mut().set_focus(7.5);
        let bytes = encode_scene(&original, true).unwrap();

        let mut loaded = empty_scene();
        decode_scene(&mut loaded, &bytes).unwrap();

        assert_eq!(loaded.world().block_count(), original.world().block_count());
        assert_eq!(
            loaded.world().material_at(WorldPos::new(15, 0, 15)),
            MaterialId::WATER
        );
        assert_eq!(
            loaded.world().lights().active_count(),
            original.world().lights().active_count()
        );
        assert!(
            loaded
                .world()
                .get(WorldPos::new(3, 4, 5))
                .unwrap()
                .light_slot()
                .is_some()
        );
        assert_eq!(loaded.camera().position(), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(loaded.camera().focal_distance(), 7.5);
        assert_eq!(loaded.orbit_light(), Some(2));
    }

    #[test]
    fn test_uncompressed_stream_starts_with_camera_record() {
        let scene = demo_scene();
        let bytes = encode_scene(&scene, false).unwrap();
        // View type, then focal distance.
        assert_eq!(&bytes[0..4], &1i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &10.0f32.to_le_bytes());
        let compressed = encode_scene(&scene, true).unwrap();
        assert!(compressed.len() < bytes.len());
    }

    #[test]
    fn test_truncated_snapshot_leaves_scene_alone() {
        let bytes = encode_scene(&demo_scene(), false).unwrap();
        let mut scene = empty_scene();
        scene
            .world_mut()
            .set_material(WorldPos::new(0, 0, 0), MaterialId::STONE);

        let err = decode_scene(&mut scene, &bytes[..bytes.len() - 7]).unwrap_err();
        assert!(matches!(err, SnapshotError::Truncated { .. }));
        assert_eq!(scene.world().block_count(), 1);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode_scene(&empty_scene(), false).unwrap();
        bytes.push(0);
        let mut scene = empty_scene();
        assert!(matches!(
            decode_scene(&mut scene, &bytes),
            Err(SnapshotError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves").join("world.bvs");
        let scene = demo_scene();
        let written = save_snapshot(&scene, &path, true).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, written);

        let mut loaded = empty_scene();
        load_snapshot(&mut loaded, &path).unwrap();
        assert_eq!(loaded.world().block_count(), scene.world().block_count());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = empty_scene();
        let err = load_snapshot(&mut scene, &dir.path().join("absent.bvs")).unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }
}
