//! The demo scene: its lights, terrain and starting camera.

use std::f32::consts::FRAC_PI_2;

use blockview_lighting::{Light, LightMode};
use blockview_render::PlayerCamera;
use blockview_voxel::{MaterialId, World, WorldPos};
use glam::{Quat, Vec3};

/// Radius of the flat terrain disc around the origin.
pub const TERRAIN_RADIUS: i64 = 6;
/// Corner of the stone pool.
pub const POOL_CENTER: (i64, i64) = (15, 15);

const WHITE_SMOKE: Vec3 = Vec3::new(245.0 / 255.0, 245.0 / 255.0, 245.0 / 255.0);
const WHEAT: Vec3 = Vec3::new(245.0 / 255.0, 222.0 / 255.0, 179.0 / 255.0);
const AMBIENT_INTENSITY: f32 = 0.2;
const ORBIT_INTENSITY: f32 = 10.0;
const ORBIT_ARM: Vec3 = Vec3::new(0.0, 2.0, 4.0);

/// Where the orbiting point light sits at `time` seconds.
pub fn orbit_position(time: f64) -> Vec3 {
    Quat::from_rotation_y(time as f32) * ORBIT_ARM
}

/// Add the ambient, directional and orbiting point lights, returning the point
/// light's slot.
pub fn add_scene_lights(world: &mut World) -> Option<usize> {
    let lights = world.lights_mut();
    lights.add(Light::environment(Vec3::ONE, AMBIENT_INTENSITY), None);
    lights.add(
        Light::directional(Vec3::new(-1.0, -1.0, 0.0), WHITE_SMOKE, 1.0),
        None,
    );
    lights
        .add(
            Light::point(
                Vec3::new(0.0, 0.0, 2.0),
                WHEAT,
                ORBIT_INTENSITY,
                Light::DEFAULT_FALLOFF,
            ),
            None,
        )
        .map(|a| a.slot)
}

/// First unowned point light, used to re-find the orbiting light after a load.
pub fn find_orbit_light(world: &World) -> Option<usize> {
    world
        .lights()
        .iter()
        .find(|(_, light, owner)| owner.is_none() && light.mode == LightMode::Point)
        .map(|(slot, _, _)| slot)
}

/// Terrain height of column `(i, j)`.
fn terrain_height(i: i64, j: i64) -> i64 {
    let (fi, fj) = (i as f64, j as f64);
    (((fi + fi.sin() / 3.0 - fj) / 3.0).sin() * 1.5) as i64
}

/// Build the demo terrain: a debug marker, a stone and diamond frame, rolling
/// grass with a sand patch, and a water pool set in stone.
pub fn build_terrain(world: &mut World) {
    world.set_material(WorldPos::new(0, 15, 0), MaterialId::DEBUG);

    for i in 0..4i64 {
        for j in 0..4i64 {
            if i == 0 || i == 3 || j == 0 || j == 3 {
                let material = if (i ^ j) & 1 != 0 {
                    MaterialId::STONE
                } else {
                    MaterialId::DIAMOND
                };
                world.set_material(WorldPos::new(1 - i, j + 1, 0), material);
            }
        }
    }

    let side = TERRAIN_RADIUS;
    for i in -side..=side {
        for j in -side..=side {
            let y = terrain_height(i, j);
            if i * i + j * j < 15 {
                world.set_material(WorldPos::new(i, y, j), MaterialId::SAND);
                world.set_material(WorldPos::new(i, y - 1, j), MaterialId::GRASS);
            } else {
                world.set_material(WorldPos::new(i, y, j), MaterialId::GRASS);
            }
        }
    }

    let (xp, zp) = POOL_CENTER;
    for i in -2..=2i64 {
        for j in -2..=2i64 {
            if (-1..2).contains(&i) && (-1..2).contains(&j) {
                world.set_material(WorldPos::new(xp + i, -1, zp + j), MaterialId::STONE);
                let water = WorldPos::new(xp + i, 0, zp + j);
                world.set_material(water, MaterialId::WATER);
                world.at(water).translate(Vec3::new(0.0, -0.15, 0.0));
            } else {
                world.set_material(WorldPos::new(xp + i, 0, zp + j), MaterialId::STONE);
            }
        }
    }

    tracing::info!(
        "built demo terrain: {} blocks in {} chunks",
        world.block_count(),
        world.chunks().len()
    );
}

/// Put the camera back at its starting pose.
pub fn reset_camera(camera: &mut PlayerCamera) {
    camera.move_to(Vec3::new(0.0, 6.0, -8.0));
    camera.reset_zoom();
    camera.set_horizontal_angle(FRAC_PI_2);
    camera.set_vertical_angle(-0.25);
    camera.eye_separation = 0.1;
    camera.set_focus(10.0);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
