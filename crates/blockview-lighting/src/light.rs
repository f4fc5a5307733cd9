//! Light descriptors and their GPU layout.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// How a light contributes to shading. The discriminants are stored in snapshots
/// and read by the scene shader.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightMode {
    /// Uniform contribution everywhere.
    Ambient = 0,
    /// Omnidirectional light with distance falloff.
    Point = 1,
    /// Cone light around `direction`, sharpened by `exponent`.
    Spot = 2,
    /// Parallel rays along `direction`.
    Directional = 3,
}

impl LightMode {
    /// Maps a stored discriminant back to a mode.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Ambient),
            1 => Some(Self::Point),
            2 => Some(Self::Spot),
            3 => Some(Self::Directional),
            _ => None,
        }
    }
}

/// CPU-side light descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// World-space position (point and spot lights).
    pub position: Vec3,
    /// Direction the light travels (spot and directional lights).
    pub direction: Vec3,
    /// Linear RGB color.
    pub color: Vec3,
    /// Scalar multiplier on `color`.
    pub intensity: f32,
    /// Spot cone sharpness.
    pub exponent: f32,
    /// Distance attenuation coefficient.
    pub falloff: f32,
    /// Shading mode.
    pub mode: LightMode,
}

impl Light {
    /// Default attenuation of point and spot lights.
    pub const DEFAULT_FALLOFF: f32 = 0.02;
    /// Default spot cone exponent.
    pub const DEFAULT_SPOT_EXPONENT: f32 = 100.0;

    /// Ambient light that brightens everything equally.
    pub fn environment(color: Vec3, intensity: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::ZERO,
            color,
            intensity,
            exponent: 0.0,
            falloff: 0.0,
            mode: LightMode::Ambient,
        }
    }

    /// Sun-like light travelling along `direction`.
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            ..Self::environment(color, intensity).with_mode(LightMode::Directional)
        }
    }

    /// Omnidirectional light at `position`.
    pub fn point(position: Vec3, color: Vec3, intensity: f32, falloff: f32) -> Self {
        Self {
            position,
            falloff: falloff.max(0.0),
            ..Self::environment(color, intensity).with_mode(LightMode::Point)
        }
    }

    /// Cone light at `position` pointing along `direction`. The exponent is at least 1.
    pub fn spot(
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        falloff: f32,
        exponent: f32,
    ) -> Self {
        Self {
            position,
            direction: direction.normalize_or_zero(),
            color,
            intensity,
            exponent: exponent.max(1.0),
            falloff: falloff.max(0.0),
            mode: LightMode::Spot,
        }
    }

    fn with_mode(mut self, mode: LightMode) -> Self {
        self.mode = mode;
        self
    }

    /// Packs the light for the storage buffer.
    pub fn to_gpu(&self, active: bool) -> LightGpu {
        LightGpu {
            position: self.position.extend(1.0).to_array(),
            direction: self.direction.extend(0.0).to_array(),
            color: self.color.extend(self.intensity).to_array(),
            exponent: self.exponent,
            falloff: self.falloff,
            mode: self.mode as u32,
            active: active as u32,
        }
    }
}

/// Per-slot GPU data, 64 bytes, std430-compatible.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct LightGpu {
    /// xyz = position, w = 1.
    pub position: [f32; 4],
    /// xyz = direction, w = 0.
    pub direction: [f32; 4],
    /// rgb = color, a = intensity.
    pub color: [f32; 4],
    pub exponent: f32,
    pub falloff: f32,
    /// [`LightMode`] discriminant.
    pub mode: u32,
    /// 1 if the slot holds a light.
    pub active: u32,
}

/// Header at the start of the light storage buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct LightHeader {
    /// Number of slots the shader walks (highest occupied slot + 1).
    pub span: u32,
    /// Number of occupied slots.
    pub active: u32,
    pub _pad: [u32; 2],
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_layout_sizes() {
        assert_eq!(std::mem::size_of::<LightGpu>(), 64);
        assert_eq!(std::mem::size_of::<LightHeader>(), 16);
    }

    #[test]
    fn test_mode_discriminants() {
        assert_eq!(LightMode::Ambient as i32, 0);
        assert_eq!(LightMode::Point as i32, 1);
        assert_eq!(LightMode::Spot as i32, 2);
        assert_eq!(LightMode::Directional as i32, 3);
        for raw in 0..4 {
            assert_eq!(LightMode::from_raw(raw).map(|m| m as i32), Some(raw));
        }
        assert_eq!(LightMode::from_raw(4), None);
        assert_eq!(LightMode::from_raw(-1), None);
    }

    #[test]
    fn test_point_light_defaults() {
        let light = Light::point(Vec3::new(0.0, 0.0, 2.0), Vec3::ONE, 10.0, Light::DEFAULT_FALLOFF);
        assert_eq!(light.mode, LightMode::Point);
        assert_eq!(light.falloff, 0.02);
        assert_eq!(light.exponent, 0.0);
        assert_eq!(light.intensity, 10.0);
    }

    #[test]
    fn test_spot_exponent_clamped() {
        let light = Light::spot(Vec3::ZERO, Vec3::NEG_Y, Vec3::ONE, 1.0, -1.0, 0.5);
        assert_eq!(light.exponent, 1.0);
        assert_eq!(light.falloff, 0.0);
        assert!((light.direction - Vec3::NEG_Y).length() < 1e-6);
    }

    #[test]
    fn test_directional_normalizes() {
        let light = Light::directional(Vec3::new(-1.0, -1.0, 0.0), Vec3::ONE, 1.0);
        assert!((light.direction.length() - 1.0).abs() < 1e-6);
        assert_eq!(light.mode, LightMode::Directional);
    }

    #[test]
    fn test_to_gpu_packs_intensity_in_alpha() {
        let light = Light::environment(Vec3::new(0.2, 0.3, 0.4), 0.5);
        let gpu = light.to_gpu(true);
        assert_eq!(gpu.color, [0.2, 0.3, 0.4, 0.5]);
        assert_eq!(gpu.active, 1);
        assert_eq!(gpu.mode, 0);
        assert_eq!(light.to_gpu(false).active, 0);
    }
}
