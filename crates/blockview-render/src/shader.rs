//! Built-in WGSL programs and the per-context shader library.
//!
//! Uniform and attribute numbering follows [`crate::uniforms`]; the `SceneUniforms`
//! struct below must stay byte-compatible with its Rust twin.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

pub const SCENE_SHADER: &str = "scene";
pub const POST_SHADER: &str = "post";
pub const HUD_SHADER: &str = "hud";

const UNIFORMS_WGSL: &str = r#"
struct SceneUniforms {
    projection: mat4x4<f32>,
    model_view: mat4x4<f32>,
    model_normals: mat4x4<f32>,
    camera_position: vec3<f32>,
    time: f32,
    camera_target: vec3<f32>,
    focal_distance: f32,
    width: f32,
    height: f32,
    paused: u32,
    eye_type: i32,
    ambient_brightness: f32,
    light_count: u32,
    post_effect: u32,
    texture_size: u32,
};
"#;

/// Lit, textured, instanced blocks. Writes color and linear view depth.
pub const SCENE_SHADER_SOURCE: &str = r#"
struct Light {
    position: vec4<f32>,
    direction: vec4<f32>,
    color: vec4<f32>,
    exponent: f32,
    falloff: f32,
    mode: u32,
    is_active: u32,
};

struct LightBuffer {
    span: u32,
    is_active: u32,
    pad0: u32,
    pad1: u32,
    lights: array<Light>,
};

@group(0) @binding(0) var<uniform> scene: SceneUniforms;
@group(0) @binding(1) var<storage, read> light_buffer: LightBuffer;
@group(1) @binding(0) var block_textures: texture_2d_array<f32>;
@group(1) @binding(1) var block_sampler: sampler;

struct VertexInput {
    @location(1) position: vec3<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) color: vec4<f32>,
};

struct InstanceInput {
    @location(6) model0: vec4<f32>,
    @location(7) model1: vec4<f32>,
    @location(8) model2: vec4<f32>,
    @location(9) model3: vec4<f32>,
    @location(10) params: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) params: vec4<f32>,
    @location(4) view_depth: f32,
};

struct FragmentOutput {
    @location(0) color: vec4<f32>,
    @location(1) depth: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(instance.model0, instance.model1, instance.model2, instance.model3);
    let world = model * vec4<f32>(vertex.position, 1.0);
    let view = scene.model_view * world;
    var out: VertexOutput;
    out.clip_position = scene.projection * view;
    out.world_position = world.xyz;
    out.normal = normalize((model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.uv = vertex.color.xy;
    out.params = instance.params;
    out.view_depth = -view.z;
    return out;
}

// Modes: 0 ambient, 1 point, 2 spot, 3 directional.
fn shade(light: Light, p: vec3<f32>, n: vec3<f32>) -> vec3<f32> {
    let radiance = light.color.rgb * light.color.a;
    if light.mode == 0u {
        return radiance;
    }
    if light.mode == 3u {
        return radiance * max(dot(n, -normalize(light.direction.xyz)), 0.0);
    }
    let offset = light.position.xyz - p;
    let dist = max(length(offset), 1e-4);
    let l = offset / dist;
    var lit = radiance * max(dot(n, l), 0.0) / (1.0 + light.falloff * dist * dist);
    if light.mode == 2u {
        let cone = max(dot(-l, normalize(light.direction.xyz)), 0.0);
        lit = lit * pow(cone, light.exponent);
    }
    return lit;
}

@fragment
fn fs_main(in: VertexOutput) -> FragmentOutput {
    let base = textureSample(block_textures, block_sampler, in.uv, i32(in.params.x));
    let n = normalize(in.normal);

    var light = vec3<f32>(scene.ambient_brightness);
    let count = min(scene.light_count, light_buffer.span);
    for (var i = 0u; i < count; i = i + 1u) {
        let l = light_buffer.lights[i];
        if l.is_active == 0u {
            continue;
        }
        light = light + shade(l, in.world_position, n);
    }
    if in.params.z > 0.5 {
        light = max(light, vec3<f32>(1.0));
    }

    var rgb = base.rgb * light;
    // Stereo eyes: left keeps red, right keeps green and blue.
    if scene.eye_type == 1 {
        rgb = vec3<f32>(rgb.r, 0.0, 0.0);
    } else if scene.eye_type == 2 {
        rgb = vec3<f32>(0.0, rgb.g, rgb.b);
    }

    var out: FragmentOutput;
    out.color = vec4<f32>(rgb, base.a * in.params.y);
    out.depth = vec4<f32>(in.view_depth, 0.0, 0.0, 1.0);
    return out;
}
"#;

/// Full-screen pass over the offscreen framebuffer. Effects: 0 none, 1 edge, 2 wobbles.
pub const POST_SHADER_SOURCE: &str = r#"
@group(0) @binding(0) var<uniform> scene: SceneUniforms;
@group(0) @binding(1) var frame_color: texture_2d<f32>;
@group(0) @binding(2) var frame_depth: texture_2d<f32>;
@group(0) @binding(3) var frame_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(1) position: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position, 0.0, 1.0);
    out.uv = vec2<f32>(position.x * 0.5 + 0.5, 0.5 - position.y * 0.5);
    return out;
}

fn depth_at(p: vec2<i32>) -> f32 {
    let size = vec2<i32>(textureDimensions(frame_depth));
    return textureLoad(frame_depth, clamp(p, vec2<i32>(0), size - vec2<i32>(1)), 0).r;
}

fn edge_strength(p: vec2<i32>) -> f32 {
    let tl = depth_at(p + vec2<i32>(-1, -1));
    let t = depth_at(p + vec2<i32>(0, -1));
    let tr = depth_at(p + vec2<i32>(1, -1));
    let l = depth_at(p + vec2<i32>(-1, 0));
    let r = depth_at(p + vec2<i32>(1, 0));
    let bl = depth_at(p + vec2<i32>(-1, 1));
    let b = depth_at(p + vec2<i32>(0, 1));
    let br = depth_at(p + vec2<i32>(1, 1));
    let gx = (tr + 2.0 * r + br) - (tl + 2.0 * l + bl);
    let gy = (bl + 2.0 * b + br) - (tl + 2.0 * t + tr);
    let center = max(depth_at(p), 1e-3);
    return clamp(length(vec2<f32>(gx, gy)) / center, 0.0, 1.0);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var uv = in.uv;
    if scene.post_effect == 2u {
        let phase = scene.time * 4.0;
        uv = uv + vec2<f32>(sin(uv.y * 40.0 + phase), cos(uv.x * 40.0 + phase)) * 0.004;
    }
    let color = textureSample(frame_color, frame_sampler, uv);
    if scene.post_effect == 1u {
        let edge = edge_strength(vec2<i32>(in.position.xy));
        return vec4<f32>(mix(color.rgb, vec3<f32>(0.0), edge), 1.0);
    }
    return vec4<f32>(clamp(color.rgb, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
"#;

/// Textured overlay quad.
pub const HUD_SHADER_SOURCE: &str = r#"
@group(0) @binding(0) var hud_texture: texture_2d<f32>;
@group(0) @binding(1) var hud_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(1) position: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position.xy, 0.0, 1.0);
    out.uv = position.zw;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(hud_texture, hud_sampler, in.uv);
}
"#;

/// Full WGSL text for a built-in program, with the shared uniform block prepended
/// where the program uses it.
pub fn builtin_source(name: &str) -> Option<String> {
    match name {
        SCENE_SHADER => Some(format!("{UNIFORMS_WGSL}{SCENE_SHADER_SOURCE}")),
        POST_SHADER => Some(format!("{UNIFORMS_WGSL}{POST_SHADER_SOURCE}")),
        HUD_SHADER => Some(HUD_SHADER_SOURCE.to_string()),
        _ => None,
    }
}

/// Compiled shader modules owned by one render context.
#[derive(Default)]
pub struct ShaderLibrary {
    modules: HashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with every built-in program compiled.
    pub fn with_builtins(device: &wgpu::Device) -> Self {
        let mut library = Self::new();
        for name in [SCENE_SHADER, POST_SHADER, HUD_SHADER] {
            if let Some(source) = builtin_source(name) {
                library.load_from_source(device, name, &source);
            }
        }
        library
    }

    /// Compile `source` under `name`, replacing any previous module.
    pub fn load_from_source(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        source: &str,
    ) -> Arc<wgpu::ShaderModule> {
        debug!("Loading shader '{}' from source", name);
        let module = Arc::new(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }));
        if self.modules.insert(name.to_string(), module.clone()).is_some() {
            info!("Replaced shader '{}'", name);
        }
        module
    }

    pub fn get(&self, name: &str) -> Option<Arc<wgpu::ShaderModule>> {
        self.modules.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::test_context;

    #[test]
    fn test_builtin_sources() {
        for name in [SCENE_SHADER, POST_SHADER, HUD_SHADER] {
            let source = builtin_source(name).unwrap();
            assert!(source.contains("fn vs_main"));
            assert!(source.contains("fn fs_main"));
        }
        assert!(builtin_source("missing").is_none());
    }

    #[test]
    fn test_uniform_block_fields_follow_host_order() {
        let fields = [
            "projection", "model_view", "model_normals", "camera_position", "time",
            "camera_target", "focal_distance", "width", "height", "paused", "eye_type",
            "ambient_brightness", "light_count", "post_effect", "texture_size",
        ];
        let mut last = 0;
        for field in fields {
            let at = UNIFORMS_WGSL.find(&format!("    {field}:")).unwrap();
            assert!(at > last, "{field} out of order");
            last = at;
        }
    }

    #[test]
    fn test_attribute_locations_in_source() {
        assert!(SCENE_SHADER_SOURCE.contains("@location(1) position: vec3<f32>"));
        assert!(SCENE_SHADER_SOURCE.contains("@location(6) model0"));
        assert!(HUD_SHADER_SOURCE.contains("@location(1) position: vec4<f32>"));
        assert!(POST_SHADER_SOURCE.contains("@location(1) position: vec2<f32>"));
    }

    #[test]
    fn test_library_compiles_builtins() {
        let Some(ctx) = test_context() else {
            return;
        };
        let library = ShaderLibrary::with_builtins(&ctx.device);
        assert_eq!(library.len(), 3);
        assert!(library.get(SCENE_SHADER).is_some());
        assert!(library.get("missing").is_none());
    }
}
