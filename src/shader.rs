//! WGSL source for the instanced particle pass.

/// One unit quad per particle instance, expanded in the vertex stage from
/// the vertex index, positioned from the per-instance attributes. The
/// fragment stage cuts a radial falloff disc and brightens with speed.
pub const PARTICLE_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    tint: vec4<f32>,
    time: f32,
    particle_size: f32,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) speed: f32,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) instance_position: vec2<f32>,
    @location(1) instance_velocity: vec2<f32>,
) -> VertexOutput {
    var quad_vertices = array<vec2<f32>, 6>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>( 0.5, -0.5),
        vec2<f32>(-0.5,  0.5),
        vec2<f32>( 0.5, -0.5),
        vec2<f32>( 0.5,  0.5),
        vec2<f32>(-0.5,  0.5),
    );

    let corner = quad_vertices[vertex_index];
    let world = instance_position + corner * uniforms.particle_size;

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(world, 0.0, 1.0);
    out.uv = corner * 2.0;
    out.speed = length(instance_velocity);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let dist = length(in.uv);
    if dist > 1.0 {
        discard;
    }
    let falloff = 1.0 - smoothstep(0.4, 1.0, dist);
    let glow = clamp(in.speed * 0.002, 0.0, 1.0);
    let color = uniforms.tint.rgb * (0.6 + 0.4 * glow);
    return vec4<f32>(color, falloff * uniforms.tint.a);
}
"#;
