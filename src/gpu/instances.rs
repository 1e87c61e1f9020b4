//! The particle instance buffer and draw pass.
//!
//! [`ParticleRenderBuffer`] mirrors the simulation's live population into
//! a GPU instance buffer every frame. Capacity tracks the reported count
//! exactly: the buffer is reallocated on every count change rather than
//! grown with headroom, matching the simulation's own exact sizing. The
//! per-frame upload repacks the simulation's native interleave into the
//! renderer's when the strides differ; that repack is the one unavoidable
//! linear copy per frame.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::gpu::GpuState;
use crate::shader::PARTICLE_SHADER;
use crate::sim::ParticleView;

/// Fields per instance consumed by the render pipeline: position.xy and
/// velocity.xy.
pub const RENDER_STRIDE: usize = 4;

const INSTANCE_BYTES: u64 = (RENDER_STRIDE * 4) as u64;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    tint: [f32; 4],
    time: f32,
    particle_size: f32,
    _padding: [f32; 2],
}

/// Repack raw simulation memory into the renderer's interleave.
///
/// Copies the leading [`RENDER_STRIDE`] fields of each record and drops
/// the rest. Pure: a fixed `(raw, stride)` input always produces the
/// same output, no matter how often it runs.
///
/// # Panics
///
/// Panics if the stride cannot supply the renderer's fields or does not
/// divide the memory length.
pub fn pack_instances(raw: &[f32], stride: usize, out: &mut Vec<f32>) {
    assert!(
        stride >= RENDER_STRIDE,
        "simulation stride {stride} cannot fill {RENDER_STRIDE} renderer fields"
    );
    assert_eq!(
        raw.len() % stride,
        0,
        "attribute memory length {} is not a multiple of stride {}",
        raw.len(),
        stride
    );

    let count = raw.len() / stride;
    out.clear();
    out.reserve(count * RENDER_STRIDE);
    for i in 0..count {
        let base = i * stride;
        out.extend_from_slice(&raw[base..base + RENDER_STRIDE]);
    }
}

#[inline]
fn needs_realloc(capacity: usize, live: usize) -> bool {
    capacity != live
}

fn instance_buffer(device: &wgpu::Device, particles: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        // Zero-sized buffers are rejected by some backends; a dormant
        // one-instance allocation stands in while the count is zero.
        size: (particles.max(1) as u64) * INSTANCE_BYTES,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// GPU-side mirror of the particle population, plus the pipeline that
/// draws it as instanced quads.
pub struct ParticleRenderBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
    staging: Vec<f32>,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    view_proj: Mat4,
    particle_size: f32,
    tint: [f32; 4],
}

impl ParticleRenderBuffer {
    /// Build the pipeline and an instance buffer sized for
    /// `initial_count` particles.
    ///
    /// The view projection is a fixed orthographic map over
    /// `sim_width x sim_height`; window resizes stretch the viewport
    /// rather than reframe the simulation.
    pub fn new(
        gpu: &GpuState,
        sim_width: f32,
        sim_height: f32,
        initial_count: usize,
        particle_size: f32,
        tint: [f32; 4],
    ) -> Self {
        let device = gpu.device();

        let buffer = instance_buffer(device, initial_count);
        let view_proj = Mat4::orthographic_rh(0.0, sim_width, 0.0, sim_height, -1.0, 1.0);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Uniform Buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Particle Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(PARTICLE_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: INSTANCE_BYTES,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x2, // position
                        },
                        wgpu::VertexAttribute {
                            offset: 8,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x2, // velocity
                        },
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config().format,
                    // Additive-leaning blend: overlapping particles glow.
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::SrcAlpha,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            buffer,
            capacity: initial_count,
            staging: Vec::new(),
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            view_proj,
            particle_size,
            tint,
        }
    }

    /// Allocated capacity, in particles.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size the instance buffer for exactly `live` particles.
    ///
    /// A no-op while the count is unchanged; any change, growth or
    /// shrink, is a full reallocation to the exact new size.
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, live: usize) {
        if !needs_realloc(self.capacity, live) {
            return;
        }
        log::debug!(
            "instance buffer resized: {} -> {} particles",
            self.capacity,
            live
        );
        self.buffer = instance_buffer(device, live);
        self.capacity = live;
    }

    /// Upload this frame's particle records.
    ///
    /// Uploads directly when the simulation already uses the renderer's
    /// interleave; otherwise repacks through the reused staging buffer.
    ///
    /// # Panics
    ///
    /// Panics if `ensure_capacity` has not been run for this view's
    /// count.
    pub fn upload(&mut self, queue: &wgpu::Queue, view: &ParticleView<'_>) {
        assert_eq!(
            view.len(),
            self.capacity,
            "upload of {} particles into capacity {}",
            view.len(),
            self.capacity
        );
        if view.is_empty() {
            return;
        }
        if view.stride() == RENDER_STRIDE {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(view.raw()));
        } else {
            pack_instances(view.raw(), view.stride(), &mut self.staging);
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.staging));
        }
    }

    /// Sync, clear, and draw one frame of particles.
    ///
    /// Nothing is drawn when the view is empty, but the pass still runs
    /// so the frame clears.
    pub fn render(
        &mut self,
        gpu: &GpuState,
        view: &ParticleView<'_>,
        time_secs: f32,
    ) -> Result<(), wgpu::SurfaceError> {
        self.ensure_capacity(gpu.device(), view.len());
        self.upload(gpu.queue(), view);

        let uniforms = Uniforms {
            view_proj: self.view_proj.to_cols_array_2d(),
            tint: self.tint,
            time: time_secs,
            particle_size: self.particle_size,
            _padding: [0.0; 2],
        };
        gpu.queue()
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let output = gpu.surface().get_current_texture()?;
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.02,
                            b: 0.05,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if !view.is_empty() {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.buffer.slice(..));
                render_pass.draw(0..6, 0..view.len() as u32);
            }
        }

        gpu.queue().submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
