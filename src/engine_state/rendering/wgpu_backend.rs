//! `wgpu` implementation of the GPU capability seams.
//!
//! Each mesh buffer pair is a vertex and an index buffer that grow on demand.
//! Uploads that fit are written in place through the queue; larger ones replace
//! the buffers. Allocation failures are caught with error scopes and reported as
//! `GpuError`s instead of aborting the device.

use cgmath::{perspective, Deg, Matrix4, Point3, Vector3};
use log::{info, warn};
use wgpu::util::DeviceExt;

use crate::core::GpuError;
use crate::engine_state::voxels::block::block_type::BlockType;

use super::{
    backend::{DrawPass, GpuBackend},
    Vertex,
};

/// Smallest size, in bytes, a mesh buffer is created with.
const INITIAL_BUFFER_SIZE: u64 = 4096;

/// Color target format of the chunk pipeline.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Maps OpenGL clip space (z in [-1, 1]) onto wgpu's (z in [0, 1]).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// View-projection matrix for a camera at `eye` looking along `direction`, z up.
pub fn view_projection(eye: Point3<f32>, direction: Vector3<f32>, aspect: f32) -> Matrix4<f32> {
    let view = Matrix4::look_to_rh(eye, direction, Vector3::unit_z());
    OPENGL_TO_WGPU_MATRIX * perspective(Deg(70.0), aspect, 0.1, 1000.0) * view
}

/// Memory tracking for one buffer pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferAnalytics {
    /// Bytes allocated across both buffers.
    pub allocated_memory: u64,
    /// Bytes holding live data.
    pub used_memory: u64,
    /// Number of uploads.
    pub times_written: u64,
}

/// Vertex + index buffer pair on the GPU.
#[derive(Debug)]
pub struct WgpuMeshBuffer {
    label: String,
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    analytics: BufferAnalytics,
}

impl WgpuMeshBuffer {
    /// Memory statistics of this pair.
    pub fn analytics(&self) -> BufferAnalytics {
        self.analytics
    }
}

/// GPU backend over a `wgpu` device and queue.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    /// Wraps an existing device and queue.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        WgpuBackend { device, queue }
    }

    /// Requests a device with no surface attached, for offscreen rendering.
    ///
    /// # Errors
    /// `GpuError::Device` if no adapter or device is available.
    pub async fn request_headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::empty(),
            backend_options: wgpu::BackendOptions::from_env_or_default(),
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GpuError::Device(e.to_string()))?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("voxel-world device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| GpuError::Device(e.to_string()))?;

        Ok(Self::new(device, queue))
    }

    /// The wrapped device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wrapped queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Creates a buffer, turning validation and out-of-memory errors into a
    /// `GpuError::BufferCreation`.
    fn create_checked(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(e) => Err(GpuError::BufferCreation {
                label: label.to_string(),
                message: e.to_string(),
            }),
            None => Ok(buffer),
        }
    }

    /// Writes `data` into `buffer`, replacing it with a larger one if needed.
    fn write_or_grow(
        &self,
        buffer: &mut wgpu::Buffer,
        label: &str,
        data: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Result<(), GpuError> {
        if data.is_empty() {
            return Ok(());
        }
        let size = data.len() as u64;
        if size > buffer.size() {
            let grown = size.next_power_of_two().max(INITIAL_BUFFER_SIZE);
            *buffer = self.create_checked(label, grown, usage).map_err(|e| GpuError::Upload {
                label: label.to_string(),
                bytes: data.len(),
                message: e.to_string(),
            })?;
        }
        self.queue.write_buffer(buffer, 0, data);
        Ok(())
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = WgpuMeshBuffer;

    fn create_buffer(&self, label: &str) -> Result<WgpuMeshBuffer, GpuError> {
        let vertex = self.create_checked(
            &format!("{label} vertices"),
            INITIAL_BUFFER_SIZE,
            wgpu::BufferUsages::VERTEX,
        )?;
        let index = self.create_checked(
            &format!("{label} indices"),
            INITIAL_BUFFER_SIZE,
            wgpu::BufferUsages::INDEX,
        )?;
        Ok(WgpuMeshBuffer {
            label: label.to_string(),
            vertex,
            index,
            analytics: BufferAnalytics {
                allocated_memory: 2 * INITIAL_BUFFER_SIZE,
                ..BufferAnalytics::default()
            },
        })
    }

    fn allocate(
        &self,
        buffer: &mut WgpuMeshBuffer,
        vertices: &[u8],
        indices: &[u8],
    ) -> Result<(), GpuError> {
        let label = buffer.label.clone();
        self.write_or_grow(
            &mut buffer.vertex,
            &format!("{label} vertices"),
            vertices,
            wgpu::BufferUsages::VERTEX,
        )?;
        self.write_or_grow(
            &mut buffer.index,
            &format!("{label} indices"),
            indices,
            wgpu::BufferUsages::INDEX,
        )?;

        buffer.analytics.allocated_memory = buffer.vertex.size() + buffer.index.size();
        buffer.analytics.used_memory = (vertices.len() + indices.len()) as u64;
        buffer.analytics.times_written += 1;
        Ok(())
    }
}

impl DrawPass<WgpuBackend> for wgpu::RenderPass<'_> {
    fn draw_indexed(&mut self, _block_type: BlockType, buffer: &WgpuMeshBuffer, index_count: u32) {
        self.set_vertex_buffer(0, buffer.vertex.slice(..));
        self.set_index_buffer(buffer.index.slice(..), wgpu::IndexFormat::Uint32);
        wgpu::RenderPass::draw_indexed(self, 0..index_count, 0, 0..1);
    }
}

/// Render pipeline drawing chunk meshes with a single camera uniform.
pub struct ChunkPipeline {
    render_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
}

impl ChunkPipeline {
    /// Builds the pipeline for `COLOR_FORMAT` targets without depth.
    pub fn new(device: &wgpu::Device) -> Self {
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[[[0.0f32; 4]; 4]]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Chunk Render Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Chunk Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/chunk.wgsl").into()),
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Chunk Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        ChunkPipeline {
            render_pipeline,
            camera_buffer,
            camera_bind_group,
        }
    }

    /// Uploads the view-projection matrix.
    pub fn set_camera(&self, queue: &wgpu::Queue, view_proj: Matrix4<f32>) {
        let raw: [[f32; 4]; 4] = view_proj.into();
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[raw]));
    }

    /// Binds the pipeline and camera on `render_pass`.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
    }
}

impl WgpuBackend {
    /// Renders one frame into an offscreen texture.
    ///
    /// `draw` records chunk draws into the pass after the pipeline is bound.
    ///
    /// # Returns
    /// Whatever `draw` returns.
    pub fn render_offscreen<R>(
        &self,
        pipeline: &ChunkPipeline,
        size: (u32, u32),
        draw: impl FnOnce(&mut wgpu::RenderPass<'_>) -> R,
    ) -> R {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Chunk Render Encoder"),
            });
        let result = {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Chunk Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.5,
                            g: 0.7,
                            b: 0.9,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pipeline.bind(&mut render_pass);
            draw(&mut render_pass)
        };
        self.queue.submit(std::iter::once(encoder.finish()));
        if let Err(e) = self.device.poll(wgpu::PollType::Wait) {
            warn!("Device poll after offscreen render failed: {e}");
        }
        result
    }
}
