//! wgpu implementation of [`RenderBackend`].
//!
//! The backend draws into a texture view supplied by the host each frame
//! ([`WgpuBackend::set_target`]) or into its own offscreen texture when created
//! headless, which can then be read back with [`WgpuBackend::capture_rgba`].
//! Draws load the existing target contents; clearing is left to the host, or to
//! [`WgpuBackend::clear`] for headless targets.

use glam::Vec2;

use eitmirror_core::{FitTransform, Rect, Rgba};

use crate::backend::{LineDraw, MeshDraw, RenderBackend};
use crate::buffer;
use crate::error::{RenderError, RenderResult};

/// Uniforms for one draw.
/// Note: Layout must match WGSL DrawUniforms exactly (32 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct DrawUniforms {
    /// Mesh-space to host-space scale.
    pub scale: [f32; 2],
    /// Mesh-space to host-space offset.
    pub offset: [f32; 2],
    /// Render target size in host units.
    pub target_size: [f32; 2],
    /// Padding to 16-byte alignment.
    pub _pad: [f32; 2],
}

impl DrawUniforms {
    /// Creates uniforms for a transform and a target size in host units.
    pub fn new(transform: &FitTransform, target_size: Vec2) -> Self {
        Self {
            scale: transform.scale.to_array(),
            offset: transform.offset.to_array(),
            target_size: target_size.to_array(),
            _pad: [0.0; 2],
        }
    }
}

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x4];

/// GPU resources for one impedance mesh.
pub struct GpuMesh {
    /// Planar positions (vec2).
    pub position_buffer: wgpu::Buffer,
    /// Per-vertex colors (vec4).
    pub color_buffer: wgpu::Buffer,
    /// Uniform buffer for this mesh's transform.
    pub uniform_buffer: wgpu::Buffer,
    /// Bind group for the uniforms.
    pub bind_group: wgpu::BindGroup,
    /// Number of vertices the buffers hold.
    pub vertex_count: usize,
}

/// The wgpu render backend.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    bind_group_layout: wgpu::BindGroupLayout,
    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    line_uniform_buffer: wgpu::Buffer,
    line_bind_group: wgpu::BindGroup,
    target_view: Option<wgpu::TextureView>,
    target_width: u32,
    target_height: u32,
    scale_factor: f32,
    offscreen: Option<wgpu::Texture>,
}

impl WgpuBackend {
    /// Creates a backend on an existing device rendering to targets of `format`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("impedance mesh shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/impedance_mesh.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("impedance draw bind group layout"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("impedance pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::TriangleList,
            "impedance mesh pipeline",
        );
        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::LineList,
            "electrode line pipeline",
        );

        let line_uniform_buffer = buffer::create_uniform_buffer(
            &device,
            &DrawUniforms::new(&FitTransform::IDENTITY, Vec2::ONE),
            Some("electrode line uniforms"),
        );
        let line_bind_group = create_bind_group(&device, &bind_group_layout, &line_uniform_buffer);

        Self {
            device,
            queue,
            format,
            bind_group_layout,
            mesh_pipeline,
            line_pipeline,
            line_uniform_buffer,
            line_bind_group,
            target_view: None,
            target_width: 0,
            target_height: 0,
            scale_factor: 1.0,
            offscreen: None,
        }
    }

    /// Creates a backend with its own device and an offscreen RGBA target.
    pub async fn new_headless(width: u32, height: u32) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("eitmirror device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let mut backend = Self::new(device, queue, format);

        let width = width.max(1);
        let height = height.max(1);
        let texture = backend.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        backend.offscreen = Some(texture);
        backend.set_target(view, width, height, 1.0);

        log::info!("headless wgpu backend created ({width}x{height})");
        Ok(backend)
    }

    /// Blocking variant of [`new_headless`](Self::new_headless).
    pub fn new_headless_blocking(width: u32, height: u32) -> RenderResult<Self> {
        pollster::block_on(Self::new_headless(width, height))
    }

    /// Sets the view subsequent draws render into.
    ///
    /// `width` and `height` are in pixels; `scale_factor` is pixels per host unit.
    pub fn set_target(
        &mut self,
        view: wgpu::TextureView,
        width: u32,
        height: u32,
        scale_factor: f32,
    ) {
        self.target_view = Some(view);
        self.target_width = width;
        self.target_height = height;
        self.scale_factor = if scale_factor > 0.0 { scale_factor } else { 1.0 };
    }

    /// Drops the current target view.
    pub fn clear_target(&mut self) {
        self.target_view = None;
    }

    /// The wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wgpu queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Format of the render targets.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Current target dimensions in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    fn host_size(&self) -> Vec2 {
        Vec2::new(self.target_width as f32, self.target_height as f32) / self.scale_factor
    }

    /// Scissor rect in pixels for a host rect, or `None` if nothing is visible.
    fn scissor(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let target = Vec2::new(self.target_width as f32, self.target_height as f32);
        let min = (rect.origin * self.scale_factor).floor().clamp(Vec2::ZERO, target);
        let max = (rect.max() * self.scale_factor).ceil().clamp(Vec2::ZERO, target);
        let size = max - min;
        if size.x < 1.0 || size.y < 1.0 {
            return None;
        }
        Some((min.x as u32, min.y as u32, size.x as u32, size.y as u32))
    }

    /// Records one render pass on the target, loading its contents, and submits it.
    fn submit_pass(&self, label: &str, clip: Rect, record: impl FnOnce(&mut wgpu::RenderPass<'_>)) {
        let Some(view) = &self.target_view else {
            log::warn!("{label}: no render target set, skipping draw");
            return;
        };
        let Some((x, y, width, height)) = self.scissor(clip) else {
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                ..Default::default()
            });
            pass.set_scissor_rect(x, y, width, height);
            record(&mut pass);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Clears the whole target to `color`.
    pub fn clear(&mut self, color: Rgba) {
        let Some(view) = &self.target_view else {
            return;
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(color[0]),
                            g: f64::from(color[1]),
                            b: f64::from(color[2]),
                            a: f64::from(color[3]),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                ..Default::default()
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Calculates bytes per row with proper alignment for wgpu buffer copies.
    fn aligned_bytes_per_row(width: u32) -> u32 {
        let unaligned = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        unaligned.div_ceil(align) * align
    }

    /// Reads the offscreen target back as tightly packed RGBA8 rows, top row first.
    pub fn capture_rgba(&self) -> RenderResult<Vec<u8>> {
        let texture = self.offscreen.as_ref().ok_or(RenderError::NoOffscreenTarget)?;
        let (width, height) = (self.target_width, self.target_height);
        let bytes_per_row = Self::aligned_bytes_per_row(width);

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("capture readback buffer"),
            size: u64::from(bytes_per_row * height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("capture copy encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|_| RenderError::BufferMapFailed)?;
        rx.recv()
            .map_err(|_| RenderError::BufferMapFailed)?
            .map_err(|_| RenderError::BufferMapFailed)?;

        // Copy data, removing row padding
        let data = slice.get_mapped_range();
        let row_bytes = (width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height {
            let start = (row * bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + row_bytes]);
        }
        drop(data);
        readback.unmap();

        Ok(pixels)
    }
}

impl RenderBackend for WgpuBackend {
    type Mesh = GpuMesh;

    fn create_mesh(&mut self, vertex_count: usize) -> RenderResult<GpuMesh> {
        if vertex_count == 0 {
            return Err(RenderError::BufferCreationFailed(
                "mesh has no vertices".to_string(),
            ));
        }

        let position_buffer = buffer::create_empty_vertex_buffer::<[f32; 2]>(
            &self.device,
            vertex_count,
            Some("mesh positions"),
        );
        let color_buffer = buffer::create_empty_vertex_buffer::<Rgba>(
            &self.device,
            vertex_count,
            Some("mesh colors"),
        );
        let uniform_buffer = buffer::create_uniform_buffer(
            &self.device,
            &DrawUniforms::new(&FitTransform::IDENTITY, self.host_size()),
            Some("mesh uniforms"),
        );
        let bind_group = create_bind_group(&self.device, &self.bind_group_layout, &uniform_buffer);

        Ok(GpuMesh {
            position_buffer,
            color_buffer,
            uniform_buffer,
            bind_group,
            vertex_count,
        })
    }

    fn upload_positions(&mut self, mesh: &mut GpuMesh, positions: &[[f32; 2]]) {
        let len = positions.len().min(mesh.vertex_count);
        buffer::update_buffer(&self.queue, &mesh.position_buffer, &positions[..len]);
    }

    fn upload_colors(&mut self, mesh: &mut GpuMesh, colors: &[Rgba]) {
        let len = colors.len().min(mesh.vertex_count);
        buffer::update_buffer(&self.queue, &mesh.color_buffer, &colors[..len]);
    }

    fn draw_mesh(&mut self, mesh: &GpuMesh, draw: &MeshDraw) {
        let uniforms = DrawUniforms::new(&draw.transform, self.host_size());
        buffer::update_buffer(&self.queue, &mesh.uniform_buffer, &[uniforms]);

        let vertex_count = draw.vertex_count.min(mesh.vertex_count as u32);
        self.submit_pass("impedance mesh pass", draw.clip, |pass| {
            pass.set_pipeline(&self.mesh_pipeline);
            pass.set_bind_group(0, &mesh.bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.position_buffer.slice(..));
            pass.set_vertex_buffer(1, mesh.color_buffer.slice(..));
            pass.draw(0..vertex_count, 0..1);
        });
    }

    fn draw_lines(&mut self, lines: &LineDraw<'_>) {
        if lines.segments.is_empty() {
            return;
        }

        let positions: Vec<[f32; 2]> = lines
            .segments
            .iter()
            .flat_map(|[a, b]| [a.to_array(), b.to_array()])
            .collect();
        let colors = vec![lines.color; positions.len()];
        let position_buffer =
            buffer::create_vertex_buffer(&self.device, &positions, Some("electrode positions"));
        let color_buffer =
            buffer::create_vertex_buffer(&self.device, &colors, Some("electrode colors"));

        let uniforms = DrawUniforms::new(&FitTransform::IDENTITY, self.host_size());
        buffer::update_buffer(&self.queue, &self.line_uniform_buffer, &[uniforms]);

        self.submit_pass("electrode line pass", lines.clip, |pass| {
            pass.set_pipeline(&self.line_pipeline);
            pass.set_bind_group(0, &self.line_bind_group, &[]);
            pass.set_vertex_buffer(0, position_buffer.slice(..));
            pass.set_vertex_buffer(1, color_buffer.slice(..));
            pass.draw(0..positions.len() as u32, 0..1);
        });
    }

    fn release_mesh(&mut self, mesh: GpuMesh) {
        mesh.position_buffer.destroy();
        mesh.color_buffer.destroy();
        mesh.uniform_buffer.destroy();
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("impedance draw bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &POSITION_ATTRIBUTES,
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Rgba>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &COLOR_ATTRIBUTES,
                },
            ],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_uniforms_layout() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 32);
        let uniforms = DrawUniforms::new(
            &FitTransform {
                scale: Vec2::new(2.0, -2.0),
                offset: Vec2::new(5.0, 6.0),
            },
            Vec2::new(640.0, 480.0),
        );
        assert_eq!(uniforms.scale, [2.0, -2.0]);
        assert_eq!(uniforms.offset, [5.0, 6.0]);
        assert_eq!(uniforms.target_size, [640.0, 480.0]);
    }

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(WgpuBackend::aligned_bytes_per_row(64), 256);
        assert_eq!(WgpuBackend::aligned_bytes_per_row(65), 512);
    }
}
