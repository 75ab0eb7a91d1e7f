//! wgpu implementation of `RenderBackend`.
//!
//! A frame is recorded into one command encoder: `begin_frame` clears the
//! target, each draw opens its own load-preserving pass restricted to the
//! draw's viewport, and `end_frame` submits. Main, branch and playhead draws
//! each own a uniform buffer so draws in one submission never share state.

use super::layouts::{create_uniform_layout, create_waveform_points_layout, create_waveform_texture_layout};
use super::pipelines::{create_pipeline_layout, create_shader, RenderPipelineBuilder};
use super::textures::{ReadbackBuffer, RenderTarget};
use super::uniforms::{DirectUniforms, PlayheadUniforms, ScrollUniforms};
use super::{GpuContext, GpuError};
use crate::compositor::{PixelRect, Rgba, ViewportSize};
use crate::render::{DirectPass, PassRole, PlayheadPass, RenderBackend, RenderError, ScrollPass};
use crate::waveform::BandPoint;
use image::RgbaImage;
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, CommandEncoder, RenderPipeline, TextureFormat, TextureView};

/// Phrase texture resident on the device.
pub struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: BindGroup,
}

impl GpuTexture {
    pub fn size(&self) -> ViewportSize {
        ViewportSize::new(self.texture.width(), self.texture.height())
    }
}

/// Amplitude triples resident on the device.
pub struct GpuBuffer {
    _buffer: wgpu::Buffer,
    bind_group: BindGroup,
    point_count: usize,
}

struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: BindGroup,
}

impl UniformSlot {
    fn new(device: &wgpu::Device, layout: &BindGroupLayout, label: &'static str, size: usize) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }
}

pub struct GpuBackend {
    ctx: GpuContext,
    format: TextureFormat,
    limits: wgpu::Limits,
    scroll_pipeline: RenderPipeline,
    direct_pipeline: RenderPipeline,
    playhead_pipeline: RenderPipeline,
    texture_layout: BindGroupLayout,
    points_layout: BindGroupLayout,
    sampler: wgpu::Sampler,
    scroll_main: UniformSlot,
    scroll_branch: UniformSlot,
    direct_main: UniformSlot,
    direct_branch: UniformSlot,
    playhead: UniformSlot,
    encoder: Option<CommandEncoder>,
}

impl GpuBackend {
    /// Backend rendering into `Rgba8Unorm` targets.
    pub fn new(ctx: GpuContext) -> Result<Self, GpuError> {
        Self::with_format(ctx, TextureFormat::Rgba8Unorm)
    }

    /// Backend rendering into targets of `format`, e.g. a surface format.
    pub fn with_format(ctx: GpuContext, format: TextureFormat) -> Result<Self, GpuError> {
        let device = &ctx.device;

        let scroll_uniform_layout = create_uniform_layout(device, "scroll_uniform_layout");
        let direct_uniform_layout = create_uniform_layout(device, "direct_uniform_layout");
        let playhead_uniform_layout = create_uniform_layout(device, "playhead_uniform_layout");
        let texture_layout = create_waveform_texture_layout(device);
        let points_layout = create_waveform_points_layout(device);

        let scroll_shader = create_shader(device, "scroll_shader", include_str!("shaders/scroll.wgsl"));
        let direct_shader = create_shader(device, "direct_shader", include_str!("shaders/direct.wgsl"));
        let playhead_shader =
            create_shader(device, "playhead_shader", include_str!("shaders/playhead.wgsl"));

        let scroll_layout = create_pipeline_layout(
            device,
            "scroll_pipeline_layout",
            &[&scroll_uniform_layout, &texture_layout],
        );
        let direct_layout = create_pipeline_layout(
            device,
            "direct_pipeline_layout",
            &[&direct_uniform_layout, &points_layout],
        );
        let playhead_layout =
            create_pipeline_layout(device, "playhead_pipeline_layout", &[&playhead_uniform_layout]);

        let scroll_pipeline = RenderPipelineBuilder::new("scroll_pipeline")
            .layout(&scroll_layout)
            .shader(&scroll_shader)
            .format(format)
            .build(device)?;
        let direct_pipeline = RenderPipelineBuilder::new("direct_pipeline")
            .layout(&direct_layout)
            .shader(&direct_shader)
            .format(format)
            .build(device)?;
        let playhead_pipeline = RenderPipelineBuilder::new("playhead_pipeline")
            .layout(&playhead_layout)
            .shader(&playhead_shader)
            .format(format)
            .build(device)?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("waveform_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let scroll_size = std::mem::size_of::<ScrollUniforms>();
        let direct_size = std::mem::size_of::<DirectUniforms>();
        let scroll_main = UniformSlot::new(device, &scroll_uniform_layout, "scroll_main_uniforms", scroll_size);
        let scroll_branch =
            UniformSlot::new(device, &scroll_uniform_layout, "scroll_branch_uniforms", scroll_size);
        let direct_main = UniformSlot::new(device, &direct_uniform_layout, "direct_main_uniforms", direct_size);
        let direct_branch =
            UniformSlot::new(device, &direct_uniform_layout, "direct_branch_uniforms", direct_size);
        let playhead = UniformSlot::new(
            device,
            &playhead_uniform_layout,
            "playhead_uniforms",
            std::mem::size_of::<PlayheadUniforms>(),
        );

        let limits = ctx.limits();
        Ok(Self {
            ctx,
            format,
            limits,
            scroll_pipeline,
            direct_pipeline,
            playhead_pipeline,
            texture_layout,
            points_layout,
            sampler,
            scroll_main,
            scroll_branch,
            direct_main,
            direct_branch,
            playhead,
            encoder: None,
        })
    }

    /// Create a context and backend, blocking on adapter selection.
    pub fn new_blocking() -> Result<Self, GpuError> {
        Self::new(GpuContext::new_blocking()?)
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Copy `target` back to the CPU. The target must have `COPY_SRC` usage.
    pub fn read_target(&self, target: &RenderTarget) -> Result<RgbaImage, GpuError> {
        let size = target.size();
        let readback = ReadbackBuffer::new(&self.ctx.device, size.width, size.height);
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });
        readback.copy_from(&mut encoder, target.texture());
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        let pixels = readback.read_pixels(&self.ctx.device)?;
        RgbaImage::from_raw(size.width, size.height, pixels)
            .ok_or_else(|| GpuError::Readback("pixel buffer size mismatch".into()))
    }

    fn clip(&self, target: &RenderTarget, rect: PixelRect) -> Option<PixelRect> {
        let size = target.size();
        if rect.x >= size.width || rect.y >= size.height {
            return None;
        }
        let clipped = PixelRect {
            width: rect.width.min(size.width - rect.x),
            height: rect.height.min(size.height - rect.y),
            ..rect
        };
        (!clipped.is_empty()).then_some(clipped)
    }
}

fn load_pass<'e>(encoder: &'e mut CommandEncoder, view: &TextureView, label: &'static str) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            depth_slice: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

fn set_viewport(pass: &mut wgpu::RenderPass<'_>, rect: PixelRect) {
    pass.set_viewport(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
        0.0,
        1.0,
    );
}

impl RenderBackend for GpuBackend {
    type Texture = GpuTexture;
    type Buffer = GpuBuffer;
    type Target = RenderTarget;

    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn max_texture_dimension(&self) -> u32 {
        self.limits.max_texture_dimension_2d
    }

    fn upload_texture(&mut self, image: &RgbaImage, label: &str) -> Result<GpuTexture, RenderError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::DegenerateInput("zero-sized texture"));
        }
        let max = self.limits.max_texture_dimension_2d;
        if width > max || height > max {
            return Err(RenderError::ResourceCreation {
                what: "texture",
                reason: format!("{width}x{height} exceeds max_texture_dimension_2d {max}"),
            });
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        Ok(GpuTexture { texture, bind_group })
    }

    fn upload_buffer(&mut self, points: &[BandPoint], label: &str) -> Result<GpuBuffer, RenderError> {
        if points.is_empty() {
            return Err(RenderError::DegenerateInput("empty point buffer"));
        }
        let bytes: &[u8] = bytemuck::cast_slice(points);
        let max = (self.limits.max_storage_buffer_binding_size as u64).min(self.limits.max_buffer_size);
        if bytes.len() as u64 > max {
            return Err(RenderError::ResourceCreation {
                what: "buffer",
                reason: format!("{} bytes exceeds storage binding limit {max}", bytes.len()),
            });
        }

        let buffer = self
            .ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes,
                usage: wgpu::BufferUsages::STORAGE,
            });
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.points_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Ok(GpuBuffer {
            _buffer: buffer,
            bind_group,
            point_count: points.len(),
        })
    }

    fn point_count(&self, buffer: &GpuBuffer) -> usize {
        buffer.point_count
    }

    fn create_target(&mut self, size: ViewportSize) -> Result<RenderTarget, RenderError> {
        let max = self.limits.max_texture_dimension_2d;
        if size.is_empty() || size.width > max || size.height > max {
            return Err(RenderError::ResourceCreation {
                what: "render target",
                reason: format!("{}x{} outside 1..={max}", size.width, size.height),
            });
        }
        Ok(RenderTarget::for_output(&self.ctx.device, "waveform_target", size, self.format))
    }

    fn target_size(&self, target: &RenderTarget) -> ViewportSize {
        target.size()
    }

    fn begin_frame(&mut self, target: &mut RenderTarget, clear: Rgba) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("waveform_frame"),
            });
        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r as f64,
                            g: clear.g as f64,
                            b: clear.b as f64,
                            a: clear.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        if self.encoder.replace(encoder).is_some() {
            log::warn!("begin_frame called twice; previous frame discarded");
        }
    }

    fn draw_scroll(&mut self, target: &mut RenderTarget, texture: &GpuTexture, pass: &ScrollPass) {
        let Some(rect) = self.clip(target, pass.viewport) else {
            return;
        };
        let slot = match pass.role {
            PassRole::Main => &self.scroll_main,
            PassRole::Branch => &self.scroll_branch,
        };
        self.ctx
            .queue
            .write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&ScrollUniforms::from(pass)));

        let Some(encoder) = self.encoder.as_mut() else {
            log::trace!("draw_scroll outside a frame");
            return;
        };
        let mut rpass = load_pass(encoder, target.view(), "scroll_pass");
        set_viewport(&mut rpass, rect);
        rpass.set_pipeline(&self.scroll_pipeline);
        rpass.set_bind_group(0, &slot.bind_group, &[]);
        rpass.set_bind_group(1, &texture.bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    fn draw_direct(&mut self, target: &mut RenderTarget, buffer: &GpuBuffer, pass: &DirectPass) {
        let Some(rect) = self.clip(target, pass.viewport) else {
            return;
        };
        let slot = match pass.role {
            PassRole::Main => &self.direct_main,
            PassRole::Branch => &self.direct_branch,
        };
        let uniforms = DirectUniforms::new(pass, buffer.point_count);
        self.ctx
            .queue
            .write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&uniforms));

        let Some(encoder) = self.encoder.as_mut() else {
            log::trace!("draw_direct outside a frame");
            return;
        };
        let mut rpass = load_pass(encoder, target.view(), "direct_pass");
        set_viewport(&mut rpass, rect);
        rpass.set_pipeline(&self.direct_pipeline);
        rpass.set_bind_group(0, &slot.bind_group, &[]);
        rpass.set_bind_group(1, &buffer.bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    fn draw_playhead(&mut self, target: &mut RenderTarget, pass: &PlayheadPass) {
        let Some(rect) = self.clip(target, pass.viewport.full_rect()) else {
            return;
        };
        self.ctx.queue.write_buffer(
            &self.playhead.buffer,
            0,
            bytemuck::bytes_of(&PlayheadUniforms::from(pass)),
        );

        let Some(encoder) = self.encoder.as_mut() else {
            log::trace!("draw_playhead outside a frame");
            return;
        };
        let mut rpass = load_pass(encoder, target.view(), "playhead_pass");
        set_viewport(&mut rpass, rect);
        rpass.set_pipeline(&self.playhead_pipeline);
        rpass.set_bind_group(0, &self.playhead.bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    fn end_frame(&mut self, _target: &mut RenderTarget) {
        if let Some(encoder) = self.encoder.take() {
            self.ctx.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn finish(&mut self) {
        if let Err(e) = self.ctx.device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("Waiting for GPU idle failed: {e}");
        }
    }
}
