//! Render targets and CPU readback.

use super::GpuError;
use crate::compositor::ViewportSize;
use wgpu::{Device, Texture, TextureFormat, TextureUsages, TextureView};

/// A drawable that owns both texture and view.
/// The texture must outlive its view, so they are kept together.
pub struct RenderTarget {
    texture: Texture,
    view: TextureView,
}

impl RenderTarget {
    pub fn new(
        device: &Device,
        label: &str,
        size: ViewportSize,
        format: TextureFormat,
        usage: TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        Self::from_texture(texture)
    }

    /// Offscreen target that can be copied back to the CPU.
    pub fn for_output(device: &Device, label: &str, size: ViewportSize, format: TextureFormat) -> Self {
        Self::new(
            device,
            label,
            size,
            format,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
        )
    }

    /// Wrap an existing texture, e.g. a swapchain image.
    pub fn from_texture(texture: Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn size(&self) -> ViewportSize {
        ViewportSize::new(self.texture.width(), self.texture.height())
    }
}

/// Staging buffer for copying a target's pixels to the CPU.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row_bytes: u32,
    unpadded_row_bytes: u32,
}

impl ReadbackBuffer {
    /// Create a buffer sized for an RGBA8 image of the given dimensions.
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let unpadded_row_bytes = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = unpadded_row_bytes.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_row_bytes as u64) * (height as u64),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            padded_row_bytes,
            unpadded_row_bytes,
        }
    }

    pub fn padded_row_bytes(&self) -> u32 {
        self.padded_row_bytes
    }

    /// Record a copy of `texture` into this buffer.
    pub fn copy_from(&self, encoder: &mut wgpu::CommandEncoder, texture: &Texture) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Map the buffer and return tightly packed RGBA rows.
    pub fn read_pixels(&self, device: &Device) -> Result<Vec<u8>, GpuError> {
        let slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver is alive until recv below returns.
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GpuError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|e| GpuError::Readback(e.to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let pixels = {
            let data = slice.get_mapped_range();
            let mut pixels = Vec::with_capacity((self.unpadded_row_bytes * self.height) as usize);
            for row in 0..self.height {
                let start = (row * self.padded_row_bytes) as usize;
                let end = start + self.unpadded_row_bytes as usize;
                pixels.extend_from_slice(&data[start..end]);
            }
            pixels
        };
        self.buffer.unmap();
        Ok(pixels)
    }
}
