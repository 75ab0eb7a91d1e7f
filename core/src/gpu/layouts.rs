//! Bind group layouts for the waveform pipelines.
//!
//! Every pipeline uses group 0 for its per-draw uniforms and group 1 for the
//! phrase resource (texture + sampler, or the point storage buffer).

use wgpu::{BindGroupLayout, BindGroupLayoutEntry, Device, ShaderStages};

/// Builder for bind group layouts with common patterns.
pub struct BindGroupLayoutBuilder {
    label: Option<&'static str>,
    entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    pub fn new(label: &'static str) -> Self {
        Self {
            label: Some(label),
            entries: Vec::new(),
        }
    }

    pub fn uniform(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    /// Read-only storage buffer, for variable-length point arrays.
    pub fn storage_read(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    pub fn texture_2d(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        self
    }

    pub fn sampler(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        self
    }

    pub fn build(self, device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: self.label,
            entries: &self.entries,
        })
    }
}

/// Group 0: a single fragment-visible uniform block.
pub fn create_uniform_layout(device: &Device, label: &'static str) -> BindGroupLayout {
    BindGroupLayoutBuilder::new(label)
        .uniform(0, ShaderStages::FRAGMENT)
        .build(device)
}

/// Group 1 for the scroll pipeline: phrase texture and its sampler.
pub fn create_waveform_texture_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("waveform_texture_layout")
        .texture_2d(0, ShaderStages::FRAGMENT)
        .sampler(1, ShaderStages::FRAGMENT)
        .build(device)
}

/// Group 1 for the direct pipeline: interleaved (low, mid, high) floats.
pub fn create_waveform_points_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("waveform_points_layout")
        .storage_read(0, ShaderStages::FRAGMENT)
        .build(device)
}
