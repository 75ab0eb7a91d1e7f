//! Render pipeline construction.
//!
//! All waveform pipelines draw a single fullscreen triangle clipped by the
//! pass viewport, so there are no vertex buffers.

use super::GpuError;
use wgpu::{
    BindGroupLayout, BlendState, ColorTargetState, Device, PipelineLayout, RenderPipeline,
    ShaderModule, TextureFormat,
};

/// Builder for fullscreen-triangle render pipelines.
pub struct RenderPipelineBuilder<'a> {
    label: Option<&'static str>,
    layout: Option<&'a PipelineLayout>,
    shader: Option<&'a ShaderModule>,
    vertex_entry: &'static str,
    fragment_entry: &'static str,
    format: TextureFormat,
    blend: Option<BlendState>,
}

impl<'a> RenderPipelineBuilder<'a> {
    /// New builder targeting `Rgba8Unorm` with straight-alpha blending.
    pub fn new(label: &'static str) -> Self {
        Self {
            label: Some(label),
            layout: None,
            shader: None,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            format: TextureFormat::Rgba8Unorm,
            blend: Some(BlendState::ALPHA_BLENDING),
        }
    }

    pub fn layout(mut self, layout: &'a PipelineLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn shader(mut self, shader: &'a ShaderModule) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn blend(mut self, blend: Option<BlendState>) -> Self {
        self.blend = blend;
        self
    }

    pub fn build(self, device: &Device) -> Result<RenderPipeline, GpuError> {
        let shader = self.shader.ok_or(GpuError::Pipeline("shader module required"))?;

        Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: self.label,
            layout: self.layout,
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some(self.vertex_entry),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(self.fragment_entry),
                targets: &[Some(ColorTargetState {
                    format: self.format,
                    blend: self.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        }))
    }
}

pub fn create_pipeline_layout(
    device: &Device,
    label: &'static str,
    layouts: &[&BindGroupLayout],
) -> PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        immediate_size: 0,
    })
}

/// Compile one of the bundled WGSL sources.
pub fn create_shader(device: &Device, label: &'static str, source: &'static str) -> ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;

    #[tokio::test]
    async fn test_builder_requires_shader() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let result = RenderPipelineBuilder::new("no_shader").build(&ctx.device);
        assert!(matches!(result, Err(GpuError::Pipeline(_))));
    }
}
