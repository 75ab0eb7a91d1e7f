//! Resource cache, renderer and the backend seam.
//!
//! `RenderBackend` is implemented by the wgpu backend (`gpu::GpuBackend`) and
//! by a software backend (`CpuBackend`) that evaluates the compositor
//! functions per pixel. The renderer and frame coordinator are generic over
//! it, so the same cache and invalidation logic drives either.

pub mod cache;
pub mod cpu;
pub mod renderer;

pub use cache::{ResourceCache, ResourceHandle};
pub use cpu::CpuBackend;
pub use renderer::{
    BufferHandle, CompositeParams, RegenerationCounts, SlotResources, TextureHandle, WaveformRenderer,
};

use crate::compositor::{BandPalette, PixelRect, PlayheadStyle, Rgba, ViewportSize};
use crate::gpu::GpuError;
use crate::waveform::BandPoint;
use image::RgbaImage;

/// Errors raised by backends and renderer setup.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Failed to create {what}: {reason}")]
    ResourceCreation { what: &'static str, reason: String },
    #[error("Degenerate input: {0}")]
    DegenerateInput(&'static str),
}

/// Rendering strategy, selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Pre-rasterize each phrase once, scroll a window over it per frame.
    #[default]
    Texture,
    /// Classify every pixel from raw amplitude triples per frame; supports zoom.
    Direct,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Texture, Strategy::Direct];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Texture => "texture",
            Strategy::Direct => "direct",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which per-frame draw a pass belongs to.
///
/// Backends that batch a frame into one submission keep separate uniform
/// storage per role so draws never alias each other's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassRole {
    Main,
    Branch,
}

/// One scroll-strategy draw.
#[derive(Debug, Clone, Copy)]
pub struct ScrollPass {
    pub role: PassRole,
    pub viewport: PixelRect,
    pub progress: f32,
    pub alpha: f32,
}

/// One direct-strategy draw.
#[derive(Debug, Clone, Copy)]
pub struct DirectPass {
    pub role: PassRole,
    pub viewport: PixelRect,
    pub progress: f32,
    pub alpha: f32,
    pub zoom_level: f32,
    pub palette: BandPalette,
}

/// The stationary playhead overlay.
#[derive(Debug, Clone, Copy)]
pub struct PlayheadPass {
    pub viewport: ViewportSize,
    pub tint: Rgba,
    pub style: PlayheadStyle,
}

/// A device that can hold waveform resources and composite frames.
///
/// Draws are issued between `begin_frame` and `end_frame`; only the render
/// thread calls any of these.
pub trait RenderBackend {
    /// Pre-rasterized phrase image.
    type Texture;
    /// Interleaved (low, mid, high) triples.
    type Buffer;
    /// Drawable the frame is composited into.
    type Target;

    fn name(&self) -> &'static str;

    /// Largest texture edge the device accepts.
    fn max_texture_dimension(&self) -> u32;

    fn upload_texture(&mut self, image: &RgbaImage, label: &str) -> Result<Self::Texture, RenderError>;

    fn upload_buffer(&mut self, points: &[BandPoint], label: &str) -> Result<Self::Buffer, RenderError>;

    /// Number of triples held by `buffer`.
    fn point_count(&self, buffer: &Self::Buffer) -> usize;

    /// Offscreen drawable, for headless rendering.
    fn create_target(&mut self, size: ViewportSize) -> Result<Self::Target, RenderError>;

    fn target_size(&self, target: &Self::Target) -> ViewportSize;

    fn begin_frame(&mut self, target: &mut Self::Target, clear: Rgba);

    fn draw_scroll(&mut self, target: &mut Self::Target, texture: &Self::Texture, pass: &ScrollPass);

    fn draw_direct(&mut self, target: &mut Self::Target, buffer: &Self::Buffer, pass: &DirectPass);

    fn draw_playhead(&mut self, target: &mut Self::Target, pass: &PlayheadPass);

    /// Submit everything recorded since `begin_frame`.
    fn end_frame(&mut self, target: &mut Self::Target);

    /// Block until every submitted frame has finished executing on the device.
    fn finish(&mut self);
}
