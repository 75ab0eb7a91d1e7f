//! Software backend.
//!
//! Evaluates the compositor functions once per covered pixel and blends into
//! an `RgbaImage`. Used for headless rendering, tests, and as the baseline
//! in strategy benchmarks when no adapter is available.

use super::{DirectPass, PlayheadPass, RenderBackend, RenderError, ScrollPass};
use crate::compositor::direct::DirectShading;
use crate::compositor::{scroll, Rgba, ViewportSize};
use crate::waveform::BandPoint;
use image::{Rgba as Pixel, RgbaImage};

/// Default texture edge limit, matching the common wgpu downlevel limit.
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

#[derive(Debug, Clone)]
pub struct CpuBackend {
    max_texture_dimension: u32,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::with_max_texture_dimension(DEFAULT_MAX_TEXTURE_DIMENSION)
    }

    pub fn with_max_texture_dimension(max_texture_dimension: u32) -> Self {
        Self {
            max_texture_dimension,
        }
    }
}

#[inline]
fn blend(target: &mut RgbaImage, x: u32, y: u32, color: Rgba) {
    if color.a <= 0.0 {
        return;
    }
    let dst = Rgba::from_rgba8(target.get_pixel(x, y).0);
    target.put_pixel(x, y, Pixel(color.over(dst).to_rgba8()));
}

impl RenderBackend for CpuBackend {
    type Texture = RgbaImage;
    type Buffer = Vec<BandPoint>;
    type Target = RgbaImage;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    fn upload_texture(&mut self, image: &RgbaImage, _label: &str) -> Result<RgbaImage, RenderError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::DegenerateInput("zero-sized texture"));
        }
        if width > self.max_texture_dimension || height > self.max_texture_dimension {
            return Err(RenderError::ResourceCreation {
                what: "texture",
                reason: format!("{width}x{height} exceeds {}", self.max_texture_dimension),
            });
        }
        Ok(image.clone())
    }

    fn upload_buffer(&mut self, points: &[BandPoint], _label: &str) -> Result<Vec<BandPoint>, RenderError> {
        if points.is_empty() {
            return Err(RenderError::DegenerateInput("empty point buffer"));
        }
        Ok(points.to_vec())
    }

    fn point_count(&self, buffer: &Vec<BandPoint>) -> usize {
        buffer.len()
    }

    fn create_target(&mut self, size: ViewportSize) -> Result<RgbaImage, RenderError> {
        Ok(RgbaImage::new(size.width, size.height))
    }

    fn target_size(&self, target: &RgbaImage) -> ViewportSize {
        ViewportSize::new(target.width(), target.height())
    }

    fn begin_frame(&mut self, target: &mut RgbaImage, clear: Rgba) {
        let px = Pixel(clear.to_rgba8());
        for pixel in target.pixels_mut() {
            *pixel = px;
        }
    }

    fn draw_scroll(&mut self, target: &mut RgbaImage, texture: &RgbaImage, pass: &ScrollPass) {
        let rect = pass.viewport;
        if rect.is_empty() {
            return;
        }
        let x_end = (rect.x + rect.width).min(target.width());
        let y_end = (rect.y + rect.height).min(target.height());

        for y in rect.y..y_end {
            for x in rect.x..x_end {
                let (u, v) = rect.uv(x, y);
                let color = scroll::shade(texture, pass.progress, pass.alpha, u, v);
                blend(target, x, y, color);
            }
        }
    }

    fn draw_direct(&mut self, target: &mut RgbaImage, buffer: &Vec<BandPoint>, pass: &DirectPass) {
        let rect = pass.viewport;
        if rect.is_empty() {
            return;
        }
        let shading = DirectShading {
            points: buffer,
            palette: &pass.palette,
            progress: pass.progress,
            alpha: pass.alpha,
            zoom_level: pass.zoom_level,
            height: rect.height,
        };
        let x_end = (rect.x + rect.width).min(target.width());
        let y_end = (rect.y + rect.height).min(target.height());

        for x in rect.x..x_end {
            let (u, _) = rect.uv(x, rect.y);
            let Some(point) = shading.column_point(u) else {
                continue;
            };
            for y in rect.y..y_end {
                blend(target, x, y, shading.shade_point(point, u, y - rect.y));
            }
        }
    }

    fn draw_playhead(&mut self, target: &mut RgbaImage, pass: &PlayheadPass) {
        let viewport = pass.viewport;
        let height = viewport.height.min(target.height());
        let span = pass.style.column_span(viewport);

        for x in span.start..span.end.min(target.width()) {
            for y in 0..height {
                if pass.style.covers(x, y, viewport) {
                    blend(target, x, y, pass.tint);
                }
            }
        }
    }

    fn end_frame(&mut self, _target: &mut RgbaImage) {}

    fn finish(&mut self) {}
}
