//! Uniform blocks shared with the WGSL shaders.
//!
//! Field order and padding match the WGSL struct layouts exactly.

use crate::compositor::{BAND_SCALE, PLAYED_DIM, PLAYHEAD_U};
use crate::render::{DirectPass, PlayheadPass, ScrollPass};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScrollUniforms {
    pub progress: f32,
    pub alpha: f32,
    pub played_dim: f32,
    pub playhead_u: f32,
}

impl From<&ScrollPass> for ScrollUniforms {
    fn from(pass: &ScrollPass) -> Self {
        Self {
            progress: pass.progress,
            alpha: pass.alpha,
            played_dim: PLAYED_DIM,
            playhead_u: PLAYHEAD_U,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectUniforms {
    pub progress: f32,
    pub alpha: f32,
    pub played_dim: f32,
    pub playhead_u: f32,
    pub zoom: f32,
    pub point_count: f32,
    pub height: f32,
    pub band_scale: f32,
    pub low: [f32; 4],
    pub mid: [f32; 4],
    pub high: [f32; 4],
}

impl DirectUniforms {
    pub fn new(pass: &DirectPass, point_count: usize) -> Self {
        Self {
            progress: pass.progress,
            alpha: pass.alpha,
            played_dim: PLAYED_DIM,
            playhead_u: PLAYHEAD_U,
            zoom: crate::compositor::direct::effective_zoom(pass.zoom_level),
            point_count: point_count as f32,
            height: pass.viewport.height as f32,
            band_scale: BAND_SCALE,
            low: pass.palette.low.to_array(),
            mid: pass.palette.mid.to_array(),
            high: pass.palette.high.to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PlayheadUniforms {
    pub tint: [f32; 4],
    pub size: [f32; 2],
    pub line_width: f32,
    pub marker_width: f32,
    pub marker_height: f32,
    pub playhead_u: f32,
    pub _padding: [f32; 2],
}

impl From<&PlayheadPass> for PlayheadUniforms {
    fn from(pass: &PlayheadPass) -> Self {
        Self {
            tint: pass.tint.to_array(),
            size: [pass.viewport.width as f32, pass.viewport.height as f32],
            line_width: pass.style.line_width,
            marker_width: pass.style.marker_width,
            marker_height: pass.style.marker_height,
            playhead_u: PLAYHEAD_U,
            _padding: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<ScrollUniforms>(), 16);
        assert_eq!(std::mem::size_of::<DirectUniforms>(), 80);
        assert_eq!(std::mem::size_of::<PlayheadUniforms>(), 48);
    }
}
