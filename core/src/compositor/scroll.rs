//! Scroll compositor: a shifted window over a pre-rasterized phrase texture.
//!
//! `texture_u` ties the visual playhead to playback: the waveform position
//! equal to `progress` always lands at screen center. Coordinates are clamped,
//! never wrapped, so a window past either end repeats the edge texel.

use super::{Rgba, PLAYED_DIM, PLAYHEAD_U};
use image::RgbaImage;

/// Horizontal texture coordinate sampled at `screen_u` for playback `progress`.
#[inline]
pub fn texture_u(progress: f32, screen_u: f32) -> f32 {
    (progress + (screen_u - PLAYHEAD_U)).clamp(0.0, 1.0)
}

/// Alpha multiplier for a screen column: dimmed left of the playhead.
#[inline]
pub fn played_alpha(screen_u: f32) -> f32 {
    if screen_u < PLAYHEAD_U {
        PLAYED_DIM
    } else {
        1.0
    }
}

/// Nearest texel index for a clamped coordinate.
#[inline]
pub fn texel_index(coord: f32, size: u32) -> u32 {
    let max = size.saturating_sub(1);
    ((coord * size as f32).floor() as i64).clamp(0, max as i64) as u32
}

/// Sample `texture` at screen position (`screen_u`, `screen_v`) for one draw at base `alpha`.
pub fn shade(texture: &RgbaImage, progress: f32, alpha: f32, screen_u: f32, screen_v: f32) -> Rgba {
    let (width, height) = texture.dimensions();
    if width == 0 || height == 0 {
        return Rgba::TRANSPARENT;
    }

    let u = texture_u(progress, screen_u);
    let x = texel_index(u, width);
    let y = texel_index(screen_v.clamp(0.0, 1.0), height);

    Rgba::from_rgba8(texture.get_pixel(x, y).0).fade(alpha * played_alpha(screen_u))
}
