//! Compositing math shared by every rendering backend.
//!
//! Everything here is pure CPU code. The WGSL shaders in `gpu/shaders`
//! evaluate the same formulas; the software backend calls these functions
//! directly, which keeps the two paths pixel-compatible and testable.
//!
//! - `raster`: whole-phrase rasterization for the texture strategy
//! - `scroll`: the scrolling window over a pre-rasterized texture
//! - `direct`: per-frame synthesis from raw amplitude triples, with zoom
//! - `playhead`: the stationary center-line and marker

pub mod color;
pub mod direct;
pub mod playhead;
pub mod raster;
pub mod scroll;

pub use color::{parse_hex_color, Band, BandPalette, Rgba};
pub use playhead::PlayheadStyle;

use crate::waveform::BandPoint;
use serde::{Deserialize, Serialize};

/// Alpha multiplier applied left of the playhead (already played).
pub const PLAYED_DIM: f32 = 0.35;

/// Fixed alpha of the branch-alternative overlay.
pub const BRANCH_ALPHA: f32 = 0.8;

/// Fraction of the half-extent each band may occupy at full amplitude.
pub const BAND_SCALE: f32 = 1.0 / 3.0;

/// Screen-space position of the playhead.
pub const PLAYHEAD_U: f32 = 0.5;

/// Viewport size in physical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Zero-area viewports render nothing.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn full_rect(&self) -> PixelRect {
        PixelRect {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }

    /// Lower half of the viewport, used for the branch overlay.
    pub fn lower_half(&self) -> PixelRect {
        let top = self.height / 2;
        PixelRect {
            x: 0,
            y: top,
            width: self.width,
            height: self.height - top,
        }
    }
}

/// Axis-aligned pixel rectangle (draw viewport).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Normalized coordinates of the center of pixel (`px`, `py`) inside this rect.
    #[inline]
    pub fn uv(&self, px: u32, py: u32) -> (f32, f32) {
        let u = ((px - self.x) as f32 + 0.5) / self.width as f32;
        let v = ((py - self.y) as f32 + 0.5) / self.height as f32;
        (u, v)
    }
}

/// Cumulative distance thresholds from the vertical center, in pixels.
///
/// `bass <= mid <= high`; a pixel belongs to the innermost band whose
/// threshold exceeds its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandThresholds {
    pub bass: f32,
    pub mid: f32,
    pub high: f32,
}

impl BandThresholds {
    pub fn new(point: BandPoint, half_extent: f32) -> Self {
        let scale = half_extent * BAND_SCALE;
        let bass = point.low * scale;
        let mid = bass + point.mid * scale;
        let high = mid + point.high * scale;
        Self { bass, mid, high }
    }

    /// Which band covers a pixel `distance` pixels from center, if any.
    #[inline]
    pub fn classify(&self, distance: f32) -> Option<Band> {
        if distance < self.bass {
            Some(Band::Low)
        } else if distance < self.mid {
            Some(Band::Mid)
        } else if distance < self.high {
            Some(Band::High)
        } else {
            None
        }
    }
}

/// Distance of pixel row `row` (center sample) from the middle of a `height`-pixel column.
#[inline]
pub fn row_distance(row: u32, height: u32) -> f32 {
    (row as f32 + 0.5 - height as f32 * 0.5).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_cumulative() {
        let t = BandThresholds::new(BandPoint::new(0.8, 0.5, 0.2), 60.0);
        assert!((t.bass - 16.0).abs() < 1e-4);
        assert!((t.mid - 26.0).abs() < 1e-4);
        assert!((t.high - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_classify_bands_by_distance() {
        let t = BandThresholds::new(BandPoint::new(0.8, 0.5, 0.2), 60.0);
        assert_eq!(t.classify(0.5), Some(Band::Low));
        assert_eq!(t.classify(15.5), Some(Band::Low));
        assert_eq!(t.classify(16.5), Some(Band::Mid));
        assert_eq!(t.classify(27.5), Some(Band::High));
        assert_eq!(t.classify(30.5), None);
    }

    #[test]
    fn test_zero_amplitude_classifies_nothing() {
        let t = BandThresholds::new(BandPoint::default(), 60.0);
        assert_eq!(t.classify(0.0), None);
    }

    #[test]
    fn test_row_distance_is_symmetric() {
        assert_eq!(row_distance(59, 120), row_distance(60, 120));
        assert_eq!(row_distance(0, 120), 59.5);
    }

    #[test]
    fn test_lower_half_rect() {
        let rect = ViewportSize::new(100, 81).lower_half();
        assert_eq!(rect.y, 40);
        assert_eq!(rect.height, 41);
    }
}
