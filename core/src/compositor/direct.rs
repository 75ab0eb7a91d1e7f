//! Direct compositor: per-frame synthesis from raw amplitude triples.
//!
//! Same dimming and playhead rule as the scroll compositor, but the visible
//! window spans `1 / zoom` of the phrase and each column reads the nearest
//! point directly instead of a pre-rasterized texel.

use super::scroll::played_alpha;
use super::{row_distance, BandPalette, BandThresholds, Rgba, PLAYHEAD_U};
use crate::waveform::BandPoint;

/// Smallest zoom factor honored.
pub const MIN_ZOOM: f32 = 0.1;

/// Clamp a requested zoom into the supported range.
#[inline]
pub fn effective_zoom(zoom_level: f32) -> f32 {
    if zoom_level.is_nan() {
        return 1.0;
    }
    zoom_level.max(MIN_ZOOM)
}

/// Fraction of the phrase visible at once.
#[inline]
pub fn visible_fraction(zoom_level: f32) -> f32 {
    1.0 / effective_zoom(zoom_level)
}

/// Horizontal phrase coordinate for `screen_u` with the window scaled by zoom.
#[inline]
pub fn texture_u(progress: f32, screen_u: f32, zoom_level: f32) -> f32 {
    (progress + (screen_u - PLAYHEAD_U) * visible_fraction(zoom_level)).clamp(0.0, 1.0)
}

/// Nearest point index for a phrase coordinate, always within `[0, point_count - 1]`.
#[inline]
pub fn sample_index(u: f32, point_count: usize) -> usize {
    if point_count == 0 {
        return 0;
    }
    let last = point_count - 1;
    let index = (u.clamp(0.0, 1.0) * last as f32).round() as usize;
    index.min(last)
}

/// Parameters shared by every pixel of one direct draw.
#[derive(Debug, Clone, Copy)]
pub struct DirectShading<'a> {
    pub points: &'a [BandPoint],
    pub palette: &'a BandPalette,
    pub progress: f32,
    pub alpha: f32,
    pub zoom_level: f32,
    /// Height of the draw viewport in pixels.
    pub height: u32,
}

impl DirectShading<'_> {
    /// Point feeding screen column `screen_u`.
    #[inline]
    pub fn column_point(&self, screen_u: f32) -> Option<BandPoint> {
        if self.points.is_empty() {
            return None;
        }
        let u = texture_u(self.progress, screen_u, self.zoom_level);
        self.points.get(sample_index(u, self.points.len())).copied()
    }

    /// Color of pixel row `row` in column `screen_u`.
    pub fn shade(&self, screen_u: f32, row: u32) -> Rgba {
        let Some(point) = self.column_point(screen_u) else {
            return Rgba::TRANSPARENT;
        };
        self.shade_point(point, screen_u, row)
    }

    /// Color of pixel row `row` for an already resolved column point.
    #[inline]
    pub fn shade_point(&self, point: BandPoint, screen_u: f32, row: u32) -> Rgba {
        let thresholds = BandThresholds::new(point, self.height as f32 * 0.5);
        match thresholds.classify(row_distance(row, self.height)) {
            Some(band) => self
                .palette
                .color(band)
                .fade(self.alpha * played_alpha(screen_u)),
            None => Rgba::TRANSPARENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{Band, PLAYED_DIM};

    #[test]
    fn test_zoom_is_clamped() {
        assert_eq!(effective_zoom(0.01), MIN_ZOOM);
        assert_eq!(effective_zoom(2.0), 2.0);
        assert!((visible_fraction(4.0) - 0.25).abs() < 1e-6);
        assert!((visible_fraction(0.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_one_matches_scroll_mapping() {
        for s in 0..=20 {
            let screen_u = s as f32 / 20.0;
            let scroll = crate::compositor::scroll::texture_u(0.4, screen_u);
            assert!((texture_u(0.4, screen_u, 1.0) - scroll).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zoom_narrows_window() {
        // zoom 2 shows a quarter phrase either side of the playhead
        assert!((texture_u(0.5, 1.0, 2.0) - 0.75).abs() < 1e-6);
        assert!((texture_u(0.5, 0.0, 2.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_index_monotonic_and_in_range() {
        for &point_count in &[1usize, 2, 7, 500, 4096] {
            for &zoom in &[0.05f32, 0.5, 1.0, 3.0, 16.0] {
                for p in 0..=8 {
                    let progress = p as f32 / 8.0;
                    let mut previous = 0usize;
                    for s in 0..=200 {
                        let screen_u = s as f32 / 200.0;
                        let index = sample_index(texture_u(progress, screen_u, zoom), point_count);
                        assert!(index < point_count);
                        assert!(index >= previous, "index decreased at screen_u={screen_u}");
                        previous = index;
                    }
                }
            }
        }
    }

    #[test]
    fn test_sample_index_rounds() {
        assert_eq!(sample_index(0.0, 500), 0);
        assert_eq!(sample_index(1.0, 500), 499);
        assert_eq!(sample_index(0.5, 501), 250);
        assert_eq!(sample_index(0.7, 0), 0);
    }

    #[test]
    fn test_shade_classifies_like_raster() {
        let palette = BandPalette::default();
        let points = vec![BandPoint::new(0.8, 0.5, 0.2); 500];
        let shading = DirectShading {
            points: &points,
            palette: &palette,
            progress: 0.5,
            alpha: 1.0,
            zoom_level: 1.0,
            height: 120,
        };
        assert_eq!(shading.shade(0.75, 60), palette.color(Band::Low));
        assert_eq!(shading.shade(0.75, 40), palette.color(Band::Mid));
        assert_eq!(shading.shade(0.75, 32), palette.color(Band::High));
        assert_eq!(shading.shade(0.75, 29), Rgba::TRANSPARENT);

        let dimmed = shading.shade(0.25, 60);
        assert!((dimmed.a - PLAYED_DIM).abs() < 1e-6);
    }

    #[test]
    fn test_shade_empty_points() {
        let palette = BandPalette::default();
        let shading = DirectShading {
            points: &[],
            palette: &palette,
            progress: 0.0,
            alpha: 1.0,
            zoom_level: 1.0,
            height: 10,
        };
        assert_eq!(shading.shade(0.5, 5), Rgba::TRANSPARENT);
    }
}
