//! Stationary playhead at screen center: a vertical line plus a small
//! downward-pointing triangle marker along the top edge.

use super::{ViewportSize, PLAYHEAD_U};
use serde::{Deserialize, Serialize};

/// Playhead geometry in pixels. Cosmetic; tune per display density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayheadStyle {
    pub line_width: f32,
    pub marker_width: f32,
    pub marker_height: f32,
}

impl Default for PlayheadStyle {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            marker_width: 10.0,
            marker_height: 8.0,
        }
    }
}

impl PlayheadStyle {
    /// Whether pixel (`px`, `py`) is covered by the playhead in `viewport`.
    pub fn covers(&self, px: u32, py: u32, viewport: ViewportSize) -> bool {
        let center = viewport.width as f32 * PLAYHEAD_U;
        let dx = (px as f32 + 0.5 - center).abs();

        if dx < self.line_width * 0.5 {
            return true;
        }

        let y = py as f32 + 0.5;
        if self.marker_height > 0.0 && y < self.marker_height {
            let half = self.marker_width * 0.5 * (1.0 - y / self.marker_height);
            return dx < half;
        }
        false
    }

    /// Horizontal pixel span touched by the playhead, for clipped drawing.
    pub fn column_span(&self, viewport: ViewportSize) -> std::ops::Range<u32> {
        let center = viewport.width as f32 * PLAYHEAD_U;
        let half = self.line_width.max(self.marker_width) * 0.5;
        let start = (center - half).floor().max(0.0) as u32;
        let end = ((center + half).ceil() as u32).min(viewport.width);
        start..end
    }
}
