//! Whole-phrase rasterization for the texture strategy.

use super::{row_distance, BandPalette, BandThresholds};
use crate::waveform::WaveformData;
use image::{Rgba as Pixel, RgbaImage};

/// Rasterize one column per point into a `point_count × height` image.
///
/// Each column holds three mirrored bars: bass nearest the vertical center,
/// mid next, high outermost. Pixels outside the total band height stay fully
/// transparent. Returns `None` for an empty waveform or zero height.
pub fn rasterize_waveform(
    waveform: &WaveformData,
    height: u32,
    palette: &BandPalette,
) -> Option<RgbaImage> {
    let width = u32::try_from(waveform.point_count()).ok()?;
    if width == 0 || height == 0 {
        return None;
    }

    let half_extent = height as f32 * 0.5;
    let colors = [
        palette.low.to_rgba8(),
        palette.mid.to_rgba8(),
        palette.high.to_rgba8(),
    ];
    let mut image = RgbaImage::new(width, height);

    for (x, point) in waveform.interleaved().into_iter().enumerate() {
        let thresholds = BandThresholds::new(point, half_extent);
        // Rows are symmetric; walk the top half and mirror
        for y in 0..height.div_ceil(2) {
            let Some(band) = thresholds.classify(row_distance(y, height)) else {
                continue;
            };
            let px = Pixel(colors[band as usize]);
            image.put_pixel(x as u32, y, px);
            image.put_pixel(x as u32, height - 1 - y, px);
        }
    }

    Some(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::Rgba;

    #[test]
    fn test_raster_dimensions() {
        let data = WaveformData::constant(500, 0.8, 0.5, 0.2);
        let image = rasterize_waveform(&data, 120, &BandPalette::default()).unwrap();
        assert_eq!(image.dimensions(), (500, 120));
    }

    #[test]
    fn test_raster_band_layout() {
        let palette = BandPalette::default();
        let data = WaveformData::constant(500, 0.8, 0.5, 0.2);
        let image = rasterize_waveform(&data, 120, &palette).unwrap();

        // half extent 60: bass < 16 px, mid < 26 px, high < 30 px from center
        let at = |y: u32| Rgba::from_rgba8(image.get_pixel(250, y).0);
        assert_eq!(at(60).to_rgba8(), palette.low.to_rgba8());
        assert_eq!(at(59).to_rgba8(), palette.low.to_rgba8());
        assert_eq!(at(40).to_rgba8(), palette.mid.to_rgba8());
        assert_eq!(at(32).to_rgba8(), palette.high.to_rgba8());
        assert_eq!(at(29).a, 0.0);
        assert_eq!(at(20).a, 0.0);
        assert_eq!(at(0).a, 0.0);
        assert_eq!(at(119).a, 0.0);
    }

    #[test]
    fn test_raster_is_mirrored() {
        let data = WaveformData::new(vec![0.3, 1.0], vec![0.6, 0.1], vec![0.9, 0.4]).unwrap();
        let image = rasterize_waveform(&data, 63, &BandPalette::default()).unwrap();
        for x in 0..2 {
            for y in 0..63 {
                assert_eq!(image.get_pixel(x, y), image.get_pixel(x, 62 - y));
            }
        }
    }

    #[test]
    fn test_raster_degenerate_input() {
        let palette = BandPalette::default();
        let empty = WaveformData::constant(0, 0.5, 0.5, 0.5);
        assert!(rasterize_waveform(&empty, 120, &palette).is_none());
        let data = WaveformData::constant(10, 0.5, 0.5, 0.5);
        assert!(rasterize_waveform(&data, 0, &palette).is_none());
    }
}
