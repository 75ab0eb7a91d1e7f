//! Phrase waveform data and its producers.
//!
//! This module provides:
//! - `WaveformData`: immutable low/mid/high amplitude envelopes for one phrase
//! - `PhraseId`: the opaque cache key owned by the phrase graph
//! - The `WaveformGenerator` seam plus a worker pool that runs it off the render thread
//! - Deterministic synthetic waveforms for tests and benchmarks

pub mod generator;
pub mod synth;

pub use generator::{GenerationJob, GenerationResult, GenerationWorker, WaveformGenerator};
pub use synth::SyntheticGenerator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default number of points per phrase in the phrase-graph export.
pub const DEFAULT_POINT_COUNT: usize = 500;

/// Errors produced while building waveform data.
#[derive(Debug, thiserror::Error)]
pub enum WaveformError {
    #[error("Band lengths differ: low={low}, mid={mid}, high={high}")]
    LengthMismatch { low: usize, mid: usize, high: usize },
    #[error("Declared point count {declared} does not match band length {actual}")]
    PointCountMismatch { declared: usize, actual: usize },
    #[error("Invalid waveform JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opaque phrase identity, used only as a cache key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhraseId(Arc<str>);

impl PhraseId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PhraseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhraseId({})", self.0)
    }
}

impl fmt::Display for PhraseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhraseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PhraseId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// One interleaved (low, mid, high) amplitude triple.
///
/// Layout matches the direct-strategy storage buffer exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BandPoint {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl BandPoint {
    pub fn new(low: f32, mid: f32, high: f32) -> Self {
        Self { low, mid, high }
    }
}

/// Three parallel band envelopes for a phrase, values in [0, 1].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformData {
    low: Vec<f32>,
    mid: Vec<f32>,
    high: Vec<f32>,
}

/// Phrase-graph export format: `{ "low": [...], "mid": [...], "high": [...], "points": N }`.
#[derive(Debug, Serialize, Deserialize)]
struct WaveformJson {
    low: Vec<f32>,
    mid: Vec<f32>,
    high: Vec<f32>,
    #[serde(default)]
    points: Option<usize>,
}

impl WaveformData {
    /// Build from three equally long band envelopes. Values are clamped into [0, 1].
    pub fn new(low: Vec<f32>, mid: Vec<f32>, high: Vec<f32>) -> Result<Self, WaveformError> {
        if low.len() != mid.len() || low.len() != high.len() {
            return Err(WaveformError::LengthMismatch {
                low: low.len(),
                mid: mid.len(),
                high: high.len(),
            });
        }

        let clamp = |band: Vec<f32>| -> Vec<f32> {
            band.into_iter()
                .map(|v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 })
                .collect()
        };

        Ok(Self {
            low: clamp(low),
            mid: clamp(mid),
            high: clamp(high),
        })
    }

    /// A waveform with the same amplitude triple at every point.
    pub fn constant(point_count: usize, low: f32, mid: f32, high: f32) -> Self {
        Self {
            low: vec![low.clamp(0.0, 1.0); point_count],
            mid: vec![mid.clamp(0.0, 1.0); point_count],
            high: vec![high.clamp(0.0, 1.0); point_count],
        }
    }

    /// Decode the phrase-graph JSON export.
    pub fn from_json(json: &str) -> Result<Self, WaveformError> {
        let raw: WaveformJson = serde_json::from_str(json)?;
        if let Some(declared) = raw.points {
            if declared != raw.low.len() {
                return Err(WaveformError::PointCountMismatch {
                    declared,
                    actual: raw.low.len(),
                });
            }
        }
        Self::new(raw.low, raw.mid, raw.high)
    }

    /// Encode into the phrase-graph JSON export.
    pub fn to_json(&self) -> Result<String, WaveformError> {
        let raw = WaveformJson {
            low: self.low.clone(),
            mid: self.mid.clone(),
            high: self.high.clone(),
            points: Some(self.point_count()),
        };
        Ok(serde_json::to_string(&raw)?)
    }

    /// Rescale each band independently so its peak is 1.0.
    ///
    /// Bass carries far more energy than highs, so a shared scale would flatten the upper bands.
    pub fn normalized(&self) -> Self {
        fn scale(band: &[f32]) -> Vec<f32> {
            let peak = band.iter().copied().fold(0.0f32, f32::max);
            if peak > 0.0 {
                band.iter().map(|&v| v / peak).collect()
            } else {
                band.to_vec()
            }
        }

        Self {
            low: scale(&self.low),
            mid: scale(&self.mid),
            high: scale(&self.high),
        }
    }

    pub fn point_count(&self) -> usize {
        self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }

    pub fn low(&self) -> &[f32] {
        &self.low
    }

    pub fn mid(&self) -> &[f32] {
        &self.mid
    }

    pub fn high(&self) -> &[f32] {
        &self.high
    }

    /// Amplitude triple at `index`, if in range.
    pub fn point(&self, index: usize) -> Option<BandPoint> {
        Some(BandPoint {
            low: *self.low.get(index)?,
            mid: *self.mid.get(index)?,
            high: *self.high.get(index)?,
        })
    }

    /// Interleave the bands into one triple per point.
    pub fn interleaved(&self) -> Vec<BandPoint> {
        self.low
            .iter()
            .zip(&self.mid)
            .zip(&self.high)
            .map(|((&low, &mid), &high)| BandPoint { low, mid, high })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_mismatched_lengths() {
        let result = WaveformData::new(vec![0.1; 4], vec![0.1; 3], vec![0.1; 4]);
        assert!(matches!(
            result,
            Err(WaveformError::LengthMismatch { low: 4, mid: 3, high: 4 })
        ));
    }

    #[test]
    fn test_new_clamps_values() {
        let data = WaveformData::new(vec![1.5, -0.2], vec![0.5, f32::NAN], vec![0.0, 1.0]).unwrap();
        assert_eq!(data.low(), &[1.0, 0.0]);
        assert_eq!(data.mid(), &[0.5, 0.0]);
    }

    #[test]
    fn test_from_json_export_format() {
        let json = r#"{"low":[0.1,0.9],"mid":[0.2,0.3],"high":[0.0,0.4],"points":2}"#;
        let data = WaveformData::from_json(json).unwrap();
        assert_eq!(data.point_count(), 2);
        assert_eq!(data.point(1), Some(BandPoint::new(0.9, 0.3, 0.4)));
    }

    #[test]
    fn test_from_json_point_count_mismatch() {
        let json = r#"{"low":[0.1],"mid":[0.2],"high":[0.0],"points":500}"#;
        assert!(matches!(
            WaveformData::from_json(json),
            Err(WaveformError::PointCountMismatch { declared: 500, actual: 1 })
        ));
    }

    #[test]
    fn test_normalized_scales_bands_independently() {
        let data = WaveformData::new(vec![0.2, 0.4], vec![0.1, 0.05], vec![0.0, 0.0]).unwrap();
        let norm = data.normalized();
        assert_eq!(norm.low(), &[0.5, 1.0]);
        assert_eq!(norm.mid(), &[1.0, 0.5]);
        assert_eq!(norm.high(), &[0.0, 0.0]);
    }

    #[test]
    fn test_interleaved_layout() {
        let data = WaveformData::constant(3, 0.8, 0.5, 0.2);
        let points = data.interleaved();
        assert_eq!(points.len(), 3);
        let floats: &[f32] = bytemuck::cast_slice(&points);
        assert_eq!(&floats[0..3], &[0.8, 0.5, 0.2]);
    }
}
