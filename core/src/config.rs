//! Runtime render settings, loaded from JSON.

use crate::compositor::{parse_hex_color, PlayheadStyle, Rgba};
use crate::render::Strategy;
use serde::Deserialize;
use std::path::Path;

/// Smallest zoom the direct strategy accepts.
pub const MIN_ZOOM_LEVEL: f32 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid tint color: {0}")]
    InvalidColor(String),
    #[error("Invalid zoom level: {0}")]
    InvalidZoom(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub target_refresh_rate_hz: u32,
    pub strategy: Strategy,
    /// Direct strategy only.
    pub zoom_level: f32,
    pub tint_color: Rgba,
    pub playhead: PlayheadStyle,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            target_refresh_rate_hz: default_refresh_rate(),
            strategy: Strategy::default(),
            zoom_level: default_zoom(),
            tint_color: Rgba::WHITE,
            playhead: PlayheadStyle::default(),
        }
    }
}

/// On-disk shape; the color stays a string so a bad value maps to `InvalidColor`.
#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default = "default_refresh_rate")]
    target_refresh_rate_hz: u32,
    #[serde(default)]
    strategy: Strategy,
    #[serde(default = "default_zoom")]
    zoom_level: f32,
    #[serde(default = "default_tint")]
    tint_color: String,
    #[serde(default)]
    playhead: PlayheadStyle,
}

fn default_refresh_rate() -> u32 {
    120
}

fn default_zoom() -> f32 {
    1.0
}

fn default_tint() -> String {
    "#FFFFFFFF".into()
}

impl RenderSettings {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_str(json)?;

        let tint_color =
            parse_hex_color(&raw.tint_color).ok_or_else(|| ConfigError::InvalidColor(raw.tint_color.clone()))?;

        if !raw.zoom_level.is_finite() {
            return Err(ConfigError::InvalidZoom(raw.zoom_level));
        }
        let zoom_level = if raw.zoom_level < MIN_ZOOM_LEVEL {
            log::warn!(
                "zoom_level {} below minimum, clamping to {}",
                raw.zoom_level,
                MIN_ZOOM_LEVEL
            );
            MIN_ZOOM_LEVEL
        } else {
            raw.zoom_level
        };

        Ok(Self {
            target_refresh_rate_hz: raw.target_refresh_rate_hz.max(1),
            strategy: raw.strategy,
            zoom_level,
            tint_color,
            playhead: raw.playhead,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&content)?;
        log::info!(
            "Loaded render settings from {}: {} at {} Hz",
            path.as_ref().display(),
            settings.strategy,
            settings.target_refresh_rate_hz
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let settings = RenderSettings::from_json_str("{}").unwrap();
        assert_eq!(settings, RenderSettings::default());
    }

    #[test]
    fn test_full_settings() {
        let settings = RenderSettings::from_json_str(
            r##"{
                "target_refresh_rate_hz": 60,
                "strategy": "direct",
                "zoom_level": 2.5,
                "tint_color": "#FF8000",
                "playhead": { "line_width": 3.0 }
            }"##,
        )
        .unwrap();

        assert_eq!(settings.target_refresh_rate_hz, 60);
        assert_eq!(settings.strategy, Strategy::Direct);
        assert_eq!(settings.zoom_level, 2.5);
        assert_eq!(settings.tint_color.to_rgba8(), [255, 128, 0, 255]);
        assert_eq!(settings.playhead.line_width, 3.0);
        assert_eq!(settings.playhead.marker_width, PlayheadStyle::default().marker_width);
    }

    #[test]
    fn test_small_zoom_is_clamped() {
        let settings = RenderSettings::from_json_str(r#"{ "zoom_level": 0.01 }"#).unwrap();
        assert_eq!(settings.zoom_level, MIN_ZOOM_LEVEL);
    }

    #[test]
    fn test_invalid_color() {
        let err = RenderSettings::from_json_str(r#"{ "tint_color": "orange" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidColor(c) if c == "orange"));
    }

    #[test]
    fn test_unknown_strategy_is_parse_error() {
        let err = RenderSettings::from_json_str(r#"{ "strategy": "hybrid" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "strategy": "direct", "zoom_level": 4.0 }}"#).unwrap();

        let settings = RenderSettings::load(file.path()).unwrap();
        assert_eq!(settings.strategy, Strategy::Direct);
        assert_eq!(settings.zoom_level, 4.0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RenderSettings::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
