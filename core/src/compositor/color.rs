//! Colors for bands and the playhead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Straight (non-premultiplied) RGBA color, components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Scale the alpha channel only.
    pub fn fade(self, factor: f32) -> Self {
        Self {
            a: self.a * factor,
            ..self
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub fn from_rgba8(px: [u8; 4]) -> Self {
        Self::new(
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
            px[3] as f32 / 255.0,
        )
    }

    /// Source-over blend of `self` on top of `dst`.
    pub fn over(self, dst: Self) -> Self {
        let a = self.a + dst.a * (1.0 - self.a);
        if a <= 0.0 {
            return Self::TRANSPARENT;
        }
        let mix = |s: f32, d: f32| (s * self.a + d * dst.a * (1.0 - self.a)) / a;
        Self::new(mix(self.r, dst.r), mix(self.g, dst.g), mix(self.b, dst.b), a)
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional). Alpha defaults to opaque.
pub fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let hex = hex.trim_start_matches('#');
    if (hex.len() != 6 && hex.len() != 8) || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| -> Option<f32> {
        Some(u8::from_str_radix(&hex[i..i + 2], 16).ok()? as f32 / 255.0)
    };
    let a = if hex.len() == 8 { channel(6)? } else { 1.0 };
    Some(Rgba::new(channel(0)?, channel(2)?, channel(4)?, a))
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_hex_color(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color: {raw}")))
    }
}

/// One of the three frequency bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    Mid,
    High,
}

/// Per-band fill colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPalette {
    pub low: Rgba,
    pub mid: Rgba,
    pub high: Rgba,
}

impl Default for BandPalette {
    fn default() -> Self {
        Self {
            low: Rgba::new(0xF2 as f32 / 255.0, 0x40 as f32 / 255.0, 0x3A as f32 / 255.0, 1.0),
            mid: Rgba::new(0x3A as f32 / 255.0, 0xD9 as f32 / 255.0, 0x6B as f32 / 255.0, 1.0),
            high: Rgba::new(0x4A as f32 / 255.0, 0x8C as f32 / 255.0, 0xFF as f32 / 255.0, 1.0),
        }
    }
}

impl BandPalette {
    pub fn color(&self, band: Band) -> Rgba {
        match band {
            Band::Low => self.low,
            Band::Mid => self.mid,
            Band::High => self.high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ffffff"), Some(Rgba::WHITE));
        assert_eq!(parse_hex_color("000000"), Some(Rgba::BLACK));
        assert_eq!(parse_hex_color("#00000000"), Some(Rgba::TRANSPARENT));
        assert_eq!(
            parse_hex_color("#FF000080").map(|c| c.to_rgba8()),
            Some([255, 0, 0, 128])
        );
        assert_eq!(parse_hex_color("invalid"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn test_hex_round_trip_through_serde() {
        let color: Rgba = serde_json::from_str("\"#3AD96BFF\"").unwrap();
        assert_eq!(serde_json::to_string(&color).unwrap(), "\"#3AD96BFF\"");
        assert!(serde_json::from_str::<Rgba>("\"nope\"").is_err());
    }

    #[test]
    fn test_over_opaque_source_wins() {
        let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(red.over(Rgba::BLACK), red);
    }

    #[test]
    fn test_over_transparent_source_keeps_destination() {
        assert_eq!(Rgba::TRANSPARENT.over(Rgba::WHITE), Rgba::WHITE);
    }

    #[test]
    fn test_palette_lookup() {
        let palette = BandPalette::default();
        assert_eq!(palette.color(Band::Mid), palette.mid);
        assert_eq!(palette.low.to_rgba8(), [0xF2, 0x40, 0x3A, 0xFF]);
    }
}
