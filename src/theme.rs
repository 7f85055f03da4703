use serde::{Deserialize, Serialize};
use std::fmt;

/// A color in blue-green-red channel order, the order annotation callers
/// usually carry around from their capture pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bgr(pub u8, pub u8, pub u8);

impl Bgr {
    pub const WHITE: Bgr = Bgr(255, 255, 255);
    pub const BLACK: Bgr = Bgr(0, 0, 0);

    pub fn blue(self) -> u8 {
        self.0
    }

    pub fn green(self) -> u8 {
        self.1
    }

    pub fn red(self) -> u8 {
        self.2
    }

    /// Brightens every channel by the same amount, at most 30, without
    /// saturating the brightest channel.
    pub fn lighter(self) -> Bgr {
        let brightest = self.0.max(self.1).max(self.2);
        let add = (255 - brightest).min(30);
        Bgr(self.0 + add, self.1 + add, self.2 + add)
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.2, self.1, self.0, 255)
    }

    /// Parses `#RRGGBB` (or `RRGGBB`). Note the textual form is RGB, as in CSS.
    pub fn from_hex(value: &str) -> Option<Bgr> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Bgr(channel(4..6)?, channel(2..4)?, channel(0..2)?))
    }
}

impl fmt::Display for Bgr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.2, self.1, self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub zone_color: Bgr,
    pub tag_background: Bgr,
    pub text_color: Bgr,
    pub zone_alpha: f32,
    pub tag_alpha: f32,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            zone_color: Bgr(110, 70, 45),
            tag_background: Bgr(20, 20, 20),
            text_color: Bgr::WHITE,
            zone_alpha: 0.9,
            tag_alpha: 0.75,
        }
    }

    pub fn contrast() -> Self {
        Self {
            zone_color: Bgr(0, 215, 255),
            tag_background: Bgr(0, 215, 255),
            text_color: Bgr::BLACK,
            zone_alpha: 1.0,
            tag_alpha: 0.9,
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "classic" | "default" => Some(Self::classic()),
            "contrast" | "high-contrast" => Some(Self::contrast()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lighter_caps_at_thirty() {
        assert_eq!(Bgr(110, 70, 45).lighter(), Bgr(140, 100, 75));
    }

    #[test]
    fn lighter_never_overflows() {
        assert_eq!(Bgr(240, 10, 0).lighter(), Bgr(255, 25, 15));
        assert_eq!(Bgr::WHITE.lighter(), Bgr::WHITE);
    }

    #[test]
    fn hex_is_read_as_rgb() {
        assert_eq!(Bgr::from_hex("#FF8000"), Some(Bgr(0, 128, 255)));
        assert_eq!(Bgr::from_hex("zzzzzz"), None);
        assert_eq!(Bgr::from_hex("#FFF"), None);
        assert_eq!(Bgr(0, 128, 255).to_string(), "#FF8000");
    }

    #[test]
    fn themes_resolve_by_name() {
        assert_eq!(Theme::by_name("Classic").map(|t| t.zone_color), Some(Bgr(110, 70, 45)));
        assert!(Theme::by_name("neon").is_none());
    }
}
