use crate::layout::{MAX_STROKE, Slot};
use crate::theme::{Bgr, Theme};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Drawing defaults applied to every zone unless the zone overrides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleDefaults {
    /// Opacity of zone strokes, 1.0 opaque and 0.0 invisible.
    pub alpha: f32,
    pub color: Bgr,
    pub thickness: i32,
    /// Gap in pixels between a zone and its label block.
    pub margin: i32,
    /// Also fill the zone interior at a third of `alpha`.
    pub filled: bool,
    pub peephole: bool,
    /// Draw the corner marks of the peephole, not only the edge midpoints.
    pub peephole_corners: bool,
    pub normalized: bool,
    pub closed_polygons: bool,
    /// Zone color keyed by the zone's first tag.
    pub color_by_tag: BTreeMap<String, Bgr>,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        let theme = Theme::classic();
        Self {
            alpha: theme.zone_alpha,
            color: theme.zone_color,
            thickness: 2,
            margin: 5,
            filled: false,
            peephole: true,
            peephole_corners: true,
            normalized: false,
            closed_polygons: false,
            color_by_tag: BTreeMap::new(),
        }
    }
}

/// Background of label blocks and free tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagStyle {
    pub alpha: f32,
    pub background: Bgr,
}

impl Default for TagStyle {
    fn default() -> Self {
        let theme = Theme::classic();
        Self {
            alpha: theme.tag_alpha,
            background: theme.tag_background,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    pub family: String,
    pub size: f32,
    pub color: Bgr,
    /// Extra stroke width around glyph outlines; 1.0 draws plain filled glyphs.
    pub thickness: f32,
    /// Measure with the built-in width table instead of font files.
    pub fast_metrics: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "DejaVu Sans, Liberation Sans, Arial, sans-serif".to_string(),
            size: 14.0,
            color: Theme::classic().text_color,
            thickness: 1.0,
            fast_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Slot order tried for one-line label blocks.
    pub single_line_priority: [Slot; 4],
    /// Slot order tried for taller, multi-line label blocks.
    pub multi_line_priority: [Slot; 4],
    /// Search a joint placement when more than one zone carries tags.
    pub use_solver: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            single_line_priority: [Slot::Top, Slot::Inside, Slot::BottomRight, Slot::BottomLeft],
            multi_line_priority: [Slot::BottomRight, Slot::BottomLeft, Slot::Inside, Slot::Top],
            use_solver: true,
        }
    }
}

impl PlacementConfig {
    pub fn priority_for(&self, line_count: usize) -> &[Slot; 4] {
        if line_count < 2 {
            &self.single_line_priority
        } else {
            &self.multi_line_priority
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub style: StyleDefaults,
    pub tag: TagStyle,
    pub font: FontConfig,
    pub placement: PlacementConfig,
}

impl Config {
    pub fn with_theme(theme: &Theme) -> Self {
        let mut config = Config::default();
        config.apply_theme(theme);
        config
    }

    fn apply_theme(&mut self, theme: &Theme) {
        self.style.color = theme.zone_color;
        self.style.alpha = theme.zone_alpha;
        self.tag.background = theme.tag_background;
        self.tag.alpha = theme.tag_alpha;
        self.font.color = theme.text_color;
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColorValue {
    Hex(String),
    Bgr([u8; 3]),
}

impl ColorValue {
    fn resolve(self) -> anyhow::Result<Bgr> {
        match self {
            ColorValue::Hex(hex) => {
                Bgr::from_hex(&hex).ok_or_else(|| anyhow::anyhow!("invalid color {hex:?}"))
            }
            ColorValue::Bgr([b, g, r]) => Ok(Bgr(b, g, r)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StyleFile {
    alpha: Option<f32>,
    color: Option<ColorValue>,
    thickness: Option<i32>,
    margin: Option<i32>,
    filled: Option<bool>,
    peephole: Option<bool>,
    peephole_corners: Option<bool>,
    normalized: Option<bool>,
    closed_polygons: Option<bool>,
    color_by_tag: Option<BTreeMap<String, ColorValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagFile {
    alpha: Option<f32>,
    background: Option<ColorValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FontFile {
    family: Option<String>,
    size: Option<f32>,
    color: Option<ColorValue>,
    thickness: Option<f32>,
    fast_metrics: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacementFile {
    single_line_priority: Option<[Slot; 4]>,
    multi_line_priority: Option<[Slot; 4]>,
    use_solver: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    style: Option<StyleFile>,
    tag: Option<TagFile>,
    font: Option<FontFile>,
    placement: Option<PlacementFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Merges a JSON config document onto the defaults. Every field is optional.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        let theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme {theme_name:?}"))?;
        config.apply_theme(&theme);
    }

    if let Some(style) = parsed.style {
        if let Some(v) = style.alpha {
            config.style.alpha = v.clamp(0.0, 1.0);
        }
        if let Some(v) = style.color {
            config.style.color = v.resolve()?;
        }
        if let Some(v) = style.thickness {
            config.style.thickness = v.clamp(0, MAX_STROKE);
        }
        if let Some(v) = style.margin {
            config.style.margin = v.clamp(0, MAX_STROKE);
        }
        if let Some(v) = style.filled {
            config.style.filled = v;
        }
        if let Some(v) = style.peephole {
            config.style.peephole = v;
        }
        if let Some(v) = style.peephole_corners {
            config.style.peephole_corners = v;
        }
        if let Some(v) = style.normalized {
            config.style.normalized = v;
        }
        if let Some(v) = style.closed_polygons {
            config.style.closed_polygons = v;
        }
        if let Some(map) = style.color_by_tag {
            for (tag, color) in map {
                config.style.color_by_tag.insert(tag, color.resolve()?);
            }
        }
    }

    if let Some(tag) = parsed.tag {
        if let Some(v) = tag.alpha {
            config.tag.alpha = v.clamp(0.0, 1.0);
        }
        if let Some(v) = tag.background {
            config.tag.background = v.resolve()?;
        }
    }

    if let Some(font) = parsed.font {
        if let Some(v) = font.family {
            config.font.family = v;
        }
        if let Some(v) = font.size {
            config.font.size = v;
        }
        if let Some(v) = font.color {
            config.font.color = v.resolve()?;
        }
        if let Some(v) = font.thickness {
            config.font.thickness = v;
        }
        if let Some(v) = font.fast_metrics {
            config.font.fast_metrics = v;
        }
    }

    if let Some(placement) = parsed.placement {
        if let Some(v) = placement.single_line_priority {
            config.placement.single_line_priority = v;
        }
        if let Some(v) = placement.multi_line_priority {
            config.placement.multi_line_priority = v;
        }
        if let Some(v) = placement.use_solver {
            config.placement.use_solver = v;
        }
    }

    Ok(config)
}
