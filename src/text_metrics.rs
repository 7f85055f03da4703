use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::{Face, OutlineBuilder};

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Cap height used when no face is available, as a fraction of the font size.
const FALLBACK_CAP_HEIGHT: f32 = 0.72;

/// Width and above-baseline height of one rendered line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub width: f32,
    pub height: f32,
}

/// Measures `text` with the first installed face matching `font_family`.
pub fn measure_line(text: &str, font_size: f32, font_family: &str) -> Option<LineMetrics> {
    if font_size <= 0.0 {
        return Some(LineMetrics {
            width: 0.0,
            height: 0.0,
        });
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    let face = guard.face(font_family)?;
    Some(LineMetrics {
        width: face.measure_width(text, font_size)?,
        height: face.cap_height(font_size)?,
    })
}

/// Approximate metrics from a calibrated per-character width table. Used when
/// fast metrics are requested or when no face can be found.
pub fn fallback_line_metrics(text: &str, font_size: f32) -> LineMetrics {
    LineMetrics {
        width: text.chars().map(char_width_factor).sum::<f32>() * font_size,
        height: font_size * FALLBACK_CAP_HEIGHT,
    }
}

/// Glyph outlines for `text` laid out from `(x, baseline)` in canvas pixels.
/// `None` when no face is available or the text has no visible glyphs.
pub fn glyph_path(
    text: &str,
    x: f32,
    baseline: f32,
    font_size: f32,
    font_family: &str,
) -> Option<tiny_skia::Path> {
    if text.trim().is_empty() || font_size <= 0.0 {
        return None;
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    let face = guard.face(font_family)?;
    face.outline(text, x, baseline, font_size)
}

pub fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'I' | 'i' | 'j' | 'l' => 0.25,
        'f' | 'r' | 't' => 0.34,
        '1' => 0.396,
        'M' | 'W' | 'm' | 'w' => 0.9,
        '@' | '#' | '%' | '&' => 0.946,
        'A'..='Z' => 0.66,
        'a'..='z' => 0.56,
        '0'..='9' => 0.6,
        _ if ch.is_ascii() => 0.568,
        // CJK and other wide scripts
        _ => 1.0,
    }
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn face(&mut self, font_family: &str) -> Option<&mut FontFace> {
        let family_key = normalize_family_key(font_family);
        if !self.cache.contains_key(&family_key) {
            let face = self.load_face(&family_key);
            if face.is_none() {
                tracing::warn!(
                    family = %family_key,
                    "no font face available, labels are measured from the width table and drawn without text"
                );
            }
            self.cache.insert(family_key.clone(), face);
        }
        self.cache.get_mut(&family_key).and_then(|face| face.as_mut())
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        #[derive(Clone, Copy)]
        enum FamilyToken {
            Generic(Family<'static>),
            Name(usize),
        }

        let mut names: Vec<String> = Vec::new();
        let mut order: Vec<FamilyToken> = Vec::new();
        for part in font_family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            match raw.to_ascii_lowercase().as_str() {
                "serif" => order.push(FamilyToken::Generic(Family::Serif)),
                "sans-serif" | "system-ui" => order.push(FamilyToken::Generic(Family::SansSerif)),
                "monospace" => order.push(FamilyToken::Generic(Family::Monospace)),
                _ => {
                    order.push(FamilyToken::Name(names.len()));
                    names.push(raw.to_string());
                }
            }
        }
        if order.is_empty() {
            order.push(FamilyToken::Generic(Family::SansSerif));
        }

        let families: Vec<Family<'_>> = order
            .iter()
            .map(|token| match *token {
                FamilyToken::Generic(family) => family,
                FamilyToken::Name(idx) => Family::Name(names[idx].as_str()),
            })
            .collect();

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = match self.db.query(&query) {
            Some(id) => id,
            None => {
                let id = self.fallback_face_id()?;
                tracing::warn!(family = %font_family, "font family not installed, using a fallback face");
                id
            }
        };
        self.db
            .with_face_data(id, |data, index| FontFace::new(data.to_vec(), index))
            .flatten()
    }

    /// Any sans-serif face, else the first face the database knows.
    fn fallback_face_id(&self) -> Option<fontdb::ID> {
        let query = Query {
            families: &[Family::SansSerif],
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        self.db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|face| face.id))
    }
}

/// An owned font file. The borrowed `ttf_parser::Face` is re-parsed per call,
/// which only reads the table directory.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    cap_height_units: f32,
    advance_cache: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1) as f32;
        let cap_height_units = face
            .capital_height()
            .filter(|h| *h > 0)
            .map(f32::from)
            .unwrap_or(units_per_em * FALLBACK_CAP_HEIGHT);
        Some(Self {
            data,
            index,
            units_per_em,
            cap_height_units,
            advance_cache: HashMap::new(),
        })
    }

    fn parse(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.index).ok()
    }

    fn cap_height(&self, font_size: f32) -> Option<f32> {
        Some(self.cap_height_units * font_size / self.units_per_em)
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * 0.56;
        let mut missing: Vec<char> = Vec::new();
        for ch in text.chars() {
            if !self.advance_cache.contains_key(&ch) {
                missing.push(ch);
            }
        }
        if !missing.is_empty() {
            let face = Face::parse(&self.data, self.index).ok()?;
            for ch in missing {
                let advance = face
                    .glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph));
                self.advance_cache.insert(ch, advance);
            }
        }

        let width = text
            .chars()
            .map(|ch| match self.advance_cache.get(&ch).copied().flatten() {
                Some(advance) if advance > 0 => advance as f32 * scale,
                _ => fallback,
            })
            .sum::<f32>();
        Some(width.max(0.0))
    }

    fn outline(&self, text: &str, x: f32, baseline: f32, font_size: f32) -> Option<tiny_skia::Path> {
        let face = self.parse()?;
        let scale = font_size / self.units_per_em;
        let mut builder = GlyphPathBuilder {
            inner: tiny_skia::PathBuilder::new(),
            origin_x: x,
            baseline,
            scale,
        };
        for ch in text.chars() {
            match face.glyph_index(ch) {
                Some(glyph) => {
                    face.outline_glyph(glyph, &mut builder);
                    let advance = face.glyph_hor_advance(glyph).unwrap_or(0);
                    builder.origin_x += advance as f32 * scale;
                }
                None => builder.origin_x += font_size * 0.56,
            }
        }
        builder.inner.finish()
    }
}

/// Converts font units (y up) into canvas pixels (y down).
struct GlyphPathBuilder {
    inner: tiny_skia::PathBuilder,
    origin_x: f32,
    baseline: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.inner.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.inner.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.inner.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.inner.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
