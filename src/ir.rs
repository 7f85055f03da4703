use crate::config::{StyleDefaults, TagStyle};
use crate::layout::{Bounds, MAX_STROKE, Slot};
use crate::theme::Bgr;

/// Per-zone style values that replace the defaults when present.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StyleOverride {
    pub alpha: Option<f32>,
    pub color: Option<Bgr>,
    pub filled: Option<bool>,
    pub peephole: Option<bool>,
    pub thickness: Option<i32>,
}

impl StyleOverride {
    pub fn is_empty(&self) -> bool {
        *self == StyleOverride::default()
    }

    /// Layers this override over `defaults`. Without an explicit color the
    /// zone's first tag selects a class color when one is configured.
    pub fn resolve(&self, defaults: &StyleDefaults, first_tag: Option<&str>) -> ZoneStyle {
        let class_color = first_tag.and_then(|tag| defaults.color_by_tag.get(tag).copied());
        ZoneStyle {
            alpha: self.alpha.unwrap_or(defaults.alpha).clamp(0.0, 1.0),
            color: self.color.or(class_color).unwrap_or(defaults.color),
            filled: self.filled.unwrap_or(defaults.filled),
            peephole: self.peephole.unwrap_or(defaults.peephole),
            peephole_corners: defaults.peephole_corners,
            thickness: self.thickness.unwrap_or(defaults.thickness).clamp(0, MAX_STROKE),
        }
    }
}

/// Fully resolved drawing style of one zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneStyle {
    pub alpha: f32,
    pub color: Bgr,
    pub filled: bool,
    pub peephole: bool,
    pub peephole_corners: bool,
    pub thickness: i32,
}

/// A rectangle to annotate.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub bounds: Bounds,
    pub tags: Vec<String>,
    /// Fixed label slot; skips fit testing and joint placement.
    pub slot: Option<Slot>,
    pub style: StyleOverride,
}

impl Region {
    pub fn new(bounds: impl Into<Bounds>) -> Self {
        Self {
            bounds: bounds.into(),
            tags: Vec::new(),
            slot: None,
            style: StyleOverride::default(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Like [`Region::with_slot`] for a slot name coming from user input.
    pub fn with_slot_name(self, name: &str) -> Self {
        self.with_slot(Slot::parse_lenient(name))
    }

    pub fn with_style(mut self, style: StyleOverride) -> Self {
        self.style = style;
        self
    }

    pub fn first_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<(f32, f32)>,
    /// Join the last vertex back to the first; `None` uses the scene default.
    pub closed: Option<bool>,
    pub color: Option<Bgr>,
    pub thickness: Option<i32>,
    pub show_vertices: bool,
}

impl Polygon {
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self {
            points,
            closed: None,
            color: None,
            thickness: None,
            show_vertices: false,
        }
    }

    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = Some(closed);
        self
    }

    pub fn with_vertices(mut self) -> Self {
        self.show_vertices = true;
        self
    }
}

/// How a polygon added to a [`Scene`] hosts its tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurroundingBox {
    /// No derived zone; tags are ignored.
    None,
    /// Derived zone with zero stroke: only the labels are drawn.
    Hidden,
    /// Derived zone drawn like any other zone.
    Visible,
}

/// A label pinned to a point instead of a zone. Negative coordinates are
/// measured from the right/bottom canvas edge.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeTag {
    pub anchor: (i32, i32),
    pub tags: Vec<String>,
    pub style: Option<TagStyle>,
}

impl FreeTag {
    pub fn new<I, S>(anchor: (i32, i32), tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            anchor,
            tags: tags.into_iter().map(Into::into).collect(),
            style: None,
        }
    }
}

/// Everything to draw on one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub regions: Vec<Region>,
    pub polygons: Vec<Polygon>,
    pub free_tags: Vec<FreeTag>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.polygons.is_empty() && self.free_tags.is_empty()
    }

    pub fn add_zone(&mut self, region: Region) -> usize {
        self.regions.push(region);
        self.regions.len() - 1
    }

    /// Adds a polygon and, depending on `surrounding`, a zone around it that
    /// carries `tags`.
    pub fn add_polygon<I, S>(&mut self, polygon: Polygon, surrounding: SurroundingBox, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if polygon.points.is_empty() {
            return;
        }
        let bounds = Bounds::enclosing(&polygon.points);
        self.polygons.push(polygon);

        let Some(bounds) = bounds else {
            return;
        };
        let region = Region::new(bounds).with_tags(tags);
        match surrounding {
            SurroundingBox::None => {}
            SurroundingBox::Hidden => {
                self.regions.push(region.with_style(StyleOverride {
                    thickness: Some(0),
                    ..StyleOverride::default()
                }));
            }
            SurroundingBox::Visible => self.regions.push(region),
        }
    }

    pub fn add_free_tag(&mut self, tag: FreeTag) {
        self.free_tags.push(tag);
    }

    /// Keeps the zones in `range`, dropping the rest.
    pub fn retain_range(&mut self, range: std::ops::Range<usize>) {
        let end = range.end.min(self.regions.len());
        let start = range.start.min(end);
        self.regions.truncate(end);
        self.regions.drain(..start);
    }

    /// Keeps the zones whose index appears in `indices`.
    pub fn retain_indices(&mut self, indices: &[usize]) {
        let mut index = 0;
        self.regions.retain(|_| {
            let keep = indices.contains(&index);
            index += 1;
            keep
        });
    }

    pub fn clear(&mut self) {
        self.regions.clear();
        self.polygons.clear();
        self.free_tags.clear();
    }
}
