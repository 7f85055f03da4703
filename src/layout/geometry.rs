// Canvas-bounds adjustment for zones and polygon vertices. Everything here
// works in integer pixels once normalized coordinates have been resolved.

use serde::{Deserialize, Serialize};

/// Largest stroke thickness or label margin honoured, in pixels. Larger
/// values are clamped so pixel arithmetic cannot overflow.
pub const MAX_STROKE: i32 = 1024;

/// Raster dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasSize {
    pub width: i32,
    pub height: i32,
}

impl CanvasSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, rect: &Rect) -> bool {
        rect.x1 >= 0
            && rect.y1 >= 0
            && rect.x2 > rect.x1
            && rect.y2 > rect.y1
            && rect.x2 <= self.width
            && rect.y2 <= self.height
    }
}

/// Caller-supplied zone coordinates, either absolute pixels or fractions of
/// the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Bounds {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Axis-aligned box around a point list. `None` for an empty list.
    pub fn enclosing(points: &[(f32, f32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Bounds::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            bounds.x1 = bounds.x1.min(x);
            bounds.y1 = bounds.y1.min(y);
            bounds.x2 = bounds.x2.max(x);
            bounds.y2 = bounds.y2.max(y);
        }
        Some(bounds)
    }
}

impl From<(f32, f32, f32, f32)> for Bounds {
    fn from(value: (f32, f32, f32, f32)) -> Self {
        Bounds::new(value.0, value.1, value.2, value.3)
    }
}

impl From<Rect> for Bounds {
    fn from(rect: Rect) -> Self {
        Bounds::new(rect.x1 as f32, rect.y1 as f32, rect.x2 as f32, rect.y2 as f32)
    }
}

/// Pixel rectangle given by its corners. Both corners are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains_point(other.x1, other.y1) && self.contains_point(other.x2, other.y2)
    }

    /// Two rectangles collide when a corner of either lies inside the other,
    /// when one contains the other, or when they cross without sharing a
    /// corner. Touching edges count as a collision.
    pub fn collides(&self, other: &Rect) -> bool {
        self.x1 <= other.x2 && other.x1 <= self.x2 && self.y1 <= other.y2 && other.y1 <= self.y2
    }

    pub fn collides_any<'a>(&self, others: impl IntoIterator<Item = &'a Rect>) -> bool {
        others.into_iter().any(|other| self.collides(other))
    }
}

/// Resolves `bounds` against the canvas and shrinks it so a stroke of
/// `thickness` pixels stays on the canvas.
///
/// `x2`/`y2` are settled before `x1`/`y1`, which keeps `x1 < x2` and
/// `y1 < y2` even for inverted input. Out-of-range coordinates are clamped
/// and reported through `tracing` at warn level.
///
/// A thickness below one pixel still reserves a one pixel margin so the
/// result never collapses to a line; thicknesses above [`MAX_STROKE`] are
/// clamped. The containment guarantee needs a canvas at least three margins
/// wide and tall.
pub fn adjust(canvas: CanvasSize, bounds: Bounds, normalized: bool, thickness: i32) -> Rect {
    let width = canvas.width as f32;
    let height = canvas.height as f32;
    let scale = |value: f32, dimension: f32| if normalized { value * dimension } else { value };

    let x1 = clamp_coordinate("x1", scale(bounds.x1, width), width);
    let y1 = clamp_coordinate("y1", scale(bounds.y1, height), height);
    let x2 = clamp_coordinate("x2", scale(bounds.x2, width), width);
    let y2 = clamp_coordinate("y2", scale(bounds.y2, height), height);

    let margin = thickness.clamp(1, MAX_STROKE);
    // max-then-min rather than clamp(): on tiny canvases the lower bound can
    // exceed the upper one and clamp() would panic.
    let x2 = (x2 as i32).max(margin * 2).min(canvas.width.saturating_sub(margin));
    let y2 = (y2 as i32).max(margin * 2).min(canvas.height.saturating_sub(margin));
    let x1 = (x1 as i32).max(margin).min(x2.saturating_sub(margin));
    let y1 = (y1 as i32).max(margin).min(y2.saturating_sub(margin));

    Rect { x1, y1, x2, y2 }
}

/// Same resolution as [`adjust`] for a single polygon vertex, without the
/// stroke margin.
pub fn adjust_point(canvas: CanvasSize, point: (f32, f32), normalized: bool) -> (i32, i32) {
    let width = canvas.width as f32;
    let height = canvas.height as f32;
    let (x, y) = if normalized {
        (point.0 * width, point.1 * height)
    } else {
        point
    };
    let x = clamp_coordinate("x", x, width);
    let y = clamp_coordinate("y", y, height);
    (x as i32, y as i32)
}

fn clamp_coordinate(coordinate: &'static str, value: f32, max: f32) -> f32 {
    if (0.0..=max).contains(&value) {
        return value;
    }
    tracing::warn!(
        coordinate,
        value,
        max,
        "coordinate outside the canvas, clamping (normalized values must lie in 0..=1)"
    );
    if value.is_nan() { 0.0 } else { value.clamp(0.0, max) }
}
