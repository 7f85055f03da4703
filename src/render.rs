// Paints a scene onto a raster canvas.
//
// Every colored element goes through `Canvas::overlay`: the element is painted
// opaquely onto a copy of the frame and the copy is blended back at the
// element's alpha. Text is the exception and is drawn straight onto the frame
// after its background rows.

use crate::config::{Config, FontConfig, StyleDefaults, TagStyle};
use crate::ir::{Polygon, Region, Scene, ZoneStyle};
use crate::layout::{
    Assignment, CanvasSize, LabelBlock, LabelPlacement, LabelRow, MAX_STROKE, Rect, Slot, adjust,
    adjust_point, choose_slot, measure_tags, place_label, solve,
};
use crate::text_metrics;
use crate::theme::Bgr;
use tiny_skia::{
    FillRule, FilterQuality, LineCap, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

/// Length of the peephole tick marks, in pixels.
const PEEPHOLE_LINE: i32 = 7;

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("cannot allocate a {width}x{height} canvas")]
    InvalidSize { width: u32, height: u32 },
    #[error("invalid scale factors {fx}x{fy}")]
    InvalidScale { fx: f32, fy: f32 },
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Resampling filter for [`Canvas::resized`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

impl From<Interpolation> for FilterQuality {
    fn from(value: Interpolation) -> Self {
        match value {
            Interpolation::Nearest => FilterQuality::Nearest,
            Interpolation::Bilinear => FilterQuality::Bilinear,
            Interpolation::Bicubic => FilterQuality::Bicubic,
        }
    }
}

/// An RGBA raster the scene is drawn into.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    /// Opaque black canvas.
    pub fn new(width: u32, height: u32) -> Result<Self, CanvasError> {
        Self::filled(width, height, Bgr::BLACK)
    }

    pub fn filled(width: u32, height: u32, color: Bgr) -> Result<Self, CanvasError> {
        let mut pixmap = Pixmap::new(width, height).ok_or(CanvasError::InvalidSize { width, height })?;
        pixmap.fill(color.to_skia());
        Ok(Self { pixmap })
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    #[cfg(feature = "png")]
    pub fn load_png(path: impl AsRef<std::path::Path>) -> Result<Self, CanvasError> {
        let pixmap = Pixmap::load_png(path).map_err(|err| CanvasError::Decode(err.to_string()))?;
        Ok(Self { pixmap })
    }

    #[cfg(feature = "png")]
    pub fn save_png(&self, path: impl AsRef<std::path::Path>) -> Result<(), CanvasError> {
        self.pixmap
            .save_png(path)
            .map_err(|err| CanvasError::Encode(err.to_string()))
    }

    pub fn shape(&self) -> CanvasSize {
        CanvasSize::new(self.pixmap.width() as i32, self.pixmap.height() as i32)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Color at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Bgr> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some(Bgr(color.blue(), color.green(), color.red()))
    }

    /// Resamples the canvas by `fx` horizontally and `fy` vertically. Sizes
    /// round to the nearest pixel.
    pub fn resized(&self, fx: f32, fy: f32, interpolation: Interpolation) -> Result<Self, CanvasError> {
        if !(fx.is_finite() && fy.is_finite() && fx > 0.0 && fy > 0.0) {
            return Err(CanvasError::InvalidScale { fx, fy });
        }
        let width = (self.pixmap.width() as f32 * fx).round() as u32;
        let height = (self.pixmap.height() as f32 * fy).round() as u32;
        let mut pixmap = Pixmap::new(width, height).ok_or(CanvasError::InvalidSize { width, height })?;
        let paint = PixmapPaint {
            quality: interpolation.into(),
            ..PixmapPaint::default()
        };
        let transform = Transform::from_scale(
            width as f32 / self.pixmap.width() as f32,
            height as f32 / self.pixmap.height() as f32,
        );
        pixmap.draw_pixmap(0, 0, self.pixmap.as_ref(), &paint, transform, None);
        Ok(Self { pixmap })
    }

    /// Runs `paint` on a copy of the canvas and blends the copy back as
    /// `alpha * copy + (1 - alpha) * canvas`.
    pub fn overlay(&mut self, alpha: f32, paint: impl FnOnce(&mut Pixmap)) {
        if alpha.is_nan() || alpha <= 0.0 {
            return;
        }
        if alpha >= 1.0 {
            paint(&mut self.pixmap);
            return;
        }
        let mut layer = self.pixmap.clone();
        paint(&mut layer);
        let keep = 1.0 - alpha;
        for (dst, src) in self.pixmap.data_mut().iter_mut().zip(layer.data()) {
            *dst = (f32::from(*src) * alpha + f32::from(*dst) * keep).round() as u8;
        }
    }
}

/// How a region's label slot was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// The region asked for a slot by name.
    Requested,
    Solver,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionReport {
    /// Region rectangle after canvas adjustment.
    pub zone: Rect,
    pub style: ZoneStyle,
    /// `None` for regions without tags.
    pub label: Option<LabelPlacement>,
    pub source: Option<SlotSource>,
}

/// What [`draw_scene`] decided while drawing one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawReport {
    pub regions: Vec<RegionReport>,
    /// Raw result of the joint search, when it ran and found something.
    pub assignment: Option<Assignment>,
    pub free_tags: Vec<LabelPlacement>,
}

impl DrawReport {
    pub fn slots(&self) -> Vec<Option<Slot>> {
        self.regions
            .iter()
            .map(|region| region.label.as_ref().map(|label| label.slot))
            .collect()
    }
}

impl Scene {
    pub fn draw(&self, canvas: &mut Canvas, config: &Config) -> DrawReport {
        draw_scene(canvas, self, config)
    }

    /// Draws at the canvas resolution, then resamples the frame by `fx`/`fy`.
    /// Report coordinates refer to the frame before scaling.
    pub fn draw_scaled(
        &self,
        canvas: &mut Canvas,
        config: &Config,
        (fx, fy): (f32, f32),
        interpolation: Interpolation,
    ) -> Result<DrawReport, CanvasError> {
        let report = draw_scene(canvas, self, config);
        if (fx, fy) != (1.0, 1.0) {
            *canvas = canvas.resized(fx, fy, interpolation)?;
        }
        Ok(report)
    }
}

/// Draws polygons, then regions with their labels, then free tags.
pub fn draw_scene(canvas: &mut Canvas, scene: &Scene, config: &Config) -> DrawReport {
    let size = canvas.shape();
    let margin = config.style.margin.clamp(0, MAX_STROKE);

    for polygon in &scene.polygons {
        draw_polygon(canvas, polygon, &config.style);
    }

    let styles: Vec<ZoneStyle> = scene
        .regions
        .iter()
        .map(|region| region.style.resolve(&config.style, region.first_tag()))
        .collect();
    let zones: Vec<Rect> = scene
        .regions
        .iter()
        .zip(&styles)
        .map(|(region, style)| adjust(size, region.bounds, config.style.normalized, style.thickness))
        .collect();
    let blocks: Vec<LabelBlock> = scene
        .regions
        .iter()
        .map(|region| measure_tags(&region.tags, &config.font, margin))
        .collect();

    let assignment = joint_placement(&scene.regions, &zones, &blocks, size, margin, config);

    let mut regions = Vec::with_capacity(scene.regions.len());
    for (index, region) in scene.regions.iter().enumerate() {
        let (zone, style, block) = (zones[index], styles[index], &blocks[index]);
        draw_zone(canvas, &zone, &style);

        let decided = (!block.is_empty()).then(|| {
            if let Some(slot) = region.slot {
                (slot, SlotSource::Requested)
            } else if let Some(slot) = assignment.as_ref().and_then(|a| a.slots.get(index).copied().flatten()) {
                (slot, SlotSource::Solver)
            } else {
                let slot = choose_slot(&zone, block, size, margin, &config.placement);
                (slot, SlotSource::Heuristic)
            }
        });

        let label = decided.map(|(slot, _)| {
            let placement = place_label(slot, &zone, block, margin);
            draw_label(canvas, &placement, &config.tag, &config.font);
            placement
        });
        regions.push(RegionReport {
            zone,
            style,
            label,
            source: decided.map(|(_, source)| source),
        });
    }

    let free_tags = scene
        .free_tags
        .iter()
        .filter_map(|tag| {
            let block = measure_tags(&tag.tags, &config.font, margin);
            if block.is_empty() {
                return None;
            }
            let (x, y) = free_tag_origin(tag.anchor, &block, size, margin);
            let placement = place_label(Slot::Inside, &Rect::new(x, y, x, y), &block, margin);
            draw_label(canvas, &placement, tag.style.as_ref().unwrap_or(&config.tag), &config.font);
            Some(placement)
        })
        .collect();

    DrawReport {
        regions,
        assignment,
        free_tags,
    }
}

/// Runs the joint search when more than one region needs an automatic slot.
/// Regions with a requested slot only act as obstacles.
fn joint_placement(
    regions: &[Region],
    zones: &[Rect],
    blocks: &[LabelBlock],
    size: CanvasSize,
    margin: i32,
    config: &Config,
) -> Option<Assignment> {
    if !config.placement.use_solver {
        return None;
    }
    let searchable: Vec<LabelBlock> = regions
        .iter()
        .zip(blocks)
        .map(|(region, block)| {
            if region.slot.is_some() {
                LabelBlock::default()
            } else {
                block.clone()
            }
        })
        .collect();
    if searchable.iter().filter(|block| !block.is_empty()).count() < 2 {
        return None;
    }
    let assignment = solve(zones, &searchable, size, margin);
    if assignment.is_none() {
        tracing::debug!(zones = zones.len(), "falling back to per-zone placement");
    }
    assignment
}

/// Top-left corner of a free tag's anchor. Negative coordinates count back
/// from the right or bottom edge so the whole block stays visible.
fn free_tag_origin(anchor: (i32, i32), block: &LabelBlock, size: CanvasSize, margin: i32) -> (i32, i32) {
    let resolve = |value: i32, extent: i32, dimension: i32| {
        if value < 0 {
            dimension - extent + value - margin * 2
        } else {
            value - margin
        }
    };
    (
        resolve(anchor.0, block.width, size.width),
        resolve(anchor.1, block.height, size.height),
    )
}

fn draw_polygon(canvas: &mut Canvas, polygon: &Polygon, defaults: &StyleDefaults) {
    let size = canvas.shape();
    let points: Vec<(i32, i32)> = polygon
        .points
        .iter()
        .map(|&point| adjust_point(size, point, defaults.normalized))
        .collect();
    let color = polygon.color.unwrap_or(defaults.color).lighter();
    let thickness = polygon.thickness.unwrap_or(defaults.thickness).clamp(0, MAX_STROKE);
    let closed = polygon.closed.unwrap_or(defaults.closed_polygons);

    let pixmap = &mut canvas.pixmap;
    stroke_polyline(pixmap, &points, closed, color, (thickness - 1).max(1) as f32);
    if polygon.show_vertices {
        for &point in &points {
            fill_dot(pixmap, point, thickness.max(1) as f32, color);
        }
    }
}

fn draw_zone(canvas: &mut Canvas, zone: &Rect, style: &ZoneStyle) {
    if style.thickness <= 0 {
        return;
    }
    if style.peephole {
        draw_peephole(canvas, zone, style);
    }
    if style.filled {
        canvas.overlay(style.alpha / 3.0, |pixmap| fill_rect(pixmap, zone, style.color));
    }
    canvas.overlay(style.alpha, |pixmap| {
        stroke_rect(pixmap, zone, style.color, style.thickness as f32)
    });
}

fn draw_peephole(canvas: &mut Canvas, zone: &Rect, style: &ZoneStyle) {
    let thickness = style.thickness.min(2);
    let room = thickness * 2 + PEEPHOLE_LINE;
    if zone.width() <= room || zone.height() <= room {
        return;
    }
    let len = PEEPHOLE_LINE;
    let Rect { x1, y1, x2, y2 } = *zone;
    let (cx, cy) = zone.center();
    canvas.overlay(style.alpha, |pixmap| {
        if style.peephole_corners {
            let width = (thickness + 1) as f32;
            let corners = [
                ((x1, y1), (x1 + len, y1)),
                ((x2, y1), (x2 - len, y1)),
                ((x1, y2), (x1 + len, y2)),
                ((x2, y2), (x2 - len, y2)),
                ((x1, y1), (x1, y1 + len)),
                ((x1, y2), (x1, y2 - len)),
                ((x2, y1), (x2, y1 + len)),
                ((x2, y2), (x2, y2 - len)),
            ];
            for (from, to) in corners {
                stroke_line(pixmap, from, to, style.color, width);
            }
        }
        let width = (thickness - 1).max(1) as f32;
        let ticks = [
            ((x1, cy), (x1 + len, cy)),
            ((x2, cy), (x2 - len, cy)),
            ((cx, y1), (cx, y1 + len)),
            ((cx, y2), (cx, y2 - len)),
        ];
        for (from, to) in ticks {
            stroke_line(pixmap, from, to, style.color, width);
        }
    });
}

fn draw_label(canvas: &mut Canvas, placement: &LabelPlacement, tag: &TagStyle, font: &FontConfig) {
    if let Some(pointer) = placement.pointer {
        canvas.overlay(tag.alpha, |pixmap| fill_polygon(pixmap, &pointer, tag.background));
    }
    canvas.overlay(tag.alpha, |pixmap| {
        for row in &placement.rows {
            fill_rect(pixmap, &row.background, tag.background);
        }
    });
    for row in &placement.rows {
        draw_text(canvas, row, font);
    }
}

fn draw_text(canvas: &mut Canvas, row: &LabelRow, font: &FontConfig) {
    let (x, baseline) = (row.origin.0 as f32, row.origin.1 as f32);
    let Some(path) = text_metrics::glyph_path(&row.text, x, baseline, font.size, &font.family) else {
        return;
    };
    // Measurement may come from the width table while glyphs come from a real
    // face; squeeze the outline so it never leaves its background row.
    let limit = row.background.x2 as f32;
    let right = path.bounds().right();
    let path = if right > limit && right > x {
        let scale = (limit - x) / (right - x);
        match path.transform(Transform::from_row(scale, 0.0, 0.0, 1.0, x * (1.0 - scale), 0.0)) {
            Some(path) => path,
            None => return,
        }
    } else {
        path
    };

    let mut paint = solid(font.color);
    paint.anti_alias = true;
    let pixmap = &mut canvas.pixmap;
    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    if font.thickness > 1.0 {
        let stroke = Stroke {
            width: font.thickness - 1.0,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

fn solid(color: Bgr) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = false;
    paint
}

/// Fills `rect` with both corners included.
fn fill_rect(pixmap: &mut Pixmap, rect: &Rect, color: Bgr) {
    let Some(area) = tiny_skia::Rect::from_ltrb(
        rect.x1 as f32,
        rect.y1 as f32,
        (rect.x2 + 1) as f32,
        (rect.y2 + 1) as f32,
    ) else {
        return;
    };
    pixmap.fill_rect(area, &solid(color), Transform::identity(), None);
}

fn stroke_rect(pixmap: &mut Pixmap, rect: &Rect, color: Bgr, width: f32) {
    let corners = [(rect.x1, rect.y1), (rect.x2, rect.y1), (rect.x2, rect.y2), (rect.x1, rect.y2)];
    stroke_polyline(pixmap, &corners, true, color, width);
}

fn stroke_line(pixmap: &mut Pixmap, from: (i32, i32), to: (i32, i32), color: Bgr, width: f32) {
    stroke_polyline(pixmap, &[from, to], false, color, width);
}

/// Strokes through pixel centers so integer coordinates address whole pixels.
fn stroke_polyline(pixmap: &mut Pixmap, points: &[(i32, i32)], closed: bool, color: Bgr, width: f32) {
    let Some(path) = pixel_path(points, closed) else {
        return;
    };
    let stroke = Stroke {
        width,
        line_cap: LineCap::Square,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &solid(color), &stroke, Transform::identity(), None);
}

fn fill_polygon(pixmap: &mut Pixmap, points: &[(i32, i32)], color: Bgr) {
    let Some(path) = pixel_path(points, true) else {
        return;
    };
    pixmap.fill_path(&path, &solid(color), FillRule::Winding, Transform::identity(), None);
    // Thin triangles can rasterize to nothing without their outline.
    let stroke = Stroke {
        width: 1.0,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &solid(color), &stroke, Transform::identity(), None);
}

fn fill_dot(pixmap: &mut Pixmap, center: (i32, i32), radius: f32, color: Bgr) {
    let Some(path) = PathBuilder::from_circle(center.0 as f32 + 0.5, center.1 as f32 + 0.5, radius) else {
        return;
    };
    pixmap.fill_path(&path, &solid(color), FillRule::Winding, Transform::identity(), None);
}

fn pixel_path(points: &[(i32, i32)], closed: bool) -> Option<tiny_skia::Path> {
    let ((x, y), rest) = points.split_first()?;
    let mut builder = PathBuilder::new();
    builder.move_to(*x as f32 + 0.5, *y as f32 + 0.5);
    if rest.is_empty() {
        // A single vertex still gets a visible mark.
        builder.line_to(*x as f32 + 0.5, *y as f32 + 0.5);
    }
    for (x, y) in rest {
        builder.line_to(*x as f32 + 0.5, *y as f32 + 0.5);
    }
    if closed && rest.len() > 1 {
        builder.close();
    }
    builder.finish()
}
