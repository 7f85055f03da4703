use crate::config::load_config;
use crate::ir::{FreeTag, Polygon, Region, Scene, SurroundingBox};
use crate::layout::{Rect, Slot};
use crate::render::{Canvas, DrawReport, Interpolation};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "zonetag", version, about = "Draw labeled zones, polygons and tags onto an image")]
pub struct Args {
    /// Input PNG to draw on
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output PNG
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Draw on a blank WIDTHxHEIGHT canvas instead of an input image
    #[arg(long = "canvas", value_parser = parse_canvas)]
    pub canvas: Option<(u32, u32)>,

    /// Zone as "x1,y1,x2,y2[@slot]:Tag|Other"; repeatable
    #[arg(short = 'z', long = "zone", value_parser = parse_zone)]
    pub zones: Vec<Region>,

    /// Polygon as "x,y;x,y;...[:Tag|Other]"; repeatable
    #[arg(short = 'p', long = "polygon", value_parser = parse_polygon)]
    pub polygons: Vec<PolygonArg>,

    /// Free tag as "x,y:Text"; negative coordinates count from the far edge
    #[arg(short = 't', long = "free-tag", value_parser = parse_free_tag, allow_hyphen_values = true)]
    pub free_tags: Vec<FreeTag>,

    /// Config JSON file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Rescale the drawn frame by "F" or "FX,FY"
    #[arg(long = "scale", value_parser = parse_scale)]
    pub scale: Option<(f32, f32)>,

    /// Resampling filter used with --scale
    #[arg(long = "interpolation", value_enum, default_value_t = Interpolation::Bilinear)]
    pub interpolation: Interpolation,

    /// Coordinates are fractions of the canvas size
    #[arg(short = 'n', long = "normalized")]
    pub normalized: bool,

    /// Print the chosen label slots as JSON
    #[arg(long = "report")]
    pub report: bool,

    /// Only log errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonArg {
    pub polygon: Polygon,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoneSpecError {
    #[error("expected {expected} comma-separated numbers in {spec:?}")]
    Arity { spec: String, expected: usize },
    #[error("invalid number {value:?} in {spec:?}")]
    Number { spec: String, value: String },
    #[error("invalid canvas size {0:?}, expected WIDTHxHEIGHT")]
    Canvas(String),
    #[error("invalid scale {0:?}, expected positive F or FX,FY")]
    Scale(String),
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.quiet);

    let mut config = load_config(args.config.as_deref())?;
    if args.normalized {
        config.style.normalized = true;
    }

    let mut canvas = match (&args.input, args.canvas) {
        (Some(path), _) => {
            Canvas::load_png(path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, Some((width, height))) => Canvas::new(width, height)?,
        (None, None) => anyhow::bail!("either --input or --canvas is required"),
    };

    let scene = build_scene(&args);
    let scale = args.scale.unwrap_or((1.0, 1.0));
    let report = scene.draw_scaled(&mut canvas, &config, scale, args.interpolation)?;
    tracing::info!(
        zones = report.regions.len(),
        free_tags = report.free_tags.len(),
        solver = report.assignment.is_some(),
        "scene drawn"
    );

    canvas
        .save_png(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    if args.report {
        println!("{}", serde_json::to_string_pretty(&summarize(&report))?);
    }
    Ok(())
}

fn init_tracing(quiet: bool) {
    let level = if quiet { LevelFilter::ERROR } else { LevelFilter::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_scene(args: &Args) -> Scene {
    let mut scene = Scene::new();
    for region in &args.zones {
        scene.add_zone(region.clone());
    }
    for arg in &args.polygons {
        let surrounding = if arg.tags.is_empty() {
            SurroundingBox::None
        } else {
            SurroundingBox::Hidden
        };
        scene.add_polygon(arg.polygon.clone(), surrounding, arg.tags.iter().cloned());
    }
    for tag in &args.free_tags {
        scene.add_free_tag(tag.clone());
    }
    scene
}

#[derive(Debug, Serialize)]
struct PlacementSummary {
    zone: Rect,
    slot: Option<Slot>,
    area: Option<Rect>,
}

fn summarize(report: &DrawReport) -> Vec<PlacementSummary> {
    report
        .regions
        .iter()
        .map(|region| PlacementSummary {
            zone: region.zone,
            slot: region.label.as_ref().map(|label| label.slot),
            area: region.label.as_ref().map(|label| label.area),
        })
        .collect()
}

fn parse_canvas(value: &str) -> Result<(u32, u32), ZoneSpecError> {
    let invalid = || ZoneSpecError::Canvas(value.to_string());
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width = width.trim().parse().map_err(|_| invalid())?;
    let height = height.trim().parse().map_err(|_| invalid())?;
    Ok((width, height))
}

fn parse_scale(value: &str) -> Result<(f32, f32), ZoneSpecError> {
    let invalid = || ZoneSpecError::Scale(value.to_string());
    let factors = value
        .split(',')
        .map(|factor| factor.trim().parse::<f32>().map_err(|_| invalid()))
        .collect::<Result<Vec<f32>, _>>()?;
    let (fx, fy) = match factors.as_slice() {
        [f] => (*f, *f),
        [fx, fy] => (*fx, *fy),
        _ => return Err(invalid()),
    };
    if fx.is_finite() && fy.is_finite() && fx > 0.0 && fy > 0.0 {
        Ok((fx, fy))
    } else {
        Err(invalid())
    }
}

/// Splits `geometry:tags` and turns the tag list into lines. A literal `\n`
/// inside a tag starts a new line of the same tag.
fn split_spec(value: &str) -> (&str, Vec<String>) {
    let (geometry, tags) = value.split_once(':').unwrap_or((value, ""));
    let tags = tags
        .split('|')
        .map(|tag| tag.replace("\\n", "\n"))
        .filter(|tag| !tag.trim().is_empty())
        .collect();
    (geometry.trim(), tags)
}

fn parse_numbers(spec: &str, part: &str, expected: usize) -> Result<Vec<f32>, ZoneSpecError> {
    let numbers = part
        .split(',')
        .map(|value| {
            value.trim().parse::<f32>().map_err(|_| ZoneSpecError::Number {
                spec: spec.to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect::<Result<Vec<f32>, _>>()?;
    if numbers.len() != expected {
        return Err(ZoneSpecError::Arity {
            spec: spec.to_string(),
            expected,
        });
    }
    Ok(numbers)
}

fn parse_zone(value: &str) -> Result<Region, ZoneSpecError> {
    let (geometry, tags) = split_spec(value);
    let (coords, slot) = match geometry.split_once('@') {
        Some((coords, slot)) => (coords, Some(slot)),
        None => (geometry, None),
    };
    let n = parse_numbers(value, coords, 4)?;
    let region = Region::new((n[0], n[1], n[2], n[3])).with_tags(tags);
    Ok(match slot {
        Some(name) => region.with_slot_name(name),
        None => region,
    })
}

fn parse_polygon(value: &str) -> Result<PolygonArg, ZoneSpecError> {
    let (geometry, tags) = split_spec(value);
    let points = geometry
        .split(';')
        .filter(|vertex| !vertex.trim().is_empty())
        .map(|vertex| parse_numbers(value, vertex, 2).map(|n| (n[0], n[1])))
        .collect::<Result<Vec<_>, _>>()?;
    if points.is_empty() {
        return Err(ZoneSpecError::Arity {
            spec: value.to_string(),
            expected: 2,
        });
    }
    Ok(PolygonArg {
        polygon: Polygon::new(points),
        tags,
    })
}

fn parse_free_tag(value: &str) -> Result<FreeTag, ZoneSpecError> {
    let (geometry, tags) = split_spec(value);
    let n = parse_numbers(value, geometry, 2)?;
    Ok(FreeTag::new((n[0] as i32, n[1] as i32), tags))
}
