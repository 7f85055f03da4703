#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config, parse_config};
pub use ir::{FreeTag, Polygon, Region, Scene, StyleOverride, SurroundingBox};
pub use layout::{Bounds, CanvasSize, Rect, Slot};
pub use render::{Canvas, CanvasError, DrawReport, Interpolation, draw_scene};
pub use theme::{Bgr, Theme};
