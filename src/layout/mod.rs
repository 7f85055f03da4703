mod geometry;
mod slot;
mod solver;
mod text;

pub use geometry::*;
pub use slot::*;
pub use solver::*;
pub use text::*;
