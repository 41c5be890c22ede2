//! SVG renderer for canvas snapshots
//!
//! Takes a [`Collection`](crate::store::Collection) and produces an SVG string
//! with prefixed CSS classes for styling.

pub mod config;
pub mod svg;

pub use config::{Palette, SvgConfig};
pub use svg::render_svg;
