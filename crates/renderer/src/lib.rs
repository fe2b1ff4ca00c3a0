//! Overlay geometry and rendering for weather fields.
//!
//! Implements:
//! - Isobars (marching squares contours of mean sea level pressure)
//! - Wind arrows (quiver glyphs from U/V components)
//! - Rasterisation of the combined overlay and PNG encoding

pub mod contour;
pub mod error;
pub mod overlay;
pub mod png;
pub mod quiver;
pub mod raster;
pub mod sampling;

pub use contour::{contour_segments, pressure_levels, ContourConfig, Point, Segment};
pub use error::{RenderError, RenderResult};
pub use overlay::{build_overlay, Overlay, OverlayConfig};
pub use png::create_png;
pub use quiver::{generate_wind_glyphs, QuiverConfig, WindGlyph};
pub use raster::render_overlay_rgba;
pub use sampling::FieldView;
