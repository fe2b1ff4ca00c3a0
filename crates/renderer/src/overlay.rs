//! Overlay composition: isobars plus wind arrows for one set of fields.

use crate::contour::{contour_segments, ContourConfig, Segment};
use crate::error::{RenderError, RenderResult};
use crate::quiver::{generate_wind_glyphs, QuiverConfig, WindGlyph};
use crate::sampling::FieldView;

/// Output raster and styling for an overlay.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub width: u32,
    pub height: u32,
    pub contour: ContourConfig,
    pub quiver: QuiverConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            width: 660,
            height: 330,
            contour: ContourConfig::default(),
            quiver: QuiverConfig::default(),
        }
    }
}

/// Geometry for one decode cycle, in output-pixel space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub width: u32,
    pub height: u32,
    pub contours: Vec<Segment>,
    pub glyphs: Vec<WindGlyph>,
}

impl Overlay {
    /// Total number of line segments to stroke.
    pub fn segment_count(&self) -> usize {
        self.contours.len() + self.glyphs.len() * 3
    }

    /// Every contour segment followed by every glyph stroke.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.contours
            .iter()
            .copied()
            .chain(self.glyphs.iter().flat_map(|g| g.segments()))
    }
}

/// Build an overlay from pressure (hPa) and wind component (m/s) fields.
///
/// Each field is sampled on its own grid, so the three need not share a
/// resolution.
///
/// Contouring and arrow generation run concurrently on the rayon pool.
pub fn build_overlay(
    pressure: &FieldView<'_>,
    u: &FieldView<'_>,
    v: &FieldView<'_>,
    config: &OverlayConfig,
) -> RenderResult<Overlay> {
    let (width, height) = (config.width, config.height);
    if width < 2 || height < 2 {
        return Err(RenderError::InvalidSize { width, height });
    }
    for field in [pressure, u, v] {
        if field.is_empty() {
            return Err(RenderError::EmptyField {
                nx: field.nx,
                ny: field.ny,
            });
        }
    }
    let (contours, glyphs) = rayon::join(
        || contour_segments(pressure, width, height, &config.contour.levels),
        || generate_wind_glyphs(u, v, width, height, &config.quiver),
    );

    tracing::debug!(
        width,
        height,
        contours = contours.len(),
        glyphs = glyphs.len(),
        "Built overlay"
    );

    Ok(Overlay {
        width,
        height,
        contours,
        glyphs,
    })
}
