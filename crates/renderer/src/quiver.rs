//! Wind arrow (quiver) glyph generation.
//!
//! Wind components are sampled on a regular stride across the output raster
//! and each sample becomes an arrow pointing downwind: a shaft whose length
//! grows with speed and two short head strokes at the tip.

use crate::contour::{Point, Segment};
use crate::sampling::FieldView;

/// Configuration for wind arrow generation and stroking
#[derive(Debug, Clone)]
pub struct QuiverConfig {
    /// Grid spacing between arrows in pixels
    pub stride: u32,
    /// Samples slower than this (m/s) are not drawn
    pub min_speed: f32,
    /// Shaft pixels per m/s before clamping
    pub scale: f32,
    pub min_len: f32,
    pub max_len: f32,
    /// Angle between shaft and each head stroke, radians
    pub head_angle: f32,
    /// Head length as a fraction of the shaft length
    pub head_ratio: f32,
    pub min_head: f32,
    /// Line width in pixels
    pub line_width: f32,
    /// Line color [R, G, B, A]
    pub line_color: [u8; 4],
}

impl Default for QuiverConfig {
    fn default() -> Self {
        Self {
            stride: 25,
            min_speed: 0.5,
            scale: 1.2,
            min_len: 2.0,
            max_len: 18.0,
            head_angle: 0.5236,
            head_ratio: 0.35,
            min_head: 3.0,
            line_width: 1.0,
            line_color: [255, 255, 255, 140],
        }
    }
}

/// One wind arrow in output-pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindGlyph {
    pub origin: Point,
    /// End of the shaft, downwind of the origin
    pub tip: Point,
    pub head_left: Point,
    pub head_right: Point,
}

impl WindGlyph {
    /// Shaft followed by the two head strokes.
    pub fn segments(&self) -> [Segment; 3] {
        [
            Segment::new(self.origin, self.tip),
            Segment::new(self.tip, self.head_left),
            Segment::new(self.tip, self.head_right),
        ]
    }
}

/// Calculate positions for wind arrows on a grid with decimation
pub fn calculate_glyph_positions(width: u32, height: u32, stride: u32) -> Vec<(u32, u32)> {
    let mut positions = Vec::new();
    let stride = stride.max(1);

    // Start from stride/2 to center the grid
    let mut y = stride / 2;
    while y < height {
        let mut x = stride / 2;
        while x < width {
            positions.push((x, y));
            x += stride;
        }
        y += stride;
    }

    positions
}

/// Build the arrow for wind `(u, v)` anchored at `origin`.
///
/// Returns `None` for calm or missing wind. Pixel Y grows downward, so the
/// northward component is negated.
pub fn wind_glyph(origin: Point, u: f32, v: f32, config: &QuiverConfig) -> Option<WindGlyph> {
    let speed = (u * u + v * v).sqrt();
    // Also rejects NaN
    if !(speed >= config.min_speed) || speed == 0.0 {
        return None;
    }

    let len = (speed * config.scale).clamp(config.min_len, config.max_len);
    let dx = u / speed * len;
    let dy = -v / speed * len;
    let tip = Point::new(origin.x + dx, origin.y + dy);

    let angle = dy.atan2(dx);
    let head_len = (len * config.head_ratio).max(config.min_head);
    let head = |offset: f32| {
        Point::new(
            tip.x - head_len * (angle + offset).cos(),
            tip.y - head_len * (angle + offset).sin(),
        )
    };

    Some(WindGlyph {
        origin,
        tip,
        head_left: head(config.head_angle),
        head_right: head(-config.head_angle),
    })
}

/// Sample both wind components at every stride position and build arrows.
pub fn generate_wind_glyphs(
    u: &FieldView<'_>,
    v: &FieldView<'_>,
    width: u32,
    height: u32,
    config: &QuiverConfig,
) -> Vec<WindGlyph> {
    let positions = calculate_glyph_positions(width, height, config.stride);
    let glyphs: Vec<WindGlyph> = positions
        .iter()
        .filter_map(|&(px, py)| {
            let us = u.sample(px, py, width, height);
            let vs = v.sample(px, py, width, height);
            wind_glyph(Point::new(px as f32, py as f32), us, vs, config)
        })
        .collect();

    tracing::debug!(
        samples = positions.len(),
        glyphs = glyphs.len(),
        stride = config.stride,
        "Generated wind glyphs"
    );

    glyphs
}
