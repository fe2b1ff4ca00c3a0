//! Contour line (isoline) generation using the marching squares algorithm.
//!
//! The pressure field is first sampled onto the output raster, then every
//! raster cell is classified against each iso-level and the crossing points
//! are linearly interpolated along the cell edges. The result is a flat list
//! of segments in output-pixel space.

use rayon::prelude::*;

use crate::sampling::FieldView;

/// A point in 2D space (pixel coordinates)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Configuration for contour generation and stroking
#[derive(Debug, Clone)]
pub struct ContourConfig {
    /// Contour levels to draw
    pub levels: Vec<f32>,
    /// Line width in pixels
    pub line_width: f32,
    /// Line color [R, G, B, A]
    pub line_color: [u8; 4],
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            levels: pressure_levels(),
            line_width: 1.0,
            line_color: [255, 255, 255, 200],
        }
    }
}

/// Isobar levels in hPa: 960 to 1040 inclusive, every 4 hPa.
pub fn pressure_levels() -> Vec<f32> {
    generate_contour_levels(960.0, 1040.0, 4.0)
}

/// Generate contour levels automatically based on data range and interval
pub fn generate_contour_levels(min_value: f32, max_value: f32, interval: f32) -> Vec<f32> {
    if interval <= 0.0 || max_value < min_value {
        return vec![];
    }

    // Start from first multiple of interval at or above min_value
    let first = (min_value / interval).ceil() as i64;
    let last = (max_value / interval).floor() as i64;
    (first..=last).map(|i| i as f32 * interval).collect()
}

/// Edge pairs joined by the contour for each corner mask.
///
/// Edges: 0 = top, 1 = right, 2 = bottom, 3 = left. Saddles (5 and 10) use a
/// fixed pairing rather than sampling the cell centre.
const EDGE_PAIRS: [&[(u8, u8)]; 16] = [
    &[],
    &[(0, 3)],
    &[(0, 1)],
    &[(1, 3)],
    &[(1, 2)],
    &[(0, 3), (1, 2)],
    &[(0, 2)],
    &[(2, 3)],
    &[(2, 3)],
    &[(0, 2)],
    &[(0, 1), (2, 3)],
    &[(1, 2)],
    &[(1, 3)],
    &[(0, 1)],
    &[(0, 3)],
    &[],
];

/// Corner values closer than this are treated as a flat edge.
const FLAT_EDGE_EPSILON: f32 = 1e-4;

/// Fraction of the way from `a` to `b` at which `level` is crossed.
fn edge_fraction(a: f32, b: f32, level: f32) -> f32 {
    let diff = b - a;
    if diff.abs() < FLAT_EDGE_EPSILON {
        return 0.5;
    }
    ((level - a) / diff).clamp(0.0, 1.0)
}

/// Corner values of one raster cell.
#[derive(Debug, Clone, Copy)]
struct Cell {
    x: f32,
    y: f32,
    tl: f32,
    tr: f32,
    br: f32,
    bl: f32,
}

impl Cell {
    /// Bit 0 = TL, bit 1 = TR, bit 2 = BR, bit 3 = BL at or above the level.
    fn mask(&self, level: f32) -> usize {
        let mut mask = 0;
        if self.tl >= level {
            mask |= 1;
        }
        if self.tr >= level {
            mask |= 2;
        }
        if self.br >= level {
            mask |= 4;
        }
        if self.bl >= level {
            mask |= 8;
        }
        mask
    }

    /// Crossing point on an edge, walking the cell clockwise from TL.
    fn edge_point(&self, edge: u8, level: f32) -> Point {
        let Cell { x, y, .. } = *self;
        match edge {
            0 => Point::new(x + edge_fraction(self.tl, self.tr, level), y),
            1 => Point::new(x + 1.0, y + edge_fraction(self.tr, self.br, level)),
            2 => Point::new(x + 1.0 - edge_fraction(self.br, self.bl, level), y + 1.0),
            _ => Point::new(x, y + 1.0 - edge_fraction(self.bl, self.tl, level)),
        }
    }
}

/// Marching squares over a row-major raster for a single level.
///
/// Cells with any NaN corner are skipped.
pub fn march_squares(data: &[f32], width: usize, height: usize, level: f32) -> Vec<Segment> {
    if width < 2 || height < 2 || data.len() != width * height {
        return vec![];
    }

    let mut segments = Vec::new();
    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let cell = Cell {
                x: x as f32,
                y: y as f32,
                tl: data[y * width + x],
                tr: data[y * width + x + 1],
                br: data[(y + 1) * width + x + 1],
                bl: data[(y + 1) * width + x],
            };

            if cell.tl.is_nan() || cell.tr.is_nan() || cell.br.is_nan() || cell.bl.is_nan() {
                continue;
            }

            for &(a, b) in EDGE_PAIRS[cell.mask(level)] {
                segments.push(Segment::new(
                    cell.edge_point(a, level),
                    cell.edge_point(b, level),
                ));
            }
        }
    }

    segments
}

/// Contour a field at every level on a `width` x `height` output raster.
///
/// Levels are processed in parallel; segments are returned grouped by level
/// in the order the levels were given.
pub fn contour_segments(
    field: &FieldView<'_>,
    width: u32,
    height: u32,
    levels: &[f32],
) -> Vec<Segment> {
    let raster = field.resample(width, height);
    let (w, h) = (width as usize, height as usize);

    let segments: Vec<Segment> = levels
        .par_iter()
        .flat_map_iter(|&level| march_squares(&raster, w, h, level))
        .collect();

    tracing::debug!(
        nx = field.nx,
        ny = field.ny,
        width,
        height,
        num_levels = levels.len(),
        segments = segments.len(),
        "Generated contours"
    );

    segments
}
