//! Nearest-lower-index sampling of a grid onto the output raster.

/// A borrowed row-major scalar grid.
///
/// `values` may be shorter than `nx * ny`; points past its end sample as NaN.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub values: &'a [f32],
    pub nx: usize,
    pub ny: usize,
}

impl<'a> FieldView<'a> {
    pub fn new(values: &'a [f32], nx: usize, ny: usize) -> Self {
        Self { values, nx, ny }
    }

    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0 || self.values.is_empty()
    }

    /// Value under output pixel `(px, py)` of a `width` x `height` raster.
    ///
    /// Maps to input cell `(px * nx / width, py * ny / height)` with integer
    /// division, clamped to the last row/column.
    pub fn sample(&self, px: u32, py: u32, width: u32, height: u32) -> f32 {
        if self.nx == 0 || self.ny == 0 || width == 0 || height == 0 {
            return f32::NAN;
        }
        let ix = grid_index(px, self.nx, width);
        let iy = grid_index(py, self.ny, height);
        self.values
            .get(iy * self.nx + ix)
            .copied()
            .unwrap_or(f32::NAN)
    }

    /// Sample every output pixel, row-major.
    pub fn resample(&self, width: u32, height: u32) -> Vec<f32> {
        let mut raster = Vec::with_capacity(width as usize * height as usize);
        for py in 0..height {
            for px in 0..width {
                raster.push(self.sample(px, py, width, height));
            }
        }
        raster
    }
}

#[inline]
fn grid_index(pixel: u32, n_in: usize, n_out: u32) -> usize {
    let index = (pixel as u64 * n_in as u64 / n_out as u64) as usize;
    index.min(n_in - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_integer_division() {
        // 4x2 grid onto an 8x4 raster: every input cell covers 2x2 pixels
        let values = [0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0];
        let field = FieldView::new(&values, 4, 2);
        assert_eq!(field.sample(0, 0, 8, 4), 0.0);
        assert_eq!(field.sample(1, 1, 8, 4), 0.0);
        assert_eq!(field.sample(2, 0, 8, 4), 1.0);
        assert_eq!(field.sample(7, 3, 8, 4), 13.0);
        assert_eq!(field.sample(5, 2, 8, 4), 12.0);
    }

    #[test]
    fn test_sample_clamps_and_short_fields() {
        let values = [1.0, 2.0, 3.0];
        let field = FieldView::new(&values, 2, 2);
        // Pixel beyond the raster clamps to the last column/row
        assert!(field.sample(100, 0, 2, 2) == 2.0);
        // Index 3 was never decoded
        assert!(field.sample(1, 1, 2, 2).is_nan());
        assert!(FieldView::new(&[], 0, 0).sample(0, 0, 2, 2).is_nan());
    }

    #[test]
    fn test_resample_dimensions() {
        let values = [5.0; 6];
        let raster = FieldView::new(&values, 3, 2).resample(10, 4);
        assert_eq!(raster.len(), 40);
        assert!(raster.iter().all(|&v| v == 5.0));
    }
}
