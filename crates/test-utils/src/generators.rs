//! Test data generators for creating synthetic weather-like fields.
//!
//! These generators create predictable, verifiable patterns that can be
//! packed into GRIB2 messages or fed straight to the renderer.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a mean sea level pressure grid in Pa with a low in the centre.
///
/// Pressure rises radially from `center_hpa` by `depth_hpa` at the corners,
/// so the field crosses several 4 hPa isobars for typical inputs.
pub fn create_pressure_low_grid(
    width: usize,
    height: usize,
    center_hpa: f32,
    depth_hpa: f32,
) -> Vec<f32> {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 - cx;
            let dy = row as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt() / max_dist;
            data.push((center_hpa + depth_hpa * dist) * 100.0);
        }
    }
    data
}

/// Creates U and V grids for a cyclonic (counter-clockwise) vortex.
///
/// Speed grows linearly from 0 at the centre to `max_speed` at the corners.
pub fn create_vortex_wind(width: usize, height: usize, max_speed: f32) -> (Vec<f32>, Vec<f32>) {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

    let mut u = Vec::with_capacity(width * height);
    let mut v = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            // Row index grows southward, so north is -dy
            let east = col as f32 - cx;
            let north = cy - row as f32;
            let scale = max_speed / max_dist;
            u.push(-north * scale);
            v.push(east * scale);
        }
    }
    (u, v)
}

/// Creates a U-component grid varying by row (westerlies north of the equator).
pub fn create_u_wind_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let lat_factor = 1.0 - 2.0 * row as f32 / (height.max(2) - 1) as f32; // 1 to -1
        for _col in 0..width {
            data.push(lat_factor * 20.0);
        }
    }
    data
}

/// Creates a V-component grid varying by column.
pub fn create_v_wind_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            let lon_factor = (col as f32 / width as f32 - 0.5) * 2.0; // -1 to 1
            data.push(lon_factor * 15.0);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_low_grid() {
        let grid = create_pressure_low_grid(5, 5, 980.0, 40.0);
        assert_eq!(grid.len(), 25);
        assert_eq!(grid[12], 98000.0);
        assert_eq!(grid[0], 102000.0);
        assert!(grid[6] > grid[12] && grid[6] < grid[0]);
    }

    #[test]
    fn test_vortex_is_cyclonic() {
        let (u, v) = create_vortex_wind(3, 3, 10.0);
        // Centre is calm
        assert_eq!((u[4], v[4]), (0.0, 0.0));
        // North of centre the flow is westward
        assert!(u[1] < 0.0);
        // East of centre the flow is northward
        assert!(v[5] > 0.0);
    }

    #[test]
    fn test_wind_component_grids() {
        let u = create_u_wind_grid(4, 3);
        assert_eq!(u[0], 20.0);
        assert_eq!(u[11], -20.0);
        let v = create_v_wind_grid(4, 3);
        assert_eq!(v[0], -15.0);
        assert_eq!(v.len(), 12);
    }
}
