//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

use super::Window;
use crate::vector::BoundingBox;

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Flow networks are expected north-up (`pixel_height` negative, no
/// rotation); window and cell lookups assume this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Geographic coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_geo_frac(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Geographic coordinates of the pixel's top-left corner
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_geo_frac(col as f64, row as f64)
    }

    fn pixel_to_geo_frac(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Convert geographic coordinates to fractional pixel coordinates (col, row)
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-15 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }

    /// The (row, col) of the cell containing (x, y), if inside a `rows` x `cols` grid
    pub fn cell_at(&self, x: f64, y: f64, rows: usize, cols: usize) -> Option<(usize, usize)> {
        let (col, row) = self.geo_to_pixel(x, y);
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        (row < rows && col < cols).then_some((row, col))
    }

    /// Get the cell size (assumes square pixels and no rotation)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Bounding box of a raster of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ];
        let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for (x, y) in corners {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        bbox
    }

    /// Bounding box of a window of cells
    pub fn window_bounds(&self, window: &Window) -> BoundingBox {
        let (x0, y0) = self.pixel_to_geo_corner(window.col_start, window.row_start);
        let (x1, y1) = self.pixel_to_geo_corner(window.col_end, window.row_end);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Window of the cells whose centers fall inside `bbox` (edges inclusive),
    /// clamped to a `rows` x `cols` grid. `None` if no cell center is inside.
    pub fn window_for(&self, bbox: &BoundingBox, rows: usize, cols: usize) -> Option<Window> {
        let (c0, r0) = self.geo_to_pixel(bbox.min_x, bbox.max_y);
        let (c1, r1) = self.geo_to_pixel(bbox.max_x, bbox.min_y);
        if !(c0.is_finite() && c1.is_finite() && r0.is_finite() && r1.is_finite()) {
            return None;
        }

        let span = |a: f64, b: f64, n: usize| -> Option<(usize, usize)> {
            let lo = (a.min(b) - 0.5).ceil().max(0.0);
            let hi = (a.max(b) - 0.5).floor();
            if hi < lo || hi < 0.0 || lo >= n as f64 {
                return None;
            }
            Some((lo as usize, (hi as usize).min(n - 1) + 1))
        };

        let (row_start, row_end) = span(r0, r1, rows)?;
        let (col_start, col_end) = span(c0, c1, cols)?;
        Some(Window::new(row_start, row_end, col_start, col_end))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_to_geo_roundtrip() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);

        let (x, y) = gt.pixel_to_geo(5, 10);
        let (col, row) = gt.geo_to_pixel(x, y);

        assert_relative_eq!(col, 5.5, epsilon = 1e-10);
        assert_relative_eq!(row, 10.5, epsilon = 1e-10);
    }

    #[test]
    fn test_bounds() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        let bb = gt.bounds(100, 100);

        assert_relative_eq!(bb.min_x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(bb.min_y, 0.0, epsilon = 1e-10);
        assert_relative_eq!(bb.max_x, 100.0, epsilon = 1e-10);
        assert_relative_eq!(bb.max_y, 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_cell_at() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        assert_eq!(gt.cell_at(0.5, 9.5, 10, 10), Some((0, 0)));
        assert_eq!(gt.cell_at(3.2, 1.1, 10, 10), Some((8, 3)));
        assert_eq!(gt.cell_at(-0.1, 5.0, 10, 10), None);
        assert_eq!(gt.cell_at(5.0, 10.5, 10, 10), None);
        assert_eq!(gt.cell_at(10.5, 5.0, 10, 10), None);
    }

    #[test]
    fn test_window_for_centers() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        // Centers at x = 2.5, 3.5 and y = 6.5, 7.5
        let w = gt.window_for(&BoundingBox::new(2.2, 6.2, 3.9, 7.9), 10, 10).unwrap();
        assert_eq!((w.row_start, w.row_end), (2, 4));
        assert_eq!((w.col_start, w.col_end), (2, 4));

        // Box between centers contains none
        assert!(gt.window_for(&BoundingBox::new(2.6, 6.6, 3.4, 7.4), 10, 10).is_none());

        // Clamped to the grid
        let w = gt.window_for(&BoundingBox::new(-5.0, -5.0, 50.0, 50.0), 10, 10).unwrap();
        assert_eq!(w, Window::full(10, 10));

        // Entirely outside
        assert!(gt.window_for(&BoundingBox::new(20.0, 20.0, 30.0, 30.0), 10, 10).is_none());
    }
}
