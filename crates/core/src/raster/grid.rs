//! Georeferenced grids

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement, Window};
use crate::vector::BoundingBox;
use ndarray::Array2;

/// A georeferenced grid of `T` cells.
///
/// Flow-network layers are all `Raster`s sharing one grid; alignment is
/// checked with [`Raster::same_grid`].
///
/// # Example
///
/// ```ignore
/// use basinmask_core::Raster;
///
/// let mut flowdir: Raster<u8> = Raster::filled(3, 4, 1);
/// flowdir.set(1, 3, 0)?;
/// assert_eq!(flowdir.get(1, 3)?, 0);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Cells indexed (row, col)
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Zero-filled raster on the default transform
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Raster from row-major cells; fails if the length is not `rows * cols`
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    pub fn with_nodata(mut self, nodata: Option<T>) -> Self {
        self.nodata = nodata;
        self
    }

    /// A raster on the same grid holding `data` (must match the shape)
    pub fn with_same_meta_from_vec<U: RasterElement>(&self, data: Vec<U>) -> Result<Raster<U>> {
        let (rows, cols) = self.shape();
        Ok(Raster::from_vec(data, rows, cols)?
            .with_transform(self.transform)
            .with_crs(self.crs.clone()))
    }

    /// Cast every cell to another element type.
    ///
    /// Nodata cells, and values that do not fit `U`, become `nodata`.
    pub fn cast<U: RasterElement>(&self, nodata: U) -> Raster<U> {
        let data = self.data.mapv(|v| {
            if self.is_nodata(v) {
                return nodata;
            }
            v.to_f64().and_then(U::from_f64).unwrap_or(nodata)
        });
        Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: Some(nodata),
        }
    }

    // Dimensions

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Same shape and (numerically) the same transform
    pub fn same_grid<U: RasterElement>(&self, other: &Raster<U>) -> bool {
        let (a, b) = (self.transform, *other.transform());
        self.shape() == other.shape()
            && [
                (a.origin_x, b.origin_x),
                (a.origin_y, b.origin_y),
                (a.pixel_width, b.pixel_width),
                (a.pixel_height, b.pixel_height),
            ]
            .iter()
            .all(|(p, q)| (p - q).abs() <= 1e-9 * p.abs().max(q.abs()).max(1.0))
    }

    // Data access

    /// Checked cell read
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Cell read without bounds checks
    ///
    /// # Safety
    /// `row < rows()` and `col < cols()`
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell width in map units
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Outer extent of all cells
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Coordinates

    /// Cell center in map coordinates
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// The (row, col) of the cell containing (x, y), if any
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        self.transform.cell_at(x, y, self.rows(), self.cols())
    }

    /// Window of cells whose centers fall inside `bbox`
    pub fn window_for(&self, bbox: &BoundingBox) -> Option<Window> {
        self.transform.window_for(bbox, self.rows(), self.cols())
    }

    // Nodata

    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells holding data
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<u32> = Raster::new(10, 10);
        raster.set(5, 5, 42).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42);
        assert!(raster.get(10, 0).is_err());
    }

    #[test]
    fn test_cast_maps_nodata() {
        let r = Raster::from_vec(vec![1.0, f64::NAN, 300.0, 4.0], 2, 2).unwrap();
        let c: Raster<u8> = r.cast(255);
        assert_eq!(c.get(0, 0).unwrap(), 1);
        assert_eq!(c.get(0, 1).unwrap(), 255);
        assert_eq!(c.get(1, 0).unwrap(), 255);
        assert_eq!(c.nodata(), Some(255));
        assert_eq!(c.valid_count(), 2);
    }

    #[test]
    fn test_same_grid() {
        let gt = GeoTransform::new(10.0, 50.0, 0.25, -0.25);
        let a: Raster<u8> = Raster::new(4, 4).with_transform(gt);
        let b: Raster<f64> = Raster::new(4, 4).with_transform(gt);
        let c: Raster<f64> = Raster::new(4, 4);
        assert!(a.same_grid(&b));
        assert!(!a.same_grid(&c));
    }
}
