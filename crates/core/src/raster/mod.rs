//! Raster data structures

mod dataset;
mod element;
mod geotransform;
mod grid;
mod window;

pub use dataset::RasterDataset;
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use window::Window;
