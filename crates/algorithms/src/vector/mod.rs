//! Vector conversions of raster labels
//!
//! - Polygonize: trace label regions into multipolygons
//! - Region masks: bounding box or polygon membership of cell centers

mod mask;
mod polygonize;

pub use mask::RegionMask;
pub use polygonize::{polygonize, LabelPolygon};
