//! # basinmask core
//!
//! Core types, traits and I/O for the basinmask delineation engine.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced grid
//! - `RasterDataset`: named, aligned raster layers
//! - `GeoTransform`, `BoundingBox`, `Window`: georeferencing and extents
//! - `CRS`: Coordinate Reference System tags
//! - `FeatureCollection`: the vector result/input type
//! - Catalog traits through which regions resolve files and names
//! - Algorithm trait for a consistent API
//! - I/O for GeoTIFF rasters and GeoJSON vectors

pub mod catalog;
pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use catalog::{DataCatalog, LocalCatalog, ModelRegistry, StaticModelRegistry};
pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterDataset, RasterElement, Window};
pub use vector::{AttributeValue, BoundingBox, Feature, FeatureCollection, GeometryKind};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::{DataCatalog, ModelRegistry};
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterDataset, RasterElement, Window};
    pub use crate::vector::{BoundingBox, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for basinmask algorithms.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
