//! # basinmask algorithms
//!
//! Region parsing and basin delineation for basinmask.
//!
//! ## Modules
//!
//! - **region**: region descriptors and `parse_region`
//! - **hydrology**: D8 flow networks, basin labelling, stream order,
//!   basin, sub-basin and interbasin geometry
//! - **vector**: label polygonization and region masks

pub mod hydrology;
pub mod region;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        get_basin_geometry, label_basins, strahler_order, BasinGeometry, BasinIndex, BasinKind,
        BasinRequest, BasinResolver, D8Encoding, FeatureBasinIndex, FlowNetwork, LayerNames,
        StreamNetworkParams,
    };
    pub use crate::region::{parse_region, Region, RegionDescriptor, RegionKind, RegionParser};
    pub use crate::vector::{polygonize, RegionMask};
    pub use basinmask_core::prelude::*;
}
