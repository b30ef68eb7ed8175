//! Region descriptors and their parsing
//!
//! A region descriptor selects what area a model or workflow covers: a
//! model root, a polygon, a grid, or a set of basins given by ids, points,
//! a bounding box or a geometry.

mod descriptor;
mod kind;
mod parser;

pub use descriptor::{RegionDescriptor, RegionValue};
pub use kind::{BasinSelection, Region, RegionKind};
pub use parser::{parse_region, RegionParser};
