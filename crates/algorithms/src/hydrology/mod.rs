//! Hydrological analysis on D8 flow networks
//!
//! - D8 encodings: sequential, Esri, Whitebox and LDD direction codes
//! - Flow network: flow directions plus optional basin, upstream area and
//!   stream order layers on one grid
//! - Basins: upstream floods, downstream traces, basin labelling
//! - Stream order and stream network extraction
//! - Basin geometry: basin, sub-basin and interbasin delineation

mod basin_geometry;
mod basin_index;
mod basins;
mod d8;
mod flow_network;
mod stream_network;
mod stream_order;

pub use basin_geometry::{
    get_basin_geometry, nearest_cell, region_cells, BasinGeometry, BasinKind, BasinRequest,
    BasinResolver, SelectionCriterion,
};
pub use basin_index::{BasinIndex, FeatureBasinIndex};
pub use basins::{
    basin_labels, flood_pieces, flood_upstream, label_basins, terminal_outlet, trace_downstream,
    LabelBasins,
};
pub use d8::{opposite, D8Encoding, FlowCode, D8_OFFSETS};
pub use flow_network::{FlowNetwork, LayerNames};
pub use stream_network::{stream_network, StreamCriteria, StreamNetworkParams};
pub use stream_order::{strahler_order, StrahlerOrder};
