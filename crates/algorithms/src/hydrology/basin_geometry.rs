//! Basin geometry resolution
//!
//! Given a flow network and a selection (basin ids, points, a bounding box
//! or a polygon), returns basin polygons and their outlet points:
//!
//! - **basin**: whole basins of the basin layer
//! - **subbasin**: everything upstream of split points on the stream network
//! - **interbasin**: like subbasin, with the flood confined to the region

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use basinmask_core::raster::Window;
use basinmask_core::vector::{AttributeValue, Feature, FeatureCollection};
use basinmask_core::{Algorithm, BoundingBox, Error, Result};
use geo::{Geometry, MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::basin_index::BasinIndex;
use super::basins::{basin_labels, flood_pieces, trace_downstream};
use super::flow_network::FlowNetwork;
use super::stream_network::{StreamCriteria, StreamNetworkParams};
use crate::vector::{polygonize, LabelPolygon, RegionMask};

/// What a selection delineates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasinKind {
    #[default]
    Basin,
    Subbasin,
    Interbasin,
}

impl fmt::Display for BasinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BasinKind::Basin => "basin",
            BasinKind::Subbasin => "subbasin",
            BasinKind::Interbasin => "interbasin",
        })
    }
}

/// Parameters for basin geometry resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasinRequest {
    pub kind: BasinKind,
    /// Basin ids
    pub basid: Option<Vec<u32>>,
    /// Points `(x, y)` in the network CRS
    pub xy: Option<Vec<(f64, f64)>>,
    pub bbox: Option<BoundingBox>,
    /// Polygon mask
    pub geom: Option<MultiPolygon<f64>>,
    /// Extent sub-basin floods may not leave
    pub bounds: Option<BoundingBox>,
    /// Minimum stream order of split points and selected streams
    pub strord: Option<u8>,
    /// Minimum upstream area of split points and selected streams
    pub uparea: Option<f64>,
    /// Search radius in cells for point lookup and index queries
    pub buffer: usize,
    /// Select by basin outlets instead of stream cells
    pub outlets: bool,
}

/// The single selection criterion of a request
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionCriterion {
    BasinIds(Vec<u32>),
    Points(Vec<(f64, f64)>),
    BBox(BoundingBox),
    Polygon(MultiPolygon<f64>),
}

impl SelectionCriterion {
    /// Region mask for bbox and polygon selections
    pub fn mask(&self) -> Option<RegionMask> {
        match self {
            SelectionCriterion::BBox(bbox) => Some(RegionMask::BBox(*bbox)),
            SelectionCriterion::Polygon(mp) => Some(RegionMask::Polygon(mp.clone())),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            SelectionCriterion::BasinIds(ids) => format!("basid {:?}", ids),
            SelectionCriterion::Points(xy) => format!("xy {:?}", xy),
            SelectionCriterion::BBox(bbox) => format!("bbox {:?}", bbox.to_array()),
            SelectionCriterion::Polygon(_) => "geom".to_string(),
        }
    }
}

fn check_box(name: &'static str, bbox: &BoundingBox) -> Result<()> {
    bbox.validate().map_err(|_| Error::InvalidParameter {
        name,
        value: format!("{:?}", bbox.to_array()),
        reason: "expected finite xmin < xmax and ymin < ymax".into(),
    })
}

impl BasinRequest {
    pub fn new(kind: BasinKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn stream_params(&self) -> StreamNetworkParams {
        StreamNetworkParams {
            strord: self.strord,
            uparea: self.uparea,
        }
    }

    /// The selection criterion; exactly one of basid, xy, bbox or geom
    pub fn criterion(&self) -> Result<SelectionCriterion> {
        let mut found = Vec::with_capacity(1);
        if let Some(ids) = &self.basid {
            found.push(SelectionCriterion::BasinIds(ids.clone()));
        }
        if let Some(xy) = &self.xy {
            found.push(SelectionCriterion::Points(xy.clone()));
        }
        if let Some(bbox) = &self.bbox {
            found.push(SelectionCriterion::BBox(*bbox));
        }
        if let Some(geom) = &self.geom {
            found.push(SelectionCriterion::Polygon(geom.clone()));
        }
        if found.len() > 1 {
            return Err(Error::InvalidParameter {
                name: "selection",
                value: format!("{} criteria", found.len()),
                reason: "give only one of basid, xy, bbox or geom".into(),
            });
        }
        found.pop().ok_or_else(|| Error::InvalidParameter {
            name: "selection",
            value: "none".into(),
            reason: "one of basid, xy, bbox or geom is required".into(),
        })
    }

    /// Fail on malformed requests before touching the network
    pub fn validate(&self, network: &FlowNetwork) -> Result<()> {
        if let Some(bbox) = &self.bbox {
            check_box("bbox", bbox)?;
        }
        if let Some(bounds) = &self.bounds {
            check_box("bounds", bounds)?;
        }
        if self.basid.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::InvalidParameter {
                name: "basid",
                value: "[]".into(),
                reason: "empty id list".into(),
            });
        }
        if self.xy.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::InvalidParameter {
                name: "xy",
                value: "[]".into(),
                reason: "empty point list".into(),
            });
        }
        if self.geom.as_ref().is_some_and(|g| g.0.is_empty()) {
            return Err(Error::InvalidParameter {
                name: "geom",
                value: "empty".into(),
                reason: "polygon mask has no parts".into(),
            });
        }
        if self.uparea.is_some() && network.uparea().is_none() {
            return Err(Error::MissingLayer(
                "uparea threshold given but the network has no uparea layer".into(),
            ));
        }
        Ok(())
    }
}

/// Resolved basins and outlets, keyed by the `basid` property
#[derive(Debug, Clone, PartialEq)]
pub struct BasinGeometry {
    /// One `MultiPolygon` feature per id
    pub basins: FeatureCollection,
    /// One `Point` feature per id, when outlets apply
    pub outlets: Option<FeatureCollection>,
}

impl BasinGeometry {
    /// Ids in output order
    pub fn ids(&self) -> Vec<u32> {
        self.basins
            .iter()
            .filter_map(|f| f.get_property("basid")?.as_i64())
            .filter_map(|id| u32::try_from(id).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.basins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basins.is_empty()
    }
}

/// Basin geometry resolver
#[derive(Debug, Clone, Default)]
pub struct BasinResolver;

impl Algorithm for BasinResolver {
    type Input = FlowNetwork;
    type Output = BasinGeometry;
    type Params = BasinRequest;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Basin Geometry"
    }

    fn description(&self) -> &'static str {
        "Delineate basins, sub-basins or interbasins from a D8 flow network"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        get_basin_geometry(&input, &params, None)
    }
}

/// Resolve the basin polygons and outlet points a request selects.
///
/// An optional [`BasinIndex`] prunes the candidate basins of region
/// selections. It never clips the returned polygons.
///
/// # Errors
/// - `InvalidParameter` for a missing, ambiguous or malformed selection
/// - `MissingLayer` for an uparea threshold on a network without uparea
/// - `NoBasinsFound` when the selection yields no cells
pub fn get_basin_geometry(
    network: &FlowNetwork,
    request: &BasinRequest,
    index: Option<&dyn BasinIndex>,
) -> Result<BasinGeometry> {
    request.validate(network)?;
    let criterion = request.criterion()?;
    debug!("resolving {} geometry by {}", request.kind, criterion.describe());

    match request.kind {
        BasinKind::Basin => resolve_basins(network, request, &criterion, index),
        BasinKind::Subbasin | BasinKind::Interbasin => {
            resolve_subbasins(network, request, &criterion, index)
        }
    }
}

/// Nearest cell accepted by `accept`, searching square rings of growing
/// Chebyshev distance up to `buffer`. Within a ring the cell center closest
/// to the point wins, ties going to the first cell in row-major order.
pub fn nearest_cell<F>(network: &FlowNetwork, x: f64, y: f64, buffer: usize, accept: F) -> Option<usize>
where
    F: Fn(usize) -> bool,
{
    let (colf, rowf) = network.transform().geo_to_pixel(x, y);
    if !colf.is_finite() || !rowf.is_finite() {
        return None;
    }
    let (r0, c0) = (rowf.floor() as isize, colf.floor() as isize);
    let (rows, cols) = (network.rows() as isize, network.cols() as isize);

    for k in 0..=buffer as isize {
        let mut best: Option<(f64, usize)> = None;
        for r in (r0 - k)..=(r0 + k) {
            let edge_row = r == r0 - k || r == r0 + k;
            let step = if edge_row || k == 0 { 1 } else { (2 * k) as usize };
            for c in ((c0 - k)..=(c0 + k)).step_by(step) {
                if r < 0 || c < 0 || r >= rows || c >= cols {
                    continue;
                }
                let idx = network.index(r as usize, c as usize);
                if !accept(idx) {
                    continue;
                }
                let d = (r as f64 + 0.5 - rowf).powi(2) + (c as f64 + 0.5 - colf).powi(2);
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, idx));
                }
            }
        }
        if let Some((_, idx)) = best {
            return Some(idx);
        }
    }
    None
}

/// Valid cells whose centers lie inside the mask, row-major
pub fn region_cells(network: &FlowNetwork, mask: &RegionMask) -> Vec<usize> {
    let Some(window) = mask.bounds().and_then(|b| network.window_for(&b)) else {
        return Vec::new();
    };
    window
        .cells()
        .filter(|&(r, c)| {
            let (x, y) = network.flowdir().pixel_to_geo(c, r);
            mask.contains(x, y)
        })
        .map(|(r, c)| network.index(r, c))
        .filter(|&i| network.is_valid(i))
        .collect()
}

fn candidate_ids(
    network: &FlowNetwork,
    mask: &RegionMask,
    buffer: usize,
    index: Option<&dyn BasinIndex>,
) -> Option<BTreeSet<u32>> {
    let index = index?;
    let bounds = mask.bounds()?;
    let pad = buffer as f64 * network.transform().cell_size();
    let ids = index.candidates_in(&bounds.buffered(pad));
    debug!("basin index returned {} candidates", ids.len());
    Some(ids)
}

fn resolve_basins(
    network: &FlowNetwork,
    request: &BasinRequest,
    criterion: &SelectionCriterion,
    index: Option<&dyn BasinIndex>,
) -> Result<BasinGeometry> {
    let labels = basin_labels(network)?;
    let label_at = |i: usize| -> u32 {
        let (r, c) = network.cell(i);
        // SAFETY: labels share the flow direction grid
        let v = unsafe { labels.get_unchecked(r, c) };
        if labels.is_nodata(v) {
            0
        } else {
            v
        }
    };

    let mut outlet_cells: BTreeMap<u32, usize> = BTreeMap::new();
    let ids: Vec<u32> = match criterion {
        SelectionCriterion::BasinIds(ids) => {
            let set: BTreeSet<u32> = ids.iter().copied().filter(|&id| id != 0).collect();
            set.into_iter().collect()
        }
        SelectionCriterion::Points(points) => {
            let mut ids = Vec::new();
            for &(x, y) in points {
                let cell = nearest_cell(network, x, y, request.buffer, |i| label_at(i) != 0)
                    .ok_or_else(|| {
                        Error::NoBasinsFound(format!(
                            "no basin within {} cells of ({}, {})",
                            request.buffer, x, y
                        ))
                    })?;
                let id = label_at(cell);
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            ids
        }
        SelectionCriterion::BBox(_) | SelectionCriterion::Polygon(_) => {
            let Some(mask) = criterion.mask() else {
                return Err(Error::Algorithm("region selection without a mask".into()));
            };
            let candidates = candidate_ids(network, &mask, request.buffer, index);
            let streams = StreamCriteria::new(network, &request.stream_params())?;
            let mut ids = BTreeSet::new();
            for cell in region_cells(network, &mask) {
                let id = label_at(cell);
                if id == 0 || candidates.as_ref().is_some_and(|c| !c.contains(&id)) {
                    continue;
                }
                if !streams.is_stream(cell) {
                    continue;
                }
                if request.outlets {
                    if !network.is_outlet(cell) {
                        continue;
                    }
                    outlet_cells.entry(id).or_insert(cell);
                }
                ids.insert(id);
            }
            ids.into_iter().collect()
        }
    };

    if ids.is_empty() {
        return Err(Error::NoBasinsFound(criterion.describe()));
    }

    let polygons = polygonize(&labels, &ids, None);
    if polygons.is_empty() {
        return Err(Error::NoBasinsFound(criterion.describe()));
    }
    debug!("selected {} basins", polygons.len());

    let outlets = if request.outlets {
        let missing: BTreeSet<u32> = polygons
            .iter()
            .map(|p| p.id)
            .filter(|id| !outlet_cells.contains_key(id))
            .collect();
        if !missing.is_empty() {
            for cell in network.outlets() {
                let id = label_at(cell);
                if missing.contains(&id) {
                    outlet_cells.entry(id).or_insert(cell);
                }
            }
        }
        let points = polygons
            .iter()
            .filter_map(|p| outlet_cells.get(&p.id).map(|&cell| (p.id, cell)));
        Some(outlet_collection(network, points))
    } else {
        None
    };

    Ok(BasinGeometry {
        basins: basin_collection(network, &polygons),
        outlets,
    })
}

fn resolve_subbasins(
    network: &FlowNetwork,
    request: &BasinRequest,
    criterion: &SelectionCriterion,
    index: Option<&dyn BasinIndex>,
) -> Result<BasinGeometry> {
    let streams = StreamCriteria::new(network, &request.stream_params())?;

    let bounds_window: Option<Window> = match &request.bounds {
        Some(b) => Some(network.window_for(b).ok_or_else(|| {
            Error::NoBasinsFound(format!("no cells inside bounds {:?}", b.to_array()))
        })?),
        None => None,
    };
    let in_bounds = |i: usize| {
        let (r, c) = network.cell(i);
        bounds_window.map_or(true, |w| w.contains(r, c))
    };

    let mut in_region: Option<Vec<bool>> = None;
    let seeds: Vec<usize> = match criterion {
        SelectionCriterion::Points(points) => {
            let mut seeds = Vec::with_capacity(points.len());
            for &(x, y) in points {
                let cell = nearest_cell(network, x, y, request.buffer, |i| network.is_valid(i))
                    .ok_or_else(|| {
                        Error::NoBasinsFound(format!("point ({}, {}) is not on the flow network", x, y))
                    })?;
                let path = trace_downstream(network, cell, |i| streams.is_stream(i))?;
                seeds.push(path[path.len() - 1]);
            }
            seeds
        }
        SelectionCriterion::BBox(_) | SelectionCriterion::Polygon(_) => {
            let Some(mask) = criterion.mask() else {
                return Err(Error::Algorithm("region selection without a mask".into()));
            };
            let cells = region_cells(network, &mask);
            let mut region = vec![false; network.len()];
            for &cell in &cells {
                region[cell] = true;
            }

            let candidates = candidate_ids(network, &mask, request.buffer, index);
            let labels = match candidates {
                Some(_) => Some(basin_labels(network)?),
                None => None,
            };
            let is_candidate = |i: usize| match (&candidates, &labels) {
                (Some(ids), Some(labels)) => {
                    let (r, c) = network.cell(i);
                    // SAFETY: labels share the flow direction grid
                    ids.contains(&unsafe { labels.get_unchecked(r, c) })
                }
                _ => true,
            };

            let seeds: Vec<usize> = cells
                .into_iter()
                .filter(|&i| is_candidate(i) && streams.is_stream(i))
                .filter(|&i| {
                    if request.outlets {
                        network.is_outlet(i)
                    } else {
                        network.downstream(i).map_or(true, |d| !region[d])
                    }
                })
                .collect();
            in_region = Some(region);
            seeds
        }
        SelectionCriterion::BasinIds(_) => {
            return Err(Error::InvalidParameter {
                name: "basid",
                value: criterion.describe(),
                reason: format!("{} selections need points or a region", request.kind),
            });
        }
    };

    if seeds.is_empty() {
        return Err(Error::NoBasinsFound(format!(
            "no {} outlets for {}",
            request.kind,
            criterion.describe()
        )));
    }

    let confine = request.kind == BasinKind::Interbasin;
    let mut pieces = vec![0u32; network.len()];
    let counts = flood_pieces(network, &seeds, &mut pieces, |i| {
        in_bounds(i) && (!confine || in_region.as_ref().map_or(true, |r| r[i]))
    });

    let ids: Vec<u32> = counts
        .iter()
        .enumerate()
        .filter(|(_, &n)| n > 0)
        .map(|(k, _)| (k + 1) as u32)
        .collect();
    debug!(
        "{} {} pieces from {} split points",
        ids.len(),
        request.kind,
        seeds.len()
    );
    if ids.is_empty() {
        return Err(Error::NoBasinsFound(criterion.describe()));
    }

    let mut labels = network.flowdir().with_same_meta_from_vec(pieces)?;
    labels.set_nodata(Some(0));
    let polygons = polygonize(&labels, &ids, bounds_window);
    let points = ids.iter().map(|&id| (id, seeds[(id - 1) as usize]));

    Ok(BasinGeometry {
        basins: basin_collection(network, &polygons),
        outlets: Some(outlet_collection(network, points)),
    })
}

fn basin_collection(network: &FlowNetwork, polygons: &[LabelPolygon]) -> FeatureCollection {
    let mut fc = FeatureCollection::with_crs(network.crs().cloned());
    for p in polygons {
        fc.push(
            Feature::new(Geometry::MultiPolygon(p.geometry.clone()))
                .with_id(p.id)
                .with_property("basid", AttributeValue::Int(p.id as i64))
                .with_property("area_cells", AttributeValue::Int(p.cells as i64)),
        );
    }
    fc
}

fn outlet_collection<I>(network: &FlowNetwork, outlets: I) -> FeatureCollection
where
    I: IntoIterator<Item = (u32, usize)>,
{
    let mut fc = FeatureCollection::with_crs(network.crs().cloned());
    for (id, cell) in outlets {
        let (x, y) = network.cell_center(cell);
        fc.push(
            Feature::new(Geometry::Point(Point::new(x, y)))
                .with_id(id)
                .with_property("basid", AttributeValue::Int(id as i64)),
        );
    }
    fc
}
