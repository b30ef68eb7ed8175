//! Parsed regions

use std::fmt;
use std::path::PathBuf;

use basinmask_core::raster::Raster;
use basinmask_core::vector::FeatureCollection;
use basinmask_core::{BoundingBox, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::hydrology::{BasinKind, BasinRequest};

/// Kind of a parsed region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Model,
    Geom,
    Grid,
    Basin,
    Subbasin,
    Interbasin,
    Outlet,
}

impl RegionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RegionKind::Model => "model",
            RegionKind::Geom => "geom",
            RegionKind::Grid => "grid",
            RegionKind::Basin => "basin",
            RegionKind::Subbasin => "subbasin",
            RegionKind::Interbasin => "interbasin",
            RegionKind::Outlet => "outlet",
        }
    }

    /// Auxiliary keys meaningful for the kind
    pub fn auxiliary_keys(self) -> &'static [&'static str] {
        match self {
            RegionKind::Basin => &["uparea", "strord", "outlets", "buffer"],
            RegionKind::Subbasin | RegionKind::Interbasin => {
                &["uparea", "strord", "bounds", "outlets", "buffer"]
            }
            RegionKind::Model | RegionKind::Geom | RegionKind::Grid | RegionKind::Outlet => &[],
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selection parameters of basin, subbasin and interbasin regions
#[derive(Debug, Clone, Default)]
pub struct BasinSelection {
    pub basid: Option<Vec<u32>>,
    pub xy: Option<Vec<(f64, f64)>>,
    pub bbox: Option<BoundingBox>,
    /// Polygonal mask
    pub geom: Option<FeatureCollection>,
    pub bounds: Option<BoundingBox>,
    pub uparea: Option<f64>,
    pub strord: Option<u8>,
    pub outlets: bool,
    pub buffer: Option<usize>,
}

impl BasinSelection {
    fn params(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(ids) = &self.basid {
            map.insert("basid".into(), json!(ids));
        }
        if let Some(xy) = &self.xy {
            let pairs: Vec<[f64; 2]> = xy.iter().map(|&(x, y)| [x, y]).collect();
            map.insert("xy".into(), json!(pairs));
        }
        if let Some(bbox) = &self.bbox {
            map.insert("bbox".into(), json!(bbox.to_array()));
        }
        if let Some(geom) = &self.geom {
            map.insert("geom".into(), geometry_summary(geom));
        }
        if let Some(bounds) = &self.bounds {
            map.insert("bounds".into(), json!(bounds.to_array()));
        }
        if let Some(uparea) = self.uparea {
            map.insert("uparea".into(), json!(uparea));
        }
        if let Some(strord) = self.strord {
            map.insert("strord".into(), json!(strord));
        }
        if self.outlets {
            map.insert("outlets".into(), json!(true));
        }
        if let Some(buffer) = self.buffer {
            map.insert("buffer".into(), json!(buffer));
        }
        map
    }

    fn to_request(&self, kind: BasinKind) -> BasinRequest {
        BasinRequest {
            kind,
            basid: self.basid.clone(),
            xy: self.xy.clone(),
            bbox: self.bbox,
            geom: self.geom.as_ref().map(FeatureCollection::to_multi_polygon),
            bounds: self.bounds,
            strord: self.strord,
            uparea: self.uparea,
            buffer: self.buffer.unwrap_or(0),
            outlets: self.outlets,
        }
    }
}

fn geometry_summary(fc: &FeatureCollection) -> Value {
    json!({
        "features": fc.len(),
        "bounds": fc.total_bounds().map(|b| b.to_array()),
    })
}

/// A validated region
#[derive(Debug, Clone)]
pub enum Region {
    Model { name: String, root: PathBuf },
    Geom { geom: FeatureCollection },
    Grid { grid: Raster<f64> },
    Basin(BasinSelection),
    Subbasin(BasinSelection),
    Interbasin(BasinSelection),
    Outlet { bbox: BoundingBox },
}

impl Region {
    pub fn kind(&self) -> RegionKind {
        match self {
            Region::Model { .. } => RegionKind::Model,
            Region::Geom { .. } => RegionKind::Geom,
            Region::Grid { .. } => RegionKind::Grid,
            Region::Basin(_) => RegionKind::Basin,
            Region::Subbasin(_) => RegionKind::Subbasin,
            Region::Interbasin(_) => RegionKind::Interbasin,
            Region::Outlet { .. } => RegionKind::Outlet,
        }
    }

    /// The parameters set on the region as a JSON object.
    ///
    /// Geometries and rasters appear as a summary of their extent.
    pub fn params(&self) -> Value {
        let map = match self {
            Region::Model { name, root } => {
                let mut map = Map::new();
                map.insert("name".into(), json!(name));
                map.insert("root".into(), json!(root.to_string_lossy()));
                map
            }
            Region::Geom { geom } => {
                let mut map = Map::new();
                map.insert("geom".into(), geometry_summary(geom));
                map
            }
            Region::Grid { grid } => {
                let mut map = Map::new();
                map.insert(
                    "grid".into(),
                    json!({
                        "shape": [grid.rows(), grid.cols()],
                        "bounds": grid.bounds().to_array(),
                    }),
                );
                map
            }
            Region::Basin(sel) | Region::Subbasin(sel) | Region::Interbasin(sel) => sel.params(),
            Region::Outlet { bbox } => {
                let mut map = Map::new();
                map.insert("bbox".into(), json!(bbox.to_array()));
                map
            }
        };
        Value::Object(map)
    }

    pub fn selection(&self) -> Option<&BasinSelection> {
        match self {
            Region::Basin(sel) | Region::Subbasin(sel) | Region::Interbasin(sel) => Some(sel),
            _ => None,
        }
    }

    /// Basin geometry request for basin-like regions.
    ///
    /// An outlet region becomes an interbasin request over its box with
    /// `outlets` set.
    pub fn basin_request(&self) -> Result<BasinRequest> {
        match self {
            Region::Basin(sel) => Ok(sel.to_request(BasinKind::Basin)),
            Region::Subbasin(sel) => Ok(sel.to_request(BasinKind::Subbasin)),
            Region::Interbasin(sel) => Ok(sel.to_request(BasinKind::Interbasin)),
            Region::Outlet { bbox } => Ok(BasinRequest {
                kind: BasinKind::Interbasin,
                bbox: Some(*bbox),
                outlets: true,
                ..Default::default()
            }),
            other => Err(Error::InvalidRegionValue {
                key: other.kind().to_string(),
                reason: "region does not select basins".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde() {
        assert_eq!(serde_json::to_string(&RegionKind::Interbasin).unwrap(), "\"interbasin\"");
        let k: RegionKind = serde_json::from_str("\"outlet\"").unwrap();
        assert_eq!(k, RegionKind::Outlet);
        assert_eq!(RegionKind::Subbasin.to_string(), "subbasin");
    }

    #[test]
    fn test_params_name_set_keys() {
        let region = Region::Subbasin(BasinSelection {
            xy: Some(vec![(1.0, -1.0)]),
            uparea: Some(5.0),
            bounds: Some(BoundingBox::new(0.0, -5.0, 3.0, 0.0)),
            ..Default::default()
        });
        let params = region.params();
        let obj = params.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(params["xy"], json!([[1.0, -1.0]]));
        assert_eq!(params["bounds"], json!([0.0, -5.0, 3.0, 0.0]));
    }

    #[test]
    fn test_outlet_request() {
        let region = Region::Outlet {
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        };
        let req = region.basin_request().unwrap();
        assert_eq!(req.kind, BasinKind::Interbasin);
        assert!(req.outlets);
        assert_eq!(req.bbox, Some(BoundingBox::new(0.0, 0.0, 1.0, 1.0)));

        let geom = Region::Geom {
            geom: FeatureCollection::new(),
        };
        assert!(matches!(geom.basin_request(), Err(Error::InvalidRegionValue { .. })));
    }
}
