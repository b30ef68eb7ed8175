//! Region parsing
//!
//! A descriptor holds exactly one selector key (`geom`, `bbox`, `grid`,
//! `basin`, `subbasin`, `interbasin`, `outlet` or a model name) plus
//! auxiliary keys. File paths and catalog names are resolved through a
//! [`DataCatalog`]; no hydrology is computed here.

use std::path::PathBuf;

use basinmask_core::vector::{FeatureCollection, GeometryKind};
use basinmask_core::{BoundingBox, DataCatalog, Error, Feature, ModelRegistry, Result};
use geo::Geometry;
use serde_json::Value;
use tracing::{debug, warn};

use super::descriptor::{RegionDescriptor, RegionValue};
use super::kind::{BasinSelection, Region, RegionKind};

const SELECTOR_KEYS: [&str; 7] = ["geom", "bbox", "grid", "basin", "subbasin", "interbasin", "outlet"];
const AUXILIARY_KEYS: [&str; 5] = ["uparea", "strord", "bounds", "outlets", "buffer"];
const WRAPPER_KEY: &str = "region";

/// Parses region descriptors into [`Region`]s
pub struct RegionParser<'a> {
    catalog: &'a dyn DataCatalog,
    registry: Option<&'a dyn ModelRegistry>,
    strict: bool,
}

impl<'a> RegionParser<'a> {
    /// Strict parser without model names
    pub fn new(catalog: &'a dyn DataCatalog) -> Self {
        Self {
            catalog,
            registry: None,
            strict: true,
        }
    }

    /// Accept the registry's model names as selector keys
    pub fn with_registry(mut self, registry: &'a dyn ModelRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Reject (strict) or drop with a warning (lenient) auxiliary keys the
    /// region kind does not use
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn is_model(&self, key: &str) -> bool {
        self.registry.is_some_and(|r| r.contains(key))
    }

    pub fn parse(&self, descriptor: &RegionDescriptor) -> Result<Region> {
        if let Some(value) = descriptor.get(WRAPPER_KEY) {
            return match value {
                RegionValue::Json(v @ Value::Object(_)) if descriptor.len() == 1 => {
                    self.parse(&RegionDescriptor::from_value(v.clone())?)
                }
                _ => Err(Error::InvalidRegionKey {
                    keys: vec![WRAPPER_KEY.to_string()],
                    reason: "expected a single 'region' key holding a mapping".into(),
                }),
            };
        }

        let mut selectors = Vec::new();
        let mut unknown = Vec::new();
        for key in descriptor.keys() {
            if SELECTOR_KEYS.contains(&key) || self.is_model(key) {
                selectors.push(key);
            } else if !AUXILIARY_KEYS.contains(&key) {
                unknown.push(key.to_string());
            }
        }
        if !unknown.is_empty() {
            return Err(Error::InvalidRegionKey {
                keys: unknown,
                reason: "unknown key".into(),
            });
        }
        let selector = match selectors.as_slice() {
            [one] => *one,
            [] => {
                return Err(Error::InvalidRegionKey {
                    keys: descriptor.keys().map(String::from).collect(),
                    reason: "no region kind given".into(),
                })
            }
            many => {
                return Err(Error::InvalidRegionKey {
                    keys: many.iter().map(|k| k.to_string()).collect(),
                    reason: "only one region kind may be given".into(),
                })
            }
        };
        let value = descriptor.get(selector).ok_or_else(|| Error::Other(selector.to_string()))?;

        let region = match selector {
            "geom" => Region::Geom {
                geom: self.polygons(selector, value)?,
            },
            "bbox" => {
                let bbox = bbox_value(selector, json_of(selector, value)?)?;
                let mut geom = FeatureCollection::new();
                geom.push(Feature::new(Geometry::Polygon(bbox.to_polygon())));
                Region::Geom { geom }
            }
            "grid" => self.grid(selector, value)?,
            "basin" => Region::Basin(self.selection(selector, value, true)?),
            "subbasin" => Region::Subbasin(self.selection(selector, value, false)?),
            "interbasin" => Region::Interbasin(self.selection(selector, value, false)?),
            "outlet" => Region::Outlet {
                bbox: bbox_value(selector, json_of(selector, value)?)?,
            },
            model => self.model(model, value)?,
        };

        let region = self.apply_auxiliary(region, descriptor)?;
        debug!("parsed region of kind {}", region.kind());
        Ok(region)
    }

    fn apply_auxiliary(&self, mut region: Region, descriptor: &RegionDescriptor) -> Result<Region> {
        let allowed = region.kind().auxiliary_keys();
        let mut rejected = Vec::new();
        for (key, value) in descriptor.iter() {
            if !AUXILIARY_KEYS.contains(&key) {
                continue;
            }
            if !allowed.contains(&key) {
                if self.strict {
                    rejected.push(key.to_string());
                } else {
                    warn!("ignoring key '{}' for region kind {}", key, region.kind());
                }
                continue;
            }
            let sel = match &mut region {
                Region::Basin(sel) | Region::Subbasin(sel) | Region::Interbasin(sel) => sel,
                _ => continue,
            };
            let v = json_of(key, value)?;
            match key {
                "uparea" => sel.uparea = Some(number_value(key, v)?),
                "strord" => {
                    let order = uint_value(key, v)?;
                    sel.strord = Some(u8::try_from(order).map_err(|_| Error::InvalidRegionValue {
                        key: key.into(),
                        reason: format!("stream order {} out of range", order),
                    })?);
                }
                "bounds" => sel.bounds = Some(bbox_value(key, v)?),
                "outlets" => {
                    sel.outlets = v.as_bool().ok_or_else(|| Error::InvalidRegionValue {
                        key: key.into(),
                        reason: "expected true or false".into(),
                    })?
                }
                "buffer" => sel.buffer = Some(uint_value(key, v)? as usize),
                _ => {}
            }
        }
        if !rejected.is_empty() {
            return Err(Error::InvalidRegionKey {
                keys: rejected,
                reason: format!("not used by region kind {}", region.kind()),
            });
        }
        Ok(region)
    }

    /// Geometry given in memory, as a file path or as a catalog name
    fn geometry(&self, key: &str, value: &RegionValue) -> Result<FeatureCollection> {
        match value {
            RegionValue::Geometry(fc) => Ok(fc.clone()),
            RegionValue::Json(Value::String(source)) => self.catalog.get_geodataframe(source),
            other => Err(Error::InvalidRegionValue {
                key: key.into(),
                reason: format!("expected a geometry or a path, got {}", other.type_name()),
            }),
        }
    }

    fn polygons(&self, key: &str, value: &RegionValue) -> Result<FeatureCollection> {
        let geom = self.geometry(key, value)?;
        match geom.geometry_kind() {
            GeometryKind::Polygon => Ok(geom),
            kind => Err(Error::InvalidRegionValue {
                key: key.into(),
                reason: format!("expected polygon geometries, got {:?}", kind),
            }),
        }
    }

    fn grid(&self, key: &str, value: &RegionValue) -> Result<Region> {
        let grid = match value {
            RegionValue::Raster(r) => r.clone(),
            RegionValue::Json(Value::String(source)) => {
                let ds = self.catalog.get_rasterdataset(source)?;
                let (_, layer) = ds.first().ok_or_else(|| Error::InvalidRegionValue {
                    key: key.into(),
                    reason: format!("raster source '{}' has no layers", source),
                })?;
                layer.clone()
            }
            other => {
                return Err(Error::InvalidRegionValue {
                    key: key.into(),
                    reason: format!("expected a raster or a path, got {}", other.type_name()),
                })
            }
        };
        Ok(Region::Grid { grid })
    }

    fn model(&self, name: &str, value: &RegionValue) -> Result<Region> {
        let root = match value {
            RegionValue::Json(Value::String(s)) => PathBuf::from(s),
            other => {
                return Err(Error::InvalidRegionValue {
                    key: name.into(),
                    reason: format!("expected a model root path, got {}", other.type_name()),
                })
            }
        };
        if !root.is_dir() {
            return Err(Error::InvalidRegionValue {
                key: name.into(),
                reason: format!("model root {} is not a directory", root.display()),
            });
        }
        Ok(Region::Model {
            name: name.to_string(),
            root,
        })
    }

    /// Selection of basin-like kinds; `ids` allows integer basin ids
    fn selection(&self, key: &str, value: &RegionValue, ids: bool) -> Result<BasinSelection> {
        let mut sel = BasinSelection::default();
        match value {
            RegionValue::Json(Value::String(_)) | RegionValue::Geometry(_) => {
                let geom = self.geometry(key, value)?;
                match geom.geometry_kind() {
                    GeometryKind::Polygon => sel.geom = Some(geom),
                    GeometryKind::Point => {
                        sel.xy = Some(
                            geom.representative_points()
                                .into_iter()
                                .map(|p| (p.x(), p.y()))
                                .collect(),
                        )
                    }
                    kind => {
                        return Err(Error::InvalidRegionValue {
                            key: key.into(),
                            reason: format!("expected point or polygon geometries, got {:?}", kind),
                        })
                    }
                }
            }
            RegionValue::Json(v) => match v {
                Value::Number(_) if ids => sel.basid = Some(vec![basin_id(key, v)?]),
                Value::Array(items) if ids && !items.is_empty() && items.iter().all(is_integer) => {
                    sel.basid = Some(items.iter().map(|i| basin_id(key, i)).collect::<Result<_>>()?)
                }
                Value::Array(items) if items.iter().all(Value::is_array) && !items.is_empty() => {
                    sel.xy = Some(items.iter().map(|p| point_value(key, p)).collect::<Result<_>>()?)
                }
                Value::Array(items) if items.len() == 2 => sel.xy = Some(vec![point_value(key, v)?]),
                Value::Array(items) if items.len() == 4 => sel.bbox = Some(bbox_value(key, v)?),
                other => {
                    return Err(Error::InvalidRegionValue {
                        key: key.into(),
                        reason: format!("cannot select basins from {}", other),
                    })
                }
            },
            RegionValue::Raster(_) => {
                return Err(Error::InvalidRegionValue {
                    key: key.into(),
                    reason: "a raster does not select basins".into(),
                })
            }
        }
        Ok(sel)
    }
}

/// Parse a descriptor into its kind and region
pub fn parse_region(
    descriptor: &RegionDescriptor,
    catalog: &dyn DataCatalog,
    registry: Option<&dyn ModelRegistry>,
) -> Result<(RegionKind, Region)> {
    let mut parser = RegionParser::new(catalog);
    if let Some(registry) = registry {
        parser = parser.with_registry(registry);
    }
    let region = parser.parse(descriptor)?;
    Ok((region.kind(), region))
}

fn json_of<'v>(key: &str, value: &'v RegionValue) -> Result<&'v Value> {
    value.as_json().ok_or_else(|| Error::InvalidRegionValue {
        key: key.into(),
        reason: format!("expected a plain value, got {}", value.type_name()),
    })
}

fn is_integer(v: &Value) -> bool {
    v.is_i64() || v.is_u64()
}

fn number_value(key: &str, v: &Value) -> Result<f64> {
    v.as_f64()
        .filter(|x| x.is_finite())
        .ok_or_else(|| Error::InvalidRegionValue {
            key: key.into(),
            reason: format!("expected a number, got {}", v),
        })
}

fn uint_value(key: &str, v: &Value) -> Result<u64> {
    v.as_u64().ok_or_else(|| Error::InvalidRegionValue {
        key: key.into(),
        reason: format!("expected a non-negative integer, got {}", v),
    })
}

fn basin_id(key: &str, v: &Value) -> Result<u32> {
    let id = v.as_i64().ok_or_else(|| Error::InvalidRegionValue {
        key: key.into(),
        reason: format!("expected an integer basin id, got {}", v),
    })?;
    u32::try_from(id).map_err(|_| Error::InvalidRegionValue {
        key: key.into(),
        reason: format!("basin id {} out of range", id),
    })
}

fn point_value(key: &str, v: &Value) -> Result<(f64, f64)> {
    match v.as_array().map(Vec::as_slice) {
        Some([x, y]) => Ok((number_value(key, x)?, number_value(key, y)?)),
        _ => Err(Error::InvalidRegionValue {
            key: key.into(),
            reason: format!("expected an [x, y] pair, got {}", v),
        }),
    }
}

fn bbox_value(key: &str, v: &Value) -> Result<BoundingBox> {
    let values = match v.as_array() {
        Some(items) if items.len() == 4 => items
            .iter()
            .map(|i| number_value(key, i))
            .collect::<Result<Vec<f64>>>()?,
        _ => {
            return Err(Error::InvalidRegionValue {
                key: key.into(),
                reason: format!("expected [xmin, ymin, xmax, ymax], got {}", v),
            })
        }
    };
    BoundingBox::from_slice(&values).map_err(|e| Error::InvalidRegionValue {
        key: key.into(),
        reason: e.to_string(),
    })
}
