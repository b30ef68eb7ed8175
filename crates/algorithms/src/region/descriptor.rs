//! Region descriptors: ordered key/value input of the region parser

use basinmask_core::raster::Raster;
use basinmask_core::vector::FeatureCollection;
use basinmask_core::{Error, Result};
use serde_json::Value;

/// A descriptor value: plain JSON or an in-memory dataset
#[derive(Debug, Clone)]
pub enum RegionValue {
    Json(Value),
    Geometry(FeatureCollection),
    Raster(Raster<f64>),
}

impl RegionValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RegionValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Short type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            RegionValue::Json(Value::Null) => "null",
            RegionValue::Json(Value::Bool(_)) => "bool",
            RegionValue::Json(Value::Number(_)) => "number",
            RegionValue::Json(Value::String(_)) => "string",
            RegionValue::Json(Value::Array(_)) => "array",
            RegionValue::Json(Value::Object(_)) => "mapping",
            RegionValue::Geometry(_) => "geometry",
            RegionValue::Raster(_) => "raster",
        }
    }
}

impl From<Value> for RegionValue {
    fn from(v: Value) -> Self {
        RegionValue::Json(v)
    }
}

impl From<FeatureCollection> for RegionValue {
    fn from(fc: FeatureCollection) -> Self {
        RegionValue::Geometry(fc)
    }
}

impl From<Raster<f64>> for RegionValue {
    fn from(r: Raster<f64>) -> Self {
        RegionValue::Raster(r)
    }
}

/// Ordered mapping from region keys to values
#[derive(Debug, Clone, Default)]
pub struct RegionDescriptor {
    entries: Vec<(String, RegionValue)>,
}

impl RegionDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RegionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a key, replacing an earlier value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RegionValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&RegionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptor from a JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                entries: map
                    .into_iter()
                    .map(|(k, v)| (k, RegionValue::Json(v)))
                    .collect(),
            }),
            other => Err(Error::InvalidRegionValue {
                key: "region".into(),
                reason: format!("expected a mapping, got {}", RegionValue::Json(other).type_name()),
            }),
        }
    }

    /// Descriptor from JSON text such as `{"subbasin": [12.2, 45.8], "strord": 4}`
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }
}
