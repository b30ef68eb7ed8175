//! Vector data structures
//!
//! A `FeatureCollection` plays the role of a geo-dataframe: region
//! geometries come in as one, basin polygons and outlet points go out as one.

mod bbox;

pub use bbox::BoundingBox;

use geo::{BoundingRect, Centroid};
use geo_types::{Geometry, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::crs::CRS;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Integer view; floats with no fractional part count
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            AttributeValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Coarse geometry classification of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Empty,
    Point,
    Line,
    Polygon,
    Mixed,
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Builder-style id setter
    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    fn kind(&self) -> GeometryKind {
        match &self.geometry {
            None => GeometryKind::Empty,
            Some(Geometry::Point(_)) | Some(Geometry::MultiPoint(_)) => GeometryKind::Point,
            Some(Geometry::Line(_))
            | Some(Geometry::LineString(_))
            | Some(Geometry::MultiLineString(_)) => GeometryKind::Line,
            Some(Geometry::Polygon(_))
            | Some(Geometry::MultiPolygon(_))
            | Some(Geometry::Rect(_))
            | Some(Geometry::Triangle(_)) => GeometryKind::Polygon,
            Some(Geometry::GeometryCollection(_)) => GeometryKind::Mixed,
        }
    }
}

/// Collection of features in one CRS
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: Option<CRS>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crs(crs: Option<CRS>) -> Self {
        Self {
            features: Vec::new(),
            crs,
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Geometry kind shared by all features
    pub fn geometry_kind(&self) -> GeometryKind {
        let mut kinds = self.features.iter().map(Feature::kind).filter(|k| *k != GeometryKind::Empty);
        let Some(first) = kinds.next() else {
            return GeometryKind::Empty;
        };
        if kinds.all(|k| k == first) {
            first
        } else {
            GeometryKind::Mixed
        }
    }

    pub fn is_polygonal(&self) -> bool {
        self.geometry_kind() == GeometryKind::Polygon
    }

    /// Bounds over every feature
    pub fn total_bounds(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
            .map(BoundingBox::from)
            .reduce(|a, b| a.union(&b))
    }

    /// One representative point per feature: the point itself for point
    /// features, the centroid otherwise
    pub fn representative_points(&self) -> Vec<Point<f64>> {
        self.features
            .iter()
            .filter_map(|f| match f.geometry.as_ref()? {
                Geometry::Point(p) => Some(*p),
                g => g.centroid(),
            })
            .collect()
    }

    /// All polygon parts as one multipolygon
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        let mut polys: Vec<Polygon<f64>> = Vec::new();
        for geom in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            match geom {
                Geometry::Polygon(p) => polys.push(p.clone()),
                Geometry::MultiPolygon(mp) => polys.extend(mp.0.iter().cloned()),
                Geometry::Rect(r) => polys.push(r.to_polygon()),
                Geometry::Triangle(t) => polys.push(t.to_polygon()),
                _ => {}
            }
        }
        MultiPolygon::new(polys)
    }

    /// Find a feature by an integer attribute
    pub fn find_by(&self, key: &str, value: i64) -> Option<&Feature> {
        self.features
            .iter()
            .find(|f| f.get_property(key).and_then(AttributeValue::as_i64) == Some(value))
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
