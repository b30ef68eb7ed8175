//! GeoJSON reading/writing for feature collections

use std::fs;
use std::path::Path;

use geojson::{GeoJson, JsonObject, JsonValue};
use serde_json::Map;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};

fn to_attribute(value: &JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

fn to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

/// CRS from the (legacy) `crs` member, `{"type": "name", "properties": {"name": ...}}`
fn parse_crs(foreign: Option<&JsonObject>) -> Option<CRS> {
    let name = foreign?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    name.parse().ok()
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = feature
        .geometry
        .map(geo_types::Geometry::<f64>::try_from)
        .transpose()?;
    let id = feature.id.map(|id| match id {
        geojson::feature::Id::String(s) => s,
        geojson::feature::Id::Number(n) => n.to_string(),
    });
    let properties = feature
        .properties
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (k.clone(), to_attribute(v)))
        .collect();
    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

/// Parse a GeoJSON document (collection, single feature or bare geometry)
pub fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse()?;
    let mut out = FeatureCollection::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            out.crs = parse_crs(fc.foreign_members.as_ref());
            for feature in fc.features {
                out.push(convert_feature(feature)?);
            }
        }
        GeoJson::Feature(feature) => out.push(convert_feature(feature)?),
        GeoJson::Geometry(geometry) => {
            out.push(Feature::new(geo_types::Geometry::<f64>::try_from(geometry)?));
        }
    }
    Ok(out)
}

/// Read a GeoJSON file
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_geojson(&text)
}

/// Serialize a collection to a GeoJSON string
pub fn to_geojson_string(collection: &FeatureCollection) -> Result<String> {
    let features = collection
        .iter()
        .map(|f| geojson::Feature {
            bbox: None,
            geometry: f
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
            id: f.id.clone().map(|id| match id.parse::<i64>() {
                Ok(n) => geojson::feature::Id::Number(n.into()),
                Err(_) => geojson::feature::Id::String(id),
            }),
            properties: Some(
                f.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), to_json(v)))
                    .collect::<Map<String, JsonValue>>(),
            ),
            foreign_members: None,
        })
        .collect();

    let foreign_members = collection.crs.as_ref().and_then(CRS::urn).map(|urn| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            serde_json::json!({"type": "name", "properties": {"name": urn}}),
        );
        members
    });

    let fc = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    };
    serde_json::to_string(&fc).map_err(Error::from)
}

/// Write a collection to a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    fs::write(path.as_ref(), to_geojson_string(collection)?)?;
    Ok(())
}
