//! Named, aligned raster layers

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::raster::Raster;

/// A set of named `f64` layers sharing one grid.
///
/// This is what a catalog hands back for a raster source; typed views
/// (flow direction codes, basin ids) are cast out of it by the consumer.
#[derive(Debug, Clone, Default)]
pub struct RasterDataset {
    layers: BTreeMap<String, Raster<f64>>,
}

impl RasterDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer; it must share the grid of the layers already present
    pub fn insert(&mut self, name: impl Into<String>, layer: Raster<f64>) -> Result<()> {
        let name = name.into();
        if let Some(first) = self.layers.values().next() {
            if !first.same_grid(&layer) {
                return Err(Error::GridMismatch { layer: name });
            }
        }
        self.layers.insert(name, layer);
        Ok(())
    }

    /// Builder-style `insert`
    pub fn with_layer(mut self, name: impl Into<String>, layer: Raster<f64>) -> Result<Self> {
        self.insert(name, layer)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Raster<f64>> {
        self.layers.get(name)
    }

    /// Like `get`, but a missing layer is an error
    pub fn layer(&self, name: &str) -> Result<&Raster<f64>> {
        self.get(name)
            .ok_or_else(|| Error::MissingLayer(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Remove a layer, returning it
    pub fn remove(&mut self, name: &str) -> Option<Raster<f64>> {
        self.layers.remove(name)
    }

    /// Layer names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// The first layer in name order
    pub fn first(&self) -> Option<(&str, &Raster<f64>)> {
        self.layers.iter().next().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    #[test]
    fn test_dataset_alignment() {
        let gt = GeoTransform::new(0.0, 4.0, 1.0, -1.0);
        let mut ds = RasterDataset::new();
        ds.insert("flwdir", Raster::new(4, 4).with_transform(gt)).unwrap();
        ds.insert("uparea", Raster::new(4, 4).with_transform(gt)).unwrap();

        let err = ds.insert("basins", Raster::new(3, 4).with_transform(gt));
        assert!(matches!(err, Err(Error::GridMismatch { .. })));

        assert_eq!(ds.names().collect::<Vec<_>>(), vec!["flwdir", "uparea"]);
        assert!(matches!(ds.layer("strord"), Err(Error::MissingLayer(_))));
    }
}
