//! Data catalog and model registry seams
//!
//! Region parsing resolves file paths and dataset names through
//! [`DataCatalog`]; model-kind regions are validated against a
//! [`ModelRegistry`]. [`LocalCatalog`] is a small file-backed catalog:
//! sources declared in a JSON document, with existing paths as fallback.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::{read_geojson, read_geotiff};
use crate::raster::RasterDataset;
use crate::vector::FeatureCollection;

/// Resolves names or paths into in-memory data
pub trait DataCatalog {
    /// Load a raster source as named layers
    fn get_rasterdataset(&self, source: &str) -> Result<RasterDataset>;

    /// Load a vector source
    fn get_geodataframe(&self, source: &str) -> Result<FeatureCollection>;
}

/// Enumerates the model identifiers a region key may name
pub trait ModelRegistry {
    fn model_names(&self) -> Vec<String>;

    fn contains(&self, name: &str) -> bool {
        self.model_names().iter().any(|m| m == name)
    }
}

/// A fixed list of model names
#[derive(Debug, Clone, Default)]
pub struct StaticModelRegistry {
    names: Vec<String>,
}

impl StaticModelRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ModelRegistry for StaticModelRegistry {
    fn model_names(&self) -> Vec<String> {
        self.names.clone()
    }
}

/// Kind of data behind a catalog source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    RasterDataset,
    GeoDataFrame,
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub data_type: DataType,
    /// Single file (vector, or single-layer raster)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Raster layer name -> file
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub layers: BTreeMap<String, PathBuf>,
    /// CRS assigned to the loaded data, e.g. `EPSG:4326`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogConfig {
    #[serde(default)]
    root: Option<PathBuf>,
    #[serde(default)]
    sources: BTreeMap<String, SourceConfig>,
}

/// File-backed catalog
#[derive(Debug, Clone, Default)]
pub struct LocalCatalog {
    root: PathBuf,
    sources: BTreeMap<String, SourceConfig>,
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "band".to_string())
}

const RASTER_EXTS: &[&str] = &["tif", "tiff"];
const VECTOR_EXTS: &[&str] = &["geojson", "json"];

impl LocalCatalog {
    /// Empty catalog resolving relative paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sources: BTreeMap::new(),
        }
    }

    /// Parse a JSON catalog document; a relative `root` is taken relative to `base_dir`
    pub fn from_json_str(text: &str, base_dir: &Path) -> Result<Self> {
        let config: CatalogConfig = serde_json::from_str(text)?;
        let root = match config.root {
            Some(root) if root.is_absolute() => root,
            Some(root) => base_dir.join(root),
            None => base_dir.to_path_buf(),
        };
        Ok(Self {
            root,
            sources: config.sources,
        })
    }

    /// Read a JSON catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json_str(&text, base)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn parse_crs(source: &SourceConfig) -> Result<Option<CRS>> {
        source.crs.as_deref().map(str::parse).transpose()
    }

    fn read_layers<'a, I>(&self, files: I, crs: Option<CRS>) -> Result<RasterDataset>
    where
        I: IntoIterator<Item = (String, &'a Path)>,
    {
        let mut ds = RasterDataset::new();
        for (name, file) in files {
            let path = self.resolve(file);
            debug!("reading raster layer '{}' from {}", name, path.display());
            let mut layer = read_geotiff::<f64, _>(&path)?;
            if crs.is_some() {
                layer.set_crs(crs.clone());
            }
            ds.insert(name, layer)?;
        }
        Ok(ds)
    }
}

impl DataCatalog for LocalCatalog {
    fn get_rasterdataset(&self, source: &str) -> Result<RasterDataset> {
        if let Some(entry) = self.sources.get(source) {
            if entry.data_type != DataType::RasterDataset {
                return Err(Error::UnsupportedDataType(format!(
                    "source '{}' is not a RasterDataset",
                    source
                )));
            }
            let crs = Self::parse_crs(entry)?;
            let files: Vec<(String, &Path)> = if entry.layers.is_empty() {
                let path = entry.path.as_deref().ok_or_else(|| {
                    Error::Other(format!("source '{}' has neither path nor layers", source))
                })?;
                vec![(layer_name(path), path)]
            } else {
                entry
                    .layers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.as_path()))
                    .collect()
            };
            return self.read_layers(files, crs);
        }

        let path = self.resolve(Path::new(source));
        if path.is_file() && has_extension(&path, RASTER_EXTS) {
            return self.read_layers([(layer_name(&path), path.as_path())], None);
        }
        if path.is_dir() {
            let mut files: Vec<PathBuf> = fs::read_dir(&path)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_extension(p, RASTER_EXTS))
                .collect();
            files.sort();
            if !files.is_empty() {
                return self.read_layers(files.iter().map(|p| (layer_name(p), p.as_path())), None);
            }
        }
        Err(Error::UnknownSource(source.to_string()))
    }

    fn get_geodataframe(&self, source: &str) -> Result<FeatureCollection> {
        if let Some(entry) = self.sources.get(source) {
            if entry.data_type != DataType::GeoDataFrame {
                return Err(Error::UnsupportedDataType(format!(
                    "source '{}' is not a GeoDataFrame",
                    source
                )));
            }
            let path = entry
                .path
                .as_deref()
                .ok_or_else(|| Error::Other(format!("source '{}' has no path", source)))?;
            let mut fc = read_geojson(self.resolve(path))?;
            if let Some(crs) = Self::parse_crs(entry)? {
                fc.crs = Some(crs);
            }
            return Ok(fc);
        }

        let path = self.resolve(Path::new(source));
        if path.is_file() && has_extension(&path, VECTOR_EXTS) {
            debug!("reading vector source {}", path.display());
            return read_geojson(&path);
        }
        Err(Error::UnknownSource(source.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{write_geojson, write_geotiff};
    use crate::raster::{GeoTransform, Raster};
    use crate::vector::{BoundingBox, Feature};
    use geo_types::Geometry;

    fn write_fixture(dir: &Path) {
        let gt = GeoTransform::new(0.0, 3.0, 1.0, -1.0);
        let flwdir = Raster::from_vec(vec![1.0; 9], 3, 3).unwrap().with_transform(gt);
        let basins = Raster::from_vec(vec![5.0; 9], 3, 3).unwrap().with_transform(gt);
        fs::create_dir_all(dir.join("net")).unwrap();
        write_geotiff(&flwdir, dir.join("net/flwdir.tif")).unwrap();
        write_geotiff(&basins, dir.join("net/basins.tif")).unwrap();

        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(Geometry::Polygon(BoundingBox::new(0.0, 0.0, 1.0, 1.0).to_polygon())));
        write_geojson(&fc, dir.join("area.geojson")).unwrap();
    }

    #[test]
    fn test_declared_sources() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let text = r#"{
            "sources": {
                "hydro": {"data_type": "RasterDataset", "crs": "EPSG:4326",
                          "layers": {"flwdir": "net/flwdir.tif", "basins": "net/basins.tif"}},
                "area": {"data_type": "GeoDataFrame", "path": "area.geojson", "crs": "EPSG:4326"}
            }
        }"#;
        let cat = LocalCatalog::from_json_str(text, dir.path()).unwrap();

        let ds = cat.get_rasterdataset("hydro").unwrap();
        assert_eq!(ds.names().collect::<Vec<_>>(), vec!["basins", "flwdir"]);
        assert_eq!(ds.layer("basins").unwrap().get(1, 1).unwrap(), 5.0);
        assert_eq!(ds.layer("flwdir").unwrap().crs(), Some(&CRS::wgs84()));

        let fc = cat.get_geodataframe("area").unwrap();
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.crs, Some(CRS::wgs84()));

        assert!(matches!(
            cat.get_geodataframe("hydro"),
            Err(Error::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn test_path_fallback() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let cat = LocalCatalog::new(dir.path());

        let ds = cat.get_rasterdataset("net").unwrap();
        assert_eq!(ds.len(), 2);
        let ds = cat.get_rasterdataset("net/flwdir.tif").unwrap();
        assert!(ds.contains("flwdir"));
        assert_eq!(cat.get_geodataframe("area.geojson").unwrap().len(), 1);

        assert!(matches!(
            cat.get_rasterdataset("missing"),
            Err(Error::UnknownSource(_))
        ));
    }

    #[test]
    fn test_static_registry() {
        let reg = StaticModelRegistry::new(["wflow", "sfincs"]);
        assert!(reg.contains("wflow"));
        assert!(!reg.contains("delft3d"));
    }
}
