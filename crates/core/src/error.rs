//! Error types for basinmask

use thiserror::Error;

/// Main error type for basinmask operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Raster layer '{layer}' is not aligned with the flow direction grid")]
    GridMismatch { layer: String },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Region key(s) {keys:?} not understood: {reason}")]
    InvalidRegionKey { keys: Vec<String>, reason: String },

    #[error("Region value for '{key}' not understood: {reason}")]
    InvalidRegionValue { key: String, reason: String },

    #[error("No basins found: {0}")]
    NoBasinsFound(String),

    #[error("Missing raster layer: {0}")]
    MissingLayer(String),

    #[error("Unknown data source: {0}")]
    UnknownSource(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::GeoJson(e.to_string())
    }
}

/// Result type alias for basinmask operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_messages() {
        let e = Error::InvalidRegionKey {
            keys: vec!["region".into()],
            reason: "expected a mapping".into(),
        };
        assert!(e.to_string().starts_with("Region key"));

        let e = Error::InvalidRegionValue {
            key: "geom".into(),
            reason: "point geometry".into(),
        };
        assert!(e.to_string().starts_with("Region value"));

        let e = Error::NoBasinsFound("basid [0]".into());
        assert!(e.to_string().starts_with("No basins found"));
    }
}
