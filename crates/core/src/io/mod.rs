//! I/O for rasters (GeoTIFF) and vectors (GeoJSON)

mod geojson;
mod native;

pub use self::geojson::{parse_geojson, read_geojson, to_geojson_string, write_geojson};
pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
