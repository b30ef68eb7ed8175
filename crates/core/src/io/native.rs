//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is limited to the
//! ModelPixelScale/ModelTiepoint pair and the GDAL nodata tag; projections
//! are not decoded, the catalog supplies the CRS.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray64Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Read a single-band GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S, T>(buf: Vec<S>, nodata: Option<f64>) -> Vec<T>
where
    S: num_traits::ToPrimitive + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| {
            let v = v.to_f64().unwrap_or(f64::NAN);
            if nodata.is_some_and(|nd| v == nd) {
                return T::default_nodata();
            }
            T::from_f64(v).unwrap_or(T::default_nodata())
        })
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let (rows, cols) = (height as usize, width as usize);

    let nodata = decoder
        .get_tag_ascii_string(Tag::Unknown(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());
    let transform = read_geotransform(&mut decoder).ok();

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_all(buf, nodata),
        DecodingResult::F64(buf) => cast_all(buf, nodata),
        DecodingResult::U8(buf) => cast_all(buf, nodata),
        DecodingResult::U16(buf) => cast_all(buf, nodata),
        DecodingResult::U32(buf) => cast_all(buf, nodata),
        DecodingResult::U64(buf) => cast_all(buf, nodata),
        DecodingResult::I8(buf) => cast_all(buf, nodata),
        DecodingResult::I16(buf) => cast_all(buf, nodata),
        DecodingResult::I32(buf) => cast_all(buf, nodata),
        DecodingResult::I64(buf) => cast_all(buf, nodata),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_nodata(nodata.map(|_| T::default_nodata()));
    if let Some(transform) = transform {
        raster.set_transform(transform);
    }
    Ok(raster)
}

fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE))
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT))
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// Write a Raster to a GeoTIFF file as 64-bit float.
///
/// Nodata cells are written as the raster's nodata value (NaN when unset)
/// and the GDAL nodata tag records it, so integer layers such as basin ids
/// survive a round trip.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, BufWriter::new(file))
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let nodata = raster.nodata().and_then(|v| v.to_f64());

    let data: Vec<f64> = raster
        .data()
        .iter()
        .map(|&v| {
            if raster.is_nodata(v) {
                nodata.unwrap_or(f64::NAN)
            } else {
                v.to_f64().unwrap_or(f64::NAN)
            }
        })
        .collect();

    let mut image = encoder
        .new_image::<Gray64Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();
    let tag_err = |e: tiff::TiffError| Error::Other(format!("Cannot write GeoTIFF tag: {}", e));

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(tag_err)?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(tag_err)?;

    // Version 1.1.0 with GTRasterTypeGeoKey = RasterPixelIsArea
    let geokeys: [u16; 8] = [1, 1, 0, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geokeys[..])
        .map_err(tag_err)?;

    if let Some(nd) = nodata {
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA), nd.to_string().as_str())
            .map_err(tag_err)?;
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}
