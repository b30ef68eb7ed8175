//! Cell value trait shared by every raster layer

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Flow direction codes live in `u8`, basin ids in `u32`, upstream area in
/// `f64`; the trait gives them a common nodata and casting story.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, `None` if the value does not fit
    fn from_f64(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        NumCast::from(value)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty, $nodata:expr) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                $nodata
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.is_some_and(|nd| *self == nd)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }
        }
    };
}

impl_raster_element_int!(i16, i16::MIN);
impl_raster_element_int!(i32, i32::MIN);
impl_raster_element_int!(i64, i64::MIN);
impl_raster_element_int!(u8, u8::MAX);
impl_raster_element_int!(u16, u16::MAX);
// Basin ids reserve 0 for "no basin"
impl_raster_element_int!(u32, 0);
impl_raster_element_int!(u64, 0);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);
