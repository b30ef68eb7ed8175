//! Coordinate Reference System tags
//!
//! basinmask never reprojects; a CRS travels from the flow network to the
//! output geometries and is compared, nothing more.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A CRS known by EPSG code or by WKT text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    wkt: Option<String>,
    epsg: Option<u32>,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// EPSG:4326
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Same EPSG code, or identical WKT when either code is unknown
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// `EPSG:<code>`, a truncated `WKT:` prefix, or `Unknown`
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }

    /// OGC URN as used by the GeoJSON `crs` member
    pub fn urn(&self) -> Option<String> {
        self.epsg.map(|code| format!("urn:ogc:def:crs:EPSG::{}", code))
    }
}

impl FromStr for CRS {
    type Err = Error;

    /// Accepts `EPSG:4326`, `epsg:4326`, a bare code, or an OGC URN;
    /// anything else is kept as WKT.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidParameter {
                name: "crs",
                value: String::new(),
                reason: "empty CRS string".into(),
            });
        }
        let code = s
            .rsplit(':')
            .next()
            .filter(|_| {
                let lower = s.to_ascii_lowercase();
                lower.starts_with("epsg:") || lower.starts_with("urn:ogc:def:crs:epsg")
            })
            .or(Some(s))
            .and_then(|c| c.parse::<u32>().ok());
        Ok(match code {
            Some(code) => Self::from_epsg(code),
            None => Self::from_wkt(s),
        })
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
        assert_eq!(crs.urn().as_deref(), Some("urn:ogc:def:crs:EPSG::4326"));
    }

    #[test]
    fn test_crs_parse() {
        assert_eq!("EPSG:3857".parse::<CRS>().unwrap().epsg(), Some(3857));
        assert_eq!("4326".parse::<CRS>().unwrap().epsg(), Some(4326));
        assert_eq!(
            "urn:ogc:def:crs:EPSG::32631".parse::<CRS>().unwrap().epsg(),
            Some(32631)
        );
        let wkt: CRS = "GEOGCS[\"WGS 84\"]".parse().unwrap();
        assert!(wkt.epsg().is_none());
        assert!("  ".parse::<CRS>().is_err());
    }

    #[test]
    fn test_crs_equivalence() {
        assert!(CRS::from_epsg(4326).is_equivalent(&CRS::wgs84()));
        assert!(!CRS::from_epsg(4326).is_equivalent(&CRS::from_wkt("x")));
    }
}
