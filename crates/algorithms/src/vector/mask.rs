//! Region masks: a bounding box or a polygon a cell center must fall in

use basinmask_core::BoundingBox;
use geo::{BoundingRect, Intersects, MultiPolygon, Point};

/// Area a selection is confined to. Boundaries are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionMask {
    BBox(BoundingBox),
    Polygon(MultiPolygon<f64>),
}

impl RegionMask {
    /// Extent of the mask, `None` for an empty polygon
    pub fn bounds(&self) -> Option<BoundingBox> {
        match self {
            RegionMask::BBox(bbox) => Some(*bbox),
            RegionMask::Polygon(mp) => mp.bounding_rect().map(BoundingBox::from),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            RegionMask::BBox(bbox) => bbox.contains_point(x, y),
            RegionMask::Polygon(mp) => mp.intersects(&Point::new(x, y)),
        }
    }
}
