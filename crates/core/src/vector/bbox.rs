//! Axis-aligned bounding boxes

use geo::{LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned bounding box `(xmin, ymin, xmax, ymax)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Unchecked constructor
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Checked constructor: finite and strictly ordered
    pub fn try_new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let bbox = Self::new(min_x, min_y, max_x, max_y);
        bbox.validate()?;
        Ok(bbox)
    }

    /// From a `[xmin, ymin, xmax, ymax]` slice
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match values {
            [a, b, c, d] => Self::try_new(*a, *b, *c, *d),
            _ => Err(Error::InvalidParameter {
                name: "bbox",
                value: format!("{:?}", values),
                reason: "expected [xmin, ymin, xmax, ymax]".into(),
            }),
        }
    }

    /// Fail on inverted, empty or non-finite boxes
    pub fn validate(&self) -> Result<()> {
        let finite = [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.min_x >= self.max_x || self.min_y >= self.max_y {
            return Err(Error::InvalidParameter {
                name: "bbox",
                value: format!("{:?}", self.to_array()),
                reason: "expected finite xmin < xmax and ymin < ymax".into(),
            });
        }
        Ok(())
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grow by `distance` on every side
    pub fn buffered(&self, distance: f64) -> BoundingBox {
        BoundingBox::new(
            self.min_x - distance,
            self.min_y - distance,
            self.max_x + distance,
            self.max_y + distance,
        )
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.min_x, self.min_y),
                (self.max_x, self.min_y),
                (self.max_x, self.max_y),
                (self.min_x, self.max_y),
                (self.min_x, self.min_y),
            ]),
            vec![],
        )
    }
}

impl From<geo::Rect<f64>> for BoundingBox {
    fn from(rect: geo::Rect<f64>) -> Self {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_validation() {
        assert!(BoundingBox::try_new(0.0, -5.0, 3.0, 0.0).is_ok());
        assert!(BoundingBox::try_new(3.0, -5.0, 0.0, 0.0).is_err());
        assert!(BoundingBox::try_new(0.0, 0.0, 0.0, 1.0).is_err());
        assert!(BoundingBox::try_new(0.0, f64::NAN, 1.0, 1.0).is_err());
        assert!(BoundingBox::from_slice(&[0.0, 1.0, 2.0]).is_err());
    }

    #[test]
    fn test_bbox_predicates() {
        let bb = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bb.contains_point(5.0, 5.0));
        assert!(bb.contains_point(10.0, 0.0));
        assert!(!bb.contains_point(15.0, 5.0));
        assert!(bb.intersects(&BoundingBox::new(9.0, 9.0, 12.0, 12.0)));
        assert!(!bb.intersects(&BoundingBox::new(11.0, 11.0, 12.0, 12.0)));
        assert_eq!(bb.buffered(1.0), BoundingBox::new(-1.0, -1.0, 11.0, 11.0));
    }
}
