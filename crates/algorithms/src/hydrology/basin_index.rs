//! Spatial index of basin extents
//!
//! An index lets a region query skip basins whose extent, or representative
//! point, lies outside the region. Polygons are always traced from the
//! basin layer itself.

use std::collections::{BTreeMap, BTreeSet};

use basinmask_core::raster::{Raster, Window};
use basinmask_core::vector::{AttributeValue, FeatureCollection};
use basinmask_core::{BoundingBox, Error, Result};
use geo::BoundingRect;
use rstar::{RTree, RTreeObject, AABB};

/// Basin extent lookups
pub trait BasinIndex {
    /// Ids of basins whose extent intersects `bbox`
    fn candidates_in(&self, bbox: &BoundingBox) -> BTreeSet<u32>;
}

#[derive(Debug, Clone)]
struct BasinEnvelope {
    id: u32,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BasinEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_aabb(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y])
}

/// R-tree over one extent per basin id
#[derive(Debug)]
pub struct FeatureBasinIndex {
    tree: RTree<BasinEnvelope>,
}

impl FeatureBasinIndex {
    fn from_bounds(bounds: BTreeMap<u32, BoundingBox>) -> Self {
        let entries = bounds
            .into_iter()
            .map(|(id, bbox)| BasinEnvelope {
                id,
                envelope: to_aabb(&bbox),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Index basin features; the id is the `id_field` property, or the
    /// feature id when the property is absent.
    ///
    /// Features of the same id are merged into one extent. Point features
    /// (e.g. basin outlets) index as degenerate extents.
    pub fn from_features(features: &FeatureCollection, id_field: &str) -> Result<Self> {
        let mut bounds: BTreeMap<u32, BoundingBox> = BTreeMap::new();
        for (i, feature) in features.iter().enumerate() {
            let id = feature
                .get_property(id_field)
                .and_then(AttributeValue::as_i64)
                .or_else(|| feature.id.as_deref().and_then(|s| s.parse().ok()))
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| Error::InvalidParameter {
                    name: "index",
                    value: format!("feature {}", i),
                    reason: format!("no non-negative integer '{}' or feature id", id_field),
                })?;
            let Some(rect) = feature.geometry.as_ref().and_then(|g| g.bounding_rect()) else {
                continue;
            };
            let bbox = BoundingBox::from(rect);
            bounds
                .entry(id)
                .and_modify(|b| *b = b.union(&bbox))
                .or_insert(bbox);
        }
        Ok(Self::from_bounds(bounds))
    }

    /// Index the cell extents of every id in a basin raster (0 = nodata)
    pub fn from_basins(basins: &Raster<u32>) -> Self {
        let gt = basins.transform();
        let mut cells: BTreeMap<u32, (usize, usize, usize, usize)> = BTreeMap::new();
        for ((row, col), &id) in basins.data().indexed_iter() {
            if id == 0 || basins.is_nodata(id) {
                continue;
            }
            cells
                .entry(id)
                .and_modify(|(r0, r1, c0, c1)| {
                    *r0 = (*r0).min(row);
                    *r1 = (*r1).max(row + 1);
                    *c0 = (*c0).min(col);
                    *c1 = (*c1).max(col + 1);
                })
                .or_insert((row, row + 1, col, col + 1));
        }
        let bounds = cells
            .into_iter()
            .map(|(id, (r0, r1, c0, c1))| {
                (id, gt.window_bounds(&Window::new(r0, r1, c0, c1)))
            })
            .collect();
        Self::from_bounds(bounds)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl BasinIndex for FeatureBasinIndex {
    fn candidates_in(&self, bbox: &BoundingBox) -> BTreeSet<u32> {
        self.tree
            .locate_in_envelope_intersecting(&to_aabb(bbox))
            .map(|e| e.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basinmask_core::vector::Feature;
    use basinmask_core::GeoTransform;
    use geo::Geometry;

    fn square(x: f64, y: f64, id: i64) -> Feature {
        Feature::new(Geometry::Polygon(BoundingBox::new(x, y, x + 1.0, y + 1.0).to_polygon()))
            .with_property("basid", AttributeValue::Int(id))
    }

    #[test]
    fn test_feature_index() {
        let mut fc = FeatureCollection::new();
        fc.push(square(0.0, 0.0, 1));
        fc.push(square(5.0, 5.0, 2));
        fc.push(square(1.0, 0.0, 1));
        let index = FeatureBasinIndex::from_features(&fc, "basid").unwrap();
        assert_eq!(index.len(), 2);

        let hits = index.candidates_in(&BoundingBox::new(1.5, 0.2, 1.8, 0.4));
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![1]);
        assert!(index.candidates_in(&BoundingBox::new(3.0, 3.0, 4.0, 4.0)).is_empty());
        // merged extent of id 1 spans both squares
        let hits = index.candidates_in(&BoundingBox::new(-1.0, -1.0, 0.1, 0.1));
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(index.candidates_in(&BoundingBox::new(0.0, 0.0, 6.0, 6.0)).len(), 2);
    }

    #[test]
    fn test_feature_id_fallback() {
        let mut fc = FeatureCollection::new();
        let mut f = square(0.0, 0.0, 0);
        f.properties.clear();
        fc.push(f.clone().with_id(12));
        let index = FeatureBasinIndex::from_features(&fc, "basid").unwrap();
        assert!(index.candidates_in(&BoundingBox::new(0.2, 0.2, 0.3, 0.3)).contains(&12));

        let mut bad = FeatureCollection::new();
        bad.push(f);
        assert!(FeatureBasinIndex::from_features(&bad, "basid").is_err());
    }

    #[test]
    fn test_index_from_raster() {
        let basins = Raster::from_vec(vec![1u32, 1, 2, 0, 1, 2], 2, 3)
            .unwrap()
            .with_transform(GeoTransform::new(10.0, 2.0, 1.0, -1.0));
        let index = FeatureBasinIndex::from_basins(&basins);
        assert_eq!(index.len(), 2);
        let hits = index.candidates_in(&BoundingBox::new(10.2, 0.2, 11.8, 1.8));
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![1]);
        let hits = index.candidates_in(&BoundingBox::new(12.2, 0.2, 12.8, 0.8));
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![2]);
    }
}
