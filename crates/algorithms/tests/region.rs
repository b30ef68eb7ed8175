//! Region parsing against a local catalog, and regions resolved into basins.

mod common;

use basinmask_algorithms::hydrology::{get_basin_geometry, BasinKind};
use basinmask_algorithms::region::{parse_region, Region, RegionDescriptor, RegionKind, RegionParser};
use basinmask_core::io::{write_geojson, write_geotiff};
use basinmask_core::{
    BoundingBox, Error, Feature, FeatureCollection, GeoTransform, LocalCatalog, Raster,
    StaticModelRegistry,
};
use geo::{Geometry, Point};
use serde_json::json;

use common::{center, two_basins};

fn squares() -> FeatureCollection {
    let mut fc = FeatureCollection::new();
    for (x, y) in [(0.0, 0.0), (2.0, 1.0)] {
        fc.push(
            Feature::new(Geometry::Polygon(BoundingBox::new(x, y, x + 1.0, y + 1.0).to_polygon()))
                .with_id(1),
        );
    }
    fc
}

fn grid() -> Raster<f64> {
    Raster::from_vec((0..12).map(f64::from).collect(), 3, 4)
        .unwrap()
        .with_transform(GeoTransform::new(10.0, 20.0, 0.5, -0.5))
}

#[test]
fn selector_keys_map_to_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = LocalCatalog::new(dir.path());
    let registry = StaticModelRegistry::new(["wflow", "sfincs"]);
    let root = dir.path().to_string_lossy().to_string();

    let cases = [
        (RegionDescriptor::new().with("geom", squares()), RegionKind::Geom),
        (RegionDescriptor::new().with("bbox", json!([0.0, 0.0, 1.0, 1.0])), RegionKind::Geom),
        (RegionDescriptor::new().with("grid", grid()), RegionKind::Grid),
        (RegionDescriptor::new().with("basin", json!([1, 2])), RegionKind::Basin),
        (RegionDescriptor::new().with("subbasin", json!([1.0, 2.0])), RegionKind::Subbasin),
        (RegionDescriptor::new().with("interbasin", json!([0.0, 0.0, 1.0, 1.0])), RegionKind::Interbasin),
        (RegionDescriptor::new().with("outlet", json!([0.0, 0.0, 1.0, 1.0])), RegionKind::Outlet),
        (RegionDescriptor::new().with("sfincs", json!(root)), RegionKind::Model),
    ];
    for (descriptor, expected) in cases {
        let (kind, region) = parse_region(&descriptor, &catalog, Some(&registry)).unwrap();
        assert_eq!(kind, expected);
        assert_eq!(region.kind(), expected);
    }
}

#[test]
fn geometry_from_file_matches_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("area.geojson");
    write_geojson(&squares(), &path).unwrap();
    let catalog = LocalCatalog::new(dir.path());

    let memory = RegionParser::new(&catalog)
        .parse(&RegionDescriptor::new().with("geom", squares()))
        .unwrap();
    for source in [path.to_string_lossy().to_string(), "area.geojson".to_string()] {
        let file = RegionParser::new(&catalog)
            .parse(&RegionDescriptor::new().with("geom", json!(source)))
            .unwrap();
        assert_eq!(file.kind(), memory.kind());
        assert_eq!(file.params(), memory.params());
    }
}

#[test]
fn grid_from_file_matches_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.tif");
    write_geotiff(&grid(), &path).unwrap();
    let catalog = LocalCatalog::new(dir.path());

    let memory = RegionParser::new(&catalog)
        .parse(&RegionDescriptor::new().with("grid", grid()))
        .unwrap();
    let file = RegionParser::new(&catalog)
        .parse(&RegionDescriptor::new().with("grid", json!(path.to_string_lossy())))
        .unwrap();
    assert_eq!(file.params(), memory.params());
    match file {
        Region::Grid { grid } => assert_eq!(grid.shape(), (3, 4)),
        other => panic!("unexpected kind {}", other.kind()),
    }
}

#[test]
fn point_geometry_file_selects_points() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outlets.geojson");
    let mut points = FeatureCollection::new();
    points.push(Feature::new(Geometry::Point(Point::new(1.5, 0.5))));
    write_geojson(&points, &path).unwrap();
    let catalog = LocalCatalog::new(dir.path());

    let d = RegionDescriptor::new().with("interbasin", json!("outlets.geojson"));
    let (_, region) = parse_region(&d, &catalog, None).unwrap();
    assert_eq!(region.selection().unwrap().xy, Some(vec![(1.5, 0.5)]));

    let d = RegionDescriptor::new().with("geom", json!("outlets.geojson"));
    assert!(matches!(
        parse_region(&d, &catalog, None),
        Err(Error::InvalidRegionValue { .. })
    ));
}

#[test]
fn missing_source_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = LocalCatalog::new(dir.path());
    let d = RegionDescriptor::new().with("geom", json!("nowhere.geojson"));
    assert!(matches!(parse_region(&d, &catalog, None), Err(Error::UnknownSource(_))));
}

#[test]
fn subbasin_region_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = LocalCatalog::new(dir.path());
    let (x, y) = center(2, 1);
    let d = RegionDescriptor::from_json(&format!(
        r#"{{"subbasin": [{}, {}], "strord": 2}}"#,
        x, y
    ))
    .unwrap();
    let (kind, region) = parse_region(&d, &catalog, None).unwrap();
    assert_eq!(kind, RegionKind::Subbasin);

    let request = region.basin_request().unwrap();
    assert_eq!(request.kind, BasinKind::Subbasin);
    let geom = get_basin_geometry(&two_basins(), &request, None).unwrap();
    assert_eq!(geom.len(), 1);
    assert_eq!(geom.outlets.map(|o| o.len()), Some(1));
}

#[test]
fn outlet_region_resolves_as_interbasin() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = LocalCatalog::new(dir.path());
    let d = RegionDescriptor::new().with("outlet", json!([0.0, 0.0, 6.0, 3.0]));
    let (_, region) = parse_region(&d, &catalog, None).unwrap();
    let geom = get_basin_geometry(&two_basins(), &region.basin_request().unwrap(), None).unwrap();
    // one basin outlet lies in the box
    assert_eq!(geom.len(), 1);
}

#[test]
fn basin_zero_parses_but_finds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = LocalCatalog::new(dir.path());
    let d = RegionDescriptor::new().with("basin", json!(0));
    let (_, region) = parse_region(&d, &catalog, None).unwrap();
    assert!(matches!(
        get_basin_geometry(&two_basins(), &region.basin_request().unwrap(), None),
        Err(Error::NoBasinsFound(_))
    ));
}
