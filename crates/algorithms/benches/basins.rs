//! Benchmarks for basin delineation

use basinmask_algorithms::hydrology::{
    get_basin_geometry, label_basins, strahler_order, BasinKind, BasinRequest, D8Encoding,
    FeatureBasinIndex, FlowNetwork,
};
use basinmask_core::{BoundingBox, GeoTransform, Raster};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Comb-shaped network: every column drains south into a bottom channel
/// flowing west, split into `size / 16` basins by pits along the channel.
fn create_comb_network(size: usize) -> FlowNetwork {
    let mut codes = vec![7u8; size * size];
    let last = size - 1;
    for col in 0..size {
        codes[last * size + col] = if col % 16 == 0 { 0 } else { 5 };
    }
    let flowdir = Raster::from_vec(codes, size, size)
        .unwrap()
        .with_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    FlowNetwork::new(flowdir, D8Encoding::Sequential)
}

fn bench_label_basins(c: &mut Criterion) {
    let mut group = c.benchmark_group("basins/label");
    for size in [256, 512, 1024] {
        let net = create_comb_network(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| label_basins(black_box(&net)).unwrap())
        });
    }
    group.finish();
}

fn bench_strahler(c: &mut Criterion) {
    let mut group = c.benchmark_group("basins/strahler");
    for size in [256, 512, 1024] {
        let net = create_comb_network(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| strahler_order(black_box(&net)).unwrap())
        });
    }
    group.finish();
}

fn bench_bbox_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("basins/bbox");
    for size in [256, 512] {
        let base = create_comb_network(size);
        let basins = label_basins(&base).unwrap();
        let net = base.with_basins(basins).unwrap();
        let index = FeatureBasinIndex::from_basins(net.basins().unwrap());
        let s = size as f64;
        let request = BasinRequest {
            bbox: Some(BoundingBox::new(0.25 * s, 0.0, 0.5 * s, 0.25 * s)),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("full_scan", size), &size, |b, _| {
            b.iter(|| get_basin_geometry(black_box(&net), &request, None).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("indexed", size), &size, |b, _| {
            b.iter(|| get_basin_geometry(black_box(&net), &request, Some(&index)).unwrap())
        });
    }
    group.finish();
}

fn bench_interbasin(c: &mut Criterion) {
    let mut group = c.benchmark_group("basins/interbasin");
    for size in [256, 512] {
        let net = create_comb_network(size);
        let s = size as f64;
        let request = BasinRequest {
            kind: BasinKind::Interbasin,
            bbox: Some(BoundingBox::new(0.0, 0.0, 0.5 * s, 0.5 * s)),
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| get_basin_geometry(black_box(&net), &request, None).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_label_basins,
    bench_strahler,
    bench_bbox_selection,
    bench_interbasin
);
criterion_main!(benches);
