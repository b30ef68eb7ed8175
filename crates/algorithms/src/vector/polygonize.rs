//! Raster label polygonization
//!
//! Boundary edges between cells of one label and everything else are traced
//! into closed rings. Edges are directed with the label on their left, so
//! exteriors come out counter-clockwise and holes clockwise. At a corner
//! where two cells touch only diagonally the trace turns left, which keeps
//! such cells in separate parts (4-connectivity).

use std::collections::{BTreeMap, HashMap};

use basinmask_core::raster::{GeoTransform, Raster, Window};
use geo::algorithm::orient::{Direction, Orient};
use geo::{Contains, Coord, LineString, MultiPolygon, Point, Polygon};

use crate::maybe_rayon::*;

/// (row, col) step per edge direction: E, N, W, S
const STEP: [(isize, isize); 4] = [(0, 1), (-1, 0), (0, -1), (1, 0)];

/// One polygonized label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPolygon {
    pub id: u32,
    pub geometry: MultiPolygon<f64>,
    /// Number of cells carrying the label
    pub cells: usize,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    start: (usize, usize),
    dir: usize,
}

impl Edge {
    fn end(&self) -> (usize, usize) {
        let (dr, dc) = STEP[self.dir];
        (
            (self.start.0 as isize + dr) as usize,
            (self.start.1 as isize + dc) as usize,
        )
    }
}

/// Polygonize `ids` of a label raster.
///
/// Only cells inside `window` are considered (the whole grid when `None`).
/// Ids without cells are left out. Labels are processed in parallel.
pub fn polygonize(labels: &Raster<u32>, ids: &[u32], window: Option<Window>) -> Vec<LabelPolygon> {
    let (rows, cols) = labels.shape();
    let window = window.unwrap_or_else(|| Window::full(rows, cols));

    let mut extents: BTreeMap<u32, (Window, usize)> = ids
        .iter()
        .map(|&id| (id, (Window::new(usize::MAX, 0, usize::MAX, 0), 0)))
        .collect();
    for (row, col) in window.cells() {
        let id = unsafe { labels.get_unchecked(row, col) };
        if let Some((w, n)) = extents.get_mut(&id) {
            w.row_start = w.row_start.min(row);
            w.row_end = w.row_end.max(row + 1);
            w.col_start = w.col_start.min(col);
            w.col_end = w.col_end.max(col + 1);
            *n += 1;
        }
    }

    let jobs: Vec<(u32, Window, usize)> = extents
        .into_iter()
        .filter(|(_, (_, n))| *n > 0)
        .map(|(id, (w, n))| (id, w, n))
        .collect();

    let transform = *labels.transform();
    let mut polygons: Vec<LabelPolygon> = jobs
        .into_par_iter()
        .map(|(id, w, cells)| LabelPolygon {
            id,
            geometry: trace_label(labels, id, &w, &transform),
            cells,
        })
        .collect();
    polygons.sort_by_key(|p| p.id);
    polygons
}

fn boundary_edges(labels: &Raster<u32>, id: u32, window: &Window) -> Vec<Edge> {
    let (rows, cols) = labels.shape();
    let is_id = |r: isize, c: isize| {
        r >= 0
            && c >= 0
            && (r as usize) < rows
            && (c as usize) < cols
            && window.contains(r as usize, c as usize)
            && unsafe { labels.get_unchecked(r as usize, c as usize) } == id
    };

    let mut edges = Vec::new();
    for (row, col) in window.cells() {
        let (r, c) = (row as isize, col as isize);
        if !is_id(r, c) {
            continue;
        }
        if !is_id(r + 1, c) {
            edges.push(Edge { start: (row + 1, col), dir: 0 });
        }
        if !is_id(r, c + 1) {
            edges.push(Edge { start: (row + 1, col + 1), dir: 1 });
        }
        if !is_id(r - 1, c) {
            edges.push(Edge { start: (row, col + 1), dir: 2 });
        }
        if !is_id(r, c - 1) {
            edges.push(Edge { start: (row, col), dir: 3 });
        }
    }
    edges
}

/// Link directed edges into closed rings of corner nodes (first == last)
fn link_rings(edges: &[Edge]) -> Vec<Vec<(usize, usize)>> {
    let mut outgoing: HashMap<(usize, usize), Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.start).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let mut ring: Vec<(usize, usize)> = Vec::new();
        let mut prev_dir = None;
        let mut e = first;
        for _ in 0..edges.len() {
            used[e] = true;
            let edge = edges[e];
            if prev_dir != Some(edge.dir) {
                ring.push(edge.start);
            }
            prev_dir = Some(edge.dir);

            let node = edge.end();
            let d = edge.dir;
            // left, straight, right
            let next = [(d + 1) % 4, d, (d + 3) % 4].iter().find_map(|&turn| {
                outgoing
                    .get(&node)?
                    .iter()
                    .copied()
                    .find(|&k| edges[k].dir == turn)
            });
            match next {
                Some(n) if n != first => e = n,
                _ => break,
            }
        }
        // start node in the middle of a straight run
        if prev_dir == Some(edges[first].dir) && ring.len() > 1 {
            ring.remove(0);
        }
        if ring.len() >= 3 {
            ring.push(ring[0]);
            rings.push(ring);
        }
    }
    rings
}

/// Signed area in index space with y pointing up (x = col, y = -row)
fn signed_area(ring: &[(usize, usize)]) -> f64 {
    ring.windows(2)
        .map(|w| {
            let (r0, c0) = (w[0].0 as f64, w[0].1 as f64);
            let (r1, c1) = (w[1].0 as f64, w[1].1 as f64);
            c0 * -r1 - c1 * -r0
        })
        .sum::<f64>()
        / 2.0
}

fn index_polygon(ring: &[(usize, usize)]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(r, c)| Coord {
            x: c as f64,
            y: -(r as f64),
        })
        .collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// A point half a cell along the first segment of a ring; it lies on this
/// ring only
fn probe_point(ring: &[(usize, usize)]) -> Point<f64> {
    let (r0, c0) = (ring[0].0 as f64, ring[0].1 as f64);
    let (r1, c1) = (ring[1].0 as f64, ring[1].1 as f64);
    let len = (r1 - r0).abs().max((c1 - c0).abs());
    let r = r0 + 0.5 * (r1 - r0) / len;
    let c = c0 + 0.5 * (c1 - c0) / len;
    Point::new(c, -r)
}

fn to_map(ring: &[(usize, usize)], transform: &GeoTransform) -> LineString<f64> {
    ring.iter()
        .map(|&(r, c)| {
            let (x, y) = transform.pixel_to_geo_corner(c, r);
            Coord { x, y }
        })
        .collect::<Vec<_>>()
        .into()
}

fn trace_label(labels: &Raster<u32>, id: u32, window: &Window, transform: &GeoTransform) -> MultiPolygon<f64> {
    let edges = boundary_edges(labels, id, window);
    let rings = link_rings(&edges);

    let mut exteriors: Vec<(Vec<(usize, usize)>, Polygon<f64>, f64)> = Vec::new();
    let mut holes: Vec<Vec<(usize, usize)>> = Vec::new();
    for ring in rings {
        let area = signed_area(&ring);
        if area > 0.0 {
            let poly = index_polygon(&ring);
            exteriors.push((ring, poly, area));
        } else {
            holes.push(ring);
        }
    }

    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); exteriors.len()];
    for hole in holes {
        let probe = probe_point(&hole);
        let owner = exteriors
            .iter()
            .enumerate()
            .filter(|(_, (_, poly, _))| poly.contains(&probe))
            .min_by(|a, b| a.1 .2.total_cmp(&b.1 .2))
            .map(|(i, _)| i);
        if let Some(i) = owner {
            interiors[i].push(to_map(&hole, transform));
        }
    }

    let polygons = exteriors
        .iter()
        .zip(interiors)
        .map(|((ring, _, _), inner)| Polygon::new(to_map(ring, transform), inner))
        .collect::<Vec<_>>();
    MultiPolygon::new(polygons).orient(Direction::Default)
}
