//! Synthetic flow networks shared by the integration tests.
//!
//! The 6x8 grid has unit cells with its top-left corner at (0, 6), so the
//! center of cell (row, col) is (col + 0.5, 5.5 - row).
//!
//! ```text
//!   cols 0-3: basin A           cols 4-7: basin B
//!   v v v v                     > > > v
//!   v v v v                     > > > v
//!   v v v v                     > > > v
//!   v v v v                     > > > v
//!   v v v v                     > > > v
//!   < < < <                     > > > >
//! ```
//!
//! A drains west out of (5,0), B east out of (5,7). Strahler order 2 is
//! reached along row 5 cols 0-2 and along col 7 rows 1-5.

#![allow(dead_code)]

use basinmask_algorithms::hydrology::{D8Encoding, FlowNetwork};
use basinmask_core::{GeoTransform, Raster};

pub const ROWS: usize = 6;
pub const COLS: usize = 8;

/// Sequential codes: 1 = E, 3 = N, 5 = W, 7 = S
pub fn sequential_codes() -> Vec<u8> {
    let mut codes = Vec::with_capacity(ROWS * COLS);
    for row in 0..ROWS {
        for col in 0..COLS {
            let code = match (row, col) {
                (5, 0..=3) => 5,
                (_, 0..=3) => 7,
                (5, _) => 1,
                (_, 7) => 7,
                _ => 1,
            };
            codes.push(code);
        }
    }
    codes
}

pub fn transform() -> GeoTransform {
    GeoTransform::new(0.0, ROWS as f64, 1.0, -1.0)
}

/// The network with derived basins: A = 1, B = 2
pub fn two_basins() -> FlowNetwork {
    let flowdir = Raster::from_vec(sequential_codes(), ROWS, COLS)
        .unwrap()
        .with_transform(transform());
    FlowNetwork::new(flowdir, D8Encoding::Sequential)
}

/// Basin layer with ids 10 (A) and 20 (B)
pub fn basin_layer() -> Raster<u32> {
    let ids = (0..ROWS * COLS)
        .map(|i| if i % COLS < 4 { 10 } else { 20 })
        .collect();
    Raster::from_vec(ids, ROWS, COLS)
        .unwrap()
        .with_transform(transform())
        .with_nodata(Some(0))
}

/// Center of a cell in map coordinates
pub fn center(row: usize, col: usize) -> (f64, f64) {
    (col as f64 + 0.5, ROWS as f64 - 0.5 - row as f64)
}
