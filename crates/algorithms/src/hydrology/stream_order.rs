//! Strahler stream order
//!
//! Headwater cells get order 1. Downstream, the order increases by one
//! where two or more upstream cells of the maximum order meet, otherwise
//! the maximum upstream order carries on.

use std::collections::VecDeque;

use basinmask_core::raster::Raster;
use basinmask_core::{Algorithm, Error, Result};

use super::flow_network::FlowNetwork;

/// Strahler order algorithm
#[derive(Debug, Clone, Default)]
pub struct StrahlerOrder;

impl Algorithm for StrahlerOrder {
    type Input = FlowNetwork;
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Strahler Order"
    }

    fn description(&self) -> &'static str {
        "Strahler stream order of every cell of a D8 flow network"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        strahler_order(&input)
    }
}

/// Compute the Strahler order of every valid cell.
///
/// # Algorithm
/// 1. Count incoming flows for each cell (in-degree)
/// 2. Start from cells with in-degree 0 (headwaters)
/// 3. Propagate downstream, tracking the maximum upstream order and how
///    many upstream cells reach it
///
/// Nodata cells and cells on flow cycles get 0 (nodata).
pub fn strahler_order(network: &FlowNetwork) -> Result<Raster<u8>> {
    let n = network.len();

    let mut in_degree = vec![0u8; n];
    for cell in 0..n {
        if let Some(down) = network.downstream(cell) {
            in_degree[down] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..n)
        .filter(|&i| network.is_valid(i) && in_degree[i] == 0)
        .collect();

    let mut order = vec![0u8; n];
    let mut max_up = vec![0u8; n];
    let mut n_max = vec![0u8; n];

    while let Some(cell) = queue.pop_front() {
        order[cell] = match (max_up[cell], n_max[cell]) {
            (0, _) => 1,
            (m, k) if k >= 2 => m.saturating_add(1),
            (m, _) => m,
        };

        let Some(down) = network.downstream(cell) else {
            continue;
        };
        let o = order[cell];
        if o > max_up[down] {
            max_up[down] = o;
            n_max[down] = 1;
        } else if o == max_up[down] {
            n_max[down] = n_max[down].saturating_add(1);
        }
        in_degree[down] -= 1;
        if in_degree[down] == 0 {
            queue.push_back(down);
        }
    }

    let mut output = network.flowdir().with_same_meta_from_vec(order)?;
    output.set_nodata(Some(0));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::d8::D8Encoding;

    // Two first-order branches meeting at (2,1), draining south to a pit
    fn junction() -> FlowNetwork {
        // Sequential: 1=E 5=W 6=SW 7=S 8=SE, 0 = pit
        #[rustfmt::skip]
        let codes = vec![
            7, 255, 7,
            8, 255, 6,
            255, 7, 255,
            255, 0, 255,
        ];
        FlowNetwork::new(Raster::from_vec(codes, 4, 3).unwrap(), D8Encoding::Sequential)
    }

    #[test]
    fn test_strahler_junction() {
        let net = junction();
        let ord = strahler_order(&net).unwrap();
        assert_eq!(ord.get(0, 0).unwrap(), 1);
        assert_eq!(ord.get(1, 0).unwrap(), 1);
        assert_eq!(ord.get(1, 2).unwrap(), 1);
        // (1,0) and (1,2) both order 1 meet at (2,1)
        assert_eq!(ord.get(2, 1).unwrap(), 2);
        assert_eq!(ord.get(3, 1).unwrap(), 2);
        assert_eq!(ord.get(0, 1).unwrap(), 0);
    }

    #[test]
    fn test_strahler_single_line() {
        let flowdir = Raster::from_vec(vec![1u8, 1, 1, 0], 1, 4).unwrap();
        let net = FlowNetwork::new(flowdir, D8Encoding::Sequential);
        let ord = strahler_order(&net).unwrap();
        assert!(ord.data().iter().all(|&o| o == 1));
    }

    #[test]
    fn test_strahler_lower_order_tributary() {
        // Order-2 stem at (3,1) receives a headwater at (3,0) flowing E:
        // the stem keeps order 2.
        #[rustfmt::skip]
        let codes = vec![
            7, 255, 7,
            8, 255, 6,
            255, 7, 255,
            1, 7, 255,
            255, 0, 255,
        ];
        let net = FlowNetwork::new(Raster::from_vec(codes, 5, 3).unwrap(), D8Encoding::Sequential);
        let ord = strahler_order(&net).unwrap();
        assert_eq!(ord.get(3, 1).unwrap(), 2);
        assert_eq!(ord.get(4, 1).unwrap(), 2);
    }
}
