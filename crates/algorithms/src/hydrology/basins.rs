//! Basin labelling and flow path tracing
//!
//! Upstream flood fills walk the inverse of the D8 graph breadth-first from
//! seed cells; downstream traces follow the graph until a stop condition.

use std::borrow::Cow;
use std::collections::VecDeque;

use basinmask_core::raster::Raster;
use basinmask_core::{Algorithm, Error, Result};
use tracing::debug;

use super::flow_network::FlowNetwork;

/// Label every cell upstream of `seed` with `id`.
///
/// Only unlabelled cells (`labels[i] == 0`) accepted by `within` are taken;
/// the flood stops at cells already carrying a label, so repeated calls
/// yield disjoint pieces. Returns the number of cells labelled.
pub fn flood_upstream<F>(
    network: &FlowNetwork,
    seed: usize,
    id: u32,
    labels: &mut [u32],
    within: F,
) -> usize
where
    F: Fn(usize) -> bool,
{
    if labels[seed] != 0 || !network.is_valid(seed) || !within(seed) {
        return 0;
    }
    labels[seed] = id;
    1 + spread_upstream(network, seed, labels, &within)
}

/// Split the area upstream of `seeds` into disjoint pieces labelled
/// 1..=n in seed order.
///
/// Every seed is labelled before any flood starts, so a seed lying
/// upstream of another still becomes its own piece. Returns the cell count
/// per seed; a seed repeated, invalid or rejected by `within` counts 0.
pub fn flood_pieces<F>(network: &FlowNetwork, seeds: &[usize], labels: &mut [u32], within: F) -> Vec<usize>
where
    F: Fn(usize) -> bool,
{
    let mut counts = vec![0usize; seeds.len()];
    for (k, &seed) in seeds.iter().enumerate() {
        if labels[seed] == 0 && network.is_valid(seed) && within(seed) {
            labels[seed] = (k + 1) as u32;
            counts[k] = 1;
        }
    }
    for (k, &seed) in seeds.iter().enumerate() {
        if counts[k] > 0 {
            counts[k] += spread_upstream(network, seed, labels, &within);
        }
    }
    counts
}

/// Breadth-first flood from an already labelled cell
fn spread_upstream<F>(network: &FlowNetwork, seed: usize, labels: &mut [u32], within: &F) -> usize
where
    F: Fn(usize) -> bool,
{
    let id = labels[seed];
    let mut queue = VecDeque::new();
    queue.push_back(seed);
    let mut count = 0;

    while let Some(cell) = queue.pop_front() {
        for up in network.upstream_neighbors(cell) {
            if labels[up] != 0 || !within(up) {
                continue;
            }
            labels[up] = id;
            count += 1;
            queue.push_back(up);
        }
    }
    count
}

/// Follow the flow path from `start` until `stop` accepts a cell or the
/// path ends at an outlet. Returns the path including both ends.
///
/// Fails with an algorithm error if the path revisits a cell.
pub fn trace_downstream<F>(network: &FlowNetwork, start: usize, mut stop: F) -> Result<Vec<usize>>
where
    F: FnMut(usize) -> bool,
{
    if !network.is_valid(start) {
        return Err(Error::InvalidParameter {
            name: "start",
            value: format!("{:?}", network.cell(start)),
            reason: "cell is not part of the flow network".into(),
        });
    }

    let mut path = vec![start];
    let mut cell = start;
    while !stop(cell) {
        let Some(next) = network.downstream(cell) else {
            break;
        };
        if path.len() > network.len() {
            return Err(Error::Algorithm(format!(
                "flow path from cell {:?} does not terminate",
                network.cell(start)
            )));
        }
        path.push(next);
        cell = next;
    }
    Ok(path)
}

/// Outlet the cell ultimately drains to
pub fn terminal_outlet(network: &FlowNetwork, cell: usize) -> Result<usize> {
    let path = trace_downstream(network, cell, |_| false)?;
    Ok(path[path.len() - 1])
}

/// Label all basins by flooding upstream from every outlet.
///
/// Outlets are numbered 1.. in row-major order; cells that reach no outlet
/// (flow cycles) and nodata cells stay 0.
pub fn label_basins(network: &FlowNetwork) -> Result<Raster<u32>> {
    let mut labels = vec![0u32; network.len()];
    let outlets = network.outlets();
    for (i, &outlet) in outlets.iter().enumerate() {
        flood_upstream(network, outlet, (i + 1) as u32, &mut labels, |_| true);
    }
    debug!("labelled {} basins", outlets.len());

    let mut output = network.flowdir().with_same_meta_from_vec(labels)?;
    output.set_nodata(Some(0));
    Ok(output)
}

/// The network's basin layer, or labels derived from its outlets
pub fn basin_labels(network: &FlowNetwork) -> Result<Cow<'_, Raster<u32>>> {
    match network.basins() {
        Some(basins) => Ok(Cow::Borrowed(basins)),
        None => label_basins(network).map(Cow::Owned),
    }
}

/// Basin labelling algorithm
#[derive(Debug, Clone, Default)]
pub struct LabelBasins;

impl Algorithm for LabelBasins {
    type Input = FlowNetwork;
    type Output = Raster<u32>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Label Basins"
    }

    fn description(&self) -> &'static str {
        "Label every drainage basin of a D8 flow network"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        label_basins(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::d8::D8Encoding;
    use basinmask_core::GeoTransform;

    // Ridge at col 2: left half drains west, right half drains east
    fn two_basins() -> FlowNetwork {
        let mut codes = Vec::new();
        for _ in 0..3 {
            codes.extend_from_slice(&[5u8, 5, 3, 1, 1]);
        }
        // ridge column drains north, top of ridge drains west
        codes[2] = 5;
        let flowdir = Raster::from_vec(codes, 3, 5)
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        FlowNetwork::new(flowdir, D8Encoding::Sequential)
    }

    #[test]
    fn test_label_all_basins() {
        let net = two_basins();
        let labels = label_basins(&net).unwrap();
        // Outlets in row-major order: (0,0) (0,4) (1,0) (1,4) (2,0) (2,4)
        assert_eq!(labels.get(0, 0).unwrap(), 1);
        assert_eq!(labels.get(0, 4).unwrap(), 2);
        assert_eq!(labels.get(2, 3).unwrap(), 6);
        // ridge drains north into the top row then west
        assert_eq!(labels.get(2, 2).unwrap(), 1);
        assert_eq!(labels.nodata(), Some(0));
        assert_eq!(labels.valid_count(), 15);
    }

    #[test]
    fn test_flood_stops_at_labels() {
        let net = two_basins();
        let mut labels = vec![0u32; net.len()];
        let n1 = flood_upstream(&net, net.index(0, 1), 1, &mut labels, |_| true);
        let n2 = flood_upstream(&net, net.index(0, 0), 2, &mut labels, |_| true);
        assert_eq!(n1, 4); // (0,1) (0,2) (1,2) (2,2)
        assert_eq!(n2, 1);
        assert_eq!(flood_upstream(&net, net.index(0, 0), 3, &mut labels, |_| true), 0);
    }

    #[test]
    fn test_flood_within_domain() {
        let net = two_basins();
        let mut labels = vec![0u32; net.len()];
        let n = flood_upstream(&net, net.index(0, 1), 1, &mut labels, |i| net.cell(i).0 < 2);
        assert_eq!(n, 3);
        assert_eq!(labels[net.index(2, 2)], 0);
    }

    #[test]
    fn test_nested_seeds_keep_own_piece() {
        let net = two_basins();
        let mut labels = vec![0u32; net.len()];
        // outlet first, then a cell upstream of it
        let seeds = [net.index(0, 0), net.index(1, 2)];
        let counts = flood_pieces(&net, &seeds, &mut labels, |_| true);
        assert_eq!(counts, vec![3, 2]);
        assert_eq!(labels[net.index(2, 2)], 2);
        assert_eq!(labels[net.index(0, 2)], 1);

        let mut labels = vec![0u32; net.len()];
        let counts = flood_pieces(&net, &[net.index(0, 0), net.index(0, 0)], &mut labels, |_| true);
        assert_eq!(counts, vec![5, 0]);
    }

    #[test]
    fn test_trace_downstream() {
        let net = two_basins();
        let path = trace_downstream(&net, net.index(2, 2), |_| false).unwrap();
        assert_eq!(
            path,
            vec![net.index(2, 2), net.index(1, 2), net.index(0, 2), net.index(0, 1), net.index(0, 0)]
        );
        let path = trace_downstream(&net, net.index(2, 2), |i| net.cell(i).0 == 0).unwrap();
        assert_eq!(path.last(), Some(&net.index(0, 2)));
        assert_eq!(terminal_outlet(&net, net.index(1, 3)).unwrap(), net.index(1, 4));
    }

    #[test]
    fn test_trace_cycle_fails() {
        // E then W: a two-cell loop
        let flowdir = Raster::from_vec(vec![1u8, 5], 1, 2).unwrap();
        let net = FlowNetwork::new(flowdir, D8Encoding::Sequential);
        assert!(net.outlets().is_empty());
        assert!(matches!(terminal_outlet(&net, 0), Err(Error::Algorithm(_))));
        assert_eq!(label_basins(&net).unwrap().valid_count(), 0);
    }
}
