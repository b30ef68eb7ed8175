//! Stream cell classification
//!
//! A cell is a stream cell when it meets every given threshold: stream
//! order at least `strord` and upstream area at least `uparea`. Without
//! thresholds every valid cell is a stream cell. The stream order layer is
//! derived with [`strahler_order`] when the network lacks one.

use std::borrow::Cow;

use basinmask_core::raster::Raster;
use basinmask_core::{Error, Result};
use ndarray::Array2;

use super::flow_network::FlowNetwork;
use super::stream_order::strahler_order;

/// Stream thresholds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamNetworkParams {
    /// Minimum stream order
    pub strord: Option<u8>,
    /// Minimum upstream area, in the units of the uparea layer
    pub uparea: Option<f64>,
}

/// Thresholds bound to the layers they test
#[derive(Debug, Clone)]
pub struct StreamCriteria<'a> {
    network: &'a FlowNetwork,
    strord: Option<(u8, Cow<'a, Raster<u8>>)>,
    uparea: Option<(f64, &'a Raster<f64>)>,
}

impl<'a> StreamCriteria<'a> {
    /// Bind thresholds to the network layers.
    ///
    /// Fails with `MissingLayer` for an upstream area threshold on a
    /// network without an uparea layer.
    pub fn new(network: &'a FlowNetwork, params: &StreamNetworkParams) -> Result<Self> {
        let strord = match params.strord {
            Some(t) => {
                let layer = match network.strord() {
                    Some(layer) => Cow::Borrowed(layer),
                    None => Cow::Owned(strahler_order(network)?),
                };
                Some((t, layer))
            }
            None => None,
        };
        let uparea = match params.uparea {
            Some(t) => {
                let layer = network.uparea().ok_or_else(|| {
                    Error::MissingLayer("uparea threshold given but the network has no uparea layer".into())
                })?;
                Some((t, layer))
            }
            None => None,
        };
        Ok(Self {
            network,
            strord,
            uparea,
        })
    }

    /// Valid cell meeting every threshold
    pub fn is_stream(&self, idx: usize) -> bool {
        if !self.network.is_valid(idx) {
            return false;
        }
        let (row, col) = self.network.cell(idx);
        if let Some((t, layer)) = &self.strord {
            // SAFETY: layers share the flow direction grid
            let v = unsafe { layer.get_unchecked(row, col) };
            if layer.is_nodata(v) || v < *t {
                return false;
            }
        }
        if let Some((t, layer)) = &self.uparea {
            let v = unsafe { layer.get_unchecked(row, col) };
            if layer.is_nodata(v) || v < *t {
                return false;
            }
        }
        true
    }
}

/// Extract the stream network as a binary raster.
///
/// # Returns
/// Raster<u8> with 1 = stream cell, 0 = non-stream cell
pub fn stream_network(network: &FlowNetwork, params: StreamNetworkParams) -> Result<Raster<u8>> {
    let criteria = StreamCriteria::new(network, &params)?;
    let (rows, cols) = network.shape();

    let mut output_data = Array2::<u8>::zeros((rows, cols));
    for row in 0..rows {
        for col in 0..cols {
            if criteria.is_stream(network.index(row, col)) {
                output_data[(row, col)] = 1;
            }
        }
    }

    let mut output = Raster::from_array(output_data)
        .with_transform(*network.transform())
        .with_crs(network.crs().cloned());
    output.set_nodata(Some(0));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::d8::D8Encoding;

    // 1x5 line draining east into a pit
    fn line() -> FlowNetwork {
        let flowdir = Raster::from_vec(vec![1u8, 1, 1, 1, 0], 1, 5).unwrap();
        let uparea = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0], 1, 5).unwrap();
        FlowNetwork::new(flowdir, D8Encoding::Sequential)
            .with_uparea(uparea)
            .unwrap()
    }

    #[test]
    fn test_no_thresholds_all_valid() {
        let net = line();
        let streams = stream_network(&net, StreamNetworkParams::default()).unwrap();
        assert_eq!(streams.valid_count(), 5);
    }

    #[test]
    fn test_uparea_threshold() {
        let net = line();
        let params = StreamNetworkParams {
            uparea: Some(3.0),
            ..Default::default()
        };
        let streams = stream_network(&net, params).unwrap();
        let values: Vec<u8> = streams.data().iter().copied().collect();
        assert_eq!(values, vec![0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_strord_derived_when_missing() {
        // Two headwaters joining: only the junction and below reach order 2
        let flowdir = Raster::from_vec(vec![8u8, 255, 6, 255, 7, 255, 255, 0, 255], 3, 3).unwrap();
        let net = FlowNetwork::new(flowdir, D8Encoding::Sequential);
        let criteria = StreamCriteria::new(
            &net,
            &StreamNetworkParams {
                strord: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!criteria.is_stream(net.index(0, 0)));
        assert!(criteria.is_stream(net.index(1, 1)));
        assert!(criteria.is_stream(net.index(2, 1)));
    }

    #[test]
    fn test_uparea_missing_layer() {
        let flowdir = Raster::from_vec(vec![1u8, 0], 1, 2).unwrap();
        let net = FlowNetwork::new(flowdir, D8Encoding::Sequential);
        let params = StreamNetworkParams {
            uparea: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(StreamCriteria::new(&net, &params), Err(Error::MissingLayer(_))));
    }
}
