//! Flow network: aligned D8 flow direction, basin, upstream area and
//! stream order layers
//!
//! Cells are addressed by flat row-major index. Downstream and upstream
//! neighbours are decoded on demand from the flow direction codes.

use basinmask_core::raster::{GeoTransform, Raster, RasterDataset, RasterElement, Window};
use basinmask_core::{BoundingBox, Error, Result, CRS};

use super::d8::{D8Encoding, FlowCode, D8_OFFSETS};

/// Layer names looked up by [`FlowNetwork::from_dataset`]
#[derive(Debug, Clone)]
pub struct LayerNames {
    pub flwdir: String,
    pub basins: String,
    pub uparea: String,
    pub strord: String,
}

impl Default for LayerNames {
    fn default() -> Self {
        Self {
            flwdir: "flwdir".into(),
            basins: "basins".into(),
            uparea: "uparea".into(),
            strord: "strord".into(),
        }
    }
}

/// Read-only D8 flow network
#[derive(Debug, Clone)]
pub struct FlowNetwork {
    flowdir: Raster<u8>,
    encoding: D8Encoding,
    basins: Option<Raster<u32>>,
    uparea: Option<Raster<f64>>,
    strord: Option<Raster<u8>>,
}

impl FlowNetwork {
    /// Network from a flow direction raster alone
    pub fn new(flowdir: Raster<u8>, encoding: D8Encoding) -> Self {
        Self {
            flowdir,
            encoding,
            basins: None,
            uparea: None,
            strord: None,
        }
    }

    /// Attach the basin id layer (0 = nodata)
    pub fn with_basins(mut self, basins: Raster<u32>) -> Result<Self> {
        self.check_aligned("basins", &basins)?;
        self.basins = Some(basins);
        Ok(self)
    }

    /// Attach the upstream area layer
    pub fn with_uparea(mut self, uparea: Raster<f64>) -> Result<Self> {
        self.check_aligned("uparea", &uparea)?;
        self.uparea = Some(uparea);
        Ok(self)
    }

    /// Attach the stream order layer
    pub fn with_strord(mut self, strord: Raster<u8>) -> Result<Self> {
        self.check_aligned("strord", &strord)?;
        self.strord = Some(strord);
        Ok(self)
    }

    /// Build a network from named dataset layers; only `flwdir` is required
    pub fn from_dataset(ds: &RasterDataset, names: &LayerNames, encoding: D8Encoding) -> Result<Self> {
        let flowdir = ds.layer(&names.flwdir)?.cast::<u8>(encoding.nodata());
        let mut network = FlowNetwork::new(flowdir, encoding);
        if let Some(basins) = ds.get(&names.basins) {
            network = network.with_basins(basins.cast::<u32>(0))?;
        }
        if let Some(uparea) = ds.get(&names.uparea) {
            network = network.with_uparea(uparea.clone())?;
        }
        if let Some(strord) = ds.get(&names.strord) {
            network = network.with_strord(strord.cast::<u8>(0))?;
        }
        Ok(network)
    }

    fn check_aligned<T: RasterElement>(&self, layer: &str, other: &Raster<T>) -> Result<()> {
        let (er, ec) = self.flowdir.shape();
        let (ar, ac) = other.shape();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        let crs_differs = match (self.flowdir.crs(), other.crs()) {
            (Some(a), Some(b)) => !a.is_equivalent(b),
            _ => false,
        };
        if !self.flowdir.same_grid(other) || crs_differs {
            return Err(Error::GridMismatch {
                layer: layer.to_string(),
            });
        }
        Ok(())
    }

    // Layers

    pub fn flowdir(&self) -> &Raster<u8> {
        &self.flowdir
    }

    pub fn encoding(&self) -> D8Encoding {
        self.encoding
    }

    pub fn basins(&self) -> Option<&Raster<u32>> {
        self.basins.as_ref()
    }

    pub fn uparea(&self) -> Option<&Raster<f64>> {
        self.uparea.as_ref()
    }

    pub fn strord(&self) -> Option<&Raster<u8>> {
        self.strord.as_ref()
    }

    // Grid

    pub fn rows(&self) -> usize {
        self.flowdir.rows()
    }

    pub fn cols(&self) -> usize {
        self.flowdir.cols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.flowdir.shape()
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.flowdir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flowdir.is_empty()
    }

    pub fn transform(&self) -> &GeoTransform {
        self.flowdir.transform()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.flowdir.crs()
    }

    pub fn bounds(&self) -> BoundingBox {
        self.flowdir.bounds()
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols() + col
    }

    #[inline]
    pub fn cell(&self, idx: usize) -> (usize, usize) {
        (idx / self.cols(), idx % self.cols())
    }

    /// Cell center in map coordinates
    pub fn cell_center(&self, idx: usize) -> (f64, f64) {
        let (row, col) = self.cell(idx);
        self.flowdir.pixel_to_geo(col, row)
    }

    /// Index of the cell containing (x, y)
    pub fn cell_at(&self, x: f64, y: f64) -> Option<usize> {
        self.flowdir.cell_at(x, y).map(|(row, col)| self.index(row, col))
    }

    /// Cells whose centers lie inside `bbox`
    pub fn window_for(&self, bbox: &BoundingBox) -> Option<Window> {
        self.flowdir.window_for(bbox)
    }

    fn neighbor(&self, idx: usize, dir: usize) -> Option<usize> {
        let (row, col) = self.cell(idx);
        let (dr, dc) = D8_OFFSETS[dir];
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        if nr < 0 || nc < 0 || nr >= self.rows() as isize || nc >= self.cols() as isize {
            return None;
        }
        Some(self.index(nr as usize, nc as usize))
    }

    // Topology

    /// Decoded flow code of a cell
    #[inline]
    pub fn code(&self, idx: usize) -> FlowCode {
        let (row, col) = self.cell(idx);
        // SAFETY: cell() keeps row/col inside the grid for idx < len()
        let raw = unsafe { self.flowdir.get_unchecked(row, col) };
        self.encoding.decode(raw)
    }

    /// Cell carries a direction or is a pit
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        idx < self.len() && self.code(idx).is_valid()
    }

    /// Downstream neighbour; `None` for pits, nodata, and cells draining
    /// off the grid or into nodata
    pub fn downstream(&self, idx: usize) -> Option<usize> {
        match self.code(idx) {
            FlowCode::Direction(dir) => self.neighbor(idx, dir).filter(|&n| self.is_valid(n)),
            FlowCode::Pit | FlowCode::NoData => None,
        }
    }

    /// Valid neighbours draining into `idx`
    pub fn upstream_neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        (0..8).filter_map(move |dir| {
            let n = self.neighbor(idx, dir)?;
            (self.downstream(n) == Some(idx)).then_some(n)
        })
    }

    /// Valid cell without a downstream neighbour
    pub fn is_outlet(&self, idx: usize) -> bool {
        self.is_valid(idx) && self.downstream(idx).is_none()
    }

    /// All outlets in row-major order
    pub fn outlets(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.is_outlet(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3x3, everything drains south into the bottom row, which drains east;
    // (2, 2) is a pit and (0, 0) is nodata.
    fn network() -> FlowNetwork {
        #[rustfmt::skip]
        let codes = vec![
            247, 4, 4,
            4,   4, 4,
            1,   1, 0,
        ];
        let flowdir = Raster::from_vec(codes, 3, 3)
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        FlowNetwork::new(flowdir, D8Encoding::Esri)
    }

    #[test]
    fn test_downstream() {
        let net = network();
        assert_eq!(net.downstream(net.index(0, 1)), Some(net.index(1, 1)));
        assert_eq!(net.downstream(net.index(2, 0)), Some(net.index(2, 1)));
        assert_eq!(net.downstream(net.index(2, 2)), None);
        assert_eq!(net.downstream(0), None);
        assert!(!net.is_valid(0));
    }

    #[test]
    fn test_upstream_and_outlets() {
        let net = network();
        let mut up: Vec<usize> = net.upstream_neighbors(net.index(2, 1)).collect();
        up.sort_unstable();
        assert_eq!(up, vec![net.index(1, 1), net.index(2, 0)]);
        assert_eq!(net.upstream_neighbors(net.index(0, 2)).count(), 0);
        assert_eq!(net.outlets(), vec![net.index(2, 2)]);
    }

    #[test]
    fn test_drain_into_nodata_is_outlet() {
        // nodata, then two cells draining west
        let flowdir = Raster::from_vec(vec![247u8, 16, 16], 1, 3).unwrap();
        let net = FlowNetwork::new(flowdir, D8Encoding::Esri);
        assert_eq!(net.downstream(2), Some(1));
        assert_eq!(net.downstream(1), None);
        assert_eq!(net.outlets(), vec![1]);

        // draining off the grid
        let flowdir = Raster::from_vec(vec![16u8, 1], 1, 2).unwrap();
        let net = FlowNetwork::new(flowdir, D8Encoding::Esri);
        assert_eq!(net.outlets(), vec![0, 1]);
    }

    #[test]
    fn test_layer_alignment() {
        let net = network();
        let bad: Raster<u32> = Raster::new(2, 3);
        assert!(matches!(net.clone().with_basins(bad), Err(Error::SizeMismatch { .. })));

        let shifted: Raster<f64> = Raster::new(3, 3).with_transform(GeoTransform::new(1.0, 3.0, 1.0, -1.0));
        assert!(matches!(net.clone().with_uparea(shifted), Err(Error::GridMismatch { .. })));

        let ok: Raster<f64> = Raster::new(3, 3).with_transform(*net.transform());
        assert!(net.with_uparea(ok).is_ok());
    }

    #[test]
    fn test_from_dataset() {
        let gt = GeoTransform::new(0.0, 3.0, 1.0, -1.0);
        let flw = Raster::from_vec(vec![4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 1.0, 1.0, 0.0], 3, 3)
            .unwrap()
            .with_transform(gt);
        let bas = Raster::from_vec(vec![7.0; 9], 3, 3).unwrap().with_transform(gt);
        let ds = RasterDataset::new()
            .with_layer("flwdir", flw)
            .unwrap()
            .with_layer("basins", bas)
            .unwrap();

        let net = FlowNetwork::from_dataset(&ds, &LayerNames::default(), D8Encoding::Esri).unwrap();
        assert_eq!(net.basins().unwrap().get(1, 1).unwrap(), 7);
        assert!(net.uparea().is_none());
        assert_eq!(net.outlets(), vec![8]);

        let empty = RasterDataset::new();
        assert!(matches!(
            FlowNetwork::from_dataset(&empty, &LayerNames::default(), D8Encoding::Esri),
            Err(Error::MissingLayer(_))
        ));
    }
}
