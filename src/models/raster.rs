use crate::models::StationCoord;
use serde::{Deserialize, Serialize};

/// Slack applied before rounding a cell count up, so that an extent which is
/// an exact multiple of the cell size does not gain a cell from float noise.
const DIMENSION_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = StationCoord>,
    {
        coords.into_iter().fold(None, |bbox, c| {
            Some(match bbox {
                None => BoundingBox {
                    min_lon: c.lon,
                    max_lon: c.lon,
                    min_lat: c.lat,
                    max_lat: c.lat,
                },
                Some(b) => BoundingBox {
                    min_lon: b.min_lon.min(c.lon),
                    max_lon: b.max_lon.max(c.lon),
                    min_lat: b.min_lat.min(c.lat),
                    max_lat: b.max_lat.max(c.lat),
                },
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

/// How many cells cover an extent.
///
/// `Ceiling` is used by default everywhere. `Truncate` and `TruncatePlusOne`
/// reproduce the per-month and climatology rasters of the legacy scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridSizing {
    /// `ceil(extent / cell)`, at least one cell
    Ceiling,
    /// `trunc(extent / cell)`, may be zero
    Truncate,
    /// `trunc(extent / cell) + 1`
    TruncatePlusOne,
}

impl GridSizing {
    pub fn cell_count(&self, extent: f64, cell_size: f64) -> usize {
        let ratio = (extent / cell_size).max(0.0);
        match self {
            GridSizing::Ceiling => ((ratio - DIMENSION_EPSILON).ceil() as usize).max(1),
            GridSizing::Truncate => ratio.trunc() as usize,
            GridSizing::TruncatePlusOne => ratio.trunc() as usize + 1,
        }
    }

    /// Whether a point on the closing edge of the box is pulled into the last cell
    fn clamps_closing_edge(&self) -> bool {
        matches!(self, GridSizing::Ceiling)
    }
}

/// Georeferencing of a north-up grid: origin is (min lon, max lat)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub origin_lon: f64,
    pub origin_lat: f64,
    pub cell_size: f64,
    pub width: usize,
    pub height: usize,
    pub sizing: GridSizing,
}

impl GridSpec {
    /// `None` when the extent is not finite or the sizing policy yields an empty grid
    pub fn from_bounds(bbox: &BoundingBox, cell_size: f64, sizing: GridSizing) -> Option<Self> {
        if !(bbox.width().is_finite() && bbox.height().is_finite() && cell_size > 0.0) {
            return None;
        }
        let width = sizing.cell_count(bbox.width(), cell_size);
        let height = sizing.cell_count(bbox.height(), cell_size);
        if width == 0 || height == 0 {
            return None;
        }
        width.checked_mul(height)?;

        Some(Self {
            origin_lon: bbox.min_lon,
            origin_lat: bbox.max_lat,
            cell_size,
            width,
            height,
            sizing,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// `(row, col)` of the cell containing the coordinate
    pub fn cell_of(&self, coord: StationCoord) -> Option<(usize, usize)> {
        let col = self.index_along((coord.lon - self.origin_lon) / self.cell_size, self.width)?;
        let row = self.index_along((self.origin_lat - coord.lat) / self.cell_size, self.height)?;
        Some((row, col))
    }

    fn index_along(&self, offset: f64, cells: usize) -> Option<usize> {
        if !offset.is_finite() || offset < 0.0 {
            return None;
        }
        let index = offset.floor() as usize;
        if index < cells {
            Some(index)
        } else if self.sizing.clamps_closing_edge() {
            Some(cells - 1)
        } else {
            None
        }
    }

    /// GDAL-style affine transform `(x0, dx, 0, y0, 0, -dy)`
    pub fn geo_transform(&self) -> [f64; 6] {
        [
            self.origin_lon,
            self.cell_size,
            0.0,
            self.origin_lat,
            0.0,
            -self.cell_size,
        ]
    }
}

/// A single-band `f32` raster, row-major from the north-west corner
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub spec: GridSpec,
    pub nodata: f64,
    cells: Vec<f32>,
}

impl RasterGrid {
    pub fn filled(spec: GridSpec, nodata: f64) -> Self {
        Self {
            spec,
            nodata,
            cells: vec![nodata as f32; spec.cell_count()],
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let index = row * self.spec.width + col;
        self.cells[index] = value as f32;
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.cells[row * self.spec.width + col]
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn width(&self) -> usize {
        self.spec.width
    }

    pub fn height(&self) -> usize {
        self.spec.height
    }

    pub fn data_cell_count(&self) -> usize {
        let nodata = self.nodata as f32;
        self.cells.iter().filter(|&&c| c != nodata).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> BoundingBox {
        BoundingBox {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    #[test]
    fn test_cell_count_policies() {
        let cell = 0.0083;
        assert_eq!(GridSizing::Ceiling.cell_count(0.0, cell), 1);
        assert_eq!(GridSizing::Truncate.cell_count(0.0, cell), 0);
        assert_eq!(GridSizing::TruncatePlusOne.cell_count(0.0, cell), 1);

        assert_eq!(GridSizing::Ceiling.cell_count(0.02, cell), 3);
        assert_eq!(GridSizing::Truncate.cell_count(0.02, cell), 2);
        assert_eq!(GridSizing::TruncatePlusOne.cell_count(0.02, cell), 3);

        // exact multiple does not gain a cell
        assert_eq!(GridSizing::Ceiling.cell_count(4.0 * cell, cell), 4);
    }

    #[test]
    fn test_non_finite_extent_has_no_grid() {
        let cell = 0.0083;
        let unbounded = bbox(121.0, f64::INFINITY, 24.0, 24.5);
        assert_eq!(GridSpec::from_bounds(&unbounded, cell, GridSizing::Ceiling), None);
        let nan = bbox(f64::NAN, 121.0, 24.0, 24.5);
        assert_eq!(GridSpec::from_bounds(&nan, cell, GridSizing::TruncatePlusOne), None);
    }

    #[test]
    fn test_degenerate_extent_with_truncation_is_empty() {
        let degenerate = bbox(121.0, 121.0, 24.0, 24.0);
        assert!(GridSpec::from_bounds(&degenerate, 0.0083, GridSizing::Truncate).is_none());

        let spec = GridSpec::from_bounds(&degenerate, 0.0083, GridSizing::Ceiling).unwrap();
        assert_eq!((spec.width, spec.height), (1, 1));
        assert_eq!(spec.cell_of(StationCoord::new(121.0, 24.0)), Some((0, 0)));
    }

    #[test]
    fn test_cell_of_north_up() {
        let spec = GridSpec::from_bounds(&bbox(0.0, 1.0, 0.0, 1.0), 0.25, GridSizing::Ceiling).unwrap();
        assert_eq!((spec.width, spec.height), (4, 4));

        // north-west corner
        assert_eq!(spec.cell_of(StationCoord::new(0.0, 1.0)), Some((0, 0)));
        // south-east corner is clamped into the last cell
        assert_eq!(spec.cell_of(StationCoord::new(1.0, 0.0)), Some((3, 3)));
        assert_eq!(spec.cell_of(StationCoord::new(0.3, 0.6)), Some((1, 1)));
        assert_eq!(spec.cell_of(StationCoord::new(-0.1, 0.5)), None);
    }

    #[test]
    fn test_truncated_grid_drops_closing_edge() {
        let spec =
            GridSpec::from_bounds(&bbox(0.0, 1.0, 0.0, 1.0), 0.25, GridSizing::Truncate).unwrap();
        assert_eq!(spec.cell_of(StationCoord::new(1.0, 0.5)), None);
    }

    #[test]
    fn test_raster_fill_and_set() {
        let spec = GridSpec::from_bounds(&bbox(0.0, 1.0, 0.0, 1.0), 0.5, GridSizing::Ceiling).unwrap();
        let mut grid = RasterGrid::filled(spec, -99.9);
        assert!(grid.cells().iter().all(|&c| c == -99.9f32));

        grid.set(1, 0, 4.5);
        assert_eq!(grid.get(1, 0), 4.5);
        assert_eq!(grid.data_cell_count(), 1);
        assert_eq!(spec.geo_transform(), [0.0, 0.5, 0.0, 1.0, 0.0, -0.5]);
    }
}
