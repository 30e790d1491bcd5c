//! Single-band `f32` GeoTIFF output in EPSG:4326.
//!
//! The grid is georeferenced with `ModelPixelScale` and `ModelTiepoint`
//! (raster corner (0, 0) pinned to the grid origin), a GeoKey directory
//! declaring a geographic WGS84 model, and the `GDAL_NODATA` tag.

use crate::error::{ProcessingError, Result};
use crate::models::RasterGrid;
use crate::utils::constants::EPSG_WGS84;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

// GeoKey ids and values
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

pub struct GeoTiffWriter;

impl GeoTiffWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_raster(&self, grid: &RasterGrid, path: &Path) -> Result<()> {
        let width = u32::try_from(grid.width())
            .map_err(|_| ProcessingError::InvalidFormat(format!("Raster too wide: {}", grid.width())))?;
        let height = u32::try_from(grid.height())
            .map_err(|_| ProcessingError::InvalidFormat(format!("Raster too tall: {}", grid.height())))?;

        let [origin_lon, scale_x, _, origin_lat, _, scale_y] = grid.spec.geo_transform();
        let mut file = BufWriter::new(File::create(path)?);
        {
            let mut encoder = TiffEncoder::new(&mut file)?;
            let mut image = encoder.new_image::<colortype::Gray32Float>(width, height)?;

            image.encoder().write_tag(
                Tag::ModelPixelScaleTag,
                &[scale_x, -scale_y, 0.0][..],
            )?;
            image.encoder().write_tag(
                Tag::ModelTiepointTag,
                &[0.0, 0.0, 0.0, origin_lon, origin_lat, 0.0][..],
            )?;
            image
                .encoder()
                .write_tag(Tag::GeoKeyDirectoryTag, &geo_key_directory()[..])?;
            image
                .encoder()
                .write_tag(Tag::GdalNodata, nodata_text(grid.nodata).as_str())?;

            image.write_data(grid.cells())?;
        }
        file.flush()?;

        debug!(
            "Wrote {}x{} raster ({} data cells) to {}",
            width,
            height,
            grid.data_cell_count(),
            path.display()
        );
        Ok(())
    }
}

impl Default for GeoTiffWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Header (version 1.1.0, 3 keys) followed by the key entries
#[rustfmt::skip]
fn geo_key_directory() -> [u16; 16] {
    [
        1, 1, 0, 3,
        GT_MODEL_TYPE_GEO_KEY, 0, 1, MODEL_TYPE_GEOGRAPHIC,
        GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA,
        GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, EPSG_WGS84,
    ]
}

fn nodata_text(nodata: f64) -> String {
    nodata.to_string()
}
