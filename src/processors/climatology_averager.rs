use crate::config::RunConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{
    ClimatologyRecord, GridSizing, MissingValuePolicy, MonthlyTable, PointSet, StationCoord,
    StationKey,
};
use crate::processors::diagnostics::{DiagnosticReport, Stage};
use crate::processors::point_rasterizer::{PointRasterizer, RasterOutput};
use crate::readers::{MonthlyTableReader, TextSource};
use crate::utils::constants::{CELL_SIZE, CLIMATOLOGY_ATTRIBUTE};
use crate::utils::filename::climatology_file_name;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Running (sum, count) of the twelve calendar months of one station
type MonthAccumulators = [(f64, usize); 12];

/// Averages each calendar month across every year of the merged table and
/// rasterizes the twelve mean surfaces.
pub struct ClimatologyAverager {
    missing: MissingValuePolicy,
    rasterizer: PointRasterizer,
    reader: MonthlyTableReader,
}

impl ClimatologyAverager {
    pub fn new(missing: MissingValuePolicy, cell_size: f64, sizing: GridSizing) -> Self {
        Self {
            missing,
            rasterizer: PointRasterizer::new(missing, cell_size, sizing).for_stage(Stage::Climatology),
            reader: MonthlyTableReader::new(missing).for_stage(Stage::Climatology),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        let source = TextSource::new()
            .with_encoding(&config.input_encoding)
            .with_mmap(config.use_mmap);

        let mut averager = Self::new(
            config.missing_values(),
            config.cell_size,
            config.grid_sizing.climatology(),
        );
        averager.rasterizer = averager.rasterizer.with_max_workers(config.max_workers);
        averager.reader = averager.reader.with_source(source);
        averager
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.rasterizer = self.rasterizer.with_max_workers(max_workers);
        self
    }

    /// Coordinate column names of merged tables read from disk
    pub fn with_coordinate_fields(mut self, lon_field: &str, lat_field: &str) -> Self {
        self.reader = self.reader.with_coordinate_fields(lon_field, lat_field);
        self
    }

    /// One record per station and calendar month, ordered by (lon, lat, month)
    pub fn averages(&self, table: &MonthlyTable) -> Vec<ClimatologyRecord> {
        let mut groups: BTreeMap<StationKey, MonthAccumulators> = BTreeMap::new();

        for (station, row) in table.stations().iter().zip(table.rows()) {
            let accumulators = groups.entry(station.key()).or_insert([(0.0, 0); 12]);
            for (key, value) in table.columns().iter().zip(row) {
                if let Some(value) = self.missing.observed(*value) {
                    let slot = &mut accumulators[(key.month - 1) as usize];
                    slot.0 += value;
                    slot.1 += 1;
                }
            }
        }

        groups
            .into_iter()
            .flat_map(|(key, accumulators)| {
                let station = StationCoord::from_key(key);
                accumulators
                    .into_iter()
                    .zip(1u32..)
                    .map(move |((sum, count), month)| {
                        ClimatologyRecord::from_sum(station, month, sum, count)
                    })
            })
            .collect()
    }

    /// Stations with a defined mean for `month`, as single-attribute points
    pub fn month_points(records: &[ClimatologyRecord], month: u32) -> PointSet {
        PointSet::from_values(
            CLIMATOLOGY_ATTRIBUTE,
            records
                .iter()
                .filter(|r| r.month == month)
                .filter_map(|r| r.mean.map(|mean| (r.station, mean))),
        )
    }

    /// Write the twelve `Monthly_Avg_Rain_<MM>_<MonthName>.tif` rasters.
    ///
    /// A month without any contributing station is reported and skipped.
    pub fn rasterize(
        &self,
        table: &MonthlyTable,
        output_dir: &Path,
    ) -> Result<(Vec<RasterOutput>, DiagnosticReport)> {
        let records = self.averages(table);
        let point_sets: Vec<PointSet> = (1..=12)
            .map(|month| Self::month_points(&records, month))
            .collect();

        let (outputs, report) = self.rasterizer.run_parallel(point_sets.len(), |index| {
            let month = index as u32 + 1;
            let points = &point_sets[index];
            if points.is_empty() {
                return Err(ProcessingError::EmptyResult(format!(
                    "No station has an observation for {}",
                    climatology_file_name(month)
                )));
            }
            self.rasterizer
                .write_field(points, 0, &output_dir.join(climatology_file_name(month)))
        })?;

        info!(
            "Wrote {} climatology rasters to {}",
            outputs.len(),
            output_dir.display()
        );
        Ok((outputs, report))
    }

    /// Read a merged table from disk and rasterize its climatology
    pub fn rasterize_file(
        &self,
        path: &Path,
        output_dir: &Path,
    ) -> Result<(Vec<RasterOutput>, DiagnosticReport)> {
        let (table, mut report) = self.reader.read_table(path)?;
        let (outputs, raster_report) = self.rasterize(&table, output_dir)?;
        report.merge(raster_report);
        Ok((outputs, report))
    }
}

impl Default for ClimatologyAverager {
    fn default() -> Self {
        Self::new(MissingValuePolicy::default(), CELL_SIZE, GridSizing::Ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonthKey;
    use crate::processors::diagnostics::DiagnosticKind;
    use tempfile::TempDir;

    fn merged(stations: Vec<StationCoord>, columns: &[&str], rows: Vec<Vec<f64>>) -> MonthlyTable {
        let columns = columns.iter().map(|c| MonthKey::parse(c).unwrap()).collect();
        MonthlyTable::new(None, stations, columns, rows).unwrap()
    }

    #[test]
    fn test_mean_excludes_sentinel() {
        let table = merged(
            vec![StationCoord::new(121.0, 24.0)],
            &["199801", "199901", "200001"],
            vec![vec![10.0, -99.9, 20.0]],
        );
        let records = ClimatologyAverager::default().averages(&table);

        assert_eq!(records.len(), 12);
        assert_eq!(records[0].month, 1);
        assert_eq!(records[0].mean, Some(15.0));
        assert_eq!(records[0].observations, 2);
        assert_eq!(records[1].mean, None);
    }

    #[test]
    fn test_groups_sorted_by_coordinates() {
        let table = merged(
            vec![StationCoord::new(122.0, 24.0), StationCoord::new(121.0, 25.0)],
            &["200001"],
            vec![vec![1.0], vec![2.0]],
        );
        let records = ClimatologyAverager::default().averages(&table);
        assert_eq!(records[0].station, StationCoord::new(121.0, 25.0));
        assert_eq!(records[12].station, StationCoord::new(122.0, 24.0));
    }

    #[test]
    fn test_repeated_station_rows_are_pooled() {
        let table = merged(
            vec![StationCoord::new(121.0, 24.0), StationCoord::new(121.0, 24.0)],
            &["200001"],
            vec![vec![4.0], vec![8.0]],
        );
        let records = ClimatologyAverager::default().averages(&table);
        assert_eq!(records.len(), 12);
        assert_eq!(records[0].mean, Some(6.0));
    }

    #[test]
    fn test_rasterize_skips_empty_months() -> Result<()> {
        let dir = TempDir::new()?;
        let table = merged(
            vec![StationCoord::new(121.0, 24.0), StationCoord::new(121.1, 24.1)],
            &["199801", "199901"],
            vec![vec![10.0, 20.0], vec![-99.9, 3.0]],
        );

        let (outputs, report) = ClimatologyAverager::default()
            .with_max_workers(2)
            .rasterize(&table, dir.path())?;

        assert_eq!(outputs.len(), 1);
        assert_eq!(
            outputs[0].path,
            dir.path().join("Monthly_Avg_Rain_01_January.tif")
        );
        assert_eq!(outputs[0].field, "RAIN_AVG");
        assert_eq!(outputs[0].data_cells, 2);
        assert_eq!(report.count(DiagnosticKind::EmptyResult), 11);
        Ok(())
    }
}
