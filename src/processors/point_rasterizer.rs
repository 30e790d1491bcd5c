use crate::config::{RunConfig, SchemaMode};
use crate::error::{ProcessingError, Result};
use crate::models::{GridSizing, GridSpec, MissingValuePolicy, PointSet, RasterGrid};
use crate::processors::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Stage};
use crate::readers::{PointReader, SchemaDetector, TextSource};
use crate::utils::constants::CELL_SIZE;
use crate::utils::filename::raster_file_name;
use crate::writers::GeoTiffWriter;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One raster file written by the rasterizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterOutput {
    pub field: String,
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub data_cells: usize,
}

/// Stamps point values into fixed-resolution north-up grids.
///
/// Every cell starts at the sentinel; points carrying a value overwrite their
/// cell in input order, so the last point in a cell wins.
pub struct PointRasterizer {
    missing: MissingValuePolicy,
    cell_size: f64,
    sizing: GridSizing,
    max_workers: usize,
    stage: Stage,
    reader: PointReader,
    detector: SchemaDetector,
    writer: GeoTiffWriter,
}

impl PointRasterizer {
    pub fn new(missing: MissingValuePolicy, cell_size: f64, sizing: GridSizing) -> Self {
        Self {
            missing,
            cell_size,
            sizing,
            max_workers: num_cpus::get(),
            stage: Stage::Rasterize,
            reader: PointReader::new(missing),
            detector: SchemaDetector::default(),
            writer: GeoTiffWriter::new(),
        }
    }

    /// Per-month rasterizer configured from a run
    pub fn from_config(config: &RunConfig) -> Self {
        let source = TextSource::new()
            .with_encoding(&config.input_encoding)
            .with_mmap(config.use_mmap);

        Self::new(
            config.missing_values(),
            config.cell_size,
            config.grid_sizing.monthly(),
        )
        .with_max_workers(config.max_workers)
        .with_detector(SchemaDetector::from_config(config))
        .with_source(source)
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_sizing(mut self, sizing: GridSizing) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_detector(mut self, detector: SchemaDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_source(mut self, source: TextSource) -> Self {
        self.reader = PointReader::new(self.missing).with_source(source);
        self
    }

    /// Stage that diagnostics are attributed to
    pub fn for_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    /// Grid over the bounding box of every point in the set
    pub fn grid_spec(&self, points: &PointSet) -> Result<GridSpec> {
        let bbox = points
            .bounding_box()
            .ok_or_else(|| ProcessingError::EmptyResult("Point set is empty".to_string()))?;

        GridSpec::from_bounds(&bbox, self.cell_size, self.sizing).ok_or_else(|| {
            ProcessingError::EmptyResult(format!(
                "{:?} sizing gives an empty grid for extent {:.6} x {:.6}",
                self.sizing,
                bbox.width(),
                bbox.height()
            ))
        })
    }

    pub fn rasterize(
        &self,
        points: &PointSet,
        field_index: usize,
    ) -> Result<(RasterGrid, DiagnosticReport)> {
        let spec = self.grid_spec(points)?;
        let mut grid = RasterGrid::filled(spec, self.missing.sentinel);
        let mut report = DiagnosticReport::new();

        for (coord, value) in points.values_for(field_index) {
            match spec.cell_of(coord) {
                Some((row, col)) => grid.set(row, col, value),
                None => report.push(Diagnostic::new(
                    self.stage,
                    DiagnosticKind::DroppedPoint,
                    format!(
                        "{} outside the {}x{} grid for '{}'",
                        coord,
                        spec.width,
                        spec.height,
                        points.fields.get(field_index).map_or("", String::as_str)
                    ),
                )),
            }
        }

        Ok((grid, report))
    }

    /// Rasterize one field and write it to `path`
    pub fn write_field(
        &self,
        points: &PointSet,
        field_index: usize,
        path: &Path,
    ) -> Result<(RasterOutput, DiagnosticReport)> {
        let (grid, report) = self.rasterize(points, field_index)?;
        self.writer.write_raster(&grid, path)?;

        let output = RasterOutput {
            field: points.fields.get(field_index).cloned().unwrap_or_default(),
            path: path.to_path_buf(),
            width: grid.width(),
            height: grid.height(),
            data_cells: grid.data_cell_count(),
        };
        info!(
            "Raster {} ({}x{}, {} data cells)",
            output.path.display(),
            output.width,
            output.height,
            output.data_cells
        );
        Ok((output, report))
    }

    /// Run `task` for every index on a pool of `max_workers` threads.
    ///
    /// Recoverable failures become diagnostics; anything else aborts.
    pub fn run_parallel<F>(
        &self,
        count: usize,
        task: F,
    ) -> Result<(Vec<RasterOutput>, DiagnosticReport)>
    where
        F: Fn(usize) -> Result<(RasterOutput, DiagnosticReport)> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let results: Vec<Result<(RasterOutput, DiagnosticReport)>> =
            pool.install(|| (0..count).into_par_iter().map(&task).collect());

        let mut outputs = Vec::with_capacity(count);
        let mut report = DiagnosticReport::new();
        for result in results {
            match result {
                Ok((output, task_report)) => {
                    report.merge(task_report);
                    outputs.push(output);
                }
                Err(ProcessingError::EmptyResult(message)) => {
                    report.push(Diagnostic::new(self.stage, DiagnosticKind::EmptyResult, message));
                }
                Err(e) if e.is_recoverable() => {
                    report.push(Diagnostic::new(self.stage, DiagnosticKind::ParseError, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        Ok((outputs, report))
    }

    /// One `<field>.tif` per attribute field, built in parallel
    pub fn rasterize_all(
        &self,
        points: &PointSet,
        output_dir: &Path,
    ) -> Result<(Vec<RasterOutput>, DiagnosticReport)> {
        if points.is_empty() {
            return Err(ProcessingError::EmptyResult(
                "No points with valid coordinates".to_string(),
            ));
        }
        if points.fields.is_empty() {
            return Err(ProcessingError::EmptyResult(
                "No attribute fields besides the coordinates".to_string(),
            ));
        }

        // Fails early, before spawning work, when the grid itself is empty
        self.grid_spec(points)?;

        let (targets, mut report) = self.raster_targets(points, output_dir);
        let (outputs, raster_report) = self.run_parallel(targets.len(), |task| {
            let (index, path) = &targets[task];
            self.write_field(points, *index, path)
        })?;
        report.merge(raster_report);
        Ok((outputs, report))
    }

    /// Output path per field, in header order.
    ///
    /// Fields sharing an output file are collapsed onto the last of them,
    /// so no two parallel tasks write the same file.
    fn raster_targets(
        &self,
        points: &PointSet,
        output_dir: &Path,
    ) -> (Vec<(usize, PathBuf)>, DiagnosticReport) {
        let mut report = DiagnosticReport::new();
        let mut last_by_file: HashMap<String, usize> = HashMap::new();

        for (index, field) in points.fields.iter().enumerate() {
            let file_name = raster_file_name(field);
            if let Some(previous) = last_by_file.insert(file_name.clone(), index) {
                report.push(Diagnostic::new(
                    self.stage,
                    DiagnosticKind::DuplicateColumn,
                    format!(
                        "Field '{}' (column {}) and '{}' (column {}) both map to {}; keeping the later one",
                        points.fields[previous],
                        previous + 1,
                        field,
                        index + 1,
                        file_name
                    ),
                ));
            }
        }

        let targets = points
            .fields
            .iter()
            .enumerate()
            .filter_map(|(index, field)| {
                let file_name = raster_file_name(field);
                (last_by_file.get(&file_name) == Some(&index))
                    .then(|| (index, output_dir.join(file_name)))
            })
            .collect();

        (targets, report)
    }

    /// Read a delimited point file and rasterize every attribute field
    pub fn rasterize_file(
        &self,
        path: &Path,
        output_dir: &Path,
        mode: SchemaMode,
    ) -> Result<(Vec<RasterOutput>, DiagnosticReport)> {
        let text = self.reader.read_text(path)?;
        match mode {
            SchemaMode::Detect => self.rasterize_detected(&text, path, output_dir),
            SchemaMode::BruteForce => self.rasterize_brute_force(&text, path, output_dir),
        }
    }

    fn rasterize_detected(
        &self,
        text: &str,
        path: &Path,
        output_dir: &Path,
    ) -> Result<(Vec<RasterOutput>, DiagnosticReport)> {
        let header = PointReader::header_line(text)
            .ok_or_else(|| ProcessingError::Parse(format!("{} is empty", path.display())))?;
        let schema = self.detector.detect(header)?;
        debug!("Detected {} in {}", schema, path.display());

        let (points, mut report) = self.reader.parse(text, path, &schema)?;
        let (outputs, raster_report) = self.rasterize_all(&points, output_dir)?;
        report.merge(raster_report);
        Ok((outputs, report))
    }

    /// Try every schema candidate in order and keep the first full success
    fn rasterize_brute_force(
        &self,
        text: &str,
        path: &Path,
        output_dir: &Path,
    ) -> Result<(Vec<RasterOutput>, DiagnosticReport)> {
        let mut rejected = 0usize;
        // first empty-grid failure, reported instead of a schema failure
        let mut empty: Option<ProcessingError> = None;

        for schema in self.detector.candidates() {
            let attempt = self
                .reader
                .parse(text, path, &schema)
                .and_then(|(points, report)| {
                    self.rasterize_all(&points, output_dir)
                        .map(|(outputs, raster_report)| (outputs, report, raster_report))
                });

            match attempt {
                Ok((outputs, mut report, raster_report)) => {
                    report.merge(raster_report);
                    if rejected > 0 {
                        report.push(
                            Diagnostic::new(
                                self.stage,
                                DiagnosticKind::ParseError,
                                format!("{} schema combinations rejected before {}", rejected, schema),
                            )
                            .with_file(path),
                        );
                    }
                    return Ok((outputs, report));
                }
                Err(e) if e.is_recoverable() => {
                    debug!("Schema {} rejected for {}: {}", schema, path.display(), e);
                    rejected += 1;
                    if empty.is_none() && matches!(e, ProcessingError::EmptyResult(_)) {
                        empty = Some(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(empty.unwrap_or_else(|| {
            ProcessingError::Parse(format!(
                "No delimiter and coordinate field combination works for {}",
                path.display()
            ))
        }))
    }
}

impl Default for PointRasterizer {
    fn default() -> Self {
        Self::new(MissingValuePolicy::default(), CELL_SIZE, GridSizing::Ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PointRecord, StationCoord};
    use tempfile::TempDir;
    use tiff::decoder::{Decoder, DecodingResult};

    fn point(lon: f64, lat: f64, value: Option<f64>) -> PointRecord {
        PointRecord::new(StationCoord::new(lon, lat), vec![value])
    }

    fn point_set(points: Vec<PointRecord>) -> PointSet {
        let mut set = PointSet::new(vec!["V".to_string()]);
        for p in points {
            set.push(p);
        }
        set
    }

    #[test]
    fn test_all_unset_points_give_sentinel_grid() {
        let set = point_set(vec![
            point(121.0, 24.0, None),
            point(121.1, 24.1, None),
        ]);
        let (grid, _) = PointRasterizer::default().rasterize(&set, 0).unwrap();
        assert!(grid.cells().iter().all(|&c| c == -99.9_f32));
        assert_eq!(grid.data_cell_count(), 0);
    }

    #[test]
    fn test_single_point_is_one_cell() {
        let set = point_set(vec![point(121.0, 24.0, Some(7.0))]);
        let (grid, report) = PointRasterizer::default().rasterize(&set, 0).unwrap();
        assert!(report.is_empty());
        assert_eq!((grid.width(), grid.height()), (1, 1));
        assert_eq!(grid.get(0, 0), 7.0);
    }

    #[test]
    fn test_only_the_point_cell_is_set() {
        let set = point_set(vec![
            point(121.0, 24.0, None),
            point(121.05, 24.05, Some(3.5)),
        ]);
        let (grid, _) = PointRasterizer::default().rasterize(&set, 0).unwrap();

        // the north-east point lands in the last column of the top row
        assert_eq!(grid.get(0, grid.width() - 1), 3.5);
        assert_eq!(grid.data_cell_count(), 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let set = point_set(vec![
            point(121.0, 24.0, Some(1.0)),
            point(121.0, 24.0, Some(2.0)),
        ]);
        let (grid, _) = PointRasterizer::default().rasterize(&set, 0).unwrap();
        assert_eq!(grid.get(0, 0), 2.0);
    }

    #[test]
    fn test_legacy_truncate_drops_edge_points() {
        let set = point_set(vec![
            point(121.0, 24.02, Some(1.0)),
            point(121.02, 24.0, Some(2.0)),
        ]);
        let rasterizer = PointRasterizer::default().with_sizing(GridSizing::Truncate);
        let (grid, report) = rasterizer.rasterize(&set, 0).unwrap();

        assert_eq!((grid.width(), grid.height()), (2, 2));
        assert_eq!(grid.get(0, 0), 1.0);
        assert_eq!(report.count(DiagnosticKind::DroppedPoint), 1);
    }

    #[test]
    fn test_legacy_truncate_single_point_is_empty() {
        let set = point_set(vec![point(121.0, 24.0, Some(1.0))]);
        let rasterizer = PointRasterizer::default().with_sizing(GridSizing::Truncate);
        let result = rasterizer.rasterize(&set, 0);
        assert!(matches!(result, Err(ProcessingError::EmptyResult(_))));
    }

    #[test]
    fn test_rasterize_file_writes_one_raster_per_field() -> Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("points.csv");
        std::fs::write(
            &input,
            "LON,LAT,199801,199802\n121.0,24.0,10,-99.9\n121.01,24.01,x,4\nbad\n",
        )?;

        let rasterizer = PointRasterizer::default().with_max_workers(2);
        let (outputs, report) = rasterizer.rasterize_file(&input, dir.path(), SchemaMode::Detect)?;

        let names: Vec<&str> = outputs.iter().map(|o| o.field.as_str()).collect();
        assert_eq!(names, vec!["199801", "199802"]);
        assert!(dir.path().join("199801.tif").is_file());
        assert_eq!(outputs[0].data_cells, 1);
        assert_eq!(report.count(DiagnosticKind::RowSkipped), 1);
        Ok(())
    }

    #[test]
    fn test_repeated_field_names_keep_the_last_column() -> Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("points.csv");
        let values: Vec<String> = (0..8).map(|v| v.to_string()).collect();
        std::fs::write(
            &input,
            format!("LON,LAT,{}\n121.0,24.0,{}\n", vec!["V"; 8].join(","), values.join(",")),
        )?;

        let rasterizer = PointRasterizer::default().with_max_workers(8);
        for _ in 0..20 {
            let (outputs, report) =
                rasterizer.rasterize_file(&input, dir.path(), SchemaMode::Detect)?;
            assert_eq!(outputs.len(), 1);
            assert_eq!(report.count(DiagnosticKind::DuplicateColumn), 7);

            let mut decoder = Decoder::new(std::fs::File::open(dir.path().join("V.tif"))?)?;
            match decoder.read_image()? {
                DecodingResult::F32(cells) => assert_eq!(cells, vec![7.0]),
                _ => panic!("expected f32 raster"),
            }
        }
        Ok(())
    }

    #[test]
    fn test_sanitized_names_collide() {
        let mut set = PointSet::new(vec!["a/b".to_string(), "a_b".to_string(), "c".to_string()]);
        set.push(PointRecord::new(
            StationCoord::new(121.0, 24.0),
            vec![Some(1.0), Some(2.0), Some(3.0)],
        ));

        let dir = Path::new("out");
        let (targets, report) = PointRasterizer::default().raster_targets(&set, dir);

        assert_eq!(targets, vec![(1, dir.join("a_b.tif")), (2, dir.join("c.tif"))]);
        assert_eq!(report.count(DiagnosticKind::DuplicateColumn), 1);
    }

    #[test]
    fn test_brute_force_finds_semicolon_schema() -> Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("points.txt");
        std::fs::write(&input, "x;y;RAIN\n121.0;24.0;5\n")?;

        let (outputs, report) = PointRasterizer::default().rasterize_file(
            &input,
            dir.path(),
            SchemaMode::BruteForce,
        )?;

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].path, dir.path().join("RAIN.tif"));
        assert_eq!(report.count(DiagnosticKind::ParseError), 1);
        Ok(())
    }

    #[test]
    fn test_unknown_schema_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("points.csv");
        std::fs::write(&input, "A,B,C\n1,2,3\n")?;

        for mode in [SchemaMode::Detect, SchemaMode::BruteForce] {
            let result = PointRasterizer::default().rasterize_file(&input, dir.path(), mode);
            assert!(matches!(result, Err(ProcessingError::Parse(_))));
        }
        Ok(())
    }

    #[test]
    fn test_rasterizing_twice_is_identical() -> Result<()> {
        let dir = TempDir::new()?;
        let set = point_set(vec![
            point(121.0, 24.0, Some(1.25)),
            point(121.03, 24.02, Some(8.0)),
        ]);
        let rasterizer = PointRasterizer::default();

        let first = dir.path().join("a.tif");
        let second = dir.path().join("b.tif");
        rasterizer.write_field(&set, 0, &first)?;
        rasterizer.write_field(&set, 0, &second)?;

        assert_eq!(std::fs::read(&first)?, std::fs::read(&second)?);
        Ok(())
    }
}
