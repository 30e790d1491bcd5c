use crate::config::RunConfig;
use crate::error::{ProcessingError, Result};
use crate::models::MonthlyTable;
use crate::processors::climatology_averager::ClimatologyAverager;
use crate::processors::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Stage};
use crate::processors::monthly_aggregator::MonthlyAggregator;
use crate::processors::point_rasterizer::{PointRasterizer, RasterOutput};
use crate::processors::year_merger::YearMerger;
use crate::readers::{MonthlyTableReader, TextSource};
use crate::utils::progress::ProgressReporter;
use crate::writers::{ReportWriter, RunReport, TableWriter};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runs aggregate, merge, rasterize and climatology in order from one config.
///
/// Each stage reads the complete output of the previous one from disk.
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn source(&self) -> TextSource {
        TextSource::new()
            .with_encoding(&self.config.input_encoding)
            .with_mmap(self.config.use_mmap)
    }

    /// Daily files of `input_dir` to `monthly/monthly_rainfall_<YYYY>.csv`
    pub fn aggregate(
        &self,
        progress: Option<&ProgressReporter>,
    ) -> Result<(Vec<PathBuf>, DiagnosticReport)> {
        info!("Aggregating daily files from {}", self.config.input_dir.display());
        let aggregator =
            MonthlyAggregator::new(self.config.missing_values()).with_source(self.source());

        let (tables, report) = aggregator.aggregate_directory(&self.config.input_dir, progress)?;
        let written = MonthlyAggregator::write_tables(&tables, &self.config.monthly_dir())?;
        Ok((written, report))
    }

    /// Monthly directory to the merged table; `None` when nothing was merged
    pub fn merge(&self) -> Result<(Option<(PathBuf, MonthlyTable)>, DiagnosticReport)> {
        info!("Merging monthly tables from {}", self.config.monthly_dir().display());
        let reader = MonthlyTableReader::new(self.config.missing_values()).with_source(self.source());
        let merger = YearMerger::new(self.config.merge_mode, self.config.missing_values());

        let (merged, report) = merger.merge_directory(&self.config.monthly_dir(), &reader)?;
        let merged = match merged {
            Some(table) => {
                let path = self.config.merged_file();
                TableWriter::new().write_table(&table, &path)?;
                Some((path, table))
            }
            None => None,
        };
        Ok((merged, report))
    }

    /// One raster per month column of the merged table file
    pub fn rasterize_months(
        &self,
        merged_file: &Path,
    ) -> Result<(Vec<RasterOutput>, DiagnosticReport)> {
        info!("Rasterizing monthly totals from {}", merged_file.display());
        PointRasterizer::from_config(&self.config).rasterize_file(
            merged_file,
            &self.config.monthly_raster_dir(),
            self.config.schema_mode,
        )
    }

    pub fn climatology(&self, merged: &MonthlyTable) -> Result<(Vec<RasterOutput>, DiagnosticReport)> {
        info!("Computing monthly climatology");
        ClimatologyAverager::from_config(&self.config)
            .rasterize(merged, &self.config.climatology_raster_dir())
    }

    /// Full run. Writes `run_report.json` next to the other outputs.
    pub fn run(&self, progress: Option<&ProgressReporter>) -> Result<RunReport> {
        let mut report = RunReport {
            started_at: Some(Utc::now()),
            ..RunReport::default()
        };

        self.config.prepare_directories()?;

        let (monthly_tables, aggregate_report) = self.aggregate(progress)?;
        report.monthly_tables = monthly_tables;
        report.diagnostics.merge(aggregate_report);

        if let Some(p) = progress {
            p.set_message("Merging yearly tables...");
        }
        let (merged, merge_report) = self.merge()?;
        report.diagnostics.merge(merge_report);

        if let Some((merged_file, merged_table)) = merged {
            if let Some(p) = progress {
                p.set_message("Rasterizing monthly totals...");
            }
            match self.rasterize_months(&merged_file) {
                Ok((rasters, raster_report)) => {
                    report.monthly_rasters = rasters.into_iter().map(|r| r.path).collect();
                    report.diagnostics.merge(raster_report);
                }
                Err(e) if e.is_recoverable() => {
                    let kind = match e {
                        ProcessingError::EmptyResult(_) => DiagnosticKind::EmptyResult,
                        _ => DiagnosticKind::ParseError,
                    };
                    report.diagnostics.push(
                        Diagnostic::new(Stage::Rasterize, kind, e.to_string())
                            .with_file(&merged_file),
                    );
                }
                Err(e) => return Err(e),
            }

            if let Some(p) = progress {
                p.set_message("Rasterizing monthly climatology...");
            }
            let (rasters, climatology_report) = self.climatology(&merged_table)?;
            report.climatology_rasters = rasters.into_iter().map(|r| r.path).collect();
            report.diagnostics.merge(climatology_report);

            report.merged_table = Some(merged_file);
        }

        report.finished_at = Some(Utc::now());
        ReportWriter::write_report(&report, &self.config.run_report_file())?;

        info!(
            "Run finished: {} outputs, {} diagnostics",
            report.output_count(),
            report.diagnostics.len()
        );
        Ok(report)
    }
}
