use crate::error::Result;
use crate::processors::diagnostics::DiagnosticReport;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a pipeline run produced, serialized as `run_report.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub monthly_tables: Vec<PathBuf>,
    pub merged_table: Option<PathBuf>,
    pub monthly_rasters: Vec<PathBuf>,
    pub climatology_rasters: Vec<PathBuf>,
    pub diagnostics: DiagnosticReport,
}

impl RunReport {
    pub fn output_count(&self) -> usize {
        self.monthly_tables.len()
            + usize::from(self.merged_table.is_some())
            + self.monthly_rasters.len()
            + self.climatology_rasters.len()
    }
}

pub struct ReportWriter;

impl ReportWriter {
    pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;
        info!("Run report written to {}", path.display());
        Ok(())
    }

    pub fn read_report(path: &Path) -> Result<RunReport> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::diagnostics::{Diagnostic, DiagnosticKind, Stage};
    use tempfile::TempDir;

    #[test]
    fn test_report_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("run_report.json");

        let mut report = RunReport {
            merged_table: Some(PathBuf::from("out/monthly_rainfall_merged.csv")),
            ..RunReport::default()
        };
        report.diagnostics.push(Diagnostic::new(
            Stage::Merge,
            DiagnosticKind::RowMismatch,
            "2 rows vs 3",
        ));

        ReportWriter::write_report(&report, &path)?;
        let read = ReportWriter::read_report(&path)?;

        assert_eq!(read.output_count(), 1);
        assert_eq!(read.diagnostics.count(DiagnosticKind::RowMismatch), 1);
        Ok(())
    }
}
