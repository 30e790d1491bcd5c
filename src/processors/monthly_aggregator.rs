use crate::error::{ProcessingError, Result};
use crate::models::{DailyTable, MissingValuePolicy, MonthKey, MonthlyTable};
use crate::processors::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Stage};
use crate::readers::{DailyReader, TextSource};
use crate::utils::calendar::day_keys;
use crate::utils::filename::{extract_year_from_path, is_csv_file, monthly_table_file_name};
use crate::utils::progress::ProgressReporter;
use crate::writers::TableWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Collapses daily columns into monthly accumulated totals.
///
/// A month's total is the sum of its non-missing days. A month whose days
/// are all missing, or that has no day columns in the source at all, gets
/// the sentinel.
pub struct MonthlyAggregator {
    reader: DailyReader,
    missing: MissingValuePolicy,
}

impl MonthlyAggregator {
    pub fn new(missing: MissingValuePolicy) -> Self {
        Self {
            reader: DailyReader::new(missing),
            missing,
        }
    }

    pub fn with_source(mut self, source: TextSource) -> Self {
        self.reader = DailyReader::new(self.missing).with_source(source);
        self
    }

    pub fn aggregate(&self, table: &DailyTable, year: i32) -> Result<MonthlyTable> {
        let columns: Vec<MonthKey> = MonthKey::year_months(year).collect();

        // Day columns of each month that are present in the source
        let month_indices: Vec<Vec<usize>> = columns
            .iter()
            .map(|key| {
                day_keys(key.year, key.month)
                    .iter()
                    .filter_map(|day| table.column_index(day))
                    .collect()
            })
            .collect();

        for (key, indices) in columns.iter().zip(&month_indices) {
            if indices.is_empty() {
                debug!("No day columns for {}", key);
            }
        }

        let rows = (0..table.station_count())
            .map(|station| {
                let row = table.row(station);
                month_indices
                    .iter()
                    .map(|indices| self.accumulate(row, indices))
                    .collect()
            })
            .collect();

        MonthlyTable::new(Some(year), table.stations().to_vec(), columns, rows)
    }

    fn accumulate(&self, row: &[Option<f64>], indices: &[usize]) -> f64 {
        let mut observed = indices.iter().filter_map(|&i| row[i]).peekable();
        if observed.peek().is_none() {
            return self.missing.sentinel;
        }
        observed.sum()
    }

    /// Read and aggregate one `*_YYYY.csv` daily file
    pub fn aggregate_file(&self, path: &Path) -> Result<(MonthlyTable, DiagnosticReport)> {
        let year = extract_year_from_path(path)?;
        let (daily, report) = self.reader.read_table(path)?;
        let monthly = self.aggregate(&daily, year)?;
        info!(
            "Aggregated {} stations for {} from {}",
            monthly.station_count(),
            year,
            path.display()
        );
        Ok((monthly, report))
    }

    /// Aggregate every `*.csv` in `input_dir` in file-name order.
    ///
    /// Files whose name or content cannot be interpreted are reported and
    /// skipped. Fails only when the directory holds no CSV files at all.
    pub fn aggregate_directory(
        &self,
        input_dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<(Vec<MonthlyTable>, DiagnosticReport)> {
        let files = Self::discover(input_dir)?;
        if files.is_empty() {
            return Err(ProcessingError::NoInputFiles(input_dir.to_path_buf()));
        }

        let mut report = DiagnosticReport::new();
        let mut tables = Vec::new();

        for path in &files {
            if let Some(p) = progress {
                p.set_message(&format!("Aggregating {}", path.display()));
            }

            match self.aggregate_file(path) {
                Ok((table, file_report)) => {
                    report.merge(file_report);
                    tables.push(table);
                }
                Err(e) if e.is_input_failure() => {
                    report.push(
                        Diagnostic::new(Stage::Aggregate, DiagnosticKind::ParseError, e.to_string())
                            .with_file(path),
                    );
                }
                Err(e) => return Err(e),
            }

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        if tables.is_empty() {
            report.push(Diagnostic::new(
                Stage::Aggregate,
                DiagnosticKind::EmptyResult,
                format!("No usable daily files in {}", input_dir.display()),
            ));
        }

        Ok((tables, report))
    }

    /// Write each table as `monthly_rainfall_<YYYY>.csv` into `output_dir`
    pub fn write_tables(tables: &[MonthlyTable], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let writer = TableWriter::new();
        let mut written = Vec::with_capacity(tables.len());

        for table in tables {
            let year = table.year().ok_or_else(|| {
                ProcessingError::InvalidFormat("Monthly table without a year".to_string())
            })?;
            let path = output_dir.join(monthly_table_file_name(year));
            writer.write_table(table, &path)?;
            written.push(path);
        }

        Ok(written)
    }

    /// `*.csv` files in `dir`, sorted by name
    pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if is_csv_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
