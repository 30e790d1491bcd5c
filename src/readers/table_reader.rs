use crate::error::{ProcessingError, Result};
use crate::models::{MissingValuePolicy, MonthKey, MonthlyTable, StationCoord};
use crate::processors::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Stage};
use crate::readers::TextSource;
use crate::utils::constants::{LAT_FIELD, LON_FIELD};
use crate::utils::filename::{extract_year_from_path, is_monthly_table};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reads wide monthly tables: a yearly accumulation or the merged archive
pub struct MonthlyTableReader {
    source: TextSource,
    missing: MissingValuePolicy,
    lon_field: String,
    lat_field: String,
    stage: Stage,
}

impl MonthlyTableReader {
    pub fn new(missing: MissingValuePolicy) -> Self {
        Self {
            source: TextSource::new(),
            missing,
            lon_field: LON_FIELD.to_string(),
            lat_field: LAT_FIELD.to_string(),
            stage: Stage::Merge,
        }
    }

    pub fn with_source(mut self, source: TextSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_coordinate_fields(mut self, lon_field: &str, lat_field: &str) -> Self {
        self.lon_field = lon_field.to_string();
        self.lat_field = lat_field.to_string();
        self
    }

    /// Stage that diagnostics are attributed to
    pub fn for_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn read_table(&self, path: &Path) -> Result<(MonthlyTable, DiagnosticReport)> {
        let text = self.source.read_to_string(path)?;
        self.parse_table(&text, path)
    }

    pub fn parse_table(&self, text: &str, path: &Path) -> Result<(MonthlyTable, DiagnosticReport)> {
        let mut report = DiagnosticReport::new();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let lon_index = self.find_field(&headers, &self.lon_field, path)?;
        let lat_index = self.find_field(&headers, &self.lat_field, path)?;

        let mut seen = HashSet::new();
        let mut month_fields: Vec<(usize, MonthKey)> = Vec::new();
        for (i, name) in headers.iter().enumerate() {
            if i == lon_index || i == lat_index {
                continue;
            }
            match MonthKey::parse(name) {
                Ok(key) if seen.insert(key) => month_fields.push((i, key)),
                Ok(key) => report.push(
                    Diagnostic::new(
                        self.stage,
                        DiagnosticKind::DuplicateColumn,
                        format!("Column {} repeated, first occurrence kept", key),
                    )
                    .with_file(path),
                ),
                Err(e) => report.push(
                    Diagnostic::new(self.stage, DiagnosticKind::ParseError, e.to_string())
                        .with_file(path),
                ),
            }
        }

        let mut stations = Vec::new();
        let mut rows = Vec::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

            if record.len() != headers.len() {
                report.push(
                    Diagnostic::new(
                        self.stage,
                        DiagnosticKind::RowSkipped,
                        format!("{} fields, header has {}", record.len(), headers.len()),
                    )
                    .with_file(path)
                    .with_line(line),
                );
                continue;
            }

            match (
                record[lon_index].parse::<f64>(),
                record[lat_index].parse::<f64>(),
            ) {
                (Ok(lon), Ok(lat)) if lon.is_finite() && lat.is_finite() => {
                    stations.push(StationCoord::new(lon, lat));
                    rows.push(
                        month_fields
                            .iter()
                            .map(|(i, _)| {
                                self.missing.or_sentinel(self.missing.parse_cell(&record[*i]))
                            })
                            .collect(),
                    );
                }
                _ => report.push(
                    Diagnostic::new(
                        self.stage,
                        DiagnosticKind::RowSkipped,
                        format!(
                            "Invalid coordinates '{}', '{}'",
                            &record[lon_index], &record[lat_index]
                        ),
                    )
                    .with_file(path)
                    .with_line(line),
                ),
            }
        }

        let year = extract_year_from_path(path).ok();
        let columns = month_fields.into_iter().map(|(_, key)| key).collect();
        let table = MonthlyTable::new(year, stations, columns, rows)?;
        Ok((table, report))
    }

    /// Every `monthly_rainfall_*.csv` in `dir`, sorted by file name
    pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if is_monthly_table(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read every yearly table in `dir`; unreadable files are reported and skipped
    pub fn read_directory(&self, dir: &Path) -> Result<(Vec<MonthlyTable>, DiagnosticReport)> {
        let mut report = DiagnosticReport::new();
        let mut tables = Vec::new();

        for path in Self::discover(dir)? {
            info!("Reading monthly table {}", path.display());
            match self.read_table(&path) {
                Ok((table, table_report)) => {
                    report.merge(table_report);
                    tables.push(table);
                }
                Err(e) if e.is_input_failure() => {
                    report.push(
                        Diagnostic::new(self.stage, DiagnosticKind::ParseError, e.to_string())
                            .with_file(&path),
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok((tables, report))
    }

    fn find_field(&self, headers: &csv::StringRecord, field: &str, path: &Path) -> Result<usize> {
        headers.iter().position(|h| h == field).ok_or_else(|| {
            ProcessingError::Parse(format!(
                "Coordinate column '{}' not found in {}",
                field,
                path.display()
            ))
        })
    }
}
