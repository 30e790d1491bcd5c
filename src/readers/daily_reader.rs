use crate::error::{ProcessingError, Result};
use crate::models::{DailyTable, MissingValuePolicy, StationCoord};
use crate::processors::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Stage};
use crate::readers::TextSource;
use crate::utils::constants::{LAT_FIELD, LON_FIELD};
use std::path::Path;
use tracing::debug;

/// Reads one year of daily station observations (`LON`, `LAT`, `YYYYMMDD`...)
pub struct DailyReader {
    source: TextSource,
    missing: MissingValuePolicy,
}

impl DailyReader {
    pub fn new(missing: MissingValuePolicy) -> Self {
        Self {
            source: TextSource::new(),
            missing,
        }
    }

    pub fn with_source(mut self, source: TextSource) -> Self {
        self.source = source;
        self
    }

    pub fn read_table(&self, path: &Path) -> Result<(DailyTable, DiagnosticReport)> {
        let text = self.source.read_to_string(path)?;
        self.parse_table(&text, path)
    }

    /// Parse cleaned CSV text; `path` is only used in diagnostics
    pub fn parse_table(&self, text: &str, path: &Path) -> Result<(DailyTable, DiagnosticReport)> {
        let mut report = DiagnosticReport::new();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let lon_index = find_field(&headers, LON_FIELD, path)?;
        let lat_index = find_field(&headers, LAT_FIELD, path)?;

        // (header position, day key) of every date column
        let day_fields: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != lon_index && *i != lat_index)
            .filter_map(|(i, name)| {
                if is_day_key(name) {
                    Some((i, name.to_string()))
                } else {
                    debug!("Ignoring non-date column '{}' in {}", name, path.display());
                    None
                }
            })
            .collect();

        let mut stations = Vec::new();
        let mut values = Vec::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

            if record.len() != headers.len() {
                report.push(
                    Diagnostic::new(
                        Stage::Aggregate,
                        DiagnosticKind::RowSkipped,
                        format!("{} fields, header has {}", record.len(), headers.len()),
                    )
                    .with_file(path)
                    .with_line(line),
                );
                continue;
            }

            let lon = record[lon_index].parse::<f64>();
            let lat = record[lat_index].parse::<f64>();
            let (lon, lat) = match (lon, lat) {
                (Ok(lon), Ok(lat)) if lon.is_finite() && lat.is_finite() => (lon, lat),
                _ => {
                    report.push(
                        Diagnostic::new(
                            Stage::Aggregate,
                            DiagnosticKind::RowSkipped,
                            format!(
                                "Invalid coordinates '{}', '{}'",
                                &record[lon_index], &record[lat_index]
                            ),
                        )
                        .with_file(path)
                        .with_line(line),
                    );
                    continue;
                }
            };

            stations.push(StationCoord::new(lon, lat));
            values.push(
                day_fields
                    .iter()
                    .map(|(i, _)| self.missing.parse_cell(&record[*i]))
                    .collect(),
            );
        }

        let day_columns = day_fields.into_iter().map(|(_, name)| name).collect();
        let table = DailyTable::new(stations, day_columns, values)?;
        Ok((table, report))
    }
}

fn find_field(headers: &csv::StringRecord, field: &str, path: &Path) -> Result<usize> {
    headers.iter().position(|h| h == field).ok_or_else(|| {
        ProcessingError::Parse(format!(
            "Required column '{}' not found in {}",
            field,
            path.display()
        ))
    })
}

fn is_day_key(name: &str) -> bool {
    name.len() == 8 && name.bytes().all(|b| b.is_ascii_digit())
}
