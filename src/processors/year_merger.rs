use crate::config::MergeMode;
use crate::error::Result;
use crate::models::{MissingValuePolicy, MonthKey, MonthlyTable, StationCoord, StationKey};
use crate::processors::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Stage};
use crate::readers::MonthlyTableReader;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// Combines yearly monthly tables into one wide table with a column per
/// (year, month), in ascending order.
pub struct YearMerger {
    mode: MergeMode,
    missing: MissingValuePolicy,
}

impl YearMerger {
    pub fn new(mode: MergeMode, missing: MissingValuePolicy) -> Self {
        Self { mode, missing }
    }

    /// `None` when there is nothing to merge
    pub fn merge(
        &self,
        mut tables: Vec<MonthlyTable>,
    ) -> Result<(Option<MonthlyTable>, DiagnosticReport)> {
        let mut report = DiagnosticReport::new();

        if tables.is_empty() {
            report.push(Diagnostic::new(
                Stage::Merge,
                DiagnosticKind::EmptyResult,
                "No monthly tables to merge",
            ));
            return Ok((None, report));
        }

        tables.sort_by_key(|t| t.year());

        let (stations, columns) = match self.mode {
            MergeMode::Keyed => self.merge_keyed(&tables, &mut report),
            MergeMode::Positional => self.merge_positional(&tables, &mut report),
        };

        let keys: Vec<MonthKey> = columns.keys().copied().collect();
        let rows = (0..stations.len())
            .map(|row| columns.values().map(|column| column[row]).collect())
            .collect();

        let merged = MonthlyTable::new(None, stations, keys, rows)?;
        info!(
            "Merged {} yearly tables into {} stations x {} months",
            tables.len(),
            merged.station_count(),
            merged.columns().len()
        );
        Ok((Some(merged), report))
    }

    /// Join on station coordinates. Station order follows first appearance.
    fn merge_keyed(
        &self,
        tables: &[MonthlyTable],
        report: &mut DiagnosticReport,
    ) -> (Vec<StationCoord>, BTreeMap<MonthKey, Vec<f64>>) {
        let mut stations = Vec::new();
        let mut index: HashMap<StationKey, usize> = HashMap::new();

        // Global row of every table row; None for a repeated station
        let mut row_maps: Vec<Vec<Option<usize>>> = Vec::with_capacity(tables.len());
        for table in tables {
            let mut seen = HashSet::new();
            let mut row_map = Vec::with_capacity(table.station_count());

            for (row, station) in table.stations().iter().enumerate() {
                let key = station.key();
                if !seen.insert(key) {
                    report.push(Diagnostic::new(
                        Stage::Merge,
                        DiagnosticKind::DuplicateStation,
                        format!(
                            "Station {} repeated in {} (row {}), first occurrence kept",
                            station,
                            describe(table),
                            row
                        ),
                    ));
                    row_map.push(None);
                    continue;
                }

                let global = *index.entry(key).or_insert_with(|| {
                    stations.push(*station);
                    stations.len() - 1
                });
                row_map.push(Some(global));
            }
            row_maps.push(row_map);
        }

        let mut columns = BTreeMap::new();
        for (table, row_map) in tables.iter().zip(&row_maps) {
            for (c, key) in table.columns().iter().enumerate() {
                let mut column = vec![self.missing.sentinel; stations.len()];
                for (row, global) in row_map.iter().enumerate() {
                    if let Some(global) = global {
                        column[*global] = table.row(row)[c];
                    }
                }
                self.insert_column(&mut columns, *key, column, table, report);
            }
        }

        (stations, columns)
    }

    /// Concatenate by row position; rows are assumed to be the same stations.
    fn merge_positional(
        &self,
        tables: &[MonthlyTable],
        report: &mut DiagnosticReport,
    ) -> (Vec<StationCoord>, BTreeMap<MonthKey, Vec<f64>>) {
        let stations = tables[0].stations().to_vec();
        let expected = stations.len();
        let mut columns = BTreeMap::new();

        for table in tables {
            if table.station_count() != expected {
                report.push(Diagnostic::new(
                    Stage::Merge,
                    DiagnosticKind::RowMismatch,
                    format!(
                        "{} has {} rows, expected {}",
                        describe(table),
                        table.station_count(),
                        expected
                    ),
                ));
            }

            for (c, key) in table.columns().iter().enumerate() {
                let column = (0..expected)
                    .map(|row| {
                        table
                            .rows()
                            .get(row)
                            .map_or(self.missing.sentinel, |values| values[c])
                    })
                    .collect();
                self.insert_column(&mut columns, *key, column, table, report);
            }
        }

        (stations, columns)
    }

    fn insert_column(
        &self,
        columns: &mut BTreeMap<MonthKey, Vec<f64>>,
        key: MonthKey,
        column: Vec<f64>,
        table: &MonthlyTable,
        report: &mut DiagnosticReport,
    ) {
        if columns.insert(key, column).is_some() {
            report.push(Diagnostic::new(
                Stage::Merge,
                DiagnosticKind::DuplicateColumn,
                format!("Column {} replaced by {}", key, describe(table)),
            ));
        }
    }

    /// Read every yearly table in `dir` and merge them
    pub fn merge_directory(
        &self,
        dir: &Path,
        reader: &MonthlyTableReader,
    ) -> Result<(Option<MonthlyTable>, DiagnosticReport)> {
        let (tables, mut report) = reader.read_directory(dir)?;
        let (merged, merge_report) = self.merge(tables)?;
        report.merge(merge_report);
        Ok((merged, report))
    }
}

fn describe(table: &MonthlyTable) -> String {
    match table.year() {
        Some(year) => format!("table {}", year),
        None => "table without year".to_string(),
    }
}
