use crate::error::{ProcessingError, Result};
use crate::models::StationCoord;
use crate::utils::constants::{LAT_FIELD, LON_FIELD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(year, month)` column key, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ProcessingError::Parse(format!(
                "Month {} out of range 1-12",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// Parse a `YYYYMM` column name
    pub fn parse(key: &str) -> Result<Self> {
        let key = key.trim();
        if key.len() != 6 || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProcessingError::Parse(format!(
                "'{}' is not a YYYYMM month key",
                key
            )));
        }

        let year = key[..4]
            .parse::<i32>()
            .map_err(|_| ProcessingError::Parse(format!("Invalid year in '{}'", key)))?;
        let month = key[4..6]
            .parse::<u32>()
            .map_err(|_| ProcessingError::Parse(format!("Invalid month in '{}'", key)))?;

        Self::new(year, month)
    }

    /// The twelve keys of one year
    pub fn year_months(year: i32) -> impl Iterator<Item = MonthKey> {
        (1..=12).map(move |month| MonthKey { year, month })
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

/// Wide monthly table: a row per station, a column per [`MonthKey`].
///
/// Used both for a single year's accumulation (`year` is set) and for the
/// merged multi-year table. Missing values hold the sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTable {
    year: Option<i32>,
    stations: Vec<StationCoord>,
    columns: Vec<MonthKey>,
    rows: Vec<Vec<f64>>,
}

impl MonthlyTable {
    pub fn new(
        year: Option<i32>,
        stations: Vec<StationCoord>,
        columns: Vec<MonthKey>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if stations.len() != rows.len() {
            return Err(ProcessingError::InvalidFormat(format!(
                "{} stations but {} value rows",
                stations.len(),
                rows.len()
            )));
        }

        if rows.iter().any(|row| row.len() != columns.len()) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Every row must hold {} monthly values",
                columns.len()
            )));
        }

        Ok(Self {
            year,
            stations,
            columns,
            rows,
        })
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn stations(&self) -> &[StationCoord] {
        &self.stations
    }

    pub fn columns(&self) -> &[MonthKey] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, station: usize) -> &[f64] {
        &self.rows[station]
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Total column count including the two coordinate columns
    pub fn width(&self) -> usize {
        self.columns.len() + 2
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.width());
        header.push(LON_FIELD.to_string());
        header.push(LAT_FIELD.to_string());
        header.extend(self.columns.iter().map(|k| k.to_string()));
        header
    }
}
