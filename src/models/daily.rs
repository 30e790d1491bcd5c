use crate::error::{ProcessingError, Result};
use crate::models::StationCoord;
use std::collections::HashMap;

/// One year of daily observations: a row per station, a column per date key.
///
/// Cells are `None` where the source held the sentinel, nothing, or text that
/// is not a number.
#[derive(Debug, Clone)]
pub struct DailyTable {
    stations: Vec<StationCoord>,
    day_columns: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
    column_index: HashMap<String, usize>,
}

impl DailyTable {
    pub fn new(
        stations: Vec<StationCoord>,
        day_columns: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if stations.len() != values.len() {
            return Err(ProcessingError::InvalidFormat(format!(
                "{} stations but {} value rows",
                stations.len(),
                values.len()
            )));
        }

        if let Some((row, cells)) = values
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != day_columns.len())
        {
            return Err(ProcessingError::InvalidFormat(format!(
                "Row {} has {} values, expected {}",
                row,
                cells.len(),
                day_columns.len()
            )));
        }

        let column_index = day_columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Ok(Self {
            stations,
            day_columns,
            values,
            column_index,
        })
    }

    pub fn stations(&self) -> &[StationCoord] {
        &self.stations
    }

    pub fn day_columns(&self) -> &[String] {
        &self.day_columns
    }

    pub fn row(&self, station: usize) -> &[Option<f64>] {
        &self.values[station]
    }

    pub fn column_index(&self, day_key: &str) -> Option<usize> {
        self.column_index.get(day_key).copied()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup() {
        let table = DailyTable::new(
            vec![StationCoord::new(121.0, 24.0)],
            vec!["20200101".to_string(), "20200102".to_string()],
            vec![vec![Some(1.0), None]],
        )
        .unwrap();

        assert_eq!(table.column_index("20200102"), Some(1));
        assert_eq!(table.column_index("20200103"), None);
        assert_eq!(table.row(0), &[Some(1.0), None]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = DailyTable::new(
            vec![StationCoord::new(121.0, 24.0)],
            vec!["20200101".to_string()],
            vec![vec![Some(1.0), Some(2.0)]],
        );
        assert!(result.is_err());
    }
}
