use crate::error::Result;
use crate::models::MonthlyTable;
use std::path::Path;
use tracing::info;

/// Writes wide monthly tables as CSV: `LON`, `LAT`, then one `YYYYMM` column per month
pub struct TableWriter;

impl TableWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_table(&self, table: &MonthlyTable, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(table.header())?;

        for (station, row) in table.stations().iter().zip(table.rows()) {
            let mut record = Vec::with_capacity(table.width());
            record.push(station.lon.to_string());
            record.push(station.lat.to_string());
            record.extend(row.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        info!(
            "Wrote {} stations x {} months to {}",
            table.station_count(),
            table.columns().len(),
            path.display()
        );
        Ok(())
    }
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MissingValuePolicy, MonthKey, StationCoord};
    use crate::readers::MonthlyTableReader;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_written_table_reads_back() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("monthly_rainfall_2020.csv");
        let table = MonthlyTable::new(
            Some(2020),
            vec![StationCoord::new(121.5, 24.25)],
            vec![MonthKey::new(2020, 1)?, MonthKey::new(2020, 2)?],
            vec![vec![12.5, -99.9]],
        )?;

        TableWriter::new().write_table(&table, &path)?;

        let text = std::fs::read_to_string(&path)?;
        assert_eq!(text, "LON,LAT,202001,202002\n121.5,24.25,12.5,-99.9\n");

        let (read, report) = MonthlyTableReader::new(MissingValuePolicy::default()).read_table(&path)?;
        assert!(report.is_empty());
        assert_eq!(read, table);
        Ok(())
    }
}
