use crate::error::{ProcessingError, Result};
use crate::utils::calendar::month_name;
use crate::utils::constants::{CSV_EXTENSION, MONTHLY_FILE_PREFIX, RASTER_EXTENSION};
use std::path::Path;

/// Extract the year from a file name ending in `_YYYY.csv`
///
/// # Examples
/// ```
/// use rainfall_raster::utils::extract_year;
///
/// assert_eq!(extract_year("daily_rainfall_1998.csv").unwrap(), 1998);
/// assert!(extract_year("daily_rainfall.csv").is_err());
/// ```
pub fn extract_year(file_name: &str) -> Result<i32> {
    let parse_error = || {
        ProcessingError::Parse(format!(
            "Cannot extract a year from file name '{}' (expected '*_YYYY.csv')",
            file_name
        ))
    };

    let stem = file_name
        .strip_suffix(".csv")
        .ok_or_else(parse_error)?;
    let (_, year) = stem.rsplit_once('_').ok_or_else(parse_error)?;

    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(parse_error());
    }

    year.parse::<i32>().map_err(|_| parse_error())
}

/// Year of a path, see [`extract_year`]
pub fn extract_year_from_path(path: &Path) -> Result<i32> {
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| ProcessingError::Parse(format!("Invalid file path: {}", path.display())))?;
    extract_year(file_name)
}

/// True for `*.csv` files
pub fn is_csv_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == CSV_EXTENSION)
}

/// True for the yearly `monthly_rainfall_YYYY.csv` tables written by the aggregator
pub fn is_monthly_table(path: &Path) -> bool {
    is_csv_file(path)
        && path
            .file_name()
            .and_then(|f| f.to_str())
            .is_some_and(|name| name.starts_with(MONTHLY_FILE_PREFIX) && extract_year(name).is_ok())
}

/// `monthly_rainfall_{YYYY}.csv`
pub fn monthly_table_file_name(year: i32) -> String {
    format!("{}{:04}.{}", MONTHLY_FILE_PREFIX, year, CSV_EXTENSION)
}

/// Raster file name for an attribute column, path separators replaced
pub fn raster_file_name(field: &str) -> String {
    let safe: String = field
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();
    format!("{}.{}", safe, RASTER_EXTENSION)
}

/// `Monthly_Avg_Rain_{MM}_{MonthName}.tif`
pub fn climatology_file_name(month: u32) -> String {
    format!(
        "Monthly_Avg_Rain_{:02}_{}.{}",
        month,
        month_name(month).unwrap_or("Unknown"),
        RASTER_EXTENSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("rain_2020.csv").unwrap(), 2020);
        assert_eq!(extract_year("觀測_日資料_宜蘭縣_降雨量_1960.csv").unwrap(), 1960);
        assert_eq!(extract_year("a_b_c_0999.csv").unwrap(), 999);
    }

    #[test]
    fn test_extract_year_rejects_bad_names() {
        assert!(extract_year("rain2020.csv").is_err());
        assert!(extract_year("rain_20201.csv").is_err());
        assert!(extract_year("rain_202.csv").is_err());
        assert!(extract_year("rain_2020.txt").is_err());
        assert!(extract_year("rain_20a0.csv").is_err());
        assert!(matches!(
            extract_year("rain.csv"),
            Err(ProcessingError::Parse(_))
        ));
    }

    #[test]
    fn test_output_names() {
        assert_eq!(monthly_table_file_name(1998), "monthly_rainfall_1998.csv");
        assert_eq!(raster_file_name("199801"), "199801.tif");
        assert_eq!(raster_file_name("a/b"), "a_b.tif");
        assert_eq!(climatology_file_name(3), "Monthly_Avg_Rain_03_March.tif");
    }
}
