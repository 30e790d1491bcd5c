use crate::config::RunConfig;
use crate::error::{ProcessingError, Result};
use crate::utils::constants::{CANDIDATE_DELIMITERS, CANDIDATE_LAT_FIELDS, CANDIDATE_LON_FIELDS};
use std::fmt;

/// Delimiter and coordinate field names of a point file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub delimiter: String,
    pub lon_field: String,
    pub lat_field: String,
}

impl Schema {
    pub fn new(delimiter: &str, lon_field: &str, lat_field: &str) -> Self {
        Self {
            delimiter: delimiter.to_string(),
            lon_field: lon_field.to_string(),
            lat_field: lat_field.to_string(),
        }
    }

    /// Header fields split on this schema's delimiter
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        line.trim().split(self.delimiter.as_str()).map(str::trim).collect()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delimiter {:?}, lon '{}', lat '{}'",
            self.delimiter, self.lon_field, self.lat_field
        )
    }
}

/// Finds the schema of a point file from fixed candidate lists
#[derive(Debug, Clone)]
pub struct SchemaDetector {
    delimiters: Vec<String>,
    lon_fields: Vec<String>,
    lat_fields: Vec<String>,
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self {
            delimiters: to_owned(CANDIDATE_DELIMITERS),
            lon_fields: to_owned(CANDIDATE_LON_FIELDS),
            lat_fields: to_owned(CANDIDATE_LAT_FIELDS),
        }
    }
}

impl SchemaDetector {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            delimiters: config.delimiters.clone(),
            lon_fields: config.lon_fields.clone(),
            lat_fields: config.lat_fields.clone(),
        }
    }

    /// Pick the most frequent candidate delimiter in the header (earlier
    /// candidate on a tie), then the first longitude and latitude names present.
    pub fn detect(&self, header: &str) -> Result<Schema> {
        let mut best: Option<(&str, usize)> = None;
        for delimiter in &self.delimiters {
            let count = header.matches(delimiter.as_str()).count();
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((delimiter, count));
            }
        }

        let delimiter = best
            .map(|(d, _)| d)
            .ok_or_else(|| ProcessingError::Parse(format!("No known delimiter in header '{}'", header.trim())))?;

        let fields: Vec<&str> = header.trim().split(delimiter).map(str::trim).collect();
        let lon_field = first_present(&self.lon_fields, &fields).ok_or_else(|| {
            ProcessingError::Parse(format!("No longitude field in header '{}'", header.trim()))
        })?;
        let lat_field = first_present(&self.lat_fields, &fields).ok_or_else(|| {
            ProcessingError::Parse(format!("No latitude field in header '{}'", header.trim()))
        })?;

        Ok(Schema::new(delimiter, lon_field, lat_field))
    }

    /// Every delimiter x longitude x latitude combination, in trial order
    pub fn candidates(&self) -> impl Iterator<Item = Schema> + '_ {
        self.delimiters.iter().flat_map(move |d| {
            self.lon_fields.iter().flat_map(move |lon| {
                self.lat_fields
                    .iter()
                    .map(move |lat| Schema::new(d, lon, lat))
            })
        })
    }
}

fn first_present<'a>(candidates: &'a [String], fields: &[&str]) -> Option<&'a str> {
    candidates
        .iter()
        .find(|c| fields.contains(&c.as_str()))
        .map(String::as_str)
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
