use crate::error::{ProcessingError, Result};
use crate::models::{MissingValuePolicy, PointRecord, PointSet, StationCoord};
use crate::processors::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Stage};
use crate::readers::{Schema, TextSource};
use std::path::Path;

/// Reads delimited point files: two coordinate fields plus any number of
/// numeric attribute fields.
pub struct PointReader {
    source: TextSource,
    missing: MissingValuePolicy,
}

impl PointReader {
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

    pub fn read_text(&self, path: &Path) -> Result<String> {
        self.source.read_to_string(path)
    }

    /// First non-blank line
    pub fn header_line(text: &str) -> Option<&str> {
        text.lines().find(|line| !line.trim().is_empty())
    }

    pub fn parse(
        &self,
        text: &str,
        path: &Path,
        schema: &Schema,
    ) -> Result<(PointSet, DiagnosticReport)> {
        let mut report = DiagnosticReport::new();
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let header = lines
            .next()
            .map(|(_, line)| schema.split(line))
            .ok_or_else(|| ProcessingError::Parse(format!("{} is empty", path.display())))?;

        let position = |field: &str| {
            header.iter().position(|h| *h == field).ok_or_else(|| {
                ProcessingError::Parse(format!(
                    "Field '{}' not found in {} with {}",
                    field,
                    path.display(),
                    schema
                ))
            })
        };
        let lon_index = position(&schema.lon_field)?;
        let lat_index = position(&schema.lat_field)?;

        let attribute_indices: Vec<usize> = (0..header.len())
            .filter(|i| *i != lon_index && *i != lat_index)
            .collect();
        let fields = attribute_indices
            .iter()
            .map(|i| header[*i].to_string())
            .collect();
        let mut points = PointSet::new(fields);

        for (index, line) in lines {
            let line_number = index + 1;
            let values = schema.split(line);

            if values.len() != header.len() {
                report.push(
                    Diagnostic::new(
                        Stage::Rasterize,
                        DiagnosticKind::RowSkipped,
                        format!("{} fields, header has {}", values.len(), header.len()),
                    )
                    .with_file(path)
                    .with_line(line_number),
                );
                continue;
            }

            let coord = match (
                values[lon_index].parse::<f64>(),
                values[lat_index].parse::<f64>(),
            ) {
                (Ok(lon), Ok(lat)) if lon.is_finite() && lat.is_finite() => {
                    StationCoord::new(lon, lat)
                }
                _ => {
                    report.push(
                        Diagnostic::new(
                            Stage::Rasterize,
                            DiagnosticKind::RowSkipped,
                            format!(
                                "Invalid coordinates '{}', '{}'",
                                values[lon_index], values[lat_index]
                            ),
                        )
                        .with_file(path)
                        .with_line(line_number),
                    );
                    continue;
                }
            };

            let attributes = attribute_indices
                .iter()
                .map(|i| self.missing.parse_cell(values[*i]))
                .collect();
            points.push(PointRecord::new(coord, attributes));
        }

        Ok((points, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> PointReader {
        PointReader::new(MissingValuePolicy::default())
    }

    #[test]
    fn test_parse_points() {
        let text = "LON,LAT,199801,199802\n\
                    121.5,24.5,10,-99.9\n\
                    \n\
                    121.6,24.6,x,3\n";
        let schema = Schema::new(",", "LON", "LAT");
        let (points, report) = reader()
            .parse(text, Path::new("points.csv"), &schema)
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(points.fields, vec!["199801", "199802"]);
        assert_eq!(points.len(), 2);
        assert_eq!(points.points[0].values, vec![Some(10.0), None]);
        assert_eq!(points.points[1].values, vec![None, Some(3.0)]);
    }

    #[test]
    fn test_bad_rows_are_skipped_with_line_numbers() {
        let text = "x;y;V\n1;2;3\n1;2\nnan-ish;2;3\n";
        let schema = Schema::new(";", "x", "y");
        let (points, report) = reader()
            .parse(text, Path::new("points.csv"), &schema)
            .unwrap();

        assert_eq!(points.len(), 1);
        let lines: Vec<Option<usize>> = report.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![Some(3), Some(4)]);
    }

    #[test]
    fn test_double_space_delimiter() {
        let text = "  Lon  Lat  V\n  121.0  24.0  7.5\n";
        let schema = Schema::new("  ", "Lon", "Lat");
        let (points, _) = reader()
            .parse(text, Path::new("points.txt"), &schema)
            .unwrap();
        assert_eq!(points.points[0].values, vec![Some(7.5)]);
    }

    #[test]
    fn test_wrong_schema_is_parse_error() {
        let schema = Schema::new(";", "LON", "LAT");
        let result = reader().parse("LON,LAT,V\n1,2,3\n", Path::new("p.csv"), &schema);
        assert!(matches!(result, Err(ProcessingError::Parse(_))));

        let result = reader().parse("", Path::new("p.csv"), &schema);
        assert!(matches!(result, Err(ProcessingError::Parse(_))));
    }
}
