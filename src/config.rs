use crate::error::{ProcessingError, Result};
use crate::models::{GridSizing, MissingValuePolicy};
use crate::utils::constants::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

/// How yearly tables are lined up when merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Join rows on the (LON, LAT) station identity
    Keyed,
    /// Concatenate rows by position, as the legacy scripts did
    Positional,
}

/// How the rasterizer finds the delimiter and coordinate fields of a point file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaMode {
    /// Infer from the header line
    Detect,
    /// Try every delimiter/field-name combination in order until one works
    BruteForce,
}

/// Grid sizing for the two kinds of raster products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridSizingPolicy {
    /// Ceiling with a minimum of one cell for every raster
    Unified,
    /// Truncation for per-month rasters, truncation plus one for climatology
    Legacy,
}

impl GridSizingPolicy {
    pub fn monthly(&self) -> GridSizing {
        match self {
            GridSizingPolicy::Unified => GridSizing::Ceiling,
            GridSizingPolicy::Legacy => GridSizing::Truncate,
        }
    }

    pub fn climatology(&self) -> GridSizing {
        match self {
            GridSizingPolicy::Unified => GridSizing::Ceiling,
            GridSizingPolicy::Legacy => GridSizing::TruncatePlusOne,
        }
    }
}

/// Everything a run needs, passed explicitly into each stage.
///
/// Loaded from defaults, an optional TOML file and `RAINFALL_*` environment
/// variables, in that order of precedence.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RunConfig {
    /// Directory of daily `*_YYYY.csv` files
    pub input_dir: PathBuf,

    /// Root for every output
    pub output_dir: PathBuf,

    pub sentinel: f64,

    #[validate(range(min = 1e-9, max = 180.0))]
    pub cell_size: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub tolerance: f64,

    #[validate(length(min = 1))]
    pub delimiters: Vec<String>,

    #[validate(length(min = 1))]
    pub lon_fields: Vec<String>,

    #[validate(length(min = 1))]
    pub lat_fields: Vec<String>,

    pub merge_mode: MergeMode,

    pub schema_mode: SchemaMode,

    pub grid_sizing: GridSizingPolicy,

    #[validate(range(min = 1))]
    pub max_workers: usize,

    /// Fallback encoding label for inputs without a BOM, e.g. `big5`
    pub input_encoding: String,

    pub use_mmap: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            sentinel: SENTINEL,
            cell_size: CELL_SIZE,
            tolerance: SENTINEL_TOLERANCE,
            delimiters: CANDIDATE_DELIMITERS.iter().map(|s| s.to_string()).collect(),
            lon_fields: CANDIDATE_LON_FIELDS.iter().map(|s| s.to_string()).collect(),
            lat_fields: CANDIDATE_LAT_FIELDS.iter().map(|s| s.to_string()).collect(),
            merge_mode: MergeMode::Keyed,
            schema_mode: SchemaMode::Detect,
            grid_sizing: GridSizingPolicy::Unified,
            max_workers: num_cpus::get(),
            input_encoding: DEFAULT_INPUT_ENCODING.to_string(),
            use_mmap: false,
        }
    }
}

impl RunConfig {
    /// Layer an optional TOML file and the environment over the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ProcessingError::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(::config::File::from(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator("|")
                    .with_list_parse_key("delimiters")
                    .with_list_parse_key("lon_fields")
                    .with_list_parse_key("lat_fields"),
            )
            .build()?;

        let config: RunConfig = settings.try_deserialize()?;
        config.checked()
    }

    /// Validate and return self
    pub fn checked(self) -> Result<Self> {
        self.validate()?;

        if encoding_rs::Encoding::for_label(self.input_encoding.as_bytes()).is_none() {
            return Err(ProcessingError::Config(format!(
                "Unknown input encoding: {}",
                self.input_encoding
            )));
        }

        if self.delimiters.iter().any(|d| d.is_empty()) {
            return Err(ProcessingError::Config(
                "Delimiters must not be empty strings".to_string(),
            ));
        }

        Ok(self)
    }

    pub fn missing_values(&self) -> MissingValuePolicy {
        MissingValuePolicy::new(self.sentinel, self.tolerance)
    }

    pub fn monthly_dir(&self) -> PathBuf {
        self.output_dir.join(MONTHLY_DIR)
    }

    pub fn merged_file(&self) -> PathBuf {
        self.output_dir.join(MERGED_FILE)
    }

    pub fn monthly_raster_dir(&self) -> PathBuf {
        self.output_dir.join(MONTHLY_RASTER_DIR)
    }

    pub fn climatology_raster_dir(&self) -> PathBuf {
        self.output_dir.join(MONTHLY_RASTER_DIR).join(CLIMATOLOGY_RASTER_DIR)
    }

    pub fn run_report_file(&self) -> PathBuf {
        self.output_dir.join(RUN_REPORT_FILE)
    }

    /// Create every output directory; safe to call repeatedly
    pub fn prepare_directories(&self) -> Result<()> {
        for dir in [
            self.output_dir.clone(),
            self.monthly_dir(),
            self.monthly_raster_dir(),
            self.climatology_raster_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
            debug!("Output directory ready: {}", dir.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = RunConfig::default().checked().unwrap();
        assert_eq!(config.sentinel, -99.9);
        assert_eq!(config.cell_size, 0.0083);
        assert_eq!(config.tolerance, 1e-4);
        assert_eq!(config.delimiters, vec![",", ";", "\t", "  "]);
        assert_eq!(config.lon_fields[0], "LON");
        assert_eq!(config.lat_fields[7], "y");
        assert_eq!(config.merge_mode, MergeMode::Keyed);
        assert_eq!(config.schema_mode, SchemaMode::Detect);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = RunConfig {
            cell_size: 0.0,
            ..RunConfig::default()
        };
        assert!(config.checked().is_err());

        let config = RunConfig {
            lon_fields: vec![],
            ..RunConfig::default()
        };
        assert!(config.checked().is_err());

        let config = RunConfig {
            input_encoding: "no-such-encoding".to_string(),
            ..RunConfig::default()
        };
        assert!(config.checked().is_err());
    }

    #[test]
    fn test_load_from_toml() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "input_dir = \"daily\"")?;
        writeln!(file, "cell_size = 0.01")?;
        writeln!(file, "merge_mode = \"positional\"")?;
        writeln!(file, "grid_sizing = \"legacy\"")?;
        writeln!(file, "schema_mode = \"brute-force\"")?;

        let config = RunConfig::load(Some(file.path()))?;
        assert_eq!(config.input_dir, PathBuf::from("daily"));
        assert_eq!(config.cell_size, 0.01);
        assert_eq!(config.merge_mode, MergeMode::Positional);
        assert_eq!(config.grid_sizing, GridSizingPolicy::Legacy);
        assert_eq!(config.schema_mode, SchemaMode::BruteForce);
        // untouched keys keep their defaults
        assert_eq!(config.sentinel, -99.9);
        Ok(())
    }

    #[test]
    fn test_legacy_grid_sizing() {
        assert_eq!(GridSizingPolicy::Legacy.monthly(), GridSizing::Truncate);
        assert_eq!(GridSizingPolicy::Legacy.climatology(), GridSizing::TruncatePlusOne);
        assert_eq!(GridSizingPolicy::Unified.monthly(), GridSizing::Ceiling);
    }

    #[test]
    fn test_prepare_directories_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let config = RunConfig {
            output_dir: dir.path().join("out"),
            ..RunConfig::default()
        };

        config.prepare_directories()?;
        config.prepare_directories()?;
        assert!(config.monthly_dir().is_dir());
        assert!(config.climatology_raster_dir().is_dir());
        Ok(())
    }
}
