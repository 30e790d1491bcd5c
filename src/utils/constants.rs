/// Missing observation marker in source tables and nodata value in rasters
pub const SENTINEL: f64 = -99.9;

/// Tolerance used when comparing a value against the sentinel
pub const SENTINEL_TOLERANCE: f64 = 1e-4;

/// Raster cell size in degrees, both axes
pub const CELL_SIZE: f64 = 0.0083;

/// EPSG code of the fixed geographic coordinate system (WGS84)
pub const EPSG_WGS84: u16 = 4326;

/// Coordinate column names of the station tables
pub const LON_FIELD: &str = "LON";
pub const LAT_FIELD: &str = "LAT";

/// Attribute name carried by climatology point sets
pub const CLIMATOLOGY_ATTRIBUTE: &str = "RAIN_AVG";

/// Schema detection candidates, in the order they are tried
pub const CANDIDATE_DELIMITERS: &[&str] = &[",", ";", "\t", "  "];
pub const CANDIDATE_LON_FIELDS: &[&str] = &[
    "LON",
    "lon",
    "Lon",
    "longitude",
    "Longitude",
    "LONGITUDE",
    "X",
    "x",
];
pub const CANDIDATE_LAT_FIELDS: &[&str] = &[
    "LAT",
    "lat",
    "Lat",
    "latitude",
    "Latitude",
    "LATITUDE",
    "Y",
    "y",
];

/// File names
pub const MONTHLY_FILE_PREFIX: &str = "monthly_rainfall_";
pub const MERGED_FILE: &str = "monthly_rainfall_merged.csv";
pub const RUN_REPORT_FILE: &str = "run_report.json";
pub const CSV_EXTENSION: &str = "csv";
pub const RASTER_EXTENSION: &str = "tif";

/// Directory names below the output root
pub const MONTHLY_DIR: &str = "monthly";
pub const MONTHLY_RASTER_DIR: &str = "rasters";
pub const CLIMATOLOGY_RASTER_DIR: &str = "climatology";

/// Processing defaults
pub const DEFAULT_INPUT_ENCODING: &str = "utf-8";
pub const ENV_PREFIX: &str = "RAINFALL";
