pub mod calendar;
pub mod constants;
pub mod filename;
pub mod progress;

pub use calendar::{day_keys, days_in_month, is_leap_year, month_name};
pub use constants::*;
pub use filename::{
    climatology_file_name, extract_year, extract_year_from_path, monthly_table_file_name,
    raster_file_name,
};
pub use progress::ProgressReporter;
