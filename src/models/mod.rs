pub mod climatology;
pub mod daily;
pub mod missing;
pub mod monthly;
pub mod point;
pub mod raster;
pub mod station;

pub use climatology::ClimatologyRecord;
pub use daily::DailyTable;
pub use missing::MissingValuePolicy;
pub use monthly::{MonthKey, MonthlyTable};
pub use point::{PointRecord, PointSet};
pub use raster::{BoundingBox, GridSizing, GridSpec, RasterGrid};
pub use station::{StationCoord, StationKey};
