pub mod daily_reader;
pub mod point_reader;
pub mod schema;
pub mod source;
pub mod table_reader;

pub use daily_reader::DailyReader;
pub use point_reader::PointReader;
pub use schema::{Schema, SchemaDetector};
pub use source::TextSource;
pub use table_reader::MonthlyTableReader;
