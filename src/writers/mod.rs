pub mod geotiff_writer;
pub mod report_writer;
pub mod table_writer;

pub use geotiff_writer::GeoTiffWriter;
pub use report_writer::{ReportWriter, RunReport};
pub use table_writer::TableWriter;
