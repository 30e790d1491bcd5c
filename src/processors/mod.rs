pub mod climatology_averager;
pub mod diagnostics;
pub mod monthly_aggregator;
pub mod pipeline;
pub mod point_rasterizer;
pub mod year_merger;

pub use climatology_averager::ClimatologyAverager;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport, Stage};
pub use monthly_aggregator::MonthlyAggregator;
pub use pipeline::Pipeline;
pub use point_rasterizer::{PointRasterizer, RasterOutput};
pub use year_merger::YearMerger;
