use crate::models::StationCoord;
use serde::{Deserialize, Serialize};

/// Cross-year mean of one calendar month at one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimatologyRecord {
    pub station: StationCoord,
    /// Calendar month, 1-12
    pub month: u32,
    /// `None` when every year was missing for this station and month
    pub mean: Option<f64>,
    /// Number of non-missing years that went into the mean
    pub observations: usize,
}

impl ClimatologyRecord {
    pub fn from_sum(station: StationCoord, month: u32, sum: f64, observations: usize) -> Self {
        let mean = if observations == 0 {
            None
        } else {
            Some(sum / observations as f64)
        };

        Self {
            station,
            month,
            mean,
            observations,
        }
    }
}
