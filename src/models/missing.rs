use crate::utils::constants::{SENTINEL, SENTINEL_TOLERANCE};
use serde::{Deserialize, Serialize};

/// Decides whether a value is a real measurement or the missing-data sentinel.
///
/// The same sentinel marks "no observation" in the station tables and
/// "nodata" in the rasters. NaN is always missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissingValuePolicy {
    pub sentinel: f64,
    pub tolerance: f64,
}

impl MissingValuePolicy {
    pub fn new(sentinel: f64, tolerance: f64) -> Self {
        Self {
            sentinel,
            tolerance,
        }
    }

    pub fn is_missing(&self, value: f64) -> bool {
        value.is_nan() || (value - self.sentinel).abs() <= self.tolerance
    }

    /// `None` for the sentinel, `Some(value)` for a measurement
    pub fn observed(&self, value: f64) -> Option<f64> {
        if self.is_missing(value) {
            None
        } else {
            Some(value)
        }
    }

    /// Parse a raw table cell; empty, non-numeric and sentinel cells are `None`
    pub fn parse_cell(&self, raw: &str) -> Option<f64> {
        raw.trim()
            .parse::<f64>()
            .ok()
            .and_then(|value| self.observed(value))
    }

    /// Inverse of [`observed`](Self::observed)
    pub fn or_sentinel(&self, value: Option<f64>) -> f64 {
        value.unwrap_or(self.sentinel)
    }
}

impl Default for MissingValuePolicy {
    fn default() -> Self {
        Self::new(SENTINEL, SENTINEL_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_detection() {
        let policy = MissingValuePolicy::default();
        assert!(policy.is_missing(-99.9));
        assert!(policy.is_missing(-99.90005));
        assert!(policy.is_missing(f64::NAN));
        assert!(!policy.is_missing(-99.8));
        assert!(!policy.is_missing(0.0));
    }

    #[test]
    fn test_parse_cell() {
        let policy = MissingValuePolicy::default();
        assert_eq!(policy.parse_cell(" 12.5 "), Some(12.5));
        assert_eq!(policy.parse_cell("0"), Some(0.0));
        assert_eq!(policy.parse_cell("-99.9"), None);
        assert_eq!(policy.parse_cell(""), None);
        assert_eq!(policy.parse_cell("T"), None);
    }

    #[test]
    fn test_or_sentinel() {
        let policy = MissingValuePolicy::default();
        assert_eq!(policy.or_sentinel(None), -99.9);
        assert_eq!(policy.or_sentinel(Some(3.0)), 3.0);
    }
}
