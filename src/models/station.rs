use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hashable, totally ordered station identity
pub type StationKey = (OrderedFloat<f64>, OrderedFloat<f64>);

/// A station is identified by its coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationCoord {
    pub lon: f64,
    pub lat: f64,
}

impl StationCoord {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn key(&self) -> StationKey {
        (OrderedFloat(self.lon), OrderedFloat(self.lat))
    }

    pub fn from_key(key: StationKey) -> Self {
        Self::new(key.0.into_inner(), key.1.into_inner())
    }
}

impl fmt::Display for StationCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_station_key_identity() {
        let a = StationCoord::new(121.7539, 24.7606);
        let b = StationCoord::new(121.7539, 24.7606);
        let c = StationCoord::new(121.7540, 24.7606);

        let mut index = HashMap::new();
        index.insert(a.key(), 0usize);
        assert_eq!(index.get(&b.key()), Some(&0));
        assert_eq!(index.get(&c.key()), None);
        assert_eq!(StationCoord::from_key(a.key()), a);
    }

    #[test]
    fn test_key_ordering_is_lon_then_lat() {
        let west = StationCoord::new(121.5, 25.0);
        let east_low = StationCoord::new(121.8, 24.5);
        let east_high = StationCoord::new(121.8, 24.9);
        let mut keys = vec![east_high.key(), west.key(), east_low.key()];
        keys.sort();
        assert_eq!(keys, vec![west.key(), east_low.key(), east_high.key()]);
    }
}
