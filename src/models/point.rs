use crate::models::{BoundingBox, StationCoord};

/// A located point carrying one optional value per attribute field
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub coord: StationCoord,
    /// Aligned with [`PointSet::fields`]; `None` means the field is not set
    pub values: Vec<Option<f64>>,
}

impl PointRecord {
    pub fn new(coord: StationCoord, values: Vec<Option<f64>>) -> Self {
        Self { coord, values }
    }
}

/// Points in input order plus the attribute names they carry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    pub fields: Vec<String>,
    pub points: Vec<PointRecord>,
}

impl PointSet {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            points: Vec::new(),
        }
    }

    /// Single-attribute set, points without a value are not included
    pub fn from_values<I>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = (StationCoord, f64)>,
    {
        let points = values
            .into_iter()
            .map(|(coord, value)| PointRecord::new(coord, vec![Some(value)]))
            .collect();

        Self {
            fields: vec![field.to_string()],
            points,
        }
    }

    pub fn push(&mut self, point: PointRecord) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Extent of every ingested point, with or without attribute values
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_coords(self.points.iter().map(|p| p.coord))
    }

    /// Points that carry a value for `field_index`, in input order
    pub fn values_for(&self, field_index: usize) -> impl Iterator<Item = (StationCoord, f64)> + '_ {
        self.points.iter().filter_map(move |p| {
            p.values
                .get(field_index)
                .copied()
                .flatten()
                .map(|value| (p.coord, value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_for_skips_unset_fields() {
        let mut set = PointSet::new(vec!["A".to_string(), "B".to_string()]);
        set.push(PointRecord::new(
            StationCoord::new(121.0, 24.0),
            vec![Some(1.0), None],
        ));
        set.push(PointRecord::new(
            StationCoord::new(121.5, 24.5),
            vec![None, Some(2.0)],
        ));

        let a: Vec<f64> = set.values_for(0).map(|(_, v)| v).collect();
        let b: Vec<f64> = set.values_for(1).map(|(_, v)| v).collect();
        assert_eq!(a, vec![1.0]);
        assert_eq!(b, vec![2.0]);
    }

    #[test]
    fn test_bounding_box_includes_unset_points() {
        let mut set = PointSet::new(vec!["A".to_string()]);
        set.push(PointRecord::new(StationCoord::new(121.0, 24.0), vec![Some(1.0)]));
        set.push(PointRecord::new(StationCoord::new(122.0, 25.0), vec![None]));

        let bbox = set.bounding_box().unwrap();
        assert_eq!(bbox.max_lon, 122.0);
        assert_eq!(bbox.max_lat, 25.0);
    }
}
