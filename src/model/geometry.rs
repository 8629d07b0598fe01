use serde::{Deserialize, Serialize};

/// A point or extent in world units.
pub type Vec3 = [f64; 3];

/// Derived spatial and quantity facts for one element.
///
/// Quantities come from property-set values, not from mesh integration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometrySummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_min: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_max: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// Running min/max over observed vertices.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    bounds: Option<(Vec3, Vec3)>,
}

impl BoundingBox {
    pub fn include(&mut self, p: Vec3) {
        if p.iter().any(|c| !c.is_finite()) {
            return;
        }
        match &mut self.bounds {
            Some((min, max)) => {
                for axis in 0..3 {
                    min[axis] = min[axis].min(p[axis]);
                    max[axis] = max[axis].max(p[axis]);
                }
            }
            None => self.bounds = Some((p, p)),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    #[must_use]
    pub fn min(&self) -> Option<Vec3> {
        self.bounds.map(|(min, _)| min)
    }

    #[must_use]
    pub fn max(&self) -> Option<Vec3> {
        self.bounds.map(|(_, max)| max)
    }

    /// Midpoint of the box, if any vertex was seen.
    #[must_use]
    pub fn centroid(&self) -> Option<Vec3> {
        self.bounds.map(|(min, max)| {
            [
                (min[0] + max[0]) / 2.0,
                (min[1] + max[1]) / 2.0,
                (min[2] + max[2]) / 2.0,
            ]
        })
    }
}

/// Length/area/volume accumulated for one element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuantityTotals {
    pub length: Option<f64>,
    pub area: Option<f64>,
    pub volume: Option<f64>,
}

impl QuantityTotals {
    pub fn add_length(&mut self, v: f64) {
        *self.length.get_or_insert(0.0) += v;
    }

    pub fn add_area(&mut self, v: f64) {
        *self.area.get_or_insert(0.0) += v;
    }

    pub fn add_volume(&mut self, v: f64) {
        *self.volume.get_or_insert(0.0) += v;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length.is_none() && self.area.is_none() && self.volume.is_none()
    }
}

impl GeometrySummary {
    /// Builds a summary, or `None` when neither a box nor any quantity is
    /// known. Absence means unknown, never zero.
    #[must_use]
    pub fn from_parts(
        bbox: &BoundingBox,
        quantities: QuantityTotals,
        units: Option<String>,
    ) -> Option<Self> {
        if bbox.is_empty() && quantities.is_empty() && units.is_none() {
            return None;
        }
        Some(Self {
            bbox_min: bbox.min(),
            bbox_max: bbox.max(),
            centroid: bbox.centroid(),
            length: quantities.length,
            area: quantities.area,
            volume: quantities.volume,
            units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_parts_give_no_summary() {
        let summary =
            GeometrySummary::from_parts(&BoundingBox::default(), QuantityTotals::default(), None);
        assert!(summary.is_none());
    }

    #[test]
    fn centroid_is_box_midpoint() {
        let mut bbox = BoundingBox::default();
        bbox.include([0.0, 0.0, 0.0]);
        bbox.include([4.0, -2.0, 3.0]);
        bbox.include([1.0, 1.0, 1.0]);
        let summary = GeometrySummary::from_parts(&bbox, QuantityTotals::default(), None).unwrap();
        assert_eq!(summary.bbox_min, Some([0.0, -2.0, 0.0]));
        assert_eq!(summary.bbox_max, Some([4.0, 1.0, 3.0]));
        assert_eq!(summary.centroid, Some([2.0, -0.5, 1.5]));
        assert_eq!(summary.area, None);
    }

    #[test]
    fn quantities_alone_keep_bbox_absent() {
        let mut totals = QuantityTotals::default();
        totals.add_area(10.0);
        totals.add_area(10.0);
        let summary = GeometrySummary::from_parts(&BoundingBox::default(), totals, None).unwrap();
        assert_eq!(summary.area, Some(20.0));
        assert_eq!(summary.centroid, None);
    }
}
