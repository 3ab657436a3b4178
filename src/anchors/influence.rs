use crate::{
    anchors::record::AnchorShape,
    foundation::core::Point,
    foundation::error::{UndulaError, UndulaResult},
    foundation::math::smoothstep,
};

/// Per-point freedom scalar in `[0, 1]`, index-aligned with the path points.
///
/// 0 means fully pinned, 1 fully free. Recomputed when anchors or the falloff
/// radius change; immutable for the duration of a frame.
#[derive(Clone, Debug)]
pub struct InfluenceField {
    values: Vec<f64>,
}

impl InfluenceField {
    /// Compute the field from canonical anchor shapes.
    ///
    /// O(points x anchors); runs outside the hot frame loop.
    #[tracing::instrument(skip(points, anchors), fields(points = points.len(), anchors = anchors.len()))]
    pub fn compute(
        points: &[Point],
        anchors: &[AnchorShape],
        falloff_radius: f64,
    ) -> UndulaResult<Self> {
        if !(falloff_radius > 0.0) {
            return Err(UndulaError::config("falloff radius must be > 0"));
        }
        if anchors.is_empty() {
            // No pins anywhere: everything fully free.
            return Ok(Self {
                values: vec![1.0; points.len()],
            });
        }

        let values = points
            .iter()
            .map(|&p| {
                let d = anchors
                    .iter()
                    .map(|a| distance_to_shape(p, a))
                    .fold(f64::INFINITY, f64::min);
                smoothstep(d / falloff_radius)
            })
            .collect();
        Ok(Self { values })
    }

    /// Field for a path with no anchors at all.
    pub fn free(len: usize) -> Self {
        Self {
            values: vec![1.0; len],
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn distance_to_shape(p: Point, shape: &AnchorShape) -> f64 {
    match *shape {
        AnchorShape::Point(a) => (p - a).hypot(),
        AnchorShape::Segment(a, b) => point_to_segment(p, a, b),
    }
}

/// Point-to-segment distance with clamped projection.
fn point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.hypot2();
    if len2 <= f64::EPSILON {
        return (p - a).hypot();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    let proj = Point::new(a.x + ab.x * t, a.y + ab.y * t);
    (p - proj).hypot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::record::AnchorShape;

    #[test]
    fn boundary_values_around_a_point_anchor() {
        let anchors = [AnchorShape::Point(Point::new(0.0, 0.0))];
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(50.0, 0.0),
        ];
        let field = InfluenceField::compute(&pts, &anchors, 10.0).unwrap();
        assert_eq!(field.get(0), 0.0);
        assert!((field.get(1) - 0.5).abs() < 1e-12);
        assert_eq!(field.get(2), 1.0);
        assert_eq!(field.get(3), 1.0);
    }

    #[test]
    fn influence_is_monotone_in_distance() {
        let anchors = [AnchorShape::Point(Point::new(0.0, 0.0))];
        let pts: Vec<Point> = (0..=20).map(|i| Point::new(i as f64 * 0.5, 0.0)).collect();
        let field = InfluenceField::compute(&pts, &anchors, 10.0).unwrap();
        for w in field.values().windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn segment_anchor_uses_clamped_projection() {
        let anchors = [AnchorShape::Segment(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        )];
        let pts = [
            Point::new(5.0, 0.0),  // on the segment
            Point::new(5.0, 4.0),  // above the middle
            Point::new(14.0, 0.0), // past the end, clamps to (10,0)
        ];
        let field = InfluenceField::compute(&pts, &anchors, 8.0).unwrap();
        assert_eq!(field.get(0), 0.0);
        assert!((field.get(1) - smoothstep(0.5)).abs() < 1e-12);
        assert!((field.get(2) - smoothstep(0.5)).abs() < 1e-12);
    }

    #[test]
    fn non_positive_radius_is_a_config_error() {
        let anchors = [AnchorShape::Point(Point::new(0.0, 0.0))];
        assert!(InfluenceField::compute(&[], &anchors, 0.0).is_err());
        assert!(InfluenceField::compute(&[], &anchors, -1.0).is_err());
    }

    #[test]
    fn no_anchors_means_fully_free() {
        let pts = [Point::new(1.0, 2.0)];
        let field = InfluenceField::compute(&pts, &[], 10.0).unwrap();
        assert_eq!(field.values(), &[1.0]);
    }
}
