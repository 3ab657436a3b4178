use crate::foundation::core::Point;

/// One drawing command of a parsed path.
///
/// Quadratic and smooth variants are normalized away during parsing, so the
/// model only ever carries these four.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PathCmd {
    /// Start a new subpath. Consumes 1 coordinate pair.
    MoveTo,
    /// Straight segment. Consumes 1 coordinate pair.
    LineTo,
    /// Cubic Bézier. Consumes 3 coordinate pairs (cp1, cp2, end).
    CubicTo,
    /// Close the current subpath. Consumes no coordinates.
    ClosePath,
}

impl PathCmd {
    /// Number of coordinate pairs the command consumes.
    pub fn arity(self) -> usize {
        match self {
            Self::MoveTo | Self::LineTo => 1,
            Self::CubicTo => 3,
            Self::ClosePath => 0,
        }
    }
}

/// Topological role of one point in the flat coordinate buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PointKind {
    /// First point of a subpath.
    SubpathStart,
    /// Endpoint of a straight segment.
    Line,
    /// Bézier control point.
    Control,
    /// Endpoint of a cubic segment.
    CurveEnd,
}

/// Immutable parsed path: commands plus a flat, index-stable point buffer.
///
/// Control points count as points. Every consumer downstream (influence
/// field, displacement engines, PBD solver, render output) indexes this
/// buffer by the same point index.
#[derive(Clone, Debug)]
pub struct ParsedPath {
    commands: Vec<PathCmd>,
    points: Vec<Point>,
    kinds: Vec<PointKind>,
    /// Point-index ranges of each subpath, paired with whether it is closed.
    subpaths: Vec<(std::ops::Range<usize>, bool)>,
    /// Cumulative polyline length at each point, measured through the flat
    /// point sequence.
    cumulative: Vec<f64>,
    total_length: f64,
}

impl ParsedPath {
    pub(crate) fn new(
        commands: Vec<PathCmd>,
        points: Vec<Point>,
        kinds: Vec<PointKind>,
        subpaths: Vec<(std::ops::Range<usize>, bool)>,
    ) -> Self {
        debug_assert_eq!(points.len(), kinds.len());
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += (*p - points[i - 1]).hypot();
            }
            cumulative.push(total);
        }
        Self {
            commands,
            points,
            kinds,
            subpaths,
            cumulative,
            total_length: total,
        }
    }

    pub fn commands(&self) -> &[PathCmd] {
        &self.commands
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn kinds(&self) -> &[PointKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Subpath point ranges with their closed flag.
    pub fn subpaths(&self) -> impl Iterator<Item = (std::ops::Range<usize>, bool)> + '_ {
        self.subpaths.iter().cloned()
    }

    /// Whether the whole path consists only of closed subpaths.
    pub fn is_closed(&self) -> bool {
        !self.subpaths.is_empty() && self.subpaths.iter().all(|(_, closed)| *closed)
    }

    /// Total traversed length through the point sequence.
    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Arc-length parameter in `[0, 1]` for a point index.
    pub fn parameter_at(&self, idx: usize) -> f64 {
        if self.total_length <= f64::EPSILON {
            return 0.0;
        }
        self.cumulative[idx] / self.total_length
    }

    /// Point index closest to an arc-length parameter in `[0, 1]`.
    pub fn index_at_parameter(&self, t: f64) -> usize {
        if self.points.is_empty() {
            return 0;
        }
        let target = t.clamp(0.0, 1.0) * self.total_length;
        match self
            .cumulative
            .binary_search_by(|c| c.partial_cmp(&target).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => i,
            Err(i) => i.min(self.points.len() - 1),
        }
    }

    /// Distance along the path between two arc-length parameters.
    ///
    /// Closed paths take the shorter wrap direction; open paths are linear.
    pub fn path_distance(&self, a: f64, b: f64) -> f64 {
        let d = (a - b).abs() * self.total_length;
        if self.is_closed() {
            d.min(self.total_length - d)
        } else {
            d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> ParsedPath {
        crate::path::parse::parse("M0,0 L10,0 L10,10 L0,10 Z", (0.0, 0.0)).unwrap()
    }

    #[test]
    fn arc_length_parameters_span_unit_interval() {
        let path = square();
        assert_eq!(path.parameter_at(0), 0.0);
        assert_eq!(path.parameter_at(path.len() - 1), 1.0);
        assert_eq!(path.total_length(), 30.0);
    }

    #[test]
    fn closed_path_distance_wraps() {
        let path = square();
        assert!(path.is_closed());
        // 0.0 and 0.9 are 0.1 apart around the wrap, not 0.9.
        let d = path.path_distance(0.0, 0.9);
        assert!((d - 3.0).abs() < 1e-9);
    }

    #[test]
    fn open_path_distance_is_linear() {
        let path = crate::path::parse::parse("M0,0 L10,0 L20,0", (0.0, 0.0)).unwrap();
        assert!(!path.is_closed());
        let d = path.path_distance(0.0, 1.0);
        assert!((d - 20.0).abs() < 1e-9);
    }

    #[test]
    fn index_at_parameter_hits_nearest_point() {
        let path = crate::path::parse::parse("M0,0 L10,0 L20,0", (0.0, 0.0)).unwrap();
        assert_eq!(path.index_at_parameter(0.0), 0);
        assert_eq!(path.index_at_parameter(0.5), 1);
        assert_eq!(path.index_at_parameter(1.0), 2);
    }
}
