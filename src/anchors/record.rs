use std::collections::BTreeMap;

use crate::{
    foundation::core::Point,
    foundation::error::{UndulaError, UndulaResult},
};

/// Anchor primitive kind as authored by the external editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    /// Standalone pin point.
    Point,
    /// One endpoint of a pinned line segment (two records per group).
    Line,
    /// One corner of a pinned rectangle (four records per group).
    #[serde(rename = "rect")]
    RectCorner,
}

/// Raw anchor record as persisted by the authoring tool.
///
/// Coordinates arrive as JSON numbers or numeric strings depending on the
/// editor version; both decode, anything else fails the load.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AnchorRecord {
    pub kind: AnchorKind,
    #[serde(rename = "groupId")]
    pub group_id: i64,
    pub x: Coord,
    pub y: Coord,
    /// Corner tag for rect records (tl/tr/bl/br).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner: Option<String>,
    /// Endpoint tag for line records (start/end).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// A coordinate that tolerates the legacy string encoding.
#[derive(Clone, Copy, Debug, serde::Serialize)]
#[serde(transparent)]
pub struct Coord(pub f64);

impl<'de> serde::Deserialize<'de> for Coord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(f64),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(v) => Ok(Coord(v)),
            Raw::Str(s) => s.trim().parse::<f64>().map(Coord).map_err(|_| {
                serde::de::Error::custom(format!("anchor coordinate '{s}' is not numeric"))
            }),
        }
    }
}

/// Canonical anchor geometry consumed by the influence field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnchorShape {
    Point(Point),
    Segment(Point, Point),
}

/// Decode a JSON anchor list and normalize it into canonical shapes.
pub fn decode_anchors(json: &str) -> UndulaResult<Vec<AnchorShape>> {
    let records: Vec<AnchorRecord> = serde_json::from_str(json)
        .map_err(|e| UndulaError::parse(format!("anchor list: {e}")))?;
    resolve_anchors(&records, (0.0, 0.0))
}

/// Normalize raw records into canonical shapes, translating by the same
/// origin offset that was applied during path parsing.
///
/// Point records stand alone. Line records pair up by `group_id`; a group
/// with anything other than two endpoints is rejected. Rect corners pin as
/// four independent points, so they normalize to `Point` shapes.
pub fn resolve_anchors(
    records: &[AnchorRecord],
    origin: (f64, f64),
) -> UndulaResult<Vec<AnchorShape>> {
    let mut shapes = Vec::with_capacity(records.len());
    let mut line_groups: BTreeMap<i64, Vec<Point>> = BTreeMap::new();

    for rec in records {
        let p = Point::new(rec.x.0 + origin.0, rec.y.0 + origin.1);
        match rec.kind {
            AnchorKind::Point | AnchorKind::RectCorner => shapes.push(AnchorShape::Point(p)),
            AnchorKind::Line => line_groups.entry(rec.group_id).or_default().push(p),
        }
    }

    for (group, pts) in line_groups {
        match pts.as_slice() {
            [a, b] => shapes.push(AnchorShape::Segment(*a, *b)),
            other => {
                return Err(UndulaError::parse(format!(
                    "line anchor group {group} has {} endpoints, expected 2",
                    other.len()
                )));
            }
        }
    }

    Ok(shapes)
}
