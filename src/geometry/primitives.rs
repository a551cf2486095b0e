use serde::{Deserialize, Serialize};

use super::Point;
use super::path::{Cursor, PathError, PathSegment, parse_path_lenient};

/// Geometry a caller can hand to the analyzer: raw path data or one of the
/// SVG basic shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ShapeGeometry {
    Path {
        d: String,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
    },
    Ellipse {
        cx: f32,
        cy: f32,
        rx: f32,
        ry: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Polygon {
        points: Vec<(f32, f32)>,
    },
    Polyline {
        points: Vec<(f32, f32)>,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
}

fn ellipse_segments(cx: f32, cy: f32, rx: f32, ry: f32) -> Vec<PathSegment> {
    let arc = |to: Point| PathSegment::ArcTo {
        rx,
        ry,
        x_axis_rotation: 0.0,
        large_arc: false,
        sweep: true,
        to,
    };
    vec![
        PathSegment::MoveTo(Point::new(cx + rx, cy)),
        arc(Point::new(cx - rx, cy)),
        arc(Point::new(cx + rx, cy)),
        PathSegment::ClosePath,
    ]
}

fn point_segments(points: &[(f32, f32)], close: bool) -> Vec<PathSegment> {
    let mut segments = Vec::with_capacity(points.len() + 1);
    for (idx, &(x, y)) in points.iter().enumerate() {
        let point = Point::new(x, y);
        if idx == 0 {
            segments.push(PathSegment::MoveTo(point));
        } else {
            segments.push(PathSegment::LineTo(point));
        }
    }
    if close && !segments.is_empty() {
        segments.push(PathSegment::ClosePath);
    }
    segments
}

impl ShapeGeometry {
    /// Converts the primitive into absolute path segments. Path data that
    /// fails part-way keeps the parsed prefix and reports the error.
    pub fn to_segments(&self) -> (Vec<PathSegment>, Option<PathError>) {
        match self {
            ShapeGeometry::Path { d } => parse_path_lenient(d),
            ShapeGeometry::Circle { cx, cy, r } => (ellipse_segments(*cx, *cy, *r, *r), None),
            ShapeGeometry::Ellipse { cx, cy, rx, ry } => {
                (ellipse_segments(*cx, *cy, *rx, *ry), None)
            }
            ShapeGeometry::Rect {
                x,
                y,
                width,
                height,
            } => {
                let corners = [
                    (*x, *y),
                    (x + width, *y),
                    (x + width, y + height),
                    (*x, y + height),
                ];
                (point_segments(&corners, true), None)
            }
            ShapeGeometry::Polygon { points } => (point_segments(points, true), None),
            ShapeGeometry::Polyline { points } => (point_segments(points, false), None),
            ShapeGeometry::Line { x1, y1, x2, y2 } => {
                (point_segments(&[(*x1, *y1), (*x2, *y2)], false), None)
            }
        }
    }
}

/// Parses a `points` attribute (`"0,0 10,0 5,8"`). A trailing odd coordinate
/// is dropped, as browsers do.
pub fn parse_points(raw: &str) -> Vec<(f32, f32)> {
    let mut cursor = Cursor::new(raw);
    let mut points = Vec::new();
    loop {
        let Some(x) = cursor.number() else {
            break;
        };
        let Some(y) = cursor.number() else {
            break;
        };
        points.push((x, y));
    }
    cursor.skip_separators();
    if !cursor.at_end() {
        tracing::debug!(
            offset = cursor.offset(),
            "ignoring trailing data in points list"
        );
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_points_accepts_mixed_separators() {
        assert_eq!(
            parse_points("0,0 10 0, 5,8"),
            vec![(0.0, 0.0), (10.0, 0.0), (5.0, 8.0)]
        );
        assert_eq!(parse_points("1 2 3"), vec![(1.0, 2.0)]);
    }

    #[test]
    fn rect_becomes_closed_polygon() {
        let rect = ShapeGeometry::Rect {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
        };
        let (segments, error) = rect.to_segments();
        assert!(error.is_none());
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[2], PathSegment::LineTo(Point::new(4.0, 6.0)));
        assert_eq!(segments[4], PathSegment::ClosePath);
    }

    #[test]
    fn circle_uses_two_arcs() {
        let circle = ShapeGeometry::Circle {
            cx: 50.0,
            cy: 50.0,
            r: 40.0,
        };
        let (segments, _) = circle.to_segments();
        let arcs = segments
            .iter()
            .filter(|segment| matches!(segment, PathSegment::ArcTo { .. }))
            .count();
        assert_eq!(segments[0], PathSegment::MoveTo(Point::new(90.0, 50.0)));
        assert_eq!(arcs, 2);
    }

    #[test]
    fn deserializes_tagged_primitives() {
        let shape: ShapeGeometry =
            serde_json::from_str(r#"{"kind":"circle","cx":1,"cy":2,"r":3}"#).unwrap();
        assert_eq!(
            shape,
            ShapeGeometry::Circle {
                cx: 1.0,
                cy: 2.0,
                r: 3.0
            }
        );
    }
}
