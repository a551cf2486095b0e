use serde::Serialize;

use super::classify::{ShapeType, classify};
use super::markup::inspect_svg;
use super::primitives::ShapeGeometry;
use super::{BoundingBox, Contour, Point, flatten, segment_bounds};
use crate::config::GeometryConfig;

/// Derived description of a piece of geometry. Never persisted; recompute it
/// whenever the input changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryAnalysis {
    pub bounding_box: Option<BoundingBox>,
    pub bounding_box_center: Point,
    pub centroid_center: Point,
    pub shape_type: ShapeType,
    pub use_centroid: bool,
    pub confidence: f32,
}

impl GeometryAnalysis {
    fn unanalyzable() -> Self {
        Self {
            bounding_box: None,
            bounding_box_center: Point::ORIGIN,
            centroid_center: Point::ORIGIN,
            shape_type: ShapeType::Generic,
            use_centroid: false,
            confidence: 0.0,
        }
    }

    fn bounding_box_fallback(bounds: BoundingBox) -> Self {
        Self {
            bounding_box: Some(bounds),
            bounding_box_center: bounds.center(),
            centroid_center: bounds.center(),
            shape_type: ShapeType::Generic,
            use_centroid: false,
            confidence: 0.0,
        }
    }

    pub fn is_analyzable(&self) -> bool {
        self.bounding_box.is_some()
    }

    /// The point scale and rotation should pivot around.
    pub fn visual_center(&self) -> Point {
        if self.use_centroid {
            self.centroid_center
        } else {
            self.bounding_box_center
        }
    }
}

/// Twice the signed area plus first moments, relative to `origin`.
fn contour_moments(points: &[Point], origin: Point) -> (f64, f64, f64) {
    let n = points.len();
    if n < 3 {
        return (0.0, 0.0, 0.0);
    }
    let mut area2 = 0.0_f64;
    let mut moment_x = 0.0_f64;
    let mut moment_y = 0.0_f64;
    for idx in 0..n {
        let a = points[idx];
        let b = points[(idx + 1) % n];
        let (x0, y0) = (f64::from(a.x - origin.x), f64::from(a.y - origin.y));
        let (x1, y1) = (f64::from(b.x - origin.x), f64::from(b.y - origin.y));
        let cross = x0 * y1 - x1 * y0;
        area2 += cross;
        moment_x += (x0 + x1) * cross;
        moment_y += (y0 + y1) * cross;
    }
    (area2, moment_x, moment_y)
}

/// Area-weighted centroid over every shape. Each shape is normalized to a
/// positive orientation so holes subtract only within their own shape.
fn area_centroid(shapes: &[Vec<Contour>], bounds: BoundingBox) -> Option<Point> {
    let origin = Point::new(bounds.min_x, bounds.min_y);
    let mut total_area2 = 0.0_f64;
    let mut total_mx = 0.0_f64;
    let mut total_my = 0.0_f64;
    for contours in shapes {
        let (mut area2, mut mx, mut my) = (0.0, 0.0, 0.0);
        for contour in contours {
            let (a, x, y) = contour_moments(&contour.points, origin);
            area2 += a;
            mx += x;
            my += y;
        }
        if area2 < 0.0 {
            area2 = -area2;
            mx = -mx;
            my = -my;
        }
        total_area2 += area2;
        total_mx += mx;
        total_my += my;
    }
    let box_area = (f64::from(bounds.width()) * f64::from(bounds.height())).max(f64::MIN_POSITIVE);
    if total_area2 / 2.0 <= box_area * 1e-6 {
        return None;
    }
    Some(Point::new(
        (total_mx / (3.0 * total_area2)) as f32 + origin.x,
        (total_my / (3.0 * total_area2)) as f32 + origin.y,
    ))
}

/// Largest-area contour with duplicate and closing points removed.
fn dominant_contour(shapes: &[Vec<Contour>], bounds: BoundingBox) -> Option<Vec<Point>> {
    let origin = Point::new(bounds.min_x, bounds.min_y);
    let mut best: Option<(&Contour, f64)> = None;
    for contour in shapes.iter().flatten() {
        let (area2, _, _) = contour_moments(&contour.points, origin);
        let area = area2.abs();
        if best.is_none_or(|(_, best_area)| area > best_area) {
            best = Some((contour, area));
        }
    }
    let (contour, _) = best?;
    let tolerance = bounds.max_extent() * 1e-4;
    let mut cleaned: Vec<Point> = Vec::with_capacity(contour.points.len());
    for &point in &contour.points {
        if cleaned
            .last()
            .is_some_and(|last: &Point| last.distance(point) <= tolerance)
        {
            continue;
        }
        cleaned.push(point);
    }
    while cleaned.len() > 1 {
        let (first, last) = (cleaned[0], cleaned[cleaned.len() - 1]);
        if first.distance(last) <= tolerance {
            cleaned.pop();
        } else {
            break;
        }
    }
    (cleaned.len() >= 3).then_some(cleaned)
}

/// Analyzes one or more shapes as a single visual unit.
pub fn analyze_geometry(shapes: &[ShapeGeometry], config: &GeometryConfig) -> GeometryAnalysis {
    let mut bounds: Option<BoundingBox> = None;
    let mut parse_failed = false;
    let mut budget = config.max_flatten_points;
    let mut flattened = Vec::with_capacity(shapes.len());

    for shape in shapes {
        let (segments, error) = shape.to_segments();
        if let Some(err) = error {
            tracing::debug!(%err, "shape geometry did not parse cleanly; using bounding box center");
            parse_failed = true;
        }
        if let Some(shape_bounds) = segment_bounds(&segments, config.curve_samples) {
            bounds = Some(match bounds {
                Some(existing) => existing.union(shape_bounds),
                None => shape_bounds,
            });
        }
        flattened.push(flatten(&segments, config.curve_samples, &mut budget));
    }

    let Some(bounds) = bounds else {
        return GeometryAnalysis::unanalyzable();
    };
    if parse_failed {
        return GeometryAnalysis::bounding_box_fallback(bounds);
    }
    let Some(centroid) = area_centroid(&flattened, bounds) else {
        return GeometryAnalysis::bounding_box_fallback(bounds);
    };

    let classification = match dominant_contour(&flattened, bounds) {
        Some(contour) => classify(&contour, centroid, config),
        None => return GeometryAnalysis::bounding_box_fallback(bounds),
    };

    let bbox_center = bounds.center();
    let extent = bounds.max_extent();
    let offset_ratio = if extent > 0.0 {
        bbox_center.distance(centroid) / extent
    } else {
        0.0
    };
    let use_centroid = classification.shape_type != ShapeType::Generic
        && offset_ratio > config.centroid_min_offset_ratio;

    GeometryAnalysis {
        bounding_box: Some(bounds),
        bounding_box_center: bbox_center,
        centroid_center: centroid,
        shape_type: classification.shape_type,
        use_centroid,
        confidence: classification.confidence,
    }
}

pub fn analyze_path(d: &str, config: &GeometryConfig) -> GeometryAnalysis {
    analyze_geometry(&[ShapeGeometry::Path { d: d.to_string() }], config)
}

/// Analyzes the painted shapes of a raw SVG document.
pub fn analyze_svg_content(content: &str, config: &GeometryConfig) -> GeometryAnalysis {
    match inspect_svg(content) {
        Ok(markup) => analyze_geometry(&markup.shapes, config),
        Err(err) => {
            tracing::debug!(%err, "svg content could not be inspected");
            GeometryAnalysis::unanalyzable()
        }
    }
}
