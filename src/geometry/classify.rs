use serde::Serialize;

use super::{BoundingBox, Point};
use crate::config::GeometryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Star,
    Triangle,
    Arrow,
    Generic,
}

impl ShapeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeType::Star => "star",
            ShapeType::Triangle => "triangle",
            ShapeType::Arrow => "arrow",
            ShapeType::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Classification {
    pub shape_type: ShapeType,
    pub confidence: f32,
}

/// Classifies a closed contour. Archetypes are tried in a fixed order (star,
/// triangle, arrow) and the first match wins.
pub(super) fn classify(contour: &[Point], centroid: Point, config: &GeometryConfig) -> Classification {
    let corners = detect_corners(contour, config);
    if let Some(score) = star_score(&corners, centroid, config) {
        return Classification {
            shape_type: ShapeType::Star,
            confidence: score,
        };
    }
    if let Some(score) = triangle_score(&corners, config) {
        return Classification {
            shape_type: ShapeType::Triangle,
            confidence: score,
        };
    }
    if let Some(score) = arrow_score(contour, config) {
        return Classification {
            shape_type: ShapeType::Arrow,
            confidence: score,
        };
    }
    Classification {
        shape_type: ShapeType::Generic,
        confidence: config.generic_confidence,
    }
}

fn turn_degrees(incoming: (f32, f32), outgoing: (f32, f32)) -> f32 {
    let cross = incoming.0 * outgoing.1 - incoming.1 * outgoing.0;
    let dot = incoming.0 * outgoing.0 + incoming.1 * outgoing.1;
    cross.atan2(dot).to_degrees()
}

/// Turning angle at `idx` measured between chords reaching roughly `window`
/// arc-length behind and ahead, so a rounded corner flattened into many small
/// steps still reads as one sharp turn while a smooth curve does not.
fn windowed_turn(points: &[Point], edges: &[f32], idx: usize, window: f32) -> f32 {
    let n = points.len();
    let max_steps = (n / 2).max(1);

    let mut back = idx;
    let mut travelled = 0.0;
    for _ in 0..max_steps {
        back = (back + n - 1) % n;
        travelled += edges[back];
        if travelled >= window {
            break;
        }
    }

    let mut ahead = idx;
    travelled = 0.0;
    for _ in 0..max_steps {
        travelled += edges[ahead];
        ahead = (ahead + 1) % n;
        if travelled >= window {
            break;
        }
    }

    let here = points[idx];
    let incoming = (here.x - points[back].x, here.y - points[back].y);
    let outgoing = (points[ahead].x - here.x, points[ahead].y - here.y);
    turn_degrees(incoming, outgoing)
}

fn detect_corners(points: &[Point], config: &GeometryConfig) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    let edges: Vec<f32> = (0..n)
        .map(|idx| points[idx].distance(points[(idx + 1) % n]))
        .collect();
    let perimeter: f32 = edges.iter().sum();
    if perimeter <= f32::EPSILON {
        return Vec::new();
    }
    let window = perimeter * config.corner_window_ratio;
    let turns: Vec<f32> = (0..n)
        .map(|idx| windowed_turn(points, &edges, idx, window))
        .collect();
    let is_candidate = |idx: usize| turns[idx].abs() >= config.corner_min_turn_deg;

    // Start scanning right after a run boundary so no run wraps around.
    let boundary = (0..n).find(|&idx| {
        let prev = (idx + n - 1) % n;
        !is_candidate(prev) || edges[prev] >= window
    });
    let Some(start) = boundary else {
        return Vec::new();
    };

    let mut corners = Vec::new();
    let mut best: Option<usize> = None;
    for step in 0..n {
        let idx = (start + step) % n;
        let prev = (idx + n - 1) % n;
        let continues_run = step > 0 && is_candidate(prev) && edges[prev] < window;
        if !continues_run {
            if let Some(best_idx) = best.take() {
                corners.push(points[best_idx]);
            }
        }
        if is_candidate(idx) {
            best = match best {
                Some(current) if turns[current].abs() >= turns[idx].abs() => Some(current),
                _ => Some(idx),
            };
        }
    }
    if let Some(best_idx) = best {
        corners.push(points[best_idx]);
    }
    corners
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn coefficient_of_variation(values: &[f32]) -> f32 {
    let avg = mean(values);
    if avg <= f32::EPSILON {
        return 1.0;
    }
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f32>() / values.len() as f32;
    variance.sqrt() / avg
}

fn star_score(corners: &[Point], centroid: Point, config: &GeometryConfig) -> Option<f32> {
    let n = corners.len();
    if n < config.star_min_points * 2 {
        return None;
    }
    let radii: Vec<f32> = corners.iter().map(|c| c.distance(centroid)).collect();
    let min = radii.iter().copied().fold(f32::MAX, f32::min);
    let max = radii.iter().copied().fold(f32::MIN, f32::max);
    if max <= f32::EPSILON {
        return None;
    }
    let split = (min + max) / 2.0;
    let outer: Vec<bool> = radii.iter().map(|&r| r >= split).collect();
    let flips = (0..n).filter(|&idx| outer[idx] != outer[(idx + 1) % n]).count();
    let alternation = flips as f32 / n as f32;
    if alternation < config.star_min_alternation {
        return None;
    }

    let (outer_radii, inner_radii): (Vec<f32>, Vec<f32>) = {
        let mut outer_radii = Vec::new();
        let mut inner_radii = Vec::new();
        for (radius, is_outer) in radii.iter().zip(&outer) {
            if *is_outer {
                outer_radii.push(*radius);
            } else {
                inner_radii.push(*radius);
            }
        }
        (outer_radii, inner_radii)
    };
    if outer_radii.len() < config.star_min_points {
        return None;
    }
    if mean(&inner_radii) / mean(&outer_radii) > config.star_max_inner_ratio {
        return None;
    }
    let uniformity = (1.0 - coefficient_of_variation(&outer_radii).min(1.0))
        * (1.0 - coefficient_of_variation(&inner_radii).min(1.0));
    Some((alternation * uniformity).clamp(0.0, 1.0))
}

fn interior_angle(prev: Point, at: Point, next: Point) -> f32 {
    let a = (prev.x - at.x, prev.y - at.y);
    let b = (next.x - at.x, next.y - at.y);
    let len = (a.0.hypot(a.1)) * (b.0.hypot(b.1));
    if len <= f32::EPSILON {
        return 0.0;
    }
    ((a.0 * b.0 + a.1 * b.1) / len).clamp(-1.0, 1.0).acos().to_degrees()
}

fn triangle_score(corners: &[Point], config: &GeometryConfig) -> Option<f32> {
    let [a, b, c] = corners else {
        return None;
    };
    let angles = [
        interior_angle(*c, *a, *b),
        interior_angle(*a, *b, *c),
        interior_angle(*b, *c, *a),
    ];
    let deviation = angles
        .iter()
        .map(|angle| (angle - 60.0).abs())
        .fold(0.0_f32, f32::max);
    if deviation > config.triangle_max_angle_deviation_deg {
        return None;
    }
    Some((1.0 - deviation / 60.0).clamp(0.0, 1.0))
}

/// Width of the contour across the long axis at axial coordinate `at`.
fn cross_section(contour: &[Point], at: f32, horizontal: bool) -> f32 {
    let axial = |p: Point| if horizontal { p.x } else { p.y };
    let across = |p: Point| if horizontal { p.y } else { p.x };
    let mut lo = f32::MAX;
    let mut hi = f32::MIN;
    let n = contour.len();
    for idx in 0..n {
        let a = contour[idx];
        let b = contour[(idx + 1) % n];
        let (pa, pb) = (axial(a), axial(b));
        if (pa <= at && pb >= at) || (pb <= at && pa >= at) {
            if (pb - pa).abs() <= f32::EPSILON {
                lo = lo.min(across(a)).min(across(b));
                hi = hi.max(across(a)).max(across(b));
            } else {
                let t = (at - pa) / (pb - pa);
                let value = across(a) + t * (across(b) - across(a));
                lo = lo.min(value);
                hi = hi.max(value);
            }
        }
    }
    if hi < lo { 0.0 } else { hi - lo }
}

fn arrow_score(contour: &[Point], config: &GeometryConfig) -> Option<f32> {
    let bounds = BoundingBox::from_points(contour.iter().copied())?;
    let horizontal = bounds.width() >= bounds.height();
    let (long, short) = if horizontal {
        (bounds.width(), bounds.height())
    } else {
        (bounds.height(), bounds.width())
    };
    if short <= f32::EPSILON {
        return None;
    }
    let aspect = long / short;
    if aspect < config.arrow_min_aspect {
        return None;
    }
    let (axis_min, axis_max) = if horizontal {
        (bounds.min_x, bounds.max_x)
    } else {
        (bounds.min_y, bounds.max_y)
    };
    let probe = config.arrow_probe_ratio * long;
    let near = cross_section(contour, axis_min + probe, horizontal);
    let far = cross_section(contour, axis_max - probe, horizontal);
    let (narrow, wide) = if near <= far { (near, far) } else { (far, near) };
    if narrow > config.arrow_tip_max_width_ratio * short
        || wide < config.arrow_tail_min_width_ratio * short
    {
        return None;
    }
    let contrast = 1.0 - narrow / wide;
    let elongation = (aspect / config.arrow_full_aspect).min(1.0);
    Some((contrast * elongation).clamp(0.0, 1.0))
}
