//! Transform classification and composition for embedded images and text.
//!
//! Every image transform is one of four exclusive cases, chosen first-match
//! from which of `scale`, `rotation` and `transformOrigin` are present:
//!
//! | scale | rotation | origin | case                |
//! |-------|----------|--------|---------------------|
//! | yes   | any      | yes    | `scale-with-origin` |
//! | yes   | any      | no     | `scale-only`        |
//! | no    | yes      | any    | `rotation-only`     |
//! | no    | no       | any    | `none`              |

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

use crate::geometry::Point;
use crate::render::fmt_num;
use crate::viewbox::ViewBox;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?(?:\d+(?:\.\d*)?|\.\d+))%$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformCase {
    ScaleWithOrigin,
    ScaleOnly,
    RotationOnly,
    None,
}

impl TransformCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformCase::ScaleWithOrigin => "scale-with-origin",
            TransformCase::ScaleOnly => "scale-only",
            TransformCase::RotationOnly => "rotation-only",
            TransformCase::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformOriginError {
    #[error("transform origin is empty")]
    Empty,
    #[error("unrecognized transform origin `{0}`")]
    Unrecognized(String),
}

/// A declared `transformOrigin`. Declaring one selects `scale-with-origin`;
/// the pivot itself always comes from the analyzed content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransformOrigin {
    /// Keyword asking for the visual center.
    Visual,
    /// Percentages of the image box, as written.
    Relative { x: f32, y: f32 },
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    Horizontal,
    Vertical,
    Either,
}

fn origin_component(token: &str) -> Option<(Axis, f32)> {
    let component = match token {
        "left" => (Axis::Horizontal, 0.0),
        "right" => (Axis::Horizontal, 100.0),
        "top" => (Axis::Vertical, 0.0),
        "bottom" => (Axis::Vertical, 100.0),
        "center" => (Axis::Either, 50.0),
        _ => {
            let caps = PERCENT_RE.captures(token)?;
            let value = caps[1].parse::<f32>().ok()?;
            (Axis::Either, value)
        }
    };
    Some(component)
}

impl FromStr for TransformOrigin {
    type Err = TransformOriginError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let unrecognized = || TransformOriginError::Unrecognized(raw.trim().to_string());
        match tokens.as_slice() {
            [] => Err(TransformOriginError::Empty),
            ["center" | "visual" | "auto" | "centroid"] => Ok(TransformOrigin::Visual),
            [single] => {
                let (axis, value) = origin_component(single).ok_or_else(unrecognized)?;
                Ok(match axis {
                    Axis::Vertical => TransformOrigin::Relative { x: 50.0, y: value },
                    _ => TransformOrigin::Relative { x: value, y: 50.0 },
                })
            }
            [first, second] => {
                let first = origin_component(first).ok_or_else(unrecognized)?;
                let second = origin_component(second).ok_or_else(unrecognized)?;
                let swapped = first.0 == Axis::Vertical || second.0 == Axis::Horizontal;
                let ((x_axis, x), (y_axis, y)) = if swapped {
                    (second, first)
                } else {
                    (first, second)
                };
                if x_axis == Axis::Vertical || y_axis == Axis::Horizontal {
                    return Err(unrecognized());
                }
                Ok(TransformOrigin::Relative { x, y })
            }
            _ => Err(unrecognized()),
        }
    }
}

/// `Some` and finite.
pub fn is_present(value: Option<f32>) -> bool {
    value.is_some_and(f32::is_finite)
}

pub fn classify_transform(
    scale: Option<f32>,
    rotation: Option<f32>,
    origin: Option<&TransformOrigin>,
) -> TransformCase {
    match (is_present(scale), is_present(rotation), origin.is_some()) {
        (true, _, true) => TransformCase::ScaleWithOrigin,
        (true, _, false) => TransformCase::ScaleOnly,
        (false, true, _) => TransformCase::RotationOnly,
        (false, false, _) => TransformCase::None,
    }
}

/// 2x3 affine matrix in SVG order: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(tx: f32, ty: f32) -> Self {
        Affine {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Affine {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Clockwise in a y-down coordinate system, like SVG `rotate()`.
    pub fn rotate(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Affine {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self` applied first, then `next`.
    pub fn then(self, next: Affine) -> Affine {
        Affine {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.e,
            self.b * point.x + self.d * point.y + self.f,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Canvas-space box an embedded image is laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ImageFrame {
    /// Box of `width` x `height` centered on `center`.
    pub fn centered(center: Point, width: f32, height: f32) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

}

/// How content user space lands in the frame with `xMidYMid meet`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentPlacement {
    pub scale: f32,
    pub translate: Point,
}

impl ContentPlacement {
    pub fn new(view_box: &ViewBox, frame: &ImageFrame) -> Self {
        let scale = (frame.width / view_box.width).min(frame.height / view_box.height);
        let translate = Point::new(
            frame.x + (frame.width - view_box.width * scale) / 2.0 - view_box.x * scale,
            frame.y + (frame.height - view_box.height * scale) / 2.0 - view_box.y * scale,
        );
        Self { scale, translate }
    }

    pub fn map(&self, point: Point) -> Point {
        Point::new(
            point.x * self.scale + self.translate.x,
            point.y * self.scale + self.translate.y,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTransform {
    pub case: TransformCase,
    /// Canvas-space pivot, when the case has one.
    pub origin: Option<Point>,
    pub matrix: Affine,
    /// SVG `transform` attribute value.
    pub svg: Option<String>,
}

impl ResolvedTransform {
    fn none() -> Self {
        Self {
            case: TransformCase::None,
            origin: None,
            matrix: Affine::IDENTITY,
            svg: None,
        }
    }
}

/// Composes the image transform for the selected case. `visual_center` is
/// only evaluated in the `scale-with-origin` case, whatever origin was
/// declared, and falls back to the frame center when it yields nothing.
pub fn resolve_image_transform(
    scale: Option<f32>,
    rotation: Option<f32>,
    origin: Option<&TransformOrigin>,
    frame: &ImageFrame,
    visual_center: impl FnOnce() -> Option<Point>,
) -> ResolvedTransform {
    let case = classify_transform(scale, rotation, origin);
    let rotation = rotation.filter(|value| value.is_finite());
    match case {
        TransformCase::ScaleWithOrigin => {
            let scale = scale.unwrap_or(1.0);
            let pivot = visual_center().unwrap_or_else(|| frame.center());
            let mut matrix = Affine::translate(-pivot.x, -pivot.y);
            if let Some(degrees) = rotation {
                matrix = matrix.then(Affine::rotate(degrees));
            }
            matrix = matrix
                .then(Affine::scale(scale, scale))
                .then(Affine::translate(pivot.x, pivot.y));

            let mut svg = format!(
                "translate({} {}) scale({})",
                fmt_num(pivot.x),
                fmt_num(pivot.y),
                fmt_num(scale)
            );
            if let Some(degrees) = rotation {
                svg.push_str(&format!(" rotate({})", fmt_num(degrees)));
            }
            svg.push_str(&format!(
                " translate({} {})",
                fmt_num(-pivot.x),
                fmt_num(-pivot.y)
            ));
            ResolvedTransform {
                case,
                origin: Some(pivot),
                matrix,
                svg: Some(svg),
            }
        }
        TransformCase::ScaleOnly => {
            let scale = scale.unwrap_or(1.0);
            let pivot = frame.top_left();
            let matrix = Affine::translate(-pivot.x, -pivot.y)
                .then(Affine::scale(scale, scale))
                .then(Affine::translate(pivot.x, pivot.y));
            let svg = format!(
                "translate({} {}) scale({}) translate({} {})",
                fmt_num(pivot.x),
                fmt_num(pivot.y),
                fmt_num(scale),
                fmt_num(-pivot.x),
                fmt_num(-pivot.y)
            );
            ResolvedTransform {
                case,
                origin: Some(pivot),
                matrix,
                svg: Some(svg),
            }
        }
        TransformCase::RotationOnly => {
            let degrees = rotation.unwrap_or(0.0);
            let pivot = frame.center();
            let matrix = Affine::translate(-pivot.x, -pivot.y)
                .then(Affine::rotate(degrees))
                .then(Affine::translate(pivot.x, pivot.y));
            ResolvedTransform {
                case,
                origin: Some(pivot),
                matrix,
                svg: Some(rotate_attr(degrees, pivot)),
            }
        }
        TransformCase::None => ResolvedTransform::none(),
    }
}

/// `rotate(r x y)` around the text anchor; `None` when no rotation is set.
pub fn text_rotation(rotation: Option<f32>, anchor: Point) -> Option<String> {
    rotation
        .filter(|value| value.is_finite())
        .map(|degrees| rotate_attr(degrees, anchor))
}

fn rotate_attr(degrees: f32, pivot: Point) -> String {
    format!(
        "rotate({} {} {})",
        fmt_num(degrees),
        fmt_num(pivot.x),
        fmt_num(pivot.y)
    )
}
