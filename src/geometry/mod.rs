//! Path parsing, flattening and shape analysis.
//!
//! Everything in here is a pure function of its inputs. Malformed geometry never
//! panics or propagates an error out of the analyzers; it degrades to a
//! `generic` classification with a low confidence instead.

mod analyze;
mod classify;
mod markup;
mod path;
mod primitives;

use serde::Serialize;

pub use analyze::{GeometryAnalysis, analyze_geometry, analyze_path, analyze_svg_content};
pub use classify::ShapeType;
pub use markup::{MarkupError, SvgMarkup, inspect_svg, rename_ids};
pub use path::{PathError, PathSegment, parse_path, parse_path_lenient};
pub use primitives::{ShapeGeometry, parse_points};

pub(crate) use path::{Contour, flatten, segment_bounds};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned bounds in user units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    pub fn from_point(point: Point) -> Self {
        Self {
            min_x: point.x,
            min_y: point.y,
            max_x: point.x,
            max_y: point.y,
        }
    }

    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter().filter(|p| p.x.is_finite() && p.y.is_finite());
        let first = iter.next()?;
        let mut bounds = Self::from_point(first);
        for point in iter {
            bounds.include(point);
        }
        Some(bounds)
    }

    pub fn include(&mut self, point: Point) {
        if !point.x.is_finite() || !point.y.is_finite() {
            return;
        }
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn max_extent(&self) -> f32 {
        self.width().max(self.height())
    }
}
