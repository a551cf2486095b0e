use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Anchor in percentage space (0–100) relative to the template canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Percentage to absolute coordinate. Values outside 0–100 extrapolate.
pub fn resolve(percent: f32, extent: f32) -> f32 {
    (percent / 100.0) * extent
}

pub fn resolve_position(position: Position, width: f32, height: f32) -> Point {
    Point::new(resolve(position.x, width), resolve(position.y, height))
}
