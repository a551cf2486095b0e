use serde::{Deserialize, Serialize};

/// Engine fallbacks used when neither an override nor the template sets a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: String,
    pub font_color: String,
    pub stroke_color: String,
    pub stroke_width: f32,
    pub stroke_opacity: f32,
    pub stroke_linejoin: String,
    pub shape_fill: String,
    pub shape_stroke: String,
    pub shape_stroke_width: f32,
    pub opacity: f32,
    pub background: String,
}

impl Theme {
    pub fn badge_default() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 24.0,
            font_weight: "normal".to_string(),
            font_color: "#ffffff".to_string(),
            stroke_color: "#000000".to_string(),
            stroke_width: 0.0,
            stroke_opacity: 1.0,
            stroke_linejoin: "round".to_string(),
            shape_fill: "#000000".to_string(),
            shape_stroke: "none".to_string(),
            shape_stroke_width: 0.0,
            opacity: 1.0,
            background: "none".to_string(),
        }
    }

    /// White sheet with dark ink, for proofs that go to a printer.
    pub fn print() -> Self {
        Self {
            font_color: "#1C2430".to_string(),
            shape_fill: "#FFFFFF".to_string(),
            shape_stroke: "#1C2430".to_string(),
            shape_stroke_width: 1.0,
            background: "#FFFFFF".to_string(),
            ..Self::badge_default()
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::badge_default()
    }
}
