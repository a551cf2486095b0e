use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

use crate::position::Position;
use crate::viewbox::ViewBox;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template is not valid JSON: {0}")]
    Parse(#[source] json5::Error),
    #[error("overrides are not valid JSON: {0}")]
    ParseOverrides(#[source] json5::Error),
    #[error("template `{id}` has invalid canvas size {width}x{height}")]
    InvalidCanvas { id: String, width: f32, height: f32 },
    #[error("layer #{index} has an empty id")]
    EmptyLayerId { index: usize },
    #[error("layer id `{0}` is declared more than once")]
    DuplicateLayerId(String),
    #[error("layer `{id}`: {reason}")]
    InvalidLayer { id: String, reason: String },
}

/// Numeric weights and CSS keywords are both accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontWeight {
    Number(f32),
    Keyword(String),
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontWeight::Number(weight) => write!(f, "{}", weight),
            FontWeight::Keyword(keyword) => f.write_str(keyword),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeLayer {
    pub id: String,
    pub path: String,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f32>,
    pub stroke_linejoin: Option<String>,
    pub opacity: Option<f32>,
    #[serde(default)]
    pub z_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub position: Position,
    pub rotation: Option<f32>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub font_weight: Option<FontWeight>,
    pub font_color: Option<String>,
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f32>,
    pub stroke_opacity: Option<f32>,
    pub stroke_linejoin: Option<String>,
    pub clip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgImageLayer {
    pub id: String,
    /// Center of the image box.
    pub position: Position,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub svg_content: String,
    pub transform_origin: Option<String>,
    pub scale: Option<f32>,
    pub rotation: Option<f32>,
    pub clip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Layer {
    Shape(ShapeLayer),
    Text(TextLayer),
    SvgImage(SvgImageLayer),
}

impl Layer {
    pub fn id(&self) -> &str {
        match self {
            Layer::Shape(shape) => &shape.id,
            Layer::Text(text) => &text.id,
            Layer::SvgImage(image) => &image.id,
        }
    }

    /// Shape id this layer asks to be clipped by.
    pub fn clip_reference(&self) -> Option<&str> {
        match self {
            Layer::Shape(_) => None,
            Layer::Text(text) => text.clip.as_deref(),
            Layer::SvgImage(image) => image.clip.as_deref(),
        }
        .filter(|reference| !reference.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub width: f32,
    pub height: f32,
    pub view_box: Option<ViewBox>,
    /// Paint order, back to front.
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl Template {
    /// Parses a JSON (or JSON5) template and validates its structure.
    pub fn from_json(input: &str) -> Result<Self, TemplateError> {
        let template: Template = json5::from_str(input).map_err(TemplateError::Parse)?;
        template.validate()?;
        Ok(template)
    }

    pub fn view_box(&self) -> ViewBox {
        self.view_box.unwrap_or(ViewBox {
            x: 0.0,
            y: 0.0,
            width: self.width,
            height: self.height,
        })
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        let canvas_ok = self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0;
        if !canvas_ok {
            return Err(TemplateError::InvalidCanvas {
                id: self.id.clone(),
                width: self.width,
                height: self.height,
            });
        }

        let mut seen = HashSet::new();
        for (index, layer) in self.layers.iter().enumerate() {
            let id = layer.id();
            if id.trim().is_empty() {
                return Err(TemplateError::EmptyLayerId { index });
            }
            if !seen.insert(id) {
                return Err(TemplateError::DuplicateLayerId(id.to_string()));
            }
            validate_layer(layer)?;
        }
        Ok(())
    }
}

fn validate_layer(layer: &Layer) -> Result<(), TemplateError> {
    let invalid = |reason: &str| TemplateError::InvalidLayer {
        id: layer.id().to_string(),
        reason: reason.to_string(),
    };
    match layer {
        Layer::Shape(shape) => {
            if shape.path.trim().is_empty() {
                return Err(invalid("shape path is empty"));
            }
        }
        Layer::Text(text) => {
            if !text.position.is_finite() {
                return Err(invalid("position must be finite"));
            }
        }
        Layer::SvgImage(image) => {
            if !image.position.is_finite() {
                return Err(invalid("position must be finite"));
            }
            let size_ok = image.width.is_finite()
                && image.height.is_finite()
                && image.width > 0.0
                && image.height > 0.0;
            if !size_ok {
                return Err(invalid("image size must be positive"));
            }
        }
    }
    Ok(())
}

/// Per-layer user edits. Every field is optional; absent fields fall through
/// to the template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerOverride {
    pub text: Option<String>,
    pub position: Option<Position>,
    pub rotation: Option<f32>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub font_weight: Option<FontWeight>,
    pub font_color: Option<String>,
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f32>,
    pub stroke_opacity: Option<f32>,
    pub stroke_linejoin: Option<String>,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub opacity: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub svg_content: Option<String>,
    pub transform_origin: Option<String>,
    pub scale: Option<f32>,
}

/// Overrides keyed by layer id.
pub type Overrides = BTreeMap<String, LayerOverride>;

pub fn parse_overrides(input: &str) -> Result<Overrides, TemplateError> {
    json5::from_str(input).map_err(TemplateError::ParseOverrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BADGE: &str = r##"{
        id: "round",
        width: 200,
        height: 100,
        layers: [
            { type: "shape", id: "bg", path: "M 0 0 H 200 V 100 H 0 Z", fill: "#223344" },
            { type: "text", id: "title", text: "HELLO", position: { x: 50, y: 50 }, fontWeight: "bold", clip: "bg" },
            { type: "svgImage", id: "icon", position: { x: 20, y: 50 }, width: 40, height: 40,
              svgContent: "<svg xmlns='http://www.w3.org/2000/svg'/>", scale: 1.5 },
        ],
    }"##;

    #[test]
    fn parses_json5_template() {
        let template = Template::from_json(BADGE).unwrap();
        assert_eq!(template.layers.len(), 3);
        assert_eq!(template.layers[1].clip_reference(), Some("bg"));
        assert_eq!(template.view_box(), ViewBox::new(0.0, 0.0, 200.0, 100.0).unwrap());
        assert!(matches!(template.layers[0], Layer::Shape(_)));
        let Layer::Text(text) = &template.layers[1] else {
            panic!("expected text layer");
        };
        assert_eq!(text.font_weight, Some(FontWeight::Keyword("bold".to_string())));
    }

    #[test]
    fn explicit_view_box_accepts_string() {
        let template = Template::from_json(
            r#"{"id":"t","width":10,"height":10,"viewBox":"-5 -5 20 20","layers":[]}"#,
        )
        .unwrap();
        assert_eq!(template.view_box().x, -5.0);
        assert_eq!(template.view_box().width, 20.0);
    }

    #[test]
    fn duplicate_ids_fail_loudly() {
        let err = Template::from_json(
            r#"{"id":"t","width":10,"height":10,"layers":[
                {"type":"shape","id":"a","path":"M0 0 L1 1"},
                {"type":"shape","id":"a","path":"M0 0 L1 1"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateLayerId(id) if id == "a"));
    }

    #[test]
    fn missing_required_fields_fail_loudly() {
        let err = Template::from_json(
            r#"{"id":"t","width":10,"height":10,"layers":[{"type":"text","id":"a"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Parse(_)));

        let err = Template::from_json(
            r#"{"id":"t","width":10,"height":10,"layers":[{"type":"shape","id":"","path":"M0 0"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::EmptyLayerId { index: 0 }));
    }

    #[test]
    fn invalid_canvas_and_image_size_are_rejected() {
        let err = Template::from_json(r#"{"id":"t","width":0,"height":10}"#).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidCanvas { .. }));

        let err = Template::from_json(
            r#"{"id":"t","width":10,"height":10,"layers":[
                {"type":"svgImage","id":"i","position":{"x":0,"y":0},"width":-1,"height":4}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::InvalidLayer { id, .. } if id == "i"));
    }

    #[test]
    fn parses_overrides_keyed_by_layer() {
        let overrides =
            parse_overrides(r##"{ title: { fontColor: "#ff0000", fontWeight: 700, scale: Infinity } }"##)
                .unwrap();
        let title = &overrides["title"];
        assert_eq!(title.font_color.as_deref(), Some("#ff0000"));
        assert_eq!(title.font_weight, Some(FontWeight::Number(700.0)));
        assert_eq!(title.font_weight.as_ref().map(|w| w.to_string()), Some("700".to_string()));
        assert!(title.scale.is_some_and(|scale| scale.is_infinite()));
    }
}
