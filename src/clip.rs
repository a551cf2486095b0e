use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::template::{Layer, ShapeLayer};

/// Which SVG element clip definitions are emitted as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipStyle {
    #[default]
    ClipPath,
    Mask,
}

impl ClipStyle {
    /// Attribute a clipped element uses to reference its definition.
    pub fn attribute(&self) -> &'static str {
        match self {
            ClipStyle::ClipPath => "clip-path",
            ClipStyle::Mask => "mask",
        }
    }
}

/// Suffix that keeps definition ids unique per render instance, so the same
/// template can be rendered more than once into one document.
///
/// Every id component is escaped so that only ASCII alphanumerics and `_`
/// remain, which leaves `-` free to separate components. Distinct inputs
/// therefore never produce the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderScope(String);

impl RenderScope {
    pub fn new(raw: &str) -> Self {
        let escaped = escape_id(raw.trim());
        if escaped.is_empty() {
            Self::default()
        } else {
            Self(escaped)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn clip_id(&self, shape_id: &str) -> String {
        format!("clip-{}-{}", escape_id(shape_id), self.0)
    }

    /// Id for an element declared inside an embedded image's content.
    pub fn content_id(&self, layer_id: &str, local_id: &str) -> String {
        format!("img-{}-{}-{}", escape_id(layer_id), escape_id(local_id), self.0)
    }
}

impl Default for RenderScope {
    fn default() -> Self {
        Self("main".to_string())
    }
}

/// Keeps ASCII alphanumerics; every other byte becomes `_xx` (lowercase hex).
fn escape_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("_{byte:02x}"));
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipDefinition {
    pub id: String,
    pub shape_id: String,
    pub path: String,
}

/// One definition per distinct referenced shape, in first-reference order.
/// References that name no shape are skipped.
pub fn generate_clip_definitions<'a, I>(
    shapes: &[&ShapeLayer],
    references: I,
    scope: &RenderScope,
) -> Vec<ClipDefinition>
where
    I: IntoIterator<Item = &'a str>,
{
    let by_id: HashMap<&str, &ShapeLayer> =
        shapes.iter().map(|shape| (shape.id.as_str(), *shape)).collect();
    let mut definitions: Vec<ClipDefinition> = Vec::new();
    for reference in references {
        if definitions.iter().any(|def| def.shape_id == reference) {
            continue;
        }
        let Some(shape) = by_id.get(reference) else {
            tracing::debug!(reference, "clip reference names no shape layer; rendering unclipped");
            continue;
        };
        definitions.push(ClipDefinition {
            id: scope.clip_id(&shape.id),
            shape_id: shape.id.clone(),
            path: shape.path.clone(),
        });
    }
    definitions
}

/// Collects clip references from text and image layers in paint order.
pub fn clip_definitions_for(layers: &[Layer], scope: &RenderScope) -> Vec<ClipDefinition> {
    let shapes: Vec<&ShapeLayer> = layers
        .iter()
        .filter_map(|layer| match layer {
            Layer::Shape(shape) => Some(shape),
            _ => None,
        })
        .collect();
    generate_clip_definitions(
        &shapes,
        layers.iter().filter_map(Layer::clip_reference),
        scope,
    )
}
