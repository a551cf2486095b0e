//! Merges template layers with user overrides into the ordered list of
//! render-ready layers. Field precedence is override, then template, then the
//! theme fallback.

use serde::Serialize;
use std::collections::HashMap;

use crate::clip::{ClipDefinition, ClipStyle, RenderScope, clip_definitions_for};
use crate::config::{EngineConfig, GeometryConfig};
use crate::geometry::{
    GeometryAnalysis, Point, ShapeGeometry, analyze_geometry, inspect_svg, rename_ids,
};
use crate::position::{Position, resolve_position};
use crate::template::{
    Layer, LayerOverride, Overrides, ShapeLayer, SvgImageLayer, Template, TemplateError, TextLayer,
};
use crate::theme::Theme;
use crate::transform::{
    ContentPlacement, ImageFrame, ResolvedTransform, TransformOrigin, TransformOriginError,
    resolve_image_transform, text_rotation,
};
use crate::viewbox::ViewBox;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderShape {
    pub id: String,
    pub path: String,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f32,
    pub stroke_linejoin: String,
    pub opacity: f32,
    pub z_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderText {
    pub id: String,
    pub text: String,
    /// Anchor; text is centered on it on both axes.
    pub x: f32,
    pub y: f32,
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: String,
    pub font_color: String,
    pub stroke_color: String,
    pub stroke_width: f32,
    pub stroke_opacity: f32,
    pub stroke_linejoin: String,
    pub transform: Option<String>,
    /// Id of the clip definition to apply.
    pub clip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderImage {
    pub id: String,
    pub frame: ImageFrame,
    pub view_box: Option<ViewBox>,
    /// Prefixed namespaces the embedded root declared.
    #[serde(skip)]
    pub namespaces: Vec<(String, String)>,
    /// Inner markup of the embedded document, with its ids scoped.
    #[serde(skip)]
    pub content: String,
    pub transform: ResolvedTransform,
    pub clip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderLayer {
    Shape(RenderShape),
    Text(RenderText),
    Image(RenderImage),
}

impl RenderLayer {
    pub fn id(&self) -> &str {
        match self {
            RenderLayer::Shape(shape) => &shape.id,
            RenderLayer::Text(text) => &text.id,
            RenderLayer::Image(image) => &image.id,
        }
    }
}

/// Everything a renderer needs, in paint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub template_id: String,
    pub width: f32,
    pub height: f32,
    pub view_box: ViewBox,
    pub background: String,
    pub scope: RenderScope,
    pub clip_style: ClipStyle,
    pub clip_definitions: Vec<ClipDefinition>,
    pub layers: Vec<RenderLayer>,
}

struct Merge<'a> {
    layer: &'a str,
    over: &'a LayerOverride,
}

impl Merge<'_> {
    fn number(&self, field: &'static str, over: Option<f32>, template: Option<f32>) -> Option<f32> {
        if let Some(value) = over {
            if value.is_finite() {
                return Some(value);
            }
            tracing::debug!(layer = self.layer, field, value, "ignoring non-finite override");
        }
        template.filter(|value| value.is_finite())
    }

    fn positive(&self, field: &'static str, over: Option<f32>, template: f32) -> f32 {
        match self.number(field, over, None) {
            Some(value) if value > 0.0 => value,
            Some(value) => {
                tracing::debug!(layer = self.layer, field, value, "ignoring non-positive override");
                template
            }
            None => template,
        }
    }

    fn string(&self, over: &Option<String>, template: &Option<String>, fallback: &str) -> String {
        over.as_ref()
            .or(template.as_ref())
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }

    fn position(&self, template: Position) -> Position {
        let Some(over) = self.over.position else {
            return template;
        };
        Position::new(
            self.number("position.x", Some(over.x), None).unwrap_or(template.x),
            self.number("position.y", Some(over.y), None).unwrap_or(template.y),
        )
    }
}

pub fn compose(
    template: &Template,
    overrides: &Overrides,
    theme: &Theme,
    engine: &EngineConfig,
    scope: &RenderScope,
) -> Result<Composition, TemplateError> {
    template.validate()?;
    for id in overrides.keys() {
        if template.layer(id).is_none() {
            tracing::debug!(layer = %id, template = %template.id, "override names no layer; ignoring");
        }
    }

    let clip_definitions = clip_definitions_for(&template.layers, scope);
    let clip_ids: HashMap<&str, &str> = clip_definitions
        .iter()
        .map(|def| (def.shape_id.as_str(), def.id.as_str()))
        .collect();
    let resolve_clip = |reference: Option<&String>| -> Option<String> {
        let reference = reference.filter(|reference| !reference.is_empty())?;
        clip_ids.get(reference.as_str()).map(|id| id.to_string())
    };

    let empty = LayerOverride::default();
    let layers = template
        .layers
        .iter()
        .map(|layer| {
            let merge = Merge {
                layer: layer.id(),
                over: overrides.get(layer.id()).unwrap_or(&empty),
            };
            match layer {
                Layer::Shape(shape) => RenderLayer::Shape(compose_shape(shape, &merge, theme)),
                Layer::Text(text) => {
                    let mut resolved = compose_text(text, &merge, theme, template);
                    resolved.clip = resolve_clip(text.clip.as_ref());
                    RenderLayer::Text(resolved)
                }
                Layer::SvgImage(image) => {
                    let mut resolved =
                        compose_image(image, &merge, template, &engine.geometry, scope);
                    resolved.clip = resolve_clip(image.clip.as_ref());
                    RenderLayer::Image(resolved)
                }
            }
        })
        .collect();

    Ok(Composition {
        template_id: template.id.clone(),
        width: template.width,
        height: template.height,
        view_box: template.view_box(),
        background: theme.background.clone(),
        scope: scope.clone(),
        clip_style: engine.clip_style,
        clip_definitions,
        layers,
    })
}

fn compose_shape(shape: &ShapeLayer, merge: &Merge<'_>, theme: &Theme) -> RenderShape {
    let over = merge.over;
    RenderShape {
        id: shape.id.clone(),
        path: shape.path.clone(),
        fill: merge.string(&over.fill, &shape.fill, &theme.shape_fill),
        stroke: merge.string(&over.stroke, &shape.stroke, &theme.shape_stroke),
        stroke_width: merge
            .number("strokeWidth", over.stroke_width, shape.stroke_width)
            .unwrap_or(theme.shape_stroke_width),
        stroke_linejoin: merge.string(
            &over.stroke_linejoin,
            &shape.stroke_linejoin,
            &theme.stroke_linejoin,
        ),
        opacity: merge
            .number("opacity", over.opacity, shape.opacity)
            .unwrap_or(theme.opacity),
        z_index: shape.z_index,
    }
}

fn compose_text(text: &TextLayer, merge: &Merge<'_>, theme: &Theme, template: &Template) -> RenderText {
    let over = merge.over;
    let anchor = resolve_position(merge.position(text.position), template.width, template.height);
    let rotation = merge.number("rotation", over.rotation, text.rotation);
    let font_weight = over
        .font_weight
        .as_ref()
        .or(text.font_weight.as_ref())
        .map(|weight| weight.to_string())
        .unwrap_or_else(|| theme.font_weight.clone());

    RenderText {
        id: text.id.clone(),
        text: over.text.clone().unwrap_or_else(|| text.text.clone()),
        x: anchor.x,
        y: anchor.y,
        font_family: merge.string(&over.font_family, &text.font_family, &theme.font_family),
        font_size: merge
            .number("fontSize", over.font_size, text.font_size)
            .unwrap_or(theme.font_size),
        font_weight,
        font_color: merge.string(&over.font_color, &text.font_color, &theme.font_color),
        stroke_color: merge.string(&over.stroke_color, &text.stroke_color, &theme.stroke_color),
        stroke_width: merge
            .number("strokeWidth", over.stroke_width, text.stroke_width)
            .unwrap_or(theme.stroke_width),
        stroke_opacity: merge
            .number("strokeOpacity", over.stroke_opacity, text.stroke_opacity)
            .unwrap_or(theme.stroke_opacity),
        stroke_linejoin: merge.string(
            &over.stroke_linejoin,
            &text.stroke_linejoin,
            &theme.stroke_linejoin,
        ),
        transform: text_rotation(rotation, anchor),
        clip: None,
    }
}

fn parse_origin(layer: &str, raw: Option<&str>) -> Option<TransformOrigin> {
    match raw?.parse::<TransformOrigin>() {
        Ok(origin) => Some(origin),
        Err(TransformOriginError::Empty) => None,
        Err(err) => {
            tracing::debug!(layer, %err, "ignoring transform origin");
            None
        }
    }
}

fn compose_image(
    image: &SvgImageLayer,
    merge: &Merge<'_>,
    template: &Template,
    geometry: &GeometryConfig,
    scope: &RenderScope,
) -> RenderImage {
    let over = merge.over;
    let center = resolve_position(merge.position(image.position), template.width, template.height);
    let width = merge.positive("width", over.width, image.width);
    let height = merge.positive("height", over.height, image.height);
    let frame = ImageFrame::centered(center, width, height);

    let content = over.svg_content.as_deref().unwrap_or(&image.svg_content);
    let markup = match inspect_svg(content) {
        Ok(markup) => Some(markup),
        Err(err) => {
            tracing::warn!(layer = %image.id, %err, "svg content could not be parsed; rendering empty");
            None
        }
    };
    let view_box = markup.as_ref().and_then(|markup| {
        let declared = markup.view_box.as_deref().and_then(|raw| match ViewBox::parse(raw) {
            Ok(view_box) => Some(view_box),
            Err(err) => {
                tracing::debug!(layer = %image.id, %err, "ignoring embedded viewBox");
                None
            }
        });
        declared.or_else(|| ViewBox::new(0.0, 0.0, markup.width?, markup.height?).ok())
    });

    let origin = parse_origin(
        &image.id,
        over.transform_origin
            .as_deref()
            .or(image.transform_origin.as_deref()),
    );
    let transform = resolve_image_transform(
        merge.number("scale", over.scale, image.scale),
        merge.number("rotation", over.rotation, image.rotation),
        origin.as_ref(),
        &frame,
        || {
            let markup = markup.as_ref()?;
            let analysis = analyze_geometry(&markup.shapes, geometry);
            if !analysis.is_analyzable() {
                return None;
            }
            tracing::debug!(
                layer = %image.id,
                shape = analysis.shape_type.as_str(),
                use_centroid = analysis.use_centroid,
                "pivoting on analyzed content"
            );
            let center = analysis.visual_center();
            Some(match &view_box {
                Some(view_box) => ContentPlacement::new(view_box, &frame).map(center),
                None => Point::new(frame.x + center.x, frame.y + center.y),
            })
        },
    );

    tracing::trace!(layer = %image.id, case = transform.case.as_str(), "resolved image transform");

    let (namespaces, content) = match markup {
        Some(markup) => {
            let content = rename_ids(&markup.inner, &markup.ids, |local| {
                scope.content_id(&image.id, local)
            });
            (markup.namespaces, content)
        }
        None => (Vec::new(), String::new()),
    };

    RenderImage {
        id: image.id.clone(),
        frame,
        view_box,
        namespaces,
        content,
        transform,
        clip: None,
    }
}

/// Shape layers ordered by `zIndex`; ties keep declaration order.
pub fn shapes_by_z_index(layers: &[Layer]) -> Vec<&ShapeLayer> {
    let mut shapes: Vec<&ShapeLayer> = layers
        .iter()
        .filter_map(|layer| match layer {
            Layer::Shape(shape) => Some(shape),
            _ => None,
        })
        .collect();
    shapes.sort_by_key(|shape| shape.z_index);
    shapes
}

/// Analyzes every shape layer as one composite outline.
pub fn analyze_template_shapes(template: &Template, config: &GeometryConfig) -> GeometryAnalysis {
    let shapes: Vec<ShapeGeometry> = shapes_by_z_index(&template.layers)
        .into_iter()
        .map(|shape| ShapeGeometry::Path {
            d: shape.path.clone(),
        })
        .collect();
    analyze_geometry(&shapes, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ShapeType;
    use crate::template::parse_overrides;
    use crate::transform::TransformCase;

    const STAR_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><path d="M 50 0 L 61.756 33.820 L 97.553 34.549 L 69.021 56.180 L 79.389 90.451 L 50 70 L 20.611 90.451 L 30.979 56.180 L 2.447 34.549 L 38.244 33.820 Z"/></svg>"#;

    fn template() -> Template {
        let json = format!(
            r##"{{
                "id": "badge",
                "width": 200,
                "height": 200,
                "layers": [
                    {{ "type": "shape", "id": "ring", "path": "M 0 0 H 200 V 200 H 0 Z", "fill": "#102030", "zIndex": 2 }},
                    {{ "type": "shape", "id": "inner", "path": "M 50 50 H 150 V 150 H 50 Z" }},
                    {{ "type": "text", "id": "declared", "text": "TOP", "position": {{ "x": 50, "y": 20 }}, "fontColor": "#abcdef", "clip": "ring" }},
                    {{ "type": "text", "id": "plain", "text": "BOTTOM", "position": {{ "x": 50, "y": 80 }}, "rotation": 10, "clip": "nowhere" }},
                    {{ "type": "svgImage", "id": "star", "position": {{ "x": 50, "y": 50 }}, "width": 100, "height": 100,
                       "svgContent": {content}, "transformOrigin": "center", "clip": "ring" }}
                ]
            }}"##,
            content = serde_json::to_string(STAR_SVG).unwrap()
        );
        Template::from_json(&json).unwrap()
    }

    fn compose_with(overrides: &str) -> Composition {
        compose(
            &template(),
            &parse_overrides(overrides).unwrap(),
            &Theme::badge_default(),
            &EngineConfig::default(),
            &RenderScope::default(),
        )
        .unwrap()
    }

    fn text<'a>(composition: &'a Composition, id: &str) -> &'a RenderText {
        composition
            .layers
            .iter()
            .find_map(|layer| match layer {
                RenderLayer::Text(text) if text.id == id => Some(text),
                _ => None,
            })
            .unwrap()
    }

    fn image<'a>(composition: &'a Composition, id: &str) -> &'a RenderImage {
        composition
            .layers
            .iter()
            .find_map(|layer| match layer {
                RenderLayer::Image(image) if image.id == id => Some(image),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn font_color_precedence() {
        let composition = compose_with(r##"{ "declared": { "fontColor": "#ff0000" } }"##);
        assert_eq!(text(&composition, "declared").font_color, "#ff0000");
        assert_eq!(text(&composition, "plain").font_color, "#ffffff");

        let composition = compose_with("{}");
        assert_eq!(text(&composition, "declared").font_color, "#abcdef");
        assert_eq!(text(&composition, "declared").stroke_width, 0.0);
    }

    #[test]
    fn paint_order_follows_declaration() {
        let composition = compose_with("{}");
        let ids: Vec<&str> = composition.layers.iter().map(RenderLayer::id).collect();
        assert_eq!(ids, vec!["ring", "inner", "declared", "plain", "star"]);
    }

    #[test]
    fn positions_and_rotation_are_resolved() {
        let composition = compose_with(r#"{ "plain": { "position": { "x": 25, "y": 110 } } }"#);
        let plain = text(&composition, "plain");
        assert_eq!((plain.x, plain.y), (50.0, 220.0));
        assert_eq!(plain.transform.as_deref(), Some("rotate(10 50 220)"));
        assert_eq!(text(&composition, "declared").transform, None);
    }

    #[test]
    fn clips_resolve_to_scoped_definitions() {
        let composition = compose_with("{}");
        assert_eq!(composition.clip_definitions.len(), 1);
        assert_eq!(
            text(&composition, "declared").clip.as_deref(),
            Some("clip-ring-main")
        );
        assert_eq!(text(&composition, "plain").clip, None);
        assert_eq!(image(&composition, "star").clip.as_deref(), Some("clip-ring-main"));
    }

    #[test]
    fn non_finite_and_unknown_overrides_are_ignored() {
        let composition = compose_with(
            r#"{ "declared": { "fontSize": NaN, "strokeWidth": 2 }, "ghost": { "fontColor": "red" } }"#,
        );
        let declared = text(&composition, "declared");
        assert_eq!(declared.font_size, Theme::badge_default().font_size);
        assert_eq!(declared.stroke_width, 2.0);
    }

    #[test]
    fn image_without_scale_has_no_transform() {
        let composition = compose_with("{}");
        let star = image(&composition, "star");
        assert_eq!(star.transform.case, TransformCase::None);
        assert_eq!(star.frame.x, 50.0);
        assert!(star.content.starts_with("<path"));
        assert_eq!(star.view_box, ViewBox::new(0.0, 0.0, 100.0, 100.0).ok());
    }

    #[test]
    fn visual_origin_uses_star_centroid() {
        let composition = compose_with(r#"{ "star": { "scale": 1.5 } }"#);
        let star = image(&composition, "star");
        assert_eq!(star.transform.case, TransformCase::ScaleWithOrigin);
        let origin = star.transform.origin.unwrap();
        assert!((origin.x - 100.0).abs() < 0.1, "origin {origin:?}");
        assert!((origin.y - 100.0).abs() < 0.1, "origin {origin:?}");
    }

    #[test]
    fn explicit_origin_still_pivots_on_the_analyzed_center() {
        let composition =
            compose_with(r#"{ "star": { "scale": 2, "transformOrigin": "left top" } }"#);
        let star = image(&composition, "star");
        assert_eq!(star.transform.case, TransformCase::ScaleWithOrigin);
        let origin = star.transform.origin.unwrap();
        assert!((origin.x - 100.0).abs() < 0.1, "origin {origin:?}");
        assert!((origin.y - 100.0).abs() < 0.1, "origin {origin:?}");
    }

    #[test]
    fn unanalyzable_content_pivots_on_the_frame_center() {
        let composition = compose_with(
            r#"{ "star": { "scale": 2, "transformOrigin": "25% 75%", "svgContent": "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 10 10'/>" } }"#,
        );
        let star = image(&composition, "star");
        assert_eq!(star.transform.origin, Some(Point::new(100.0, 100.0)));
    }

    #[test]
    fn embedded_ids_are_scoped_per_layer() {
        let composition = compose_with(
            r##"{ "star": { "svgContent": "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 10 10'><defs><linearGradient id='shine'/></defs><rect width='10' height='10' fill='url(#shine)'/></svg>" } }"##,
        );
        let star = image(&composition, "star");
        assert!(star.content.contains("id='img-star-shine-main'"));
        assert!(star.content.contains("fill='url(#img-star-shine-main)'"));
    }

    #[test]
    fn broken_svg_content_renders_empty() {
        let composition = compose_with(r#"{ "star": { "svgContent": "<svg><g></svg>", "rotation": 5 } }"#);
        let star = image(&composition, "star");
        assert!(star.content.is_empty());
        assert_eq!(star.view_box, None);
        assert_eq!(star.transform.case, TransformCase::RotationOnly);
    }

    #[test]
    fn shapes_sort_by_z_index_stably() {
        let template = template();
        let ids: Vec<&str> = shapes_by_z_index(&template.layers)
            .iter()
            .map(|shape| shape.id.as_str())
            .collect();
        assert_eq!(ids, vec!["inner", "ring"]);
    }

    #[test]
    fn composite_shapes_are_analyzed_together() {
        let analysis = analyze_template_shapes(&template(), &GeometryConfig::default());
        assert_eq!(analysis.bounding_box_center, Point::new(100.0, 100.0));
        assert_eq!(analysis.shape_type, ShapeType::Generic);
        assert!(!analysis.use_centroid);
    }

    #[test]
    fn invalid_template_fails_loudly() {
        let mut template = template();
        template.width = f32::NAN;
        let result = compose(
            &template,
            &Overrides::new(),
            &Theme::badge_default(),
            &EngineConfig::default(),
            &RenderScope::default(),
        );
        assert!(matches!(result, Err(TemplateError::InvalidCanvas { .. })));
    }
}
