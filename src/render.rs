use crate::clip::{ClipDefinition, ClipStyle};
#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::compose::{Composition, RenderImage, RenderLayer, RenderShape, RenderText};
use crate::viewbox::ViewBox;
use anyhow::Result;
use std::path::Path;

const LINE_HEIGHT: f32 = 1.2;

/// Formats a coordinate with at most two decimals and no trailing zeros.
pub fn fmt_num(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Standalone SVG document. Wraps exactly the markup `render_layers` produces.
pub fn render_svg(composition: &Composition) -> String {
    let view_box = composition.view_box;
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{}\" height=\"{}\" viewBox=\"{}\">",
        fmt_num(composition.width),
        fmt_num(composition.height),
        view_box.to_attr()
    ));
    let background = composition.background.trim();
    if !background.is_empty() && background != "none" {
        svg.push_str(&format!(
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
            fmt_num(view_box.x),
            fmt_num(view_box.y),
            fmt_num(view_box.width),
            fmt_num(view_box.height),
            escape_xml(background)
        ));
    }
    svg.push_str(&render_layers(composition));
    svg.push_str("</svg>");
    svg
}

/// Embeddable fragment: clip definitions followed by the layers in paint order.
pub fn render_layers(composition: &Composition) -> String {
    let mut out = String::new();
    if !composition.clip_definitions.is_empty() {
        out.push_str("<defs>");
        for def in &composition.clip_definitions {
            out.push_str(&clip_definition_svg(def, composition.clip_style, &composition.view_box));
        }
        out.push_str("</defs>");
    }
    for layer in &composition.layers {
        let (markup, clip) = match layer {
            RenderLayer::Shape(shape) => (shape_svg(shape), None),
            RenderLayer::Text(text) => (text_svg(text), text.clip.as_deref()),
            RenderLayer::Image(image) => (image_svg(image), image.clip.as_deref()),
        };
        match clip {
            // The clip sits outside the transform so it stays in canvas space.
            Some(id) => out.push_str(&format!(
                "<g {}=\"url(#{})\">{}</g>",
                composition.clip_style.attribute(),
                escape_xml(id),
                markup
            )),
            None => out.push_str(&markup),
        }
    }
    out
}

fn clip_definition_svg(def: &ClipDefinition, style: ClipStyle, view_box: &ViewBox) -> String {
    let id = escape_xml(&def.id);
    let path = escape_xml(&def.path);
    match style {
        ClipStyle::ClipPath => format!(
            "<clipPath id=\"{id}\" clipPathUnits=\"userSpaceOnUse\"><path d=\"{path}\"/></clipPath>"
        ),
        ClipStyle::Mask => format!(
            "<mask id=\"{id}\" maskUnits=\"userSpaceOnUse\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"><path d=\"{path}\" fill=\"#ffffff\"/></mask>",
            fmt_num(view_box.x),
            fmt_num(view_box.y),
            fmt_num(view_box.width),
            fmt_num(view_box.height)
        ),
    }
}

fn shape_svg(shape: &RenderShape) -> String {
    let mut svg = format!(
        "<path d=\"{}\" fill=\"{}\"",
        escape_xml(&shape.path),
        escape_xml(&shape.fill)
    );
    if shape.stroke_width > 0.0 && shape.stroke != "none" {
        svg.push_str(&format!(
            " stroke=\"{}\" stroke-width=\"{}\" stroke-linejoin=\"{}\"",
            escape_xml(&shape.stroke),
            fmt_num(shape.stroke_width),
            escape_xml(&shape.stroke_linejoin)
        ));
    }
    if shape.opacity < 1.0 {
        svg.push_str(&format!(" opacity=\"{}\"", fmt_num(shape.opacity)));
    }
    svg.push_str(&format!(" data-layer-id=\"{}\"/>", escape_xml(&shape.id)));
    svg
}

fn text_svg(text: &RenderText) -> String {
    let mut svg = format!(
        "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" fill=\"{}\"",
        fmt_num(text.x),
        fmt_num(text.y),
        escape_xml(&text.font_family),
        fmt_num(text.font_size),
        escape_xml(&text.font_weight),
        escape_xml(&text.font_color)
    );
    if text.stroke_width > 0.0 {
        svg.push_str(&format!(
            " stroke=\"{}\" stroke-width=\"{}\" stroke-opacity=\"{}\" stroke-linejoin=\"{}\" paint-order=\"stroke\"",
            escape_xml(&text.stroke_color),
            fmt_num(text.stroke_width),
            fmt_num(text.stroke_opacity),
            escape_xml(&text.stroke_linejoin)
        ));
    }
    if let Some(transform) = &text.transform {
        svg.push_str(&format!(" transform=\"{}\"", transform));
    }
    svg.push_str(&format!(" data-layer-id=\"{}\">", escape_xml(&text.id)));

    let lines: Vec<&str> = text.text.lines().collect();
    if lines.len() <= 1 {
        svg.push_str(&escape_xml(lines.first().copied().unwrap_or_default()));
    } else {
        let line_height = text.font_size * LINE_HEIGHT;
        let first_dy = -(lines.len() as f32 - 1.0) / 2.0 * line_height;
        for (idx, line) in lines.iter().enumerate() {
            let dy = if idx == 0 { first_dy } else { line_height };
            svg.push_str(&format!(
                "<tspan x=\"{}\" dy=\"{}\">{}</tspan>",
                fmt_num(text.x),
                fmt_num(dy),
                escape_xml(line)
            ));
        }
    }
    svg.push_str("</text>");
    svg
}

fn image_svg(image: &RenderImage) -> String {
    let frame = &image.frame;
    let mut nested = format!(
        "<svg x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"",
        fmt_num(frame.x),
        fmt_num(frame.y),
        fmt_num(frame.width),
        fmt_num(frame.height)
    );
    for (prefix, uri) in &image.namespaces {
        nested.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape_xml(uri)));
    }
    if let Some(view_box) = &image.view_box {
        nested.push_str(&format!(
            " viewBox=\"{}\" preserveAspectRatio=\"xMidYMid meet\"",
            view_box.to_attr()
        ));
    }
    nested.push_str(&format!(
        " data-layer-id=\"{}\">{}</svg>",
        escape_xml(&image.id),
        image.content
    ));
    match &image.transform.svg {
        Some(transform) => format!("<g transform=\"{}\">{}</g>", transform, nested),
        None => nested,
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

/// Rasterizes through resvg, scaled to fit the configured size.
#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let tree_size = tree.size();
    let scale = if render_cfg.width > 0.0 && render_cfg.height > 0.0 {
        (render_cfg.width / tree_size.width()).min(render_cfg.height / tree_size.height())
    } else {
        1.0
    };
    let width = (tree_size.width() * scale).round().max(1.0) as u32;
    let height = (tree_size.height() * scale).round().max(1.0) as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate {width}x{height} pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap_mut,
    );
    pixmap.save_png(output)?;
    Ok(())
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::RenderScope;
    use crate::compose::compose;
    use crate::config::EngineConfig;
    use crate::template::{Overrides, Template, parse_overrides};
    use crate::theme::Theme;

    const TEMPLATE: &str = r##"{
        "id": "shield",
        "width": 300,
        "height": 300,
        "layers": [
            { "type": "shape", "id": "shield", "path": "M 0 0 H 300 V 300 H 0 Z", "fill": "#114477" },
            { "type": "text", "id": "name", "text": "Tom & Jerry", "position": { "x": 50, "y": 50 }, "clip": "shield" },
            { "type": "svgImage", "id": "logo", "position": { "x": 50, "y": 25 }, "width": 60, "height": 60,
              "svgContent": "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 10 10'><circle cx='5' cy='5' r='4'/></svg>",
              "rotation": 15 }
        ]
    }"##;

    fn composition(scope: &str, overrides: &Overrides, engine: &EngineConfig) -> Composition {
        compose(
            &Template::from_json(TEMPLATE).unwrap(),
            overrides,
            &Theme::badge_default(),
            engine,
            &RenderScope::new(scope),
        )
        .unwrap()
    }

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(fmt_num(10.0), "10");
        assert_eq!(fmt_num(2.5), "2.5");
        assert_eq!(fmt_num(1.23456), "1.23");
        assert_eq!(fmt_num(-0.001), "0");
        assert_eq!(fmt_num(f32::NAN), "0");
    }

    #[test]
    fn standalone_document_wraps_the_fragment() {
        let composition = composition("main", &Overrides::new(), &EngineConfig::default());
        let fragment = render_layers(&composition);
        let svg = render_svg(&composition);
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.contains("viewBox=\"0 0 300 300\""));
        assert!(svg.ends_with(&format!("{fragment}</svg>")));
    }

    #[test]
    fn renders_layers_in_paint_order() {
        let composition = composition("main", &Overrides::new(), &EngineConfig::default());
        let fragment = render_layers(&composition);
        let shape = fragment.find("data-layer-id=\"shield\"").unwrap();
        let text = fragment.find("data-layer-id=\"name\"").unwrap();
        let image = fragment.find("data-layer-id=\"logo\"").unwrap();
        assert!(shape < text && text < image);
        assert!(fragment.contains(">Tom &amp; Jerry</text>"));
        assert!(fragment.contains("fill=\"#ffffff\""));
        assert!(fragment.contains("<g transform=\"rotate(15 150 75)\"><svg x=\"120\" y=\"45\""));
        assert!(fragment.contains("<circle cx='5' cy='5' r='4'/>"));
    }

    #[test]
    fn clipped_layers_reference_scoped_definitions() {
        let composition = composition("thumb", &Overrides::new(), &EngineConfig::default());
        let fragment = render_layers(&composition);
        assert!(fragment.starts_with(
            "<defs><clipPath id=\"clip-shield-thumb\" clipPathUnits=\"userSpaceOnUse\"><path d=\"M 0 0 H 300 V 300 H 0 Z\"/></clipPath></defs>"
        ));
        assert!(fragment.contains("<g clip-path=\"url(#clip-shield-thumb)\"><text"));
    }

    #[test]
    fn mask_style_emits_masks() {
        let engine = EngineConfig {
            clip_style: ClipStyle::Mask,
            ..EngineConfig::default()
        };
        let fragment = render_layers(&composition("main", &Overrides::new(), &engine));
        assert!(fragment.contains("<mask id=\"clip-shield-main\" maskUnits=\"userSpaceOnUse\""));
        assert!(fragment.contains("<g mask=\"url(#clip-shield-main)\">"));
    }

    #[test]
    fn stroked_multiline_text() {
        let overrides =
            parse_overrides(r#"{ "name": { "text": "ONE\nTWO", "strokeWidth": 2, "fontSize": 10 } }"#)
                .unwrap();
        let fragment = render_layers(&composition("main", &overrides, &EngineConfig::default()));
        assert!(fragment.contains("stroke-width=\"2\""));
        assert!(fragment.contains("<tspan x=\"150\" dy=\"-6\">ONE</tspan><tspan x=\"150\" dy=\"12\">TWO</tspan>"));
    }

    #[test]
    fn preview_and_export_match_for_same_scope() {
        let first = render_svg(&composition("a", &Overrides::new(), &EngineConfig::default()));
        let second = render_svg(&composition("a", &Overrides::new(), &EngineConfig::default()));
        assert_eq!(first, second);
        let other = render_svg(&composition("b", &Overrides::new(), &EngineConfig::default()));
        assert_ne!(first, other);
    }
}
