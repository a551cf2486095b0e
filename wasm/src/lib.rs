use badge_composer::{RenderOptions, render_with_options};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BadgeRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    scope: Option<String>,
}

fn build_render_options(options: BadgeRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("print") {
        RenderOptions::print()
    } else {
        RenderOptions::badge_default()
    };

    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size.filter(|size| size.is_finite() && *size > 0.0) {
        render_options.theme.font_size = font_size;
    }
    if let Some(scope) = options.scope {
        render_options = render_options.with_scope(&scope);
    }

    render_options
}

/// Renders a template (plus optional per-layer overrides) to a standalone SVG string.
#[wasm_bindgen]
pub fn render_badge_svg(
    template_json: &str,
    overrides_json: Option<String>,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<BadgeRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        BadgeRenderOptions::default()
    };

    let render_options = build_render_options(options);
    render_with_options(template_json, overrides_json.as_deref(), render_options)
        .map_err(|error| JsValue::from_str(&error.to_string()))
}
