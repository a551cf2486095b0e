pub mod analysis_dump;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clip;
pub mod compose;
pub mod config;
pub mod geometry;
pub mod position;
pub mod render;
pub mod template;
pub mod theme;
pub mod transform;
pub mod viewbox;

pub use analysis_dump::{AnalysisDump, write_analysis_dump};
#[cfg(feature = "cli")]
pub use cli::run;
pub use clip::{ClipDefinition, ClipStyle, RenderScope, clip_definitions_for, generate_clip_definitions};
pub use compose::{Composition, RenderLayer, analyze_template_shapes, compose, shapes_by_z_index};
pub use config::{Config, EngineConfig, GeometryConfig, RenderConfig, ViewBoxFitConfig, load_config};
pub use geometry::{GeometryAnalysis, ShapeType, analyze_geometry, analyze_path, analyze_svg_content};
pub use position::{Position, resolve, resolve_position};
pub use render::{render_layers, render_svg};
pub use template::{Layer, LayerOverride, Overrides, Template, TemplateError, parse_overrides};
pub use theme::Theme;
pub use transform::{TransformCase, TransformOrigin, classify_transform};
pub use viewbox::{Severity, ViewBox, ViewBoxFitAnalysis, analyze_fit, analyze_viewbox_fit};

/// Everything besides the template needed to produce a document.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub theme: Theme,
    pub engine: EngineConfig,
    pub scope: RenderScope,
}

impl RenderOptions {
    pub fn badge_default() -> Self {
        Self::default()
    }

    pub fn print() -> Self {
        Self {
            theme: Theme::print(),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = RenderScope::new(scope);
        self
    }
}

/// Parses a template and optional overrides and renders a standalone SVG.
pub fn render_with_options(
    template_json: &str,
    overrides_json: Option<&str>,
    options: RenderOptions,
) -> anyhow::Result<String> {
    let template = Template::from_json(template_json)?;
    let overrides = match overrides_json {
        Some(raw) if !raw.trim().is_empty() => parse_overrides(raw)?,
        _ => Overrides::new(),
    };
    let composition = compose(
        &template,
        &overrides,
        &options.theme,
        &options.engine,
        &options.scope,
    )?;
    Ok(render_svg(&composition))
}
