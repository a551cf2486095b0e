use crate::clip::ClipStyle;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CURVE_SAMPLES: usize = 16;
pub const DEFAULT_MAX_FLATTEN_POINTS: usize = 4096;
pub const DEFAULT_CORNER_MIN_TURN_DEG: f32 = 25.0;
pub const DEFAULT_CORNER_WINDOW_RATIO: f32 = 0.03;
pub const DEFAULT_STAR_MIN_POINTS: usize = 5;
pub const DEFAULT_STAR_MIN_ALTERNATION: f32 = 0.9;
pub const DEFAULT_STAR_MAX_INNER_RATIO: f32 = 0.85;
pub const DEFAULT_TRIANGLE_MAX_ANGLE_DEVIATION_DEG: f32 = 15.0;
pub const DEFAULT_ARROW_MIN_ASPECT: f32 = 1.5;
pub const DEFAULT_ARROW_FULL_ASPECT: f32 = 3.0;
pub const DEFAULT_ARROW_PROBE_RATIO: f32 = 0.08;
pub const DEFAULT_ARROW_TIP_MAX_WIDTH_RATIO: f32 = 0.25;
pub const DEFAULT_ARROW_TAIL_MIN_WIDTH_RATIO: f32 = 0.35;
pub const DEFAULT_CENTROID_MIN_OFFSET_RATIO: f32 = 0.02;
pub const DEFAULT_GENERIC_CONFIDENCE: f32 = 0.5;

pub const DEFAULT_CENTER_TOLERANCE_RATIO: f32 = 0.01;
pub const DEFAULT_MINOR_OFFSET_RATIO: f32 = 0.02;
pub const DEFAULT_MAJOR_OFFSET_RATIO: f32 = 0.1;
pub const DEFAULT_MIN_FILL_RATIO: f32 = 0.5;
pub const DEFAULT_OVERFLOW_TOLERANCE_RATIO: f32 = 0.001;

/// Tuning for path flattening, centroid detection and shape classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Points sampled per curve segment; clamped to 1..=64.
    pub curve_samples: usize,
    /// Hard cap on flattened points across all shapes of one analysis.
    pub max_flatten_points: usize,
    pub corner_min_turn_deg: f32,
    /// Corner detection window as a fraction of the contour perimeter.
    pub corner_window_ratio: f32,
    pub star_min_points: usize,
    pub star_min_alternation: f32,
    pub star_max_inner_ratio: f32,
    pub triangle_max_angle_deviation_deg: f32,
    pub arrow_min_aspect: f32,
    pub arrow_full_aspect: f32,
    pub arrow_probe_ratio: f32,
    pub arrow_tip_max_width_ratio: f32,
    pub arrow_tail_min_width_ratio: f32,
    pub centroid_min_offset_ratio: f32,
    pub generic_confidence: f32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            curve_samples: DEFAULT_CURVE_SAMPLES,
            max_flatten_points: DEFAULT_MAX_FLATTEN_POINTS,
            corner_min_turn_deg: DEFAULT_CORNER_MIN_TURN_DEG,
            corner_window_ratio: DEFAULT_CORNER_WINDOW_RATIO,
            star_min_points: DEFAULT_STAR_MIN_POINTS,
            star_min_alternation: DEFAULT_STAR_MIN_ALTERNATION,
            star_max_inner_ratio: DEFAULT_STAR_MAX_INNER_RATIO,
            triangle_max_angle_deviation_deg: DEFAULT_TRIANGLE_MAX_ANGLE_DEVIATION_DEG,
            arrow_min_aspect: DEFAULT_ARROW_MIN_ASPECT,
            arrow_full_aspect: DEFAULT_ARROW_FULL_ASPECT,
            arrow_probe_ratio: DEFAULT_ARROW_PROBE_RATIO,
            arrow_tip_max_width_ratio: DEFAULT_ARROW_TIP_MAX_WIDTH_RATIO,
            arrow_tail_min_width_ratio: DEFAULT_ARROW_TAIL_MIN_WIDTH_RATIO,
            centroid_min_offset_ratio: DEFAULT_CENTROID_MIN_OFFSET_RATIO,
            generic_confidence: DEFAULT_GENERIC_CONFIDENCE,
        }
    }
}

/// Thresholds for viewBox fit classification, all relative to the viewBox size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewBoxFitConfig {
    pub center_tolerance_ratio: f32,
    pub minor_offset_ratio: f32,
    pub major_offset_ratio: f32,
    pub min_fill_ratio: f32,
    pub overflow_tolerance_ratio: f32,
}

impl Default for ViewBoxFitConfig {
    fn default() -> Self {
        Self {
            center_tolerance_ratio: DEFAULT_CENTER_TOLERANCE_RATIO,
            minor_offset_ratio: DEFAULT_MINOR_OFFSET_RATIO,
            major_offset_ratio: DEFAULT_MAJOR_OFFSET_RATIO,
            min_fill_ratio: DEFAULT_MIN_FILL_RATIO,
            overflow_tolerance_ratio: DEFAULT_OVERFLOW_TOLERANCE_RATIO,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub geometry: GeometryConfig,
    pub viewbox: ViewBoxFitConfig,
    pub clip_style: ClipStyle,
}

/// PNG export size hints.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512.0,
            height: 512.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub engine: EngineConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl NumberOrString {
    fn as_f32(&self) -> Option<f32> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().parse::<f32>().ok(),
        }
        .filter(|val| val.is_finite())
    }

    fn as_usize(&self) -> Option<usize> {
        self.as_f32()
            .filter(|val| *val >= 0.0)
            .map(|val| val.round() as usize)
    }

    fn as_string(&self) -> String {
        match self {
            NumberOrString::Number(val) => format!("{}", val),
            NumberOrString::String(val) => val.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeDefaultsFile {
    font_family: Option<String>,
    font_size: Option<NumberOrString>,
    font_weight: Option<NumberOrString>,
    font_color: Option<String>,
    stroke_color: Option<String>,
    stroke_width: Option<NumberOrString>,
    stroke_opacity: Option<NumberOrString>,
    stroke_linejoin: Option<String>,
    shape_fill: Option<String>,
    shape_stroke: Option<String>,
    shape_stroke_width: Option<NumberOrString>,
    opacity: Option<NumberOrString>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeometryConfigFile {
    curve_samples: Option<NumberOrString>,
    max_flatten_points: Option<NumberOrString>,
    corner_min_turn_deg: Option<NumberOrString>,
    corner_window_ratio: Option<NumberOrString>,
    star_min_points: Option<NumberOrString>,
    star_min_alternation: Option<NumberOrString>,
    star_max_inner_ratio: Option<NumberOrString>,
    triangle_max_angle_deviation_deg: Option<NumberOrString>,
    arrow_min_aspect: Option<NumberOrString>,
    arrow_full_aspect: Option<NumberOrString>,
    arrow_probe_ratio: Option<NumberOrString>,
    arrow_tip_max_width_ratio: Option<NumberOrString>,
    arrow_tail_min_width_ratio: Option<NumberOrString>,
    centroid_min_offset_ratio: Option<NumberOrString>,
    generic_confidence: Option<NumberOrString>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ViewBoxConfigFile {
    center_tolerance_ratio: Option<NumberOrString>,
    minor_offset_ratio: Option<NumberOrString>,
    major_offset_ratio: Option<NumberOrString>,
    min_fill_ratio: Option<NumberOrString>,
    overflow_tolerance_ratio: Option<NumberOrString>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<NumberOrString>,
    height: Option<NumberOrString>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_defaults: Option<ThemeDefaultsFile>,
    geometry: Option<GeometryConfigFile>,
    #[serde(rename = "viewBox")]
    viewbox: Option<ViewBoxConfigFile>,
    clip_style: Option<ClipStyle>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Applies a JSON config document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "print" {
            config.theme = Theme::print();
        } else if theme_name == "badge" || theme_name == "default" {
            config.theme = Theme::badge_default();
        } else {
            tracing::warn!(theme = theme_name, "unknown theme preset; keeping the default");
        }
    }

    if let Some(vars) = parsed.theme_defaults {
        apply_theme_defaults(&mut config, vars);
    }
    if let Some(geometry) = parsed.geometry {
        apply_geometry(&mut config.engine.geometry, geometry);
    }
    if let Some(viewbox) = parsed.viewbox {
        apply_viewbox(&mut config.engine.viewbox, viewbox);
    }
    if let Some(style) = parsed.clip_style {
        config.engine.clip_style = style;
    }
    if let Some(render) = parsed.render {
        if let Some(v) = render.width.as_ref().and_then(NumberOrString::as_f32) {
            config.render.width = v;
        }
        if let Some(v) = render.height.as_ref().and_then(NumberOrString::as_f32) {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.theme.background = v;
        }
    }

    Ok(config)
}

fn apply_theme_defaults(config: &mut Config, vars: ThemeDefaultsFile) {
    let theme = &mut config.theme;
    if let Some(v) = vars.font_family {
        theme.font_family = v;
    }
    if let Some(v) = vars.font_size.as_ref().and_then(NumberOrString::as_f32) {
        theme.font_size = v;
    }
    if let Some(v) = vars.font_weight {
        theme.font_weight = v.as_string();
    }
    if let Some(v) = vars.font_color {
        theme.font_color = v;
    }
    if let Some(v) = vars.stroke_color {
        theme.stroke_color = v;
    }
    if let Some(v) = vars.stroke_width.as_ref().and_then(NumberOrString::as_f32) {
        theme.stroke_width = v;
    }
    if let Some(v) = vars.stroke_opacity.as_ref().and_then(NumberOrString::as_f32) {
        theme.stroke_opacity = v;
    }
    if let Some(v) = vars.stroke_linejoin {
        theme.stroke_linejoin = v;
    }
    if let Some(v) = vars.shape_fill {
        theme.shape_fill = v;
    }
    if let Some(v) = vars.shape_stroke {
        theme.shape_stroke = v;
    }
    if let Some(v) = vars.shape_stroke_width.as_ref().and_then(NumberOrString::as_f32) {
        theme.shape_stroke_width = v;
    }
    if let Some(v) = vars.opacity.as_ref().and_then(NumberOrString::as_f32) {
        theme.opacity = v;
    }
    if let Some(v) = vars.background {
        theme.background = v;
    }
}

fn apply_geometry(geometry: &mut GeometryConfig, file: GeometryConfigFile) {
    if let Some(v) = file.curve_samples.as_ref().and_then(NumberOrString::as_usize) {
        geometry.curve_samples = v;
    }
    if let Some(v) = file.max_flatten_points.as_ref().and_then(NumberOrString::as_usize) {
        geometry.max_flatten_points = v;
    }
    if let Some(v) = file.corner_min_turn_deg.as_ref().and_then(NumberOrString::as_f32) {
        geometry.corner_min_turn_deg = v;
    }
    if let Some(v) = file.corner_window_ratio.as_ref().and_then(NumberOrString::as_f32) {
        geometry.corner_window_ratio = v;
    }
    if let Some(v) = file.star_min_points.as_ref().and_then(NumberOrString::as_usize) {
        geometry.star_min_points = v;
    }
    if let Some(v) = file.star_min_alternation.as_ref().and_then(NumberOrString::as_f32) {
        geometry.star_min_alternation = v;
    }
    if let Some(v) = file.star_max_inner_ratio.as_ref().and_then(NumberOrString::as_f32) {
        geometry.star_max_inner_ratio = v;
    }
    if let Some(v) = file
        .triangle_max_angle_deviation_deg
        .as_ref()
        .and_then(NumberOrString::as_f32)
    {
        geometry.triangle_max_angle_deviation_deg = v;
    }
    if let Some(v) = file.arrow_min_aspect.as_ref().and_then(NumberOrString::as_f32) {
        geometry.arrow_min_aspect = v;
    }
    if let Some(v) = file.arrow_full_aspect.as_ref().and_then(NumberOrString::as_f32) {
        geometry.arrow_full_aspect = v;
    }
    if let Some(v) = file.arrow_probe_ratio.as_ref().and_then(NumberOrString::as_f32) {
        geometry.arrow_probe_ratio = v;
    }
    if let Some(v) = file.arrow_tip_max_width_ratio.as_ref().and_then(NumberOrString::as_f32) {
        geometry.arrow_tip_max_width_ratio = v;
    }
    if let Some(v) = file.arrow_tail_min_width_ratio.as_ref().and_then(NumberOrString::as_f32) {
        geometry.arrow_tail_min_width_ratio = v;
    }
    if let Some(v) = file.centroid_min_offset_ratio.as_ref().and_then(NumberOrString::as_f32) {
        geometry.centroid_min_offset_ratio = v;
    }
    if let Some(v) = file.generic_confidence.as_ref().and_then(NumberOrString::as_f32) {
        geometry.generic_confidence = v.clamp(0.0, 1.0);
    }
}

fn apply_viewbox(viewbox: &mut ViewBoxFitConfig, file: ViewBoxConfigFile) {
    if let Some(v) = file.center_tolerance_ratio.as_ref().and_then(NumberOrString::as_f32) {
        viewbox.center_tolerance_ratio = v;
    }
    if let Some(v) = file.minor_offset_ratio.as_ref().and_then(NumberOrString::as_f32) {
        viewbox.minor_offset_ratio = v;
    }
    if let Some(v) = file.major_offset_ratio.as_ref().and_then(NumberOrString::as_f32) {
        viewbox.major_offset_ratio = v;
    }
    if let Some(v) = file.min_fill_ratio.as_ref().and_then(NumberOrString::as_f32) {
        viewbox.min_fill_ratio = v;
    }
    if let Some(v) = file.overflow_tolerance_ratio.as_ref().and_then(NumberOrString::as_f32) {
        viewbox.overflow_tolerance_ratio = v;
    }
}
