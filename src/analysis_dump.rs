use crate::clip::RenderScope;
use crate::compose::{Composition, RenderLayer, analyze_template_shapes, compose};
use crate::config::Config;
use crate::geometry::{GeometryAnalysis, Point, analyze_geometry, inspect_svg};
use crate::template::{Layer, Overrides, Template, TemplateError};
use crate::transform::{Affine, TransformCase};
use crate::viewbox::{ViewBoxFitAnalysis, analyze_viewbox_fit};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDump {
    pub template_id: String,
    pub width: f32,
    pub height: f32,
    pub shapes: GeometryAnalysis,
    pub images: Vec<ImageDump>,
    pub clips: Vec<ClipDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDump {
    pub id: String,
    pub geometry: GeometryAnalysis,
    pub view_box_fit: ViewBoxFitAnalysis,
    pub transform_case: TransformCase,
    pub transform_origin: Option<Point>,
    pub transform: Option<String>,
    pub matrix: [f32; 6],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipDump {
    pub id: String,
    pub shape_id: String,
    pub used_by: Vec<String>,
}

fn matrix_array(matrix: &Affine) -> [f32; 6] {
    [matrix.a, matrix.b, matrix.c, matrix.d, matrix.e, matrix.f]
}

impl AnalysisDump {
    pub fn from_template(
        template: &Template,
        overrides: &Overrides,
        config: &Config,
    ) -> Result<Self, TemplateError> {
        let composition = compose(
            template,
            overrides,
            &config.theme,
            &config.engine,
            &RenderScope::default(),
        )?;
        Ok(Self::from_composition(template, overrides, &composition, config))
    }

    fn from_composition(
        template: &Template,
        overrides: &Overrides,
        composition: &Composition,
        config: &Config,
    ) -> Self {
        let images = template
            .layers
            .iter()
            .zip(&composition.layers)
            .filter_map(|(layer, rendered)| match (layer, rendered) {
                (Layer::SvgImage(image), RenderLayer::Image(resolved)) => {
                    let content = overrides
                        .get(&image.id)
                        .and_then(|over| over.svg_content.as_deref())
                        .unwrap_or(&image.svg_content);
                    let markup = inspect_svg(content).ok();
                    let geometry = markup
                        .as_ref()
                        .map(|markup| analyze_geometry(&markup.shapes, &config.engine.geometry))
                        .unwrap_or_else(|| analyze_geometry(&[], &config.engine.geometry));
                    let view_box_fit = analyze_viewbox_fit(
                        markup.as_ref().and_then(|markup| markup.view_box.as_deref()),
                        geometry.bounding_box,
                        &config.engine.viewbox,
                    );
                    Some(ImageDump {
                        id: image.id.clone(),
                        geometry,
                        view_box_fit,
                        transform_case: resolved.transform.case,
                        transform_origin: resolved.transform.origin,
                        transform: resolved.transform.svg.clone(),
                        matrix: matrix_array(&resolved.transform.matrix),
                    })
                }
                _ => None,
            })
            .collect();

        let clips = composition
            .clip_definitions
            .iter()
            .map(|def| ClipDump {
                id: def.id.clone(),
                shape_id: def.shape_id.clone(),
                used_by: template
                    .layers
                    .iter()
                    .filter(|layer| layer.clip_reference() == Some(def.shape_id.as_str()))
                    .map(|layer| layer.id().to_string())
                    .collect(),
            })
            .collect();

        Self {
            template_id: template.id.clone(),
            width: template.width,
            height: template.height,
            shapes: analyze_template_shapes(template, &config.engine.geometry),
            images,
            clips,
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or stdout when absent.
pub fn write_analysis_dump(path: Option<&Path>, dump: &AnalysisDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, dump)?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
