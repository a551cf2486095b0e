use crate::analysis_dump::{AnalysisDump, write_analysis_dump};
use crate::clip::RenderScope;
use crate::compose::compose;
use crate::config::load_config;
use crate::render::{render_svg, write_output_svg};
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::template::{Overrides, Template, parse_overrides};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "badgec", version, about = "Composes badge templates into SVG")]
pub struct Args {
    /// Template file (JSON/JSON5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Per-layer overrides JSON file
    #[arg(long = "overrides")]
    pub overrides: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme defaults and analysis thresholds)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Render instance id used to suffix clip definition ids
    #[arg(long = "scope", default_value = "main")]
    pub scope: String,

    /// PNG width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// PNG height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Print the geometry/viewBox analysis as JSON instead of rendering
    #[arg(long = "analyze")]
    pub analyze: bool,

    /// Log degraded input at debug level
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let input = read_input(args.input.as_deref())?;
    let template = Template::from_json(&input)?;
    let overrides = match args.overrides.as_deref() {
        Some(path) => parse_overrides(&std::fs::read_to_string(path)?)?,
        None => Overrides::new(),
    };

    if args.analyze {
        let dump = AnalysisDump::from_template(&template, &overrides, &config)?;
        return write_analysis_dump(args.output.as_deref(), &dump);
    }

    let scope = RenderScope::new(&args.scope);
    let composition = compose(&template, &overrides, &config.theme, &config.engine, &scope)?;
    tracing::debug!(
        template = %template.id,
        layers = composition.layers.len(),
        clips = composition.clip_definitions.len(),
        "composed template"
    );
    let svg = render_svg(&composition);
    match args.output_format {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref()),
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&svg, &output, &config.render)
        }
    }
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, render_cfg: &crate::config::RenderConfig) -> Result<()> {
    write_output_png(svg, output, render_cfg)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _render_cfg: &crate::config::RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

/// Logs go to stderr so SVG written to stdout stays clean.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
