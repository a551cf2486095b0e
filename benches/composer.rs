use badge_composer::clip::RenderScope;
use badge_composer::config::{EngineConfig, GeometryConfig, ViewBoxFitConfig};
use badge_composer::geometry::BoundingBox;
use badge_composer::template::{Overrides, Template};
use badge_composer::theme::Theme;
use badge_composer::{analyze_path, analyze_svg_content, analyze_viewbox_fit, compose, render_svg};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::f32::consts::PI;
use std::hint::black_box;

fn star_path(points: usize, outer: f32, inner: f32) -> String {
    let mut out = String::new();
    for i in 0..points * 2 {
        let radius = if i % 2 == 0 { outer } else { inner };
        let angle = -PI / 2.0 + i as f32 * PI / points as f32;
        let cmd = if i == 0 { 'M' } else { 'L' };
        out.push_str(&format!(
            "{} {:.3} {:.3} ",
            cmd,
            100.0 + radius * angle.cos(),
            100.0 + radius * angle.sin()
        ));
    }
    out.push('Z');
    out
}

fn curvy_blob(lobes: usize) -> String {
    let mut out = String::from("M 100 20 ");
    for i in 0..lobes {
        let a0 = i as f32 * 2.0 * PI / lobes as f32;
        let a1 = (i as f32 + 0.5) * 2.0 * PI / lobes as f32;
        let a2 = (i as f32 + 1.0) * 2.0 * PI / lobes as f32;
        out.push_str(&format!(
            "C {:.3} {:.3} {:.3} {:.3} {:.3} {:.3} ",
            100.0 + 95.0 * a0.sin(),
            100.0 - 95.0 * a0.cos(),
            100.0 + 95.0 * a1.sin(),
            100.0 - 95.0 * a1.cos(),
            100.0 + 80.0 * a2.sin(),
            100.0 - 80.0 * a2.cos()
        ));
    }
    out.push('Z');
    out
}

fn badge_template(images: usize) -> String {
    let mut layers = vec![
        r##"{ "type": "shape", "id": "disc", "path": "M 256 16 A 240 240 0 1 1 255.9 16 Z", "fill": "#1d3557" }"##
            .to_string(),
        r#"{ "type": "text", "id": "title", "text": "CHAMPION", "position": { "x": 50, "y": 80 }, "clip": "disc" }"#
            .to_string(),
    ];
    let star = star_path(5, 90.0, 36.0);
    for i in 0..images {
        layers.push(format!(
            r#"{{ "type": "svgImage", "id": "star{i}", "position": {{ "x": {x}, "y": 40 }}, "width": 96, "height": 96,
                "svgContent": "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 200 200'><path d='{star}'/></svg>",
                "scale": 1.2, "rotation": 15, "transformOrigin": "visual", "clip": "disc" }}"#,
            x = 10 + (i * 80 / images.max(1)),
        ));
    }
    format!(
        r#"{{ "id": "bench", "width": 512, "height": 512, "layers": [{}] }}"#,
        layers.join(",")
    )
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry_classify");
    let config = GeometryConfig::default();
    let cases = [
        ("star5", star_path(5, 90.0, 36.0)),
        ("star12", star_path(12, 90.0, 60.0)),
        ("triangle", "M 100 10 L 190 170 L 10 170 Z".to_string()),
        (
            "arrow",
            "M 20 70 H 120 V 50 L 170 100 L 120 150 V 130 H 20 Z".to_string(),
        ),
        ("blob_8", curvy_blob(8)),
        ("blob_32", curvy_blob(32)),
    ];
    for (name, path) in &cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), path, |b, path| {
            b.iter(|| {
                let analysis = analyze_path(black_box(path), &config);
                black_box(analysis.confidence);
            });
        });
    }
    group.finish();
}

fn bench_svg_content(c: &mut Criterion) {
    let config = GeometryConfig::default();
    let content = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 200 200'><g transform='translate(4 4)'><path d='{}'/><circle cx='100' cy='100' r='12'/></g></svg>",
        star_path(5, 90.0, 36.0)
    );
    c.bench_function("geometry_svg_content", |b| {
        b.iter(|| {
            let analysis = analyze_svg_content(black_box(&content), &config);
            black_box(analysis.bounding_box);
        });
    });
}

fn bench_viewbox_fit(c: &mut Criterion) {
    let config = ViewBoxFitConfig::default();
    let bounds = Some(BoundingBox {
        min_x: 12.0,
        min_y: -4.0,
        max_x: 210.0,
        max_y: 188.0,
    });
    c.bench_function("viewbox_fit", |b| {
        b.iter(|| {
            let fit = analyze_viewbox_fit(black_box(Some("0 0 200 200")), bounds, &config);
            black_box(fit.issues.len());
        });
    });
}

fn bench_compose_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_render");
    let theme = Theme::badge_default();
    let engine = EngineConfig::default();
    let scope = RenderScope::default();
    let overrides = Overrides::new();
    for images in [1usize, 8, 32] {
        let template = Template::from_json(&badge_template(images)).expect("template parse failed");
        group.bench_with_input(
            BenchmarkId::from_parameter(images),
            &template,
            |b, template| {
                b.iter(|| {
                    let composition = compose(black_box(template), &overrides, &theme, &engine, &scope)
                        .expect("compose failed");
                    black_box(render_svg(&composition).len());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_classification,
    bench_svg_content,
    bench_viewbox_fit,
    bench_compose_render
);
criterion_main!(benches);
