use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;
use thiserror::Error;

use super::primitives::{ShapeGeometry, parse_points};

/// Subtrees that hold definitions rather than painted content.
static ID_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\sid\s*=\s*)(["'])([^"']*)(["'])"#).unwrap());
static URL_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"url\(\s*#([^)\s]+)\s*\)").unwrap());
static HREF_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(href\s*=\s*)(["'])#([^"']*)(["'])"#).unwrap());

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

const NON_RENDERED: [&str; 7] = [
    "defs",
    "clipPath",
    "mask",
    "symbol",
    "marker",
    "pattern",
    "title",
];

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("svg content is not well-formed: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("expected an <svg> root element, found <{0}>")]
    NotSvg(String),
}

/// What the engine needs to know about an embedded SVG document.
#[derive(Debug, Clone, Default)]
pub struct SvgMarkup {
    /// Raw `viewBox` attribute, unparsed.
    pub view_box: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    /// Prefixed namespace declarations of the root, as `(prefix, uri)`.
    pub namespaces: Vec<(String, String)>,
    /// Everything between the root's start and end tags.
    pub inner: String,
    /// `id` attributes declared inside the root, in document order.
    pub ids: Vec<String>,
    pub shapes: Vec<ShapeGeometry>,
}

fn length(node: roxmltree::Node<'_, '_>, name: &str) -> Option<f32> {
    let raw = node.attribute(name)?.trim();
    let raw = raw.strip_suffix("px").unwrap_or(raw).trim();
    raw.parse::<f32>().ok().filter(|value| value.is_finite())
}

fn length_or_zero(node: roxmltree::Node<'_, '_>, name: &str) -> f32 {
    length(node, name).unwrap_or(0.0)
}

fn is_rendered(node: roxmltree::Node<'_, '_>) -> bool {
    !node
        .ancestors()
        .any(|ancestor| NON_RENDERED.contains(&ancestor.tag_name().name()))
}

fn shape_of(node: roxmltree::Node<'_, '_>) -> Option<ShapeGeometry> {
    let shape = match node.tag_name().name() {
        "path" => ShapeGeometry::Path {
            d: node.attribute("d")?.to_string(),
        },
        "circle" => ShapeGeometry::Circle {
            cx: length_or_zero(node, "cx"),
            cy: length_or_zero(node, "cy"),
            r: length(node, "r")?,
        },
        "ellipse" => ShapeGeometry::Ellipse {
            cx: length_or_zero(node, "cx"),
            cy: length_or_zero(node, "cy"),
            rx: length(node, "rx")?,
            ry: length(node, "ry")?,
        },
        "rect" => ShapeGeometry::Rect {
            x: length_or_zero(node, "x"),
            y: length_or_zero(node, "y"),
            width: length(node, "width")?,
            height: length(node, "height")?,
        },
        "polygon" => ShapeGeometry::Polygon {
            points: parse_points(node.attribute("points")?),
        },
        "polyline" => ShapeGeometry::Polyline {
            points: parse_points(node.attribute("points")?),
        },
        "line" => ShapeGeometry::Line {
            x1: length_or_zero(node, "x1"),
            y1: length_or_zero(node, "y1"),
            x2: length_or_zero(node, "x2"),
            y2: length_or_zero(node, "y2"),
        },
        _ => return None,
    };
    Some(shape)
}

/// Parses embedded SVG markup. Element `transform` attributes are not applied
/// to the extracted shapes.
pub fn inspect_svg(content: &str) -> Result<SvgMarkup, MarkupError> {
    let doc = roxmltree::Document::parse(content)?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(MarkupError::NotSvg(root.tag_name().name().to_string()));
    }

    let inner = match (root.first_child(), root.last_child()) {
        (Some(first), Some(last)) => content[first.range().start..last.range().end].to_string(),
        _ => String::new(),
    };

    let namespaces = root
        .namespaces()
        .filter(|ns| ns.uri() != XML_NAMESPACE)
        .filter_map(|ns| Some((ns.name()?.to_string(), ns.uri().to_string())))
        .collect();

    let mut seen = HashSet::new();
    let ids = root
        .descendants()
        .skip(1)
        .filter_map(|node| node.attribute("id"))
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect();

    let shapes = root
        .descendants()
        .filter(|node| node.is_element() && is_rendered(*node))
        .filter_map(shape_of)
        .collect();

    Ok(SvgMarkup {
        view_box: root.attribute("viewBox").map(str::to_string),
        width: length(root, "width"),
        height: length(root, "height"),
        namespaces,
        inner,
        ids,
        shapes,
    })
}

/// Renames the given ids in `inner` along with their `url(#..)` and
/// `href="#.."` references. Ids not listed are left alone.
pub fn rename_ids(inner: &str, ids: &[String], rename: impl Fn(&str) -> String) -> String {
    if ids.is_empty() {
        return inner.to_string();
    }
    let known: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let renamed = |id: &str| {
        if known.contains(id) {
            rename(id)
        } else {
            id.to_string()
        }
    };
    let out = ID_ATTR_RE.replace_all(inner, |caps: &Captures<'_>| {
        format!("{}{}{}{}", &caps[1], &caps[2], renamed(&caps[3]), &caps[4])
    });
    let out = URL_REF_RE.replace_all(&out, |caps: &Captures<'_>| {
        format!("url(#{})", renamed(&caps[1]))
    });
    let out = HREF_REF_RE.replace_all(&out, |caps: &Captures<'_>| {
        format!("{}{}#{}{}", &caps[1], &caps[2], renamed(&caps[3]), &caps[4])
    });
    out.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_root_attributes_and_inner_markup() {
        let markup = inspect_svg(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="48px"><path d="M0 0 L 24 24"/><circle cx="12" cy="12" r="4"/></svg>"#,
        )
        .unwrap();
        assert_eq!(markup.view_box.as_deref(), Some("0 0 24 24"));
        assert_eq!(markup.width, Some(48.0));
        assert_eq!(markup.height, None);
        assert_eq!(
            markup.inner,
            r#"<path d="M0 0 L 24 24"/><circle cx="12" cy="12" r="4"/>"#
        );
        assert_eq!(markup.shapes.len(), 2);
    }

    #[test]
    fn skips_definitions() {
        let markup = inspect_svg(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><defs><rect width="5" height="5"/></defs><g><polygon points="0,0 4,0 2,3"/></g></svg>"#,
        )
        .unwrap();
        assert_eq!(markup.shapes.len(), 1);
        assert!(matches!(markup.shapes[0], ShapeGeometry::Polygon { .. }));
    }

    #[test]
    fn keeps_prefixed_namespaces_of_the_root() {
        let markup = inspect_svg(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape" viewBox="0 0 10 10"><g inkscape:label="Layer 1"><rect width="4" height="4"/></g></svg>"#,
        )
        .unwrap();
        assert_eq!(
            markup.namespaces,
            vec![(
                "inkscape".to_string(),
                "http://www.inkscape.org/namespaces/inkscape".to_string()
            )]
        );
    }

    #[test]
    fn renames_ids_and_their_references() {
        let markup = inspect_svg(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><defs><linearGradient id="g"/><path id="p" d="M0 0 L1 1"/></defs><rect fill="url(#g)" width="2" height="2" data-id="g"/><use xlink:href="#p"/><use href='#other'/></svg>"##,
        )
        .unwrap();
        assert_eq!(markup.ids, vec!["g".to_string(), "p".to_string()]);
        let renamed = rename_ids(&markup.inner, &markup.ids, |id| format!("{id}-x"));
        assert!(renamed.contains(r#"<linearGradient id="g-x"/>"#));
        assert!(renamed.contains(r#"id="p-x""#));
        assert!(renamed.contains("url(#g-x)"));
        assert!(renamed.contains(r##"xlink:href="#p-x""##));
        assert!(renamed.contains(r#"data-id="g""#));
        assert!(renamed.contains("href='#other'"));
    }

    #[test]
    fn rejects_malformed_and_foreign_roots() {
        assert!(matches!(inspect_svg("<svg><path></svg>"), Err(MarkupError::Xml(_))));
        assert!(matches!(
            inspect_svg("<html></html>"),
            Err(MarkupError::NotSvg(name)) if name == "html"
        ));
    }
}
