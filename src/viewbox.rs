use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::ViewBoxFitConfig;
use crate::geometry::{BoundingBox, Point};
use crate::render::fmt_num;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewBoxError {
    #[error("viewBox is empty")]
    Empty,
    #[error("viewBox needs 4 numbers, found {0}")]
    WrongArity(usize),
    #[error("viewBox value `{0}` is not a finite number")]
    InvalidNumber(String),
    #[error("viewBox size {width}x{height} must be positive")]
    NonPositiveSize { width: f32, height: f32 },
}

/// SVG user-space window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ViewBoxRepr")]
pub struct ViewBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Templates may spell the viewBox as an attribute string or as an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ViewBoxRepr {
    Text(String),
    Rect { x: f32, y: f32, width: f32, height: f32 },
}

impl TryFrom<ViewBoxRepr> for ViewBox {
    type Error = ViewBoxError;

    fn try_from(repr: ViewBoxRepr) -> Result<Self, Self::Error> {
        match repr {
            ViewBoxRepr::Text(raw) => raw.parse(),
            ViewBoxRepr::Rect {
                x,
                y,
                width,
                height,
            } => ViewBox::new(x, y, width, height),
        }
    }
}

impl ViewBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Result<Self, ViewBoxError> {
        for value in [x, y, width, height] {
            if !value.is_finite() {
                return Err(ViewBoxError::InvalidNumber(value.to_string()));
            }
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(ViewBoxError::NonPositiveSize { width, height });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, ViewBoxError> {
        let parts: Vec<&str> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            return Err(ViewBoxError::Empty);
        }
        if parts.len() != 4 {
            return Err(ViewBoxError::WrongArity(parts.len()));
        }
        let mut values = [0.0_f32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| ViewBoxError::InvalidNumber(part.to_string()))?;
        }
        ViewBox::new(values[0], values[1], values[2], values[3])
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn to_attr(&self) -> String {
        format!(
            "{} {} {} {}",
            fmt_num(self.x),
            fmt_num(self.y),
            fmt_num(self.width),
            fmt_num(self.height)
        )
    }
}

impl FromStr for ViewBox {
    type Err = ViewBoxError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ViewBox::parse(raw)
    }
}

impl fmt::Display for ViewBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_attr())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FitStatus {
    Analyzed,
    NoViewBox,
    NotAnalyzable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Minor,
    Major,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewBoxFitAnalysis {
    pub current_view_box: Option<ViewBox>,
    pub status: FitStatus,
    pub recommended_view_box: Option<ViewBox>,
    pub offset: Point,
    pub severity: Severity,
    pub is_centered: bool,
    pub is_properly_fitted: bool,
    pub issues: Vec<String>,
}

impl ViewBoxFitAnalysis {
    fn inconclusive(status: FitStatus, current: Option<ViewBox>, issue: Option<String>) -> Self {
        Self {
            current_view_box: current,
            status,
            recommended_view_box: None,
            offset: Point::ORIGIN,
            severity: Severity::None,
            is_centered: false,
            is_properly_fitted: false,
            issues: issue.into_iter().collect(),
        }
    }
}

/// Analyzes a raw `viewBox` attribute. Blank attributes count as absent.
pub fn analyze_viewbox_fit(
    raw: Option<&str>,
    bounds: Option<BoundingBox>,
    config: &ViewBoxFitConfig,
) -> ViewBoxFitAnalysis {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return analyze_fit(None, bounds, config);
    };
    match ViewBox::parse(raw) {
        Ok(view_box) => analyze_fit(Some(view_box), bounds, config),
        Err(err) => {
            tracing::debug!(%err, raw, "viewBox is not analyzable");
            ViewBoxFitAnalysis::inconclusive(
                FitStatus::NotAnalyzable,
                None,
                Some(format!("viewBox \"{}\" is invalid: {}", raw.trim(), err)),
            )
        }
    }
}

pub fn analyze_fit(
    view_box: Option<ViewBox>,
    bounds: Option<BoundingBox>,
    config: &ViewBoxFitConfig,
) -> ViewBoxFitAnalysis {
    let Some(view_box) = view_box else {
        return ViewBoxFitAnalysis::inconclusive(FitStatus::NoViewBox, None, None);
    };
    let Some(bounds) = bounds else {
        return ViewBoxFitAnalysis::inconclusive(
            FitStatus::NotAnalyzable,
            Some(view_box),
            Some("content has no measurable geometry".to_string()),
        );
    };

    let content_center = bounds.center();
    let view_center = view_box.center();
    let dx = content_center.x - view_center.x;
    let dy = content_center.y - view_center.y;
    let (w, h) = (view_box.width, view_box.height);

    let off_x = dx.abs() > config.center_tolerance_ratio * w;
    let off_y = dy.abs() > config.center_tolerance_ratio * h;
    let is_centered = !off_x && !off_y;

    let offset_ratio = (dx.abs() / w).max(dy.abs() / h);
    let severity = if is_centered {
        Severity::None
    } else if offset_ratio > config.major_offset_ratio {
        Severity::Major
    } else if offset_ratio > config.minor_offset_ratio {
        Severity::Minor
    } else {
        Severity::None
    };

    let mut issues = Vec::new();
    if off_x {
        let side = if dx > 0.0 { "right" } else { "left" };
        issues.push(format!(
            "content is {} px off-center horizontally (shifted {})",
            fmt_num(dx.abs()),
            side
        ));
    }
    if off_y {
        let side = if dy > 0.0 { "down" } else { "up" };
        issues.push(format!(
            "content is {} px off-center vertically (shifted {})",
            fmt_num(dy.abs()),
            side
        ));
    }

    let epsilon = config.overflow_tolerance_ratio * w.max(h);
    let overflows = [
        ("left", view_box.x - bounds.min_x),
        ("top", view_box.y - bounds.min_y),
        ("right", bounds.max_x - view_box.max_x()),
        ("bottom", bounds.max_y - view_box.max_y()),
    ];
    let mut clipped = false;
    for (edge, amount) in overflows {
        if amount > epsilon {
            clipped = true;
            issues.push(format!(
                "content overflows the {} edge by {} px",
                edge,
                fmt_num(amount)
            ));
        }
    }

    let fill_ratio = (bounds.width() / w).max(bounds.height() / h);
    let padded = fill_ratio < config.min_fill_ratio;
    if padded {
        issues.push(format!(
            "content fills only {}% of the viewBox",
            (fill_ratio * 100.0).round()
        ));
    }

    let recommended = Point::new(
        content_center.x - w / 2.0,
        content_center.y - h / 2.0,
    );

    ViewBoxFitAnalysis {
        current_view_box: Some(view_box),
        status: FitStatus::Analyzed,
        recommended_view_box: Some(ViewBox {
            x: recommended.x,
            y: recommended.y,
            width: w,
            height: h,
        }),
        offset: Point::new(dx, dy),
        severity,
        is_centered,
        is_properly_fitted: !clipped && !padded,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> BoundingBox {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[test]
    fn parses_whitespace_and_comma_separated() {
        let view_box = ViewBox::parse(" 0,0  24 24 ").unwrap();
        assert_eq!(view_box, ViewBox::new(0.0, 0.0, 24.0, 24.0).unwrap());
        assert_eq!(view_box.to_attr(), "0 0 24 24");
        assert_eq!(ViewBox::parse("0 0 24"), Err(ViewBoxError::WrongArity(3)));
        assert!(matches!(
            ViewBox::parse("0 0 -1 5"),
            Err(ViewBoxError::NonPositiveSize { .. })
        ));
        assert!(matches!(
            ViewBox::parse("0 0 a 5"),
            Err(ViewBoxError::InvalidNumber(_))
        ));
    }

    #[test]
    fn deserializes_string_or_object() {
        let from_text: ViewBox = serde_json::from_str(r#""0 0 100 50""#).unwrap();
        let from_object: ViewBox =
            serde_json::from_str(r#"{"x":0,"y":0,"width":100,"height":50}"#).unwrap();
        assert_eq!(from_text, from_object);
        assert!(serde_json::from_str::<ViewBox>(r#""0 0 0 50""#).is_err());
    }

    #[test]
    fn centered_content_has_no_severity() {
        let analysis = analyze_viewbox_fit(
            Some("0 0 100 100"),
            Some(bounds(10.0, 10.0, 90.0, 90.0)),
            &ViewBoxFitConfig::default(),
        );
        assert_eq!(analysis.status, FitStatus::Analyzed);
        assert_eq!(analysis.severity, Severity::None);
        assert!(analysis.is_centered);
        assert!(analysis.is_properly_fitted);
        assert!(analysis.issues.is_empty());
        assert_eq!(analysis.offset, Point::new(0.0, 0.0));
    }

    #[test]
    fn off_center_content_is_recentered() {
        let analysis = analyze_viewbox_fit(
            Some("0 0 100 100"),
            Some(bounds(60.0, 0.0, 100.0, 40.0)),
            &ViewBoxFitConfig::default(),
        );
        assert_eq!(analysis.severity, Severity::Major);
        assert!(!analysis.is_centered);
        assert_eq!(analysis.offset, Point::new(30.0, -30.0));
        let recommended = analysis.recommended_view_box.unwrap();
        assert_eq!(recommended.center(), Point::new(80.0, 20.0));
        assert_eq!((recommended.width, recommended.height), (100.0, 100.0));
        assert_eq!(
            analysis.issues,
            vec![
                "content is 30 px off-center horizontally (shifted right)".to_string(),
                "content is 30 px off-center vertically (shifted up)".to_string(),
                "content fills only 40% of the viewBox".to_string(),
            ]
        );
        assert!(!analysis.is_properly_fitted);
    }

    #[test]
    fn small_offset_is_minor() {
        let analysis = analyze_viewbox_fit(
            Some("0 0 100 100"),
            Some(bounds(5.0, 0.0, 95.0, 100.0)),
            &ViewBoxFitConfig::default(),
        );
        assert_eq!(analysis.severity, Severity::None);

        let analysis = analyze_viewbox_fit(
            Some("0 0 100 100"),
            Some(bounds(5.0, 5.0, 95.0, 95.0 + 10.0)),
            &ViewBoxFitConfig::default(),
        );
        assert_eq!(analysis.offset, Point::new(0.0, 5.0));
        assert_eq!(analysis.severity, Severity::Minor);
        assert_eq!(
            analysis.issues,
            vec![
                "content is 5 px off-center vertically (shifted down)".to_string(),
                "content overflows the bottom edge by 5 px".to_string(),
            ]
        );
    }

    #[test]
    fn overflow_is_reported_per_side_in_order() {
        let analysis = analyze_viewbox_fit(
            Some("0 0 100 100"),
            Some(bounds(-10.0, -10.0, 110.0, 110.0)),
            &ViewBoxFitConfig::default(),
        );
        assert!(analysis.is_centered);
        assert!(!analysis.is_properly_fitted);
        let edges: Vec<&str> = analysis
            .issues
            .iter()
            .map(|issue| issue.split_whitespace().nth(3).unwrap_or_default())
            .collect();
        assert_eq!(edges, vec!["left", "top", "right", "bottom"]);
    }

    #[test]
    fn missing_view_box_is_reported_without_issues() {
        let analysis = analyze_viewbox_fit(
            None,
            Some(bounds(0.0, 0.0, 1.0, 1.0)),
            &ViewBoxFitConfig::default(),
        );
        assert_eq!(analysis.status, FitStatus::NoViewBox);
        assert_eq!(analysis.current_view_box, None);
        assert_eq!(analysis.severity, Severity::None);
        assert!(analysis.issues.is_empty());
    }

    #[test]
    fn malformed_view_box_is_not_analyzable() {
        let analysis = analyze_viewbox_fit(
            Some("0 0 wide tall"),
            Some(bounds(0.0, 0.0, 1.0, 1.0)),
            &ViewBoxFitConfig::default(),
        );
        assert_eq!(analysis.status, FitStatus::NotAnalyzable);
        assert_eq!(analysis.severity, Severity::None);
        assert_eq!(analysis.issues.len(), 1);

        let analysis = analyze_fit(
            ViewBox::new(0.0, 0.0, 10.0, 10.0).ok(),
            None,
            &ViewBoxFitConfig::default(),
        );
        assert_eq!(analysis.status, FitStatus::NotAnalyzable);
        assert!(analysis.current_view_box.is_some());
    }
}
