use std::f64::consts::{FRAC_PI_2, TAU};

use thiserror::Error;

use super::{BoundingBox, Point};

const MAX_CURVE_SAMPLES: usize = 64;

/// One absolute path command. Shorthand and relative commands are expanded
/// while parsing, so consumers only ever see these six shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    CubicTo {
        c1: Point,
        c2: Point,
        to: Point,
    },
    QuadTo {
        c: Point,
        to: Point,
    },
    ArcTo {
        rx: f32,
        ry: f32,
        x_axis_rotation: f32,
        large_arc: bool,
        sweep: bool,
        to: Point,
    },
    ClosePath,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("path data is empty")]
    Empty,
    #[error("path data must start with a moveto, found '{0}'")]
    MissingMoveTo(char),
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("command '{command}' at offset {offset} is missing arguments")]
    MissingArguments { command: char, offset: usize },
}

/// Parses SVG path data into absolute segments.
pub fn parse_path(d: &str) -> Result<Vec<PathSegment>, PathError> {
    match parse_path_lenient(d) {
        (_, Some(err)) => Err(err),
        (segments, None) => Ok(segments),
    }
}

/// Parses as much of the path as possible. Returns the segments read before
/// the first error together with that error, matching how browsers render a
/// path up to its first bad command.
pub fn parse_path_lenient(d: &str) -> (Vec<PathSegment>, Option<PathError>) {
    let mut parser = PathParser::new(d);
    let error = parser.run().err();
    (parser.segments, error)
}

pub(super) struct Cursor<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    pub(super) fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub(super) fn offset(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub(super) fn current_char(&self) -> char {
        self.text[self.pos..].chars().next().unwrap_or('\0')
    }

    pub(super) fn skip_separators(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() || byte == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Reads one number using the compact SVG grammar: `1.5.5` is two numbers
    /// and `-1-2` is two numbers.
    pub(super) fn number(&mut self) -> Option<f32> {
        self.skip_separators();
        let bytes = self.bytes;
        let start = self.pos;
        let mut end = start;
        if matches!(bytes.get(end), Some(b'+' | b'-')) {
            end += 1;
        }
        let mut digits = 0;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
            digits += 1;
        }
        if bytes.get(end) == Some(&b'.') {
            end += 1;
            while bytes.get(end).is_some_and(u8::is_ascii_digit) {
                end += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return None;
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut exp_end = end + 1;
            if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
                exp_end += 1;
            }
            let exp_digits_start = exp_end;
            while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
                exp_end += 1;
            }
            if exp_end > exp_digits_start {
                end = exp_end;
            }
        }
        let value = self.text[start..end].parse::<f32>().ok()?;
        if !value.is_finite() {
            return None;
        }
        self.pos = end;
        Some(value)
    }

    fn flag(&mut self) -> Option<bool> {
        self.skip_separators();
        let value = match self.peek()? {
            b'0' => false,
            b'1' => true,
            _ => return None,
        };
        self.pos += 1;
        Some(value)
    }
}

struct PathParser<'a> {
    cursor: Cursor<'a>,
    segments: Vec<PathSegment>,
    current: Point,
    subpath_start: Point,
    last_cubic_ctrl: Option<Point>,
    last_quad_ctrl: Option<Point>,
}

fn is_command(byte: u8) -> bool {
    matches!(
        byte.to_ascii_uppercase(),
        b'M' | b'L' | b'H' | b'V' | b'C' | b'S' | b'Q' | b'T' | b'A' | b'Z'
    )
}

fn reflect(control: Point, around: Point) -> Point {
    Point::new(2.0 * around.x - control.x, 2.0 * around.y - control.y)
}

impl<'a> PathParser<'a> {
    fn new(d: &'a str) -> Self {
        Self {
            cursor: Cursor::new(d),
            segments: Vec::new(),
            current: Point::ORIGIN,
            subpath_start: Point::ORIGIN,
            last_cubic_ctrl: None,
            last_quad_ctrl: None,
        }
    }

    fn run(&mut self) -> Result<(), PathError> {
        self.cursor.skip_separators();
        if self.cursor.at_end() {
            return Err(PathError::Empty);
        }
        let mut previous: Option<u8> = None;
        loop {
            self.cursor.skip_separators();
            let Some(byte) = self.cursor.peek() else {
                break;
            };
            let offset = self.cursor.offset();
            let command = if byte.is_ascii_alphabetic() {
                if !is_command(byte) {
                    return Err(self.unexpected());
                }
                self.cursor.pos += 1;
                byte
            } else {
                // Numbers without a command letter repeat the previous command;
                // a repeated moveto continues as a lineto.
                match previous {
                    Some(b'M') => b'L',
                    Some(b'm') => b'l',
                    Some(prev) if !matches!(prev, b'Z' | b'z') => prev,
                    _ => return Err(self.unexpected()),
                }
            };
            if self.segments.is_empty() && !matches!(command, b'M' | b'm') {
                return Err(PathError::MissingMoveTo(command as char));
            }
            self.command(command, offset)?;
            previous = Some(command);
        }
        Ok(())
    }

    fn unexpected(&self) -> PathError {
        PathError::UnexpectedChar {
            ch: self.cursor.current_char(),
            offset: self.cursor.offset(),
        }
    }

    fn number(&mut self, command: char, offset: usize) -> Result<f32, PathError> {
        self.cursor
            .number()
            .ok_or(PathError::MissingArguments { command, offset })
    }

    fn flag(&mut self, command: char, offset: usize) -> Result<bool, PathError> {
        self.cursor
            .flag()
            .ok_or(PathError::MissingArguments { command, offset })
    }

    fn point(&mut self, command: char, offset: usize, base: Point) -> Result<Point, PathError> {
        let x = self.number(command, offset)?;
        let y = self.number(command, offset)?;
        Ok(Point::new(x + base.x, y + base.y))
    }

    fn command(&mut self, command: u8, offset: usize) -> Result<(), PathError> {
        let relative = command.is_ascii_lowercase();
        let base = if relative { self.current } else { Point::ORIGIN };
        let name = command as char;
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;
        let segment = match command.to_ascii_uppercase() {
            b'M' => {
                let to = self.point(name, offset, base)?;
                self.subpath_start = to;
                PathSegment::MoveTo(to)
            }
            b'L' => PathSegment::LineTo(self.point(name, offset, base)?),
            b'H' => {
                let x = self.number(name, offset)? + base.x;
                PathSegment::LineTo(Point::new(x, self.current.y))
            }
            b'V' => {
                let y = self.number(name, offset)? + base.y;
                PathSegment::LineTo(Point::new(self.current.x, y))
            }
            b'C' => {
                let c1 = self.point(name, offset, base)?;
                let c2 = self.point(name, offset, base)?;
                let to = self.point(name, offset, base)?;
                cubic_ctrl = Some(c2);
                PathSegment::CubicTo { c1, c2, to }
            }
            b'S' => {
                let c1 = self
                    .last_cubic_ctrl
                    .map(|ctrl| reflect(ctrl, self.current))
                    .unwrap_or(self.current);
                let c2 = self.point(name, offset, base)?;
                let to = self.point(name, offset, base)?;
                cubic_ctrl = Some(c2);
                PathSegment::CubicTo { c1, c2, to }
            }
            b'Q' => {
                let c = self.point(name, offset, base)?;
                let to = self.point(name, offset, base)?;
                quad_ctrl = Some(c);
                PathSegment::QuadTo { c, to }
            }
            b'T' => {
                let c = self
                    .last_quad_ctrl
                    .map(|ctrl| reflect(ctrl, self.current))
                    .unwrap_or(self.current);
                let to = self.point(name, offset, base)?;
                quad_ctrl = Some(c);
                PathSegment::QuadTo { c, to }
            }
            b'A' => {
                let rx = self.number(name, offset)?.abs();
                let ry = self.number(name, offset)?.abs();
                let x_axis_rotation = self.number(name, offset)?;
                let large_arc = self.flag(name, offset)?;
                let sweep = self.flag(name, offset)?;
                let to = self.point(name, offset, base)?;
                PathSegment::ArcTo {
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc,
                    sweep,
                    to,
                }
            }
            _ => PathSegment::ClosePath,
        };
        self.current = match segment {
            PathSegment::MoveTo(to)
            | PathSegment::LineTo(to)
            | PathSegment::CubicTo { to, .. }
            | PathSegment::QuadTo { to, .. }
            | PathSegment::ArcTo { to, .. } => to,
            PathSegment::ClosePath => self.subpath_start,
        };
        self.last_cubic_ctrl = cubic_ctrl;
        self.last_quad_ctrl = quad_ctrl;
        self.segments.push(segment);
        Ok(())
    }
}

/// A flattened subpath.
#[derive(Debug, Clone, Default)]
pub(crate) struct Contour {
    pub points: Vec<Point>,
    pub closed: bool,
}

fn cubic_at(p0: Point, c1: Point, c2: Point, p3: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * c1.x + c * c2.x + d * p3.x,
        a * p0.y + b * c1.y + c * c2.y + d * p3.y,
    )
}

fn quad_at(p0: Point, c: Point, p2: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt;
    let b = 2.0 * mt * t;
    let d = t * t;
    Point::new(
        a * p0.x + b * c.x + d * p2.x,
        a * p0.y + b * c.y + d * p2.y,
    )
}

fn vector_angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    (ux * vy - uy * vx).atan2(ux * vx + uy * vy)
}

/// Samples an elliptical arc using the endpoint-to-center conversion from the
/// SVG implementation notes. The returned points exclude `from` and end at `to`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn arc_points(
    from: Point,
    rx: f32,
    ry: f32,
    x_axis_rotation: f32,
    large_arc: bool,
    sweep: bool,
    to: Point,
    samples: usize,
) -> Vec<Point> {
    if from == to {
        return Vec::new();
    }
    let mut rx = f64::from(rx.abs());
    let mut ry = f64::from(ry.abs());
    if rx == 0.0 || ry == 0.0 {
        return vec![to];
    }
    let phi = f64::from(x_axis_rotation).to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (x1, y1) = (f64::from(from.x), f64::from(from.y));
    let (x2, y2) = (f64::from(to.x), f64::from(to.y));

    let dx2 = (x1 - x2) / 2.0;
    let dy2 = (y1 - y2) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
    let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
    let mut coef = if den > 0.0 {
        (num / den).max(0.0).sqrt()
    } else {
        0.0
    };
    if large_arc == sweep {
        coef = -coef;
    }
    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * -(ry * x1p / rx);
    let cx = cos_phi * cxp - sin_phi * cyp + (x1 + x2) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (y1 + y2) / 2.0;

    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;
    let theta1 = vector_angle(1.0, 0.0, ux, uy);
    let mut delta = vector_angle(ux, uy, vx, vy);
    if !sweep && delta > 0.0 {
        delta -= TAU;
    } else if sweep && delta < 0.0 {
        delta += TAU;
    }

    // The epsilon keeps an exact half turn from rounding up to three quarters.
    let quarter_turns = (delta.abs() / FRAC_PI_2 - 1e-6).ceil().max(1.0) as usize;
    let count = (samples * quarter_turns).clamp(1, MAX_CURVE_SAMPLES * 4);
    let mut points = Vec::with_capacity(count);
    for step in 1..=count {
        if step == count {
            points.push(to);
            break;
        }
        let theta = theta1 + delta * (step as f64 / count as f64);
        let (sin_t, cos_t) = theta.sin_cos();
        let x = cx + rx * cos_t * cos_phi - ry * sin_t * sin_phi;
        let y = cy + rx * cos_t * sin_phi + ry * sin_t * cos_phi;
        points.push(Point::new(x as f32, y as f32));
    }
    points
}

fn grow(bounds: &mut Option<BoundingBox>, point: Point) {
    match bounds {
        Some(bounds) => bounds.include(point),
        None => *bounds = BoundingBox::from_points([point]),
    }
}

/// Conservative bounds: endpoints plus curve control points, with arcs
/// contributing sampled points since they have no control polygon.
pub(crate) fn segment_bounds(segments: &[PathSegment], samples: usize) -> Option<BoundingBox> {
    let samples = samples.clamp(1, MAX_CURVE_SAMPLES);
    let mut bounds = None;
    let mut current = Point::ORIGIN;
    let mut start = Point::ORIGIN;
    for segment in segments {
        match *segment {
            PathSegment::MoveTo(to) => {
                grow(&mut bounds, to);
                current = to;
                start = to;
            }
            PathSegment::LineTo(to) => {
                grow(&mut bounds, to);
                current = to;
            }
            PathSegment::CubicTo { c1, c2, to } => {
                grow(&mut bounds, c1);
                grow(&mut bounds, c2);
                grow(&mut bounds, to);
                current = to;
            }
            PathSegment::QuadTo { c, to } => {
                grow(&mut bounds, c);
                grow(&mut bounds, to);
                current = to;
            }
            PathSegment::ArcTo {
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                to,
            } => {
                for point in arc_points(
                    current,
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc,
                    sweep,
                    to,
                    samples,
                ) {
                    grow(&mut bounds, point);
                }
                grow(&mut bounds, to);
                current = to;
            }
            PathSegment::ClosePath => current = start,
        }
    }
    bounds
}

fn contour_at(active: &mut Option<Contour>, current: Point) -> &mut Contour {
    active.get_or_insert_with(|| Contour {
        points: vec![current],
        closed: false,
    })
}

fn push_point(contour: &mut Contour, point: Point, budget: &mut usize) {
    if *budget == 0 {
        return;
    }
    *budget -= 1;
    contour.points.push(point);
}

/// Flattens segments into polylines. `budget` caps the total number of
/// emitted points across calls so one pathological path cannot stall a render.
pub(crate) fn flatten(segments: &[PathSegment], samples: usize, budget: &mut usize) -> Vec<Contour> {
    let samples = samples.clamp(1, MAX_CURVE_SAMPLES);
    let mut contours = Vec::new();
    let mut active: Option<Contour> = None;
    let mut current = Point::ORIGIN;
    let mut start = Point::ORIGIN;
    for segment in segments {
        match *segment {
            PathSegment::MoveTo(to) => {
                if let Some(done) = active.take() {
                    contours.push(done);
                }
                let mut contour = Contour::default();
                push_point(&mut contour, to, budget);
                active = Some(contour);
                current = to;
                start = to;
            }
            PathSegment::LineTo(to) => {
                push_point(contour_at(&mut active, current), to, budget);
                current = to;
            }
            PathSegment::CubicTo { c1, c2, to } => {
                let contour = contour_at(&mut active, current);
                for step in 1..=samples {
                    let t = step as f32 / samples as f32;
                    let point = if step == samples {
                        to
                    } else {
                        cubic_at(current, c1, c2, to, t)
                    };
                    push_point(contour, point, budget);
                }
                current = to;
            }
            PathSegment::QuadTo { c, to } => {
                let contour = contour_at(&mut active, current);
                for step in 1..=samples {
                    let t = step as f32 / samples as f32;
                    let point = if step == samples {
                        to
                    } else {
                        quad_at(current, c, to, t)
                    };
                    push_point(contour, point, budget);
                }
                current = to;
            }
            PathSegment::ArcTo {
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                to,
            } => {
                let points = arc_points(
                    current,
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc,
                    sweep,
                    to,
                    samples,
                );
                let contour = contour_at(&mut active, current);
                for point in points {
                    push_point(contour, point, budget);
                }
                current = to;
            }
            PathSegment::ClosePath => {
                if let Some(mut done) = active.take() {
                    done.closed = true;
                    contours.push(done);
                }
                current = start;
            }
        }
    }
    if let Some(done) = active.take() {
        contours.push(done);
    }
    if *budget == 0 {
        tracing::debug!("path flattening hit the point budget; contour truncated");
    }
    contours
}
