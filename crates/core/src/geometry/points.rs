//! Point list parsing, formatting and bounding boxes.
//!
//! Layout geometry is stored as strings of whitespace separated `x,y` pairs,
//! e.g. `"10,20 110,20 110,40 10,40"`. The order of the pairs is meaningful:
//! it is the boundary walk of a polygon or the writing direction of a baseline.

use crate::error::{LayoutError, Result};
use crate::utils::{Point, Rect};

/// How `parse_points` reacts to a malformed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Fail on the first malformed token.
    #[default]
    Strict,
    /// Stop at the first malformed token and keep the points parsed so far.
    Lenient,
}

fn parse_token(token: &str) -> Option<Point> {
    let (x, y) = token.split_once(',')?;
    let x: f64 = x.parse().ok()?;
    let y: f64 = y.parse().ok()?;
    if x.is_finite() && y.is_finite() {
        Some((x, y))
    } else {
        None
    }
}

/// Parses a string of coordinate pairs (`x1,y1 x2,y2 ...`) into a point list.
///
/// In [`ParseMode::Lenient`] parsing stops at the first token that is not a
/// valid pair and the points read up to that token are returned.
pub fn parse_points(s: &str, mode: ParseMode) -> Result<Vec<Point>> {
    let mut points = Vec::new();
    for (index, token) in s.split_whitespace().enumerate() {
        match parse_token(token) {
            Some(p) => points.push(p),
            None => match mode {
                ParseMode::Strict => {
                    return Err(LayoutError::MalformedPoints {
                        index,
                        token: token.to_string(),
                    });
                }
                ParseMode::Lenient => break,
            },
        }
    }
    Ok(points)
}

/// Converts a point list to a string in format `x1,y1 x2,y2 ...`.
///
/// With `rounded` the coordinates are rounded to integers, otherwise the
/// shortest representation that parses back to the same value is used.
pub fn format_points(points: &[Point], rounded: bool) -> String {
    let mut out = String::with_capacity(points.len() * 12);
    for (n, &(x, y)) in points.iter().enumerate() {
        if n > 0 {
            out.push(' ');
        }
        if rounded {
            out.push_str(&format!("{},{}", x.round() as i64, y.round() as i64));
        } else {
            out.push_str(&format!("{},{}", x, y));
        }
    }
    out
}

/// Axis-aligned limits of a point list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Corners in the order top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            (self.xmin, self.ymin),
            (self.xmax, self.ymin),
            (self.xmax, self.ymax),
            (self.xmin, self.ymax),
        ]
    }

    pub fn rect(&self) -> Rect {
        (self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Gets the minimum and maximum coordinate values of a point list.
///
/// Returns None for an empty list.
pub fn limits(points: &[Point]) -> Option<BoundingBox> {
    let (&(x0, y0), rest) = points.split_first()?;
    let mut bbox = BoundingBox {
        xmin: x0,
        xmax: x0,
        ymin: y0,
        ymax: y0,
    };
    for &(x, y) in rest {
        bbox.xmin = bbox.xmin.min(x);
        bbox.xmax = bbox.xmax.max(x);
        bbox.ymin = bbox.ymin.min(y);
        bbox.ymax = bbox.ymax.max(y);
    }
    Some(bbox)
}

/// The 4 corner points of the bounding box of a point list, empty for an
/// empty list.
pub fn bbox_points(points: &[Point]) -> Vec<Point> {
    limits(points)
        .map(|b| b.corners().to_vec())
        .unwrap_or_default()
}

/// Determines whether a point list is an axis-aligned rectangle given in the
/// corner order top-left, top-right, bottom-right, bottom-left.
pub fn is_bbox(points: &[Point]) -> bool {
    points.len() == 4
        && points[0].0 == points[3].0
        && points[0].1 == points[1].1
        && points[1].0 == points[2].0
        && points[2].1 == points[3].1
        && points[0].0 <= points[1].0
        && points[0].1 <= points[3].1
}
