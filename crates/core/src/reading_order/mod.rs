//! Line continuation and reading order.
//!
//! This module contains:
//! - `params` - thresholds of the algorithm (ReadingOrderParams)
//! - `continuation` - pairwise line continuation tests and join groups
//! - `order` - the global top-to-bottom reading order of joined lines
//!
//! Both phases work on [`LineGeometry`]: a single segment baseline and the
//! 4-point polystripe around it.

pub mod continuation;
pub mod order;
pub mod params;

pub use continuation::{JoinGroup, test_line_continuation};
pub use order::{get_reading_order, sort_region_lines};
pub use params::ReadingOrderParams;

use crate::document::{ElementKind, LayoutDocument, NodeId};
use crate::error::{LayoutError, Result};
use crate::utils::{EPSILON, Point, distance, midpoint, sub, unit};

/// Geometry of a text line as used by the reading order engine.
///
/// `coords` is ordered as a polystripe of `baseline`:
/// `[above start, above end, below end, below start]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineGeometry {
    pub baseline: [Point; 2],
    pub coords: [Point; 4],
}

impl LineGeometry {
    pub fn new(baseline: &[Point], coords: &[Point]) -> Result<Self> {
        let baseline: [Point; 2] = baseline.try_into().map_err(|_| {
            LayoutError::validation(format!(
                "expected a 2-point baseline, got {} points",
                baseline.len()
            ))
        })?;
        let coords: [Point; 4] = coords.try_into().map_err(|_| {
            LayoutError::validation(format!(
                "expected 4-point coords, got {} points",
                coords.len()
            ))
        })?;
        if distance(baseline[0], baseline[1]) < EPSILON {
            return Err(LayoutError::degenerate("baseline has zero length"));
        }
        Ok(Self { baseline, coords })
    }

    /// Reads the Baseline and Coords of a TextLine.
    pub fn from_document(doc: &LayoutDocument, line: NodeId) -> Result<Self> {
        if doc.kind(line) != ElementKind::TextLine {
            return Err(LayoutError::validation(format!(
                "expected a TextLine, got {}",
                doc.kind(line).name()
            )));
        }
        let id = doc.id(line).unwrap_or("?");
        let baseline = doc
            .baseline(line)?
            .ok_or_else(|| LayoutError::validation(format!("line {id} has no Baseline")))?;
        let coords = doc
            .coords(line)?
            .ok_or_else(|| LayoutError::validation(format!("line {id} has no Coords")))?;
        Self::new(&baseline, &coords)
    }

    pub fn start(&self) -> Point {
        self.baseline[0]
    }

    pub fn end(&self) -> Point {
        self.baseline[1]
    }

    pub fn length(&self) -> f64 {
        distance(self.baseline[0], self.baseline[1])
    }

    /// Baseline angle in radians.
    pub fn angle(&self) -> f64 {
        let d = sub(self.end(), self.start());
        d.1.atan2(d.0)
    }

    /// Unit direction of the baseline.
    pub fn direction(&self) -> Point {
        // length checked in the constructor
        unit(sub(self.end(), self.start())).unwrap_or((1.0, 0.0))
    }

    pub fn midpoint(&self) -> Point {
        midpoint(self.start(), self.end())
    }

    /// Upper side of the stripe, start to end.
    pub(crate) fn top_side(&self) -> (Point, Point) {
        (self.coords[0], self.coords[1])
    }

    /// Lower side of the stripe, start to end.
    pub(crate) fn bottom_side(&self) -> (Point, Point) {
        (self.coords[3], self.coords[2])
    }

    /// Edge at the baseline start, top to bottom.
    pub(crate) fn leading_edge(&self) -> (Point, Point) {
        (self.coords[0], self.coords[3])
    }

    /// Edge at the baseline end, top to bottom.
    pub(crate) fn trailing_edge(&self) -> (Point, Point) {
        (self.coords[1], self.coords[2])
    }
}

/// Length weighted mean direction of a set of lines.
///
/// When the directions cancel out the direction of the longest member is
/// used, the first one on ties.
pub(crate) fn mean_axis(lines: &[LineGeometry], members: &[usize]) -> Point {
    let sum = members.iter().fold((0.0, 0.0), |acc, &i| {
        let l = &lines[i];
        let d = sub(l.end(), l.start());
        (acc.0 + d.0, acc.1 + d.1)
    });
    unit(sum).unwrap_or_else(|| {
        members
            .iter()
            .map(|&i| &lines[i])
            .reduce(|best, l| if l.length() > best.length() { l } else { best })
            .map_or((1.0, 0.0), LineGeometry::direction)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_point_counts() {
        let b = [(0.0, 0.0), (10.0, 0.0)];
        let c = [(0.0, -5.0), (10.0, -5.0), (10.0, 5.0), (0.0, 5.0)];
        assert!(LineGeometry::new(&b, &c).is_ok());
        assert!(LineGeometry::new(&c, &c).is_err());
        assert!(LineGeometry::new(&b, &b).is_err());
        let err = LineGeometry::new(&[(1.0, 1.0), (1.0, 1.0)], &c).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Degenerate);
    }

    #[test]
    fn mean_axis_weights_by_length() {
        let c = [(0.0, 0.0); 4];
        let lines = [
            LineGeometry::new(&[(0.0, 0.0), (30.0, 0.0)], &c).unwrap(),
            LineGeometry::new(&[(0.0, 0.0), (0.0, 10.0)], &c).unwrap(),
        ];
        let u = mean_axis(&lines, &[0, 1]);
        assert!((u.1 / u.0 - 10.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn cancelling_directions_fall_back_to_longest_line() {
        let c = [(0.0, 0.0); 4];
        let lines = [
            LineGeometry::new(&[(0.0, 0.0), (30.0, 0.0)], &c).unwrap(),
            LineGeometry::new(&[(30.0, 10.0), (20.0, 10.0)], &c).unwrap(),
            LineGeometry::new(&[(30.0, 20.0), (10.0, 20.0)], &c).unwrap(),
        ];
        assert_eq!(mean_axis(&lines, &[0, 1, 2]), (1.0, 0.0));
        assert_eq!(mean_axis(&lines, &[1, 2]), (-1.0, 0.0));
    }
}
