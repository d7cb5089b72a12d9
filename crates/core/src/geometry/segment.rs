//! Segment intersection and collinearity tests.

use crate::error::{LayoutError, Result};
use crate::utils::{
    COLLINEAR_EPSILON, EPSILON, PARALLEL_EPSILON, Point, add, cross, dot, scale, sub,
};

/// Position of a point relative to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPosition {
    /// Collinear and between the two end points (inclusive).
    OnSegment,
    /// Collinear and beyond the end point.
    RightOf,
    /// Collinear and before the start point.
    LeftOf,
    /// Not on the line through the segment.
    NotCollinear,
}

/// Finds the intersection of the lines through segments `a1→a2` and `b1→b2`.
///
/// The segments are extended to infinite lines, so the returned point need
/// not lie on either segment. Returns None when the lines are parallel or one
/// of the segments has zero length.
pub fn segment_intersection(a1: Point, a2: Point, b1: Point, b2: Point) -> Option<Point> {
    let da = sub(a2, a1);
    let db = sub(b2, b1);
    let c = cross(da, db);
    if c.abs() < PARALLEL_EPSILON {
        return None;
    }
    let t = cross(sub(b1, a1), db) / c;
    Some(add(a1, scale(da, t)))
}

/// Parameter of the projection of `point` onto the segment, 0 at `start` and
/// 1 at `end`. Returns None for a zero-length segment.
pub fn segment_parameter(start: Point, end: Point, point: Point) -> Option<f64> {
    let d = sub(end, start);
    let len2 = dot(d, d);
    if len2 < EPSILON * EPSILON {
        return None;
    }
    Some(dot(sub(point, start), d) / len2)
}

/// Checks whether `point` is collinear with the segment `start→end` and, if so,
/// on which side of it it falls.
///
/// Collinearity is judged by the area of the triangle formed by the three
/// points divided by the squared length of its longest side.
pub fn within_segment(start: Point, end: Point, point: Point) -> Result<SegmentPosition> {
    let ab = sub(end, start);
    let len2 = dot(ab, ab);
    if len2 < EPSILON * EPSILON {
        return Err(LayoutError::degenerate(format!(
            "zero-length segment at ({}, {})",
            start.0, start.1
        )));
    }

    let ap = sub(point, start);
    let bp = sub(point, end);
    let longest2 = len2.max(dot(ap, ap)).max(dot(bp, bp));
    let area = cross(ab, ap).abs() / 2.0;
    if area / longest2 >= COLLINEAR_EPSILON {
        return Ok(SegmentPosition::NotCollinear);
    }

    let t = dot(ap, ab) / len2;
    Ok(if t < -EPSILON {
        SegmentPosition::LeftOf
    } else if t > 1.0 + EPSILON {
        SegmentPosition::RightOf
    } else {
        SegmentPosition::OnSegment
    })
}
