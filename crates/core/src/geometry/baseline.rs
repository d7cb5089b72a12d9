//! Baseline analysis: orientation, length and polystripes.
//!
//! A polystripe is a Coords polygon built as a band of constant height around
//! a baseline. For a baseline with `n` points the stripe has `2n` points: the
//! `n` points above the baseline walking forward followed by the `n` points
//! below it walking backward, so the walk closes into a simple polygon.
//!
//! ```text
//!   c0 ───────── c1 ───────── c2        above = height - offset·height
//!   b0 ───────── b1 ───────── b2        (baseline)
//!   c5 ───────── c4 ───────── c3        below = offset·height
//! ```

use crate::error::{LayoutError, Result};
use crate::utils::{
    COLLINEAR_EPSILON, EPSILON, Point, STRIPE_PARALLEL_EPSILON, add, angle_diff, distance, dot,
    norm, scale, sub, unit,
};

use super::segment::{SegmentPosition, segment_intersection, within_segment};

/// Height and offset of a polystripe.
///
/// `offset` is the fraction of the height that lies below the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolyStripe {
    pub height: f64,
    pub offset: f64,
}

impl PolyStripe {
    /// Creates stripe parameters, checking `height > 0` and `offset ∈ [0, 0.5]`.
    pub fn new(height: f64, offset: f64) -> Result<Self> {
        if !(height.is_finite() && height > 0.0) {
            return Err(LayoutError::validation(format!(
                "polystripe height must be positive, got {height}"
            )));
        }
        if !(0.0..=0.5).contains(&offset) {
            return Err(LayoutError::validation(format!(
                "polystripe offset must be within [0, 0.5], got {offset}"
            )));
        }
        Ok(Self { height, offset })
    }

    /// Distance from the baseline to the upper side of the stripe.
    pub fn above(&self) -> f64 {
        self.height - self.offset * self.height
    }

    /// Distance from the baseline to the lower side of the stripe.
    pub fn below(&self) -> f64 {
        self.height - self.above()
    }
}

/// Sum of the distances between consecutive points.
pub fn length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Length weighted mean angle of the segments of a polyline, in radians.
///
/// Segment angles are unwrapped relative to the first segment of non-zero
/// length before averaging, so a polyline wiggling around ±π does not average
/// to 0. Returns None for fewer than 2 points and a degenerate error when
/// every segment has zero length.
pub fn orientation(points: &[Point]) -> Result<Option<f64>> {
    if points.len() < 2 {
        return Ok(None);
    }

    let mut reference: Option<f64> = None;
    let mut total = 0.0;
    let mut weighted = 0.0;
    for w in points.windows(2) {
        let d = sub(w[1], w[0]);
        let len = norm(d);
        if len < EPSILON {
            continue;
        }
        let angle = d.1.atan2(d.0);
        let r = *reference.get_or_insert(angle);
        weighted += len * (r + angle_diff(angle, r));
        total += len;
    }

    if total < EPSILON {
        return Err(LayoutError::degenerate(
            "cannot compute orientation of a zero-length polyline",
        ));
    }
    Ok(Some(angle_diff(weighted / total, 0.0)))
}

/// Unit direction of every edge of a polyline.
fn edge_directions(points: &[Point]) -> Result<Vec<Point>> {
    points
        .windows(2)
        .enumerate()
        .map(|(k, w)| {
            unit(sub(w[1], w[0])).ok_or_else(|| {
                LayoutError::degenerate(format!("baseline edge {k} has zero length"))
            })
        })
        .collect()
}

/// Offsets every baseline vertex by `dist` along the edge normals, joining
/// consecutive offset edges at their intersection.
fn offset_side(baseline: &[Point], dirs: &[Point], dist: f64) -> Vec<Point> {
    // (dy, -dx) points up the page for a left-to-right baseline
    let normals: Vec<Point> = dirs.iter().map(|d| (d.1, -d.0)).collect();
    let last = baseline.len() - 1;

    (0..baseline.len())
        .map(|i| {
            let raw = |k: usize| add(baseline[i], scale(normals[k], dist));
            if i == 0 {
                return raw(0);
            }
            if i == last {
                return raw(last - 1);
            }
            let prev = normals[i - 1];
            let next = normals[i];
            segment_intersection(
                add(baseline[i - 1], scale(prev, dist)),
                add(baseline[i], scale(prev, dist)),
                add(baseline[i], scale(next, dist)),
                add(baseline[i + 1], scale(next, dist)),
            )
            .unwrap_or_else(|| raw(i))
        })
        .collect()
}

/// Builds the polystripe Coords for a baseline.
///
/// The upper side lies `height - offset·height` above the baseline and the
/// lower side `offset·height` below it. Interior corners are miter joins of
/// consecutive offset edges.
pub fn synthesize_stripe(baseline: &[Point], height: f64, offset: f64) -> Result<Vec<Point>> {
    if baseline.len() < 2 {
        return Err(LayoutError::validation(format!(
            "baseline needs at least 2 points, got {}",
            baseline.len()
        )));
    }
    let stripe = PolyStripe::new(height, offset)?;
    let dirs = edge_directions(baseline)?;

    let above = offset_side(baseline, &dirs, stripe.above());
    let below = offset_side(baseline, &dirs, -stripe.below());

    let mut coords = above;
    coords.extend(below.into_iter().rev());
    Ok(coords)
}

/// Checks whether `coords` is a polystripe of `baseline` and recovers its
/// parameters.
///
/// Every baseline vertex must lie between its two paired coords points, the
/// offset edges must be parallel to the baseline edges and the two end edges
/// must be perpendicular to the adjoining baseline edge.
pub fn verify_stripe(coords: &[Point], baseline: &[Point]) -> Option<PolyStripe> {
    let n = baseline.len();
    if n < 2 || coords.len() != 2 * n {
        return None;
    }
    let dirs = edge_directions(baseline).ok()?;
    let below_of = |i: usize| coords[2 * n - 1 - i];

    for (i, &b) in baseline.iter().enumerate() {
        match within_segment(coords[i], below_of(i), b) {
            Ok(SegmentPosition::OnSegment) => {}
            _ => return None,
        }
    }

    let parallel = |from: Point, to: Point, dir: Point| -> bool {
        match unit(sub(to, from)) {
            Some(u) => 1.0 - dot(u, dir) < STRIPE_PARALLEL_EPSILON,
            // a collapsed lower side coincides with the baseline only when
            // the baseline edge itself collapses, which edge_directions rejects
            None => false,
        }
    };
    for (k, &dir) in dirs.iter().enumerate() {
        if !parallel(coords[k], coords[k + 1], dir) || !parallel(below_of(k), below_of(k + 1), dir)
        {
            return None;
        }
    }

    let perpendicular = |a: Point, b: Point, dir: Point| -> bool {
        unit(sub(b, a)).is_some_and(|u| dot(u, dir).abs() < STRIPE_PARALLEL_EPSILON)
    };
    if !perpendicular(coords[0], below_of(0), dirs[0])
        || !perpendicular(coords[n - 1], below_of(n - 1), dirs[n - 2])
    {
        return None;
    }

    let up = distance(baseline[0], coords[0]);
    let down = distance(baseline[0], below_of(0));
    let height = up + down;
    if height < EPSILON {
        return None;
    }
    let offset = down / height;
    if offset > 0.5 + COLLINEAR_EPSILON {
        return None;
    }
    Some(PolyStripe {
        height,
        offset: offset.min(0.5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn straight_stripe_corners() {
        let coords = synthesize_stripe(&[(0.0, 10.0), (100.0, 10.0)], 20.0, 0.5).unwrap();
        assert_eq!(
            coords,
            vec![(0.0, 0.0), (100.0, 0.0), (100.0, 20.0), (0.0, 20.0)]
        );
    }

    #[test]
    fn zero_offset_puts_lower_side_on_baseline() {
        let baseline = [(0.0, 10.0), (50.0, 10.0), (100.0, 10.0)];
        let coords = synthesize_stripe(&baseline, 8.0, 0.0).unwrap();
        assert_eq!(&coords[3..], &[(100.0, 10.0), (50.0, 10.0), (0.0, 10.0)]);
        let stripe = verify_stripe(&coords, &baseline).unwrap();
        assert!((stripe.height - 8.0).abs() < 1e-9);
        assert!(stripe.offset.abs() < 1e-9);
    }

    #[test]
    fn orientation_of_vertical_baseline() {
        let o = orientation(&[(0.0, 0.0), (0.0, 10.0)]).unwrap().unwrap();
        assert!((o - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn orientation_unwraps_around_pi() {
        // Right-to-left baseline wiggling slightly up and down
        let o = orientation(&[(100.0, 0.0), (50.0, 1.0), (0.0, 0.0)])
            .unwrap()
            .unwrap();
        assert!(angle_diff(o, PI).abs() < 1e-9);
    }

    #[test]
    fn orientation_of_collapsed_polyline_is_degenerate() {
        assert!(orientation(&[(1.0, 1.0)]).unwrap().is_none());
        assert!(orientation(&[(1.0, 1.0), (1.0, 1.0)]).is_err());
    }

    #[test]
    fn rejects_bad_parameters() {
        let baseline = [(0.0, 0.0), (10.0, 0.0)];
        assert!(synthesize_stripe(&baseline, 0.0, 0.2).is_err());
        assert!(synthesize_stripe(&baseline, 5.0, 0.7).is_err());
        assert!(synthesize_stripe(&[(0.0, 0.0), (0.0, 0.0)], 5.0, 0.2).is_err());
    }

    #[test]
    fn verify_rejects_non_stripes() {
        let baseline = [(0.0, 10.0), (100.0, 10.0)];
        assert!(verify_stripe(&[(0.0, 0.0), (100.0, 0.0), (100.0, 20.0)], &baseline).is_none());
        // skewed end edge
        let skewed = [(0.0, 0.0), (100.0, 0.0), (100.0, 20.0), (10.0, 20.0)];
        assert!(verify_stripe(&skewed, &baseline).is_none());
    }
}
