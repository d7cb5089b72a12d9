//! Miscellaneous geometry routines.
//!
//! Provides the tuple geometry types shared by every module and the small
//! vector helpers the baseline and reading-order code is written against:
//! - Geometric types (Point, Rect)
//! - Numeric tolerances
//! - Vector arithmetic and angle normalization

use std::f64::consts::PI;

/// Lines whose direction cross product is below this are treated as parallel.
pub const PARALLEL_EPSILON: f64 = 1e-8;

/// Normalized triangle area below which three points are collinear.
pub const COLLINEAR_EPSILON: f64 = 1e-3;

/// Tolerance on the normalized dot product when checking stripe edges.
pub const STRIPE_PARALLEL_EPSILON: f64 = 1e-2;

/// Lengths below this are considered zero.
pub const EPSILON: f64 = 1e-9;

/// A 2D point (x, y) in image coordinates (y grows downwards).
pub type Point = (f64, f64);

/// A rectangle defined by (x0, y0, x1, y1).
pub type Rect = (f64, f64, f64, f64);

/// Compares two floats for approximate equality.
#[inline]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

#[inline]
pub fn sub(a: Point, b: Point) -> Point {
    (a.0 - b.0, a.1 - b.1)
}

#[inline]
pub fn add(a: Point, b: Point) -> Point {
    (a.0 + b.0, a.1 + b.1)
}

#[inline]
pub fn scale(v: Point, s: f64) -> Point {
    (v.0 * s, v.1 * s)
}

#[inline]
pub fn dot(a: Point, b: Point) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

/// z component of the cross product of two 2D vectors.
#[inline]
pub fn cross(a: Point, b: Point) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

#[inline]
pub fn norm(v: Point) -> f64 {
    v.0.hypot(v.1)
}

#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    norm(sub(a, b))
}

#[inline]
pub fn midpoint(a: Point, b: Point) -> Point {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

/// Returns the unit vector of `v`, or None if `v` has (near) zero length.
pub fn unit(v: Point) -> Option<Point> {
    let n = norm(v);
    if n < EPSILON {
        None
    } else {
        Some((v.0 / n, v.1 / n))
    }
}

/// Rotates a vector by +90 degrees in image coordinates.
///
/// For a left-to-right direction (1, 0) this yields (0, 1), which points down
/// the page.
#[inline]
pub fn perpendicular(v: Point) -> Point {
    (-v.1, v.0)
}

/// Signed difference `a - b` normalized to the range (-π, π].
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let mut d = (a - b) % (2.0 * PI);
    if d > PI {
        d -= 2.0 * PI;
    } else if d <= -PI {
        d += 2.0 * PI;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_diff_wraps_to_half_open_range() {
        assert!(approx_eq(angle_diff(PI, -PI), 0.0, 1e-12));
        assert!(approx_eq(angle_diff(-PI, 0.0), PI, 1e-12));
        assert!(approx_eq(angle_diff(0.1, 2.0 * PI - 0.1), 0.2, 1e-12));
    }

    #[test]
    fn unit_rejects_zero_vectors() {
        assert!(unit((0.0, 0.0)).is_none());
        let u = unit((3.0, 4.0)).unwrap();
        assert!(approx_eq(u.0, 0.6, 1e-12) && approx_eq(u.1, 0.8, 1e-12));
    }

    #[test]
    fn perpendicular_points_down_for_left_to_right() {
        assert_eq!(perpendicular((1.0, 0.0)), (-0.0, 1.0));
    }
}
