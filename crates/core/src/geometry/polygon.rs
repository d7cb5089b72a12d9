//! Boolean polygon geometry behind a provider trait.
//!
//! Overlap scoring only needs a handful of operations on polygons and
//! polylines. They are expressed as [`GeometryProvider`] so the scorer does
//! not depend on a particular clipping library; [`GeoProvider`] implements
//! them with the `geo` crate.

use geo::{
    Area, BooleanOps, Coord, EuclideanLength, Geometry, LineString, MultiLineString, MultiPolygon,
    Polygon,
};

use crate::error::{LayoutError, Result};
use crate::utils::Point;

/// Dimensional class of a geometry returned by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Empty,
    Point,
    Line,
    Area,
    Collection,
}

impl GeometryKind {
    pub fn is_area(self) -> bool {
        self == GeometryKind::Area
    }

    pub fn is_line(self) -> bool {
        self == GeometryKind::Line
    }
}

/// Boolean geometry operations on polygons and polylines.
pub trait GeometryProvider {
    type Shape: Clone;

    /// Builds a polygon from a boundary walk (at least 3 points).
    fn polygon(&self, points: &[Point]) -> Result<Self::Shape>;
    /// Builds a polyline (at least 2 points).
    fn polyline(&self, points: &[Point]) -> Result<Self::Shape>;
    fn union(&self, a: &Self::Shape, b: &Self::Shape) -> Result<Self::Shape>;
    fn intersection(&self, a: &Self::Shape, b: &Self::Shape) -> Result<Self::Shape>;
    fn area(&self, shape: &Self::Shape) -> f64;
    fn length(&self, shape: &Self::Shape) -> f64;
    fn kind(&self, shape: &Self::Shape) -> GeometryKind;
}

/// [`GeometryProvider`] backed by `geo`'s boolean operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoProvider;

fn line_string(points: &[Point]) -> LineString<f64> {
    LineString::new(points.iter().map(|&(x, y)| Coord { x, y }).collect())
}

fn as_areal(shape: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match shape {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        _ => None,
    }
}

fn as_linear(shape: &Geometry<f64>) -> Option<MultiLineString<f64>> {
    match shape {
        Geometry::Line(l) => Some(MultiLineString::new(vec![LineString::new(vec![
            l.start, l.end,
        ])])),
        Geometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => Some(mls.clone()),
        _ => None,
    }
}

fn shape_name(shape: &Geometry<f64>) -> &'static str {
    match shape {
        Geometry::Point(_) => "point",
        Geometry::Line(_) => "line",
        Geometry::LineString(_) => "linestring",
        Geometry::Polygon(_) => "polygon",
        Geometry::MultiPoint(_) => "multipoint",
        Geometry::MultiLineString(_) => "multilinestring",
        Geometry::MultiPolygon(_) => "multipolygon",
        Geometry::GeometryCollection(_) => "collection",
        Geometry::Rect(_) => "rect",
        Geometry::Triangle(_) => "triangle",
    }
}

impl GeometryProvider for GeoProvider {
    type Shape = Geometry<f64>;

    fn polygon(&self, points: &[Point]) -> Result<Self::Shape> {
        if points.len() < 3 {
            return Err(LayoutError::validation(format!(
                "polygon needs at least 3 points, got {}",
                points.len()
            )));
        }
        Ok(Geometry::Polygon(Polygon::new(line_string(points), vec![])))
    }

    fn polyline(&self, points: &[Point]) -> Result<Self::Shape> {
        if points.len() < 2 {
            return Err(LayoutError::validation(format!(
                "polyline needs at least 2 points, got {}",
                points.len()
            )));
        }
        Ok(Geometry::LineString(line_string(points)))
    }

    fn union(&self, a: &Self::Shape, b: &Self::Shape) -> Result<Self::Shape> {
        match (as_areal(a), as_areal(b)) {
            (Some(pa), Some(pb)) => Ok(Geometry::MultiPolygon(pa.union(&pb))),
            _ => Err(LayoutError::provider(format!(
                "union of {} and {} is not supported",
                shape_name(a),
                shape_name(b)
            ))),
        }
    }

    fn intersection(&self, a: &Self::Shape, b: &Self::Shape) -> Result<Self::Shape> {
        if let (Some(pa), Some(pb)) = (as_areal(a), as_areal(b)) {
            return Ok(Geometry::MultiPolygon(pa.intersection(&pb)));
        }
        if let (Some(line), Some(poly)) = (as_linear(a), as_areal(b)) {
            return Ok(Geometry::MultiLineString(poly.clip(&line, false)));
        }
        if let (Some(poly), Some(line)) = (as_areal(a), as_linear(b)) {
            return Ok(Geometry::MultiLineString(poly.clip(&line, false)));
        }
        Err(LayoutError::provider(format!(
            "intersection of {} and {} is not supported",
            shape_name(a),
            shape_name(b)
        )))
    }

    fn area(&self, shape: &Self::Shape) -> f64 {
        shape.unsigned_area()
    }

    fn length(&self, shape: &Self::Shape) -> f64 {
        as_linear(shape).map_or(0.0, |mls| mls.euclidean_length())
    }

    fn kind(&self, shape: &Self::Shape) -> GeometryKind {
        match shape {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::MultiPoint(mp) if mp.0.is_empty() => GeometryKind::Empty,
            Geometry::MultiPoint(_) => GeometryKind::Point,
            Geometry::GeometryCollection(gc) if gc.0.is_empty() => GeometryKind::Empty,
            Geometry::GeometryCollection(_) => GeometryKind::Collection,
            other => {
                if let Some(mls) = as_linear(other) {
                    if mls.0.iter().all(|ls| ls.0.len() < 2) {
                        GeometryKind::Empty
                    } else {
                        GeometryKind::Line
                    }
                } else if as_areal(other).is_some_and(|mp| {
                    mp.0.iter().any(|p| p.exterior().0.len() >= 3)
                }) {
                    GeometryKind::Area
                } else {
                    GeometryKind::Empty
                }
            }
        }
    }
}
