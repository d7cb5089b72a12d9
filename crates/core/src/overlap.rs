//! Overlap scoring between polygons and polylines.
//!
//! All boolean geometry is delegated to a [`GeometryProvider`]; this module
//! only turns areas and lengths into ratios.

use tracing::debug;

use crate::error::{LayoutError, Result};
use crate::geometry::polygon::{GeometryKind, GeometryProvider};
use crate::utils::EPSILON;

/// Computes overlap ratios using a geometry provider.
pub struct OverlapScorer<'a, P: GeometryProvider> {
    provider: &'a P,
}

impl<'a, P: GeometryProvider> OverlapScorer<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &'a P {
        self.provider
    }

    fn area_of(&self, shape: &P::Shape, what: &str) -> Result<f64> {
        let area = self.provider.area(shape);
        if area <= EPSILON {
            return Err(LayoutError::degenerate(format!("{what} has zero area")));
        }
        Ok(area)
    }

    /// Intersection over union of two polygons, 0 when the intersection is
    /// not area-bearing.
    pub fn iou(&self, p: &P::Shape, q: &P::Shape) -> Result<f64> {
        let inter = self.provider.intersection(p, q)?;
        if self.provider.kind(&inter) != GeometryKind::Area {
            return Ok(0.0);
        }
        let ai = self.provider.area(&inter);
        let union = self.provider.area(p) + self.provider.area(q) - ai;
        if union <= EPSILON {
            return Err(LayoutError::degenerate("union of polygons has zero area"));
        }
        Ok(ai / union)
    }

    /// Fraction of the area of `p` covered by `q`.
    pub fn intersect_factor(&self, p: &P::Shape, q: &P::Shape) -> Result<f64> {
        let area = self.area_of(p, "polygon")?;
        let inter = self.provider.intersection(p, q)?;
        if self.provider.kind(&inter) != GeometryKind::Area {
            return Ok(0.0);
        }
        Ok(self.provider.area(&inter) / area)
    }

    /// Fraction of the length of `line` that falls inside `poly`.
    pub fn line_intersect_factor(&self, line: &P::Shape, poly: &P::Shape) -> Result<f64> {
        let len = self.provider.length(line);
        if len <= EPSILON {
            return Err(LayoutError::degenerate("polyline has zero length"));
        }
        let inter = self.provider.intersection(line, poly)?;
        if self.provider.kind(&inter) != GeometryKind::Line {
            return Ok(0.0);
        }
        Ok(self.provider.length(&inter) / len)
    }

    /// Scores how much of `target` falls into each candidate polygon.
    ///
    /// A polyline target is scored by length, a polygon target by area. When
    /// two or more candidates overlap the target, each nonzero score is
    /// scaled by `1 - area(candidate) / Σ area(overlapping candidates)` so a
    /// large region that contains everything does not win by default.
    pub fn area_weighted_overlap(
        &self,
        target: &P::Shape,
        candidates: &[P::Shape],
    ) -> Result<Vec<f64>> {
        let by_length = self.provider.kind(target) == GeometryKind::Line;
        let mut scores = candidates
            .iter()
            .map(|c| {
                if by_length {
                    self.line_intersect_factor(target, c)
                } else {
                    self.intersect_factor(target, c)
                }
            })
            .collect::<Result<Vec<f64>>>()?;

        let overlapping: Vec<usize> = (0..scores.len()).filter(|&i| scores[i] > 0.0).collect();
        if overlapping.len() < 2 {
            return Ok(scores);
        }

        let areas: Vec<f64> = overlapping
            .iter()
            .map(|&i| self.provider.area(&candidates[i]))
            .collect();
        let total: f64 = areas.iter().sum();
        if total <= EPSILON {
            return Err(LayoutError::degenerate(
                "overlapping candidates have zero total area",
            ));
        }
        for (&i, area) in overlapping.iter().zip(&areas) {
            scores[i] *= 1.0 - area / total;
        }
        debug!(
            candidates = candidates.len(),
            overlapping = overlapping.len(),
            "area weighted overlap"
        );
        Ok(scores)
    }

    /// Area of the union of several polygons.
    pub fn union_area(&self, polygons: &[P::Shape]) -> Result<f64> {
        let Some((first, rest)) = polygons.split_first() else {
            return Ok(0.0);
        };
        let mut acc = first.clone();
        for p in rest {
            acc = self.provider.union(&acc, p)?;
        }
        Ok(self.provider.area(&acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon::GeoProvider;

    #[test]
    fn half_covered_square() {
        let geo = GeoProvider;
        let scorer = OverlapScorer::new(&geo);
        let p = geo
            .polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
            .unwrap();
        let q = geo
            .polygon(&[(5.0, 0.0), (20.0, 0.0), (20.0, 10.0), (5.0, 10.0)])
            .unwrap();
        assert!((scorer.intersect_factor(&p, &q).unwrap() - 0.5).abs() < 1e-9);
        // 50 / (100 + 150 - 50)
        assert!((scorer.iou(&p, &q).unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn zero_length_line_is_degenerate() {
        let geo = GeoProvider;
        let scorer = OverlapScorer::new(&geo);
        let line = geo.polyline(&[(1.0, 1.0), (1.0, 1.0)]).unwrap();
        let poly = geo
            .polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)])
            .unwrap();
        let err = scorer.line_intersect_factor(&line, &poly).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Degenerate);
    }
}
