//! Reading order parameters.
//!
//! Contains ReadingOrderParams for controlling line joining and ordering.

use crate::error::{LayoutError, Result};

/// Parameters for line continuation and reading order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingOrderParams {
    /// Two lines whose baseline angles differ by more than this (radians)
    /// are never joined.
    pub max_angle_diff: f64,

    /// Maximum intersection over union of the two baselines projected on the
    /// shared horizontal axis. Continuations do not overlap horizontally.
    pub max_horiz_iou: f64,

    /// Minimum prolongation factor for a pair to be joined.
    pub min_prolong_factor: f64,

    /// Weight of the baseline factor in the prolongation factor. The coords
    /// factor gets the remaining `1 - baseline_weight`.
    pub baseline_weight: f64,

    /// Multiplier applied to the angle and overlap limits (and divisor of the
    /// prolongation limit) when an ambiguous group is split again.
    pub recursion_scale: f64,
}

impl Default for ReadingOrderParams {
    fn default() -> Self {
        Self {
            max_angle_diff: 25f64.to_radians(),
            max_horiz_iou: 0.1,
            min_prolong_factor: 0.5,
            baseline_weight: 0.8,
            recursion_scale: 0.9,
        }
    }
}

impl ReadingOrderParams {
    pub fn validate(&self) -> Result<()> {
        let check = |ok: bool, what: &str, value: f64| {
            if ok {
                Ok(())
            } else {
                Err(LayoutError::validation(format!("invalid {what}: {value}")))
            }
        };
        check(
            self.max_angle_diff > 0.0 && self.max_angle_diff <= std::f64::consts::PI,
            "max_angle_diff",
            self.max_angle_diff,
        )?;
        check(
            (0.0..=1.0).contains(&self.max_horiz_iou),
            "max_horiz_iou",
            self.max_horiz_iou,
        )?;
        check(
            (0.0..=1.0).contains(&self.min_prolong_factor),
            "min_prolong_factor",
            self.min_prolong_factor,
        )?;
        check(
            (0.0..=1.0).contains(&self.baseline_weight),
            "baseline_weight",
            self.baseline_weight,
        )?;
        check(
            self.recursion_scale > 0.0 && self.recursion_scale < 1.0,
            "recursion_scale",
            self.recursion_scale,
        )
    }

    /// Limits used when re-testing an ambiguous group.
    pub fn stricter(&self) -> Self {
        Self {
            max_angle_diff: self.max_angle_diff * self.recursion_scale,
            max_horiz_iou: self.max_horiz_iou * self.recursion_scale,
            min_prolong_factor: self.min_prolong_factor / self.recursion_scale,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ReadingOrderParams::default().validate().unwrap();
    }

    #[test]
    fn stricter_limits() {
        let p = ReadingOrderParams::default().stricter();
        assert!((p.max_horiz_iou - 0.09).abs() < 1e-12);
        assert!((p.min_prolong_factor - 0.5 / 0.9).abs() < 1e-12);
        assert_eq!(p.baseline_weight, 0.8);
    }

    #[test]
    fn rejects_out_of_range() {
        let p = ReadingOrderParams {
            recursion_scale: 1.0,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }
}
