//! Pairwise line continuation tests.
//!
//! Two lines `n` and `m` are a continuation (`m` reads right after `n` on
//! the same text row) when their baselines have similar angles, `m` starts
//! after `n` along their shared axis, their projections barely overlap, and
//! extending one line reaches the other at the expected height.
//!
//! The last condition is scored by the prolongation factor:
//!
//! ```text
//!        n                          m
//!   ┌──────────┐ ─ ─ ─ ─ ─ ─ ─ ┬──────────┐
//!   │ ──────── │ ─ ─ ─ ─ ─ ─ ─ │ ──────── │   baseline factor: where the
//!   └──────────┘ ─ ─ ─ ─ ─ ─ ─ ┴──────────┘   extended baseline meets the
//!                                             other line's edge
//! ```
//!
//! The coords factor measures how much of the other line's edge the
//! extended top and bottom sides span.

use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::error::Result;
use crate::geometry::segment::{segment_intersection, segment_parameter};
use crate::utils::{Point, add, angle_diff, dot, sub, unit};

use super::params::ReadingOrderParams;
use super::{LineGeometry, mean_axis};

/// Bound on the re-test rounds of an ambiguous group. With a zero
/// prolongation limit stricter params may never reject the last pair.
const MAX_RETEST_ROUNDS: usize = 64;

/// A set of lines that continue each other, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinGroup {
    /// Line indices, first to last.
    pub lines: Vec<usize>,
    /// Mean prolongation factor of the joined pairs.
    pub score: f64,
}

/// 1-D intersection over union of two intervals.
fn interval_iou(a: (f64, f64), b: (f64, f64)) -> f64 {
    let inter = (a.1.min(b.1) - a.0.max(b.0)).max(0.0);
    let union = a.1.max(b.1) - a.0.min(b.0);
    if union <= 0.0 { 0.0 } else { inter / union }
}

fn projected_interval(line: &LineGeometry, axis: Point) -> (f64, f64) {
    let s = dot(line.start(), axis);
    let e = dot(line.end(), axis);
    (s.min(e), s.max(e))
}

/// Position along `edge` where the infinite line through `side` crosses it,
/// 0 at the edge start and 1 at its end.
fn edge_position(side: (Point, Point), edge: (Point, Point)) -> Option<f64> {
    let p = segment_intersection(side.0, side.1, edge.0, edge.1)?;
    segment_parameter(edge.0, edge.1, p)
}

/// How much of `edge` the band between the extended `top` and `bottom`
/// sides covers.
fn band_overlap(top: (Point, Point), bottom: (Point, Point), edge: (Point, Point)) -> f64 {
    match (edge_position(top, edge), edge_position(bottom, edge)) {
        (Some(a), Some(b)) => interval_iou((a.min(b), a.max(b)), (0.0, 1.0)),
        _ => 0.0,
    }
}

/// How close the extended baseline lands to where the other line's own
/// baseline meets the same edge.
fn baseline_alignment(baseline: (Point, Point), edge: (Point, Point), reference: Point) -> f64 {
    let Some(t) = edge_position(baseline, edge) else {
        return 0.0;
    };
    let Some(t_ref) = segment_parameter(edge.0, edge.1, reference) else {
        return 0.0;
    };
    (1.0 - (t - t_ref).abs()).max(0.0)
}

/// Prolongation factor of `m` continuing `n`.
pub fn prolongation_factor(n: &LineGeometry, m: &LineGeometry, baseline_weight: f64) -> f64 {
    let coords = (band_overlap(n.top_side(), n.bottom_side(), m.leading_edge())
        + band_overlap(m.top_side(), m.bottom_side(), n.trailing_edge()))
        / 2.0;
    let baseline = (baseline_alignment((n.start(), n.end()), m.leading_edge(), m.start())
        + baseline_alignment((m.start(), m.end()), n.trailing_edge(), n.end()))
        / 2.0;
    baseline_weight * baseline + (1.0 - baseline_weight) * coords
}

/// Tests whether line `m` continues line `n`, returning the prolongation
/// factor of accepted pairs.
pub fn test_pair(n: &LineGeometry, m: &LineGeometry, params: &ReadingOrderParams) -> Option<f64> {
    if angle_diff(n.angle(), m.angle()).abs() > params.max_angle_diff {
        return None;
    }

    let axis = unit(add(sub(n.end(), n.start()), sub(m.end(), m.start())))?;
    if dot(m.start(), axis) < dot(n.start(), axis) {
        return None;
    }
    if interval_iou(projected_interval(n, axis), projected_interval(m, axis))
        > params.max_horiz_iou
    {
        return None;
    }

    let factor = prolongation_factor(n, m, params.baseline_weight);
    (factor >= params.min_prolong_factor).then_some(factor)
}

/// Connected components of the accepted pairs among `members`.
fn pair_groups(
    lines: &[LineGeometry],
    members: &[usize],
    params: &ReadingOrderParams,
) -> Vec<JoinGroup> {
    // group id of every member, groups merged when a pair spans two of them
    let mut group_of: Vec<Option<usize>> = vec![None; lines.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut factors: Vec<(usize, usize, f64)> = Vec::new();

    for (&n, &m) in members.iter().tuple_combinations() {
        let accepted = test_pair(&lines[n], &lines[m], params)
            .map(|f| (n, m, f))
            .or_else(|| test_pair(&lines[m], &lines[n], params).map(|f| (m, n, f)));
        let Some((a, b, f)) = accepted else {
            continue;
        };
        factors.push((a, b, f));

        match (group_of[a], group_of[b]) {
            (None, None) => {
                group_of[a] = Some(groups.len());
                group_of[b] = Some(groups.len());
                groups.push(vec![a, b]);
            }
            (Some(g), None) => {
                group_of[b] = Some(g);
                groups[g].push(b);
            }
            (None, Some(g)) => {
                group_of[a] = Some(g);
                groups[g].push(a);
            }
            (Some(ga), Some(gb)) if ga != gb => {
                let moved = std::mem::take(&mut groups[gb]);
                for &i in &moved {
                    group_of[i] = Some(ga);
                }
                groups[ga].extend(moved);
            }
            _ => {}
        }
    }

    groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .map(|g| {
            let inside: Vec<f64> = factors
                .iter()
                .filter(|(a, b, _)| g.contains(a) && g.contains(b))
                .map(|&(_, _, f)| f)
                .collect();
            let score = inside.iter().sum::<f64>() / inside.len().max(1) as f64;
            JoinGroup { lines: g, score }
        })
        .collect()
}

/// Whether two members of a group overlap along the group axis.
fn is_ambiguous(lines: &[LineGeometry], members: &[usize], axis: Point, max_iou: f64) -> bool {
    members.iter().tuple_combinations().any(|(&a, &b)| {
        interval_iou(
            projected_interval(&lines[a], axis),
            projected_interval(&lines[b], axis),
        ) > max_iou
    })
}

/// Groups lines that continue each other.
///
/// Every ordered pair of lines is tested with [`test_pair`]; accepted pairs
/// are merged into groups. A group of more than two lines whose members
/// overlap along the group axis is re-tested on its own with ever stricter
/// limits until it splits, and dropped once no pair survives. The members
/// of each final group are sorted along the group axis.
pub fn test_line_continuation(
    lines: &[LineGeometry],
    params: &ReadingOrderParams,
) -> Result<Vec<JoinGroup>> {
    params.validate()?;

    struct Pending {
        members: Vec<usize>,
        params: ReadingOrderParams,
        round: usize,
    }

    let mut work = vec![Pending {
        members: (0..lines.len()).collect(),
        params: *params,
        round: 0,
    }];
    let mut result = Vec::new();

    while let Some(item) = work.pop() {
        for mut group in pair_groups(lines, &item.members, &item.params) {
            let axis = mean_axis(lines, &group.lines);
            if group.lines.len() > 2
                && is_ambiguous(lines, &group.lines, axis, item.params.max_horiz_iou)
            {
                if item.round >= MAX_RETEST_ROUNDS {
                    debug!(lines = ?group.lines, "dropping ambiguous group");
                    continue;
                }
                debug!(
                    lines = ?group.lines,
                    round = item.round + 1,
                    "re-testing ambiguous group"
                );
                work.push(Pending {
                    members: group.lines,
                    params: item.params.stricter(),
                    round: item.round + 1,
                });
                continue;
            }

            group
                .lines
                .sort_by_key(|&i| OrderedFloat(dot(lines[i].start(), axis)));
            result.push(group);
        }
    }

    result.sort_by_key(|g| g.lines.iter().copied().min().unwrap_or(usize::MAX));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripe(x0: f64, x1: f64, y: f64, h: f64) -> LineGeometry {
        LineGeometry::new(
            &[(x0, y), (x1, y)],
            &[
                (x0, y - h / 2.0),
                (x1, y - h / 2.0),
                (x1, y + h / 2.0),
                (x0, y + h / 2.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn aligned_neighbours_have_full_factor() {
        let n = stripe(0.0, 100.0, 10.0, 20.0);
        let m = stripe(105.0, 200.0, 10.0, 20.0);
        let f = prolongation_factor(&n, &m, 0.8);
        assert!((f - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shifted_line_scores_lower() {
        let n = stripe(0.0, 100.0, 10.0, 20.0);
        let m = stripe(105.0, 200.0, 20.0, 20.0);
        let f = prolongation_factor(&n, &m, 0.8);
        // baseline lands half a height off: 0.5, bands overlap 10 of 30: 1/3
        assert!((f - (0.8 * 0.5 + 0.2 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn order_of_pair_matters() {
        let n = stripe(0.0, 100.0, 10.0, 20.0);
        let m = stripe(105.0, 200.0, 10.0, 20.0);
        let p = ReadingOrderParams::default();
        assert!(test_pair(&n, &m, &p).is_some());
        assert!(test_pair(&m, &n, &p).is_none());
    }

    #[test]
    fn interval_iou_values() {
        assert_eq!(interval_iou((0.0, 1.0), (2.0, 3.0)), 0.0);
        assert_eq!(interval_iou((0.0, 2.0), (1.0, 3.0)), 1.0 / 3.0);
    }
}
