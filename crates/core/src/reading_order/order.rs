//! Global reading order.
//!
//! Lines are first joined with [`test_line_continuation`]; every line that
//! joined nothing forms a group of its own. Groups are then sorted top to
//! bottom along the direction perpendicular to the page's mean baseline
//! direction, and their members are emitted in join order.

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::document::{ElementKind, LayoutDocument, NodeId};
use crate::error::{LayoutError, Result};
use crate::utils::{Point, dot, perpendicular};

use super::continuation::{JoinGroup, test_line_continuation};
use super::params::ReadingOrderParams;
use super::{LineGeometry, mean_axis};

/// Length weighted midpoint of the baselines of a group.
fn centroid(lines: &[LineGeometry], members: &[usize]) -> Point {
    let (mut x, mut y, mut total) = (0.0, 0.0, 0.0);
    for &i in members {
        let l = &lines[i];
        let (mx, my) = l.midpoint();
        let len = l.length();
        x += mx * len;
        y += my * len;
        total += len;
    }
    (x / total, y / total)
}

/// Reading order of a set of lines as a permutation of their indices.
pub fn get_reading_order(lines: &[LineGeometry], params: &ReadingOrderParams) -> Result<Vec<usize>> {
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let mut groups = test_line_continuation(lines, params)?;
    let mut joined = vec![false; lines.len()];
    for g in &groups {
        for &i in &g.lines {
            joined[i] = true;
        }
    }
    groups.extend(
        (0..lines.len())
            .filter(|&i| !joined[i])
            .map(|i| JoinGroup {
                lines: vec![i],
                score: 0.0,
            }),
    );

    let all: Vec<usize> = (0..lines.len()).collect();
    let axis = mean_axis(lines, &all);
    let down = perpendicular(axis);

    groups.sort_by_cached_key(|g| {
        let c = centroid(lines, &g.lines);
        (
            OrderedFloat(dot(c, down)),
            OrderedFloat(dot(c, axis)),
            g.lines.first().copied().unwrap_or(usize::MAX),
        )
    });
    debug!(lines = lines.len(), groups = groups.len(), "reading order");

    Ok(groups.into_iter().flat_map(|g| g.lines).collect())
}

/// Sorts the TextLine children of a region in reading order and returns
/// them in their new order.
pub fn sort_region_lines(
    doc: &mut LayoutDocument,
    region: NodeId,
    params: &ReadingOrderParams,
) -> Result<Vec<NodeId>> {
    doc.check_alive(region)?;
    if doc.kind(region) != ElementKind::TextRegion {
        return Err(LayoutError::validation(format!(
            "sort_region_lines: expected a TextRegion, got {}",
            doc.kind(region).name()
        )));
    }
    let nodes = doc.children_of_kind(region, ElementKind::TextLine);
    let lines = nodes
        .iter()
        .map(|&n| LineGeometry::from_document(doc, n))
        .collect::<Result<Vec<_>>>()?;

    let order: Vec<NodeId> = get_reading_order(&lines, params)?
        .into_iter()
        .map(|i| nodes[i])
        .collect();
    doc.reorder_children(region, &order)?;
    Ok(order)
}
