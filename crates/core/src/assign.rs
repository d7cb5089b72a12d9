//! Cross-document line to region assignment.
//!
//! Copies every TextLine of a source document into the destination region
//! it overlaps the most. Candidate regions are prefiltered with an R-tree of
//! their bounding boxes and then scored with an [`OverlapScorer`].

use rstar::{AABB, Envelope, RTree, RTreeObject};
use tracing::{debug, info};

use crate::document::{ElementKind, InsertMode, LayoutDocument, NodeId};
use crate::error::{LayoutError, Result};
use crate::geometry::points::limits;
use crate::geometry::polygon::{GeoProvider, GeometryProvider};
use crate::overlap::OverlapScorer;
use crate::utils::{EPSILON, Point, approx_eq};

/// How a line is scored against the destination regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Intersection over union of the line Coords and the region.
    CoordsIoU,
    /// Area weighted overlap of the line Coords.
    #[default]
    CoordsAreaWeighted,
    /// Length weighted overlap of the line Baseline.
    BaselineAreaWeighted,
    /// `blend_factor * coords + (1 - blend_factor) * baseline`, both area
    /// weighted.
    Blended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignOptions {
    pub policy: OverlapPolicy,
    /// Weight of the coords score under [`OverlapPolicy::Blended`].
    pub blend_factor: f64,
    /// Add a whole-page region so that lines outside every region still
    /// find a home.
    pub use_fallback: bool,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            policy: OverlapPolicy::default(),
            blend_factor: 0.5,
            use_fallback: true,
        }
    }
}

/// Summary of an assignment run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignReport {
    /// Lines copied into the destination.
    pub assigned: usize,
    /// How many of them landed in a fallback region.
    pub to_fallback: usize,
    /// Ids of the fallback regions that were created and kept.
    pub fallback_regions: Vec<String>,
}

/// Bounding box of a destination region inside the R-tree.
#[derive(Debug, Clone, Copy)]
struct RegionEnvelope {
    aabb: AABB<[f64; 2]>,
    index: usize,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn envelope_of(points: &[Point]) -> Option<AABB<[f64; 2]>> {
    let b = limits(points)?;
    Some(AABB::from_corners([b.xmin, b.ymin], [b.xmax, b.ymax]))
}

fn merge(a: Option<AABB<[f64; 2]>>, b: Option<AABB<[f64; 2]>>) -> Option<AABB<[f64; 2]>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.merged(&b)),
        (a, b) => a.or(b),
    }
}

fn same_polygon(a: &[Point], b: &[Point]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(p, q)| approx_eq(p.0, q.0, EPSILON) && approx_eq(p.1, q.1, EPSILON))
}

/// Destination region with its polygon.
struct Target<S> {
    node: NodeId,
    shape: S,
    used: bool,
}

/// Line geometry of a source TextLine, parsed as the policy requires.
struct SourceLine<S> {
    node: NodeId,
    coords: Option<S>,
    baseline: Option<S>,
    envelope: Option<AABB<[f64; 2]>>,
}

/// Assigns lines using the `geo` backed provider.
pub fn assign_lines_by_overlap(
    source: &LayoutDocument,
    dest: &mut LayoutDocument,
    options: &AssignOptions,
) -> Result<AssignReport> {
    assign_lines_with(&GeoProvider, source, dest, options)
}

/// Copies every TextLine of `source` into the TextRegion of `dest` that it
/// overlaps the most, page by page.
///
/// Both documents must have the same number of pages with equal sizes. A
/// line whose best score is zero, or whose id already exists in `dest`,
/// aborts the run with a validation error; lines copied before that stay.
pub fn assign_lines_with<P: GeometryProvider>(
    provider: &P,
    source: &LayoutDocument,
    dest: &mut LayoutDocument,
    options: &AssignOptions,
) -> Result<AssignReport> {
    if !(0.0..=1.0).contains(&options.blend_factor) {
        return Err(LayoutError::validation(format!(
            "blend factor must be within [0, 1], got {}",
            options.blend_factor
        )));
    }

    let src_pages = source.pages();
    let dst_pages = dest.pages();
    if src_pages.len() != dst_pages.len() {
        return Err(LayoutError::validation(format!(
            "page count differs: source has {}, destination has {}",
            src_pages.len(),
            dst_pages.len()
        )));
    }

    let scorer = OverlapScorer::new(provider);
    let mut report = AssignReport::default();
    for (num, (&sp, &dp)) in src_pages.iter().zip(&dst_pages).enumerate() {
        let src_size = source.page_size(sp)?;
        let dst_size = dest.page_size(dp)?;
        if src_size != dst_size {
            return Err(LayoutError::validation(format!(
                "page {num} size differs: source {}x{}, destination {}x{}",
                src_size.0, src_size.1, dst_size.0, dst_size.1
            )));
        }
        assign_page(&scorer, source, sp, dest, dp, options, &mut report)?;
    }

    info!(
        assigned = report.assigned,
        to_fallback = report.to_fallback,
        "assigned lines by overlap"
    );
    Ok(report)
}

/// Adds a whole-page region unless one with the same boundary exists.
/// Returns the created region.
fn ensure_fallback(dest: &mut LayoutDocument, page: NodeId) -> Result<Option<NodeId>> {
    let (w, h) = dest.page_size(page)?;
    let (w, h) = (f64::from(w.saturating_sub(1)), f64::from(h.saturating_sub(1)));
    let whole = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    for region in dest.children_of_kind(page, ElementKind::TextRegion) {
        if let Some(coords) = dest.coords(region)? {
            if same_polygon(&coords, &whole) {
                debug!(region = dest.id(region).unwrap_or("?"), "page already has a fallback");
                return Ok(None);
            }
        }
    }

    let base = format!("{}_fallback", dest.image_base(page)?);
    let mut id = base.clone();
    let mut n = 1;
    while dest.find_by_id(&id).is_some() {
        n += 1;
        id = format!("{base}{n}");
    }
    let region = dest.add_text_region(page, Some(&id), None)?;
    dest.set_coords(region, &whole)?;
    Ok(Some(region))
}

fn read_line<P: GeometryProvider>(
    provider: &P,
    doc: &LayoutDocument,
    line: NodeId,
    policy: OverlapPolicy,
) -> Result<SourceLine<P::Shape>> {
    let id = doc.id(line).unwrap_or("?");
    let want_coords = policy != OverlapPolicy::BaselineAreaWeighted;
    let want_baseline = matches!(
        policy,
        OverlapPolicy::BaselineAreaWeighted | OverlapPolicy::Blended
    );

    let mut out = SourceLine {
        node: line,
        coords: None,
        baseline: None,
        envelope: None,
    };
    if want_coords {
        let points = doc
            .coords(line)?
            .ok_or_else(|| LayoutError::validation(format!("line {id} has no Coords")))?;
        out.envelope = merge(out.envelope, envelope_of(&points));
        out.coords = Some(provider.polygon(&points)?);
    }
    if want_baseline {
        let points = doc
            .baseline(line)?
            .ok_or_else(|| LayoutError::validation(format!("line {id} has no Baseline")))?;
        out.envelope = merge(out.envelope, envelope_of(&points));
        out.baseline = Some(provider.polyline(&points)?);
    }
    Ok(out)
}

fn score_line<P: GeometryProvider>(
    scorer: &OverlapScorer<'_, P>,
    line: &SourceLine<P::Shape>,
    candidates: &[P::Shape],
    options: &AssignOptions,
) -> Result<Vec<f64>> {
    let coords = || line.coords.as_ref().ok_or_else(|| LayoutError::validation("missing Coords"));
    let baseline = || {
        line.baseline
            .as_ref()
            .ok_or_else(|| LayoutError::validation("missing Baseline"))
    };
    match options.policy {
        OverlapPolicy::CoordsIoU => {
            let c = coords()?;
            candidates.iter().map(|r| scorer.iou(c, r)).collect()
        }
        OverlapPolicy::CoordsAreaWeighted => scorer.area_weighted_overlap(coords()?, candidates),
        OverlapPolicy::BaselineAreaWeighted => {
            scorer.area_weighted_overlap(baseline()?, candidates)
        }
        OverlapPolicy::Blended => {
            let b = options.blend_factor;
            let c = scorer.area_weighted_overlap(coords()?, candidates)?;
            let l = scorer.area_weighted_overlap(baseline()?, candidates)?;
            Ok(c.iter().zip(&l).map(|(c, l)| b * c + (1.0 - b) * l).collect())
        }
    }
}

fn assign_page<P: GeometryProvider>(
    scorer: &OverlapScorer<'_, P>,
    source: &LayoutDocument,
    src_page: NodeId,
    dest: &mut LayoutDocument,
    dst_page: NodeId,
    options: &AssignOptions,
    report: &mut AssignReport,
) -> Result<()> {
    let provider = scorer.provider();
    let fallback = if options.use_fallback {
        ensure_fallback(dest, dst_page)?
    } else {
        None
    };

    let mut targets = Vec::new();
    let mut envelopes = Vec::new();
    for region in dest.children_of_kind(dst_page, ElementKind::TextRegion) {
        let Some(points) = dest.coords(region)? else {
            debug!(region = dest.id(region).unwrap_or("?"), "skipping region without Coords");
            continue;
        };
        if let Some(aabb) = envelope_of(&points) {
            envelopes.push(RegionEnvelope {
                aabb,
                index: targets.len(),
            });
        }
        targets.push(Target {
            node: region,
            shape: provider.polygon(&points)?,
            used: false,
        });
    }
    let tree = RTree::bulk_load(envelopes);

    let lines: Vec<NodeId> = source
        .descendants(src_page)
        .into_iter()
        .filter(|&n| source.kind(n) == ElementKind::TextLine)
        .collect();

    for node in lines {
        let line = read_line(provider, source, node, options.policy)?;
        let id = source.id(node).unwrap_or("?");

        let mut candidates: Vec<usize> = match &line.envelope {
            Some(aabb) => tree
                .locate_in_envelope_intersecting(aabb)
                .map(|e| e.index)
                .collect(),
            None => Vec::new(),
        };
        candidates.sort_unstable();
        let shapes: Vec<P::Shape> = candidates.iter().map(|&i| targets[i].shape.clone()).collect();
        let scores = score_line(scorer, &line, &shapes, options)?;

        // first candidate wins ties
        let best = scores
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((i, s)),
            });
        let Some((best, score)) = best.filter(|&(_, s)| s > 0.0) else {
            return Err(LayoutError::validation(format!(
                "line {id} does not overlap any region"
            )));
        };

        let target = &mut targets[candidates[best]];
        dest.import_subtree(source, line.node, target.node, InsertMode::Child)?;
        target.used = true;
        report.assigned += 1;
        if Some(target.node) == fallback {
            report.to_fallback += 1;
        }
        debug!(line = id, region = dest.id(target.node).unwrap_or("?"), score, "assigned line");
    }

    if let Some(region) = fallback {
        let used = targets.iter().any(|t| t.node == region && t.used);
        if used {
            report
                .fallback_regions
                .push(dest.id(region).unwrap_or_default().to_string());
        } else {
            dest.remove_node(region)?;
        }
    }
    Ok(())
}
