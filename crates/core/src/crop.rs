//! Cropping of layout elements out of page images.
//!
//! A selector picks `Coords` elements; for each one the engine computes an
//! integer window around the polygon, copies it out of the page raster and
//! optionally turns everything outside the polygon transparent. Each crop
//! carries a hierarchical name, the rotation and reading direction of its
//! element and the window offset.

use tracing::{debug, warn};

use crate::document::{ElementKind, LayoutDocument, NodeId, ReadingDirection};
use crate::error::{ErrorKind, LayoutError, Result};
use crate::geometry::baseline::orientation;
use crate::geometry::points::limits;
use crate::raster::{CropWindow, PageRasters, QuarterTurn, RasterProvider, polygon_mask};
use crate::utils::Point;

/// Alpha value inside the cropped polygon.
const OPAQUE: u8 = 255;
/// Alpha value for polygons matched by the transparency selector.
const SEMI_TRANSPARENT: u8 = 128;

/// Extra space around the polygon bounding box.
///
/// Values `>= 1.0` are pixels, smaller values a fraction of the larger side
/// of the unexpanded window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margin {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Margin {
    pub fn uniform(value: f64) -> Self {
        Self {
            left: value,
            top: value,
            right: value,
            bottom: value,
        }
    }
}

/// What to do when cropping a single element fails in the raster provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log a warning and continue with the next element.
    #[default]
    Skip,
    /// Return the error.
    Abort,
}

#[derive(Debug, Clone, Default)]
pub struct CropOptions {
    pub margin: Option<Margin>,
    /// Make pixels outside the polygon transparent.
    pub opaque_mask: bool,
    /// Selector, relative to each matched Coords, of polygons painted
    /// semi-transparent in the mask.
    pub transparency_selector: Option<String>,
    /// Node whose id replaces the image base name as crop name prefix.
    pub name_base: Option<NodeId>,
    pub on_error: ErrorPolicy,
}

/// A cropped element.
#[derive(Debug, Clone)]
pub struct NamedCrop<R> {
    pub id: String,
    pub name: String,
    /// Counter-clockwise rotation in degrees.
    pub rotation: f64,
    pub direction: ReadingDirection,
    pub x: u32,
    pub y: u32,
    pub raster: R,
    /// The matched Coords element.
    pub node: NodeId,
}

/// Pixel window before it is checked against the raster, may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelWindow {
    fn to_crop_window(self) -> Result<CropWindow> {
        let conv = |v: i64| u32::try_from(v).ok();
        match (
            conv(self.x),
            conv(self.y),
            conv(self.width).filter(|&w| w > 0),
            conv(self.height).filter(|&h| h > 0),
        ) {
            (Some(x), Some(y), Some(width), Some(height)) => Ok(CropWindow {
                x,
                y,
                width,
                height,
            }),
            _ => Err(LayoutError::provider(format!(
                "crop window {}x{}+{}+{} is outside of the image",
                self.width, self.height, self.x, self.y
            ))),
        }
    }
}

/// Integer crop window of a polygon on a `page_width × page_height` page.
///
/// Without a margin the window is the rounded-out bounding box. With one, it
/// is expanded and clamped to the page.
pub fn crop_window(
    points: &[Point],
    margin: Option<&Margin>,
    page_width: u32,
    page_height: u32,
) -> Result<PixelWindow> {
    let bbox = limits(points).ok_or_else(|| LayoutError::validation("Coords without points"))?;
    let mut x = bbox.xmin.floor() as i64;
    let mut y = bbox.ymin.floor() as i64;
    let mut width = (bbox.xmax.ceil() - bbox.xmin.floor()) as i64 + 1;
    let mut height = (bbox.ymax.ceil() - bbox.ymin.floor()) as i64 + 1;

    if let Some(m) = margin {
        let max_side = width.max(height) as f64;
        let amount = |v: f64| {
            if v < 1.0 {
                (max_side * v) as i64
            } else {
                v as i64
            }
        };
        let (ox, oy) = (x, y);
        x = (x - amount(m.left)).max(0);
        y = (y - amount(m.top)).max(0);
        width += ox - x + amount(m.right);
        height += oy - y + amount(m.bottom);
        width = width.min(page_width as i64 - x);
        height = height.min(page_height as i64 - y);
    }

    Ok(PixelWindow {
        x,
        y,
        width,
        height,
    })
}

/// Crop target resolved from a selector match.
struct CropJob {
    coords: NodeId,
    element: NodeId,
    page: NodeId,
    id: String,
    points: Vec<Point>,
}

/// Crops selected elements out of page images.
pub struct CropEngine<'p, P: RasterProvider> {
    rasters: PageRasters<'p, P>,
}

impl<'p, P: RasterProvider> CropEngine<'p, P> {
    pub fn new(rasters: PageRasters<'p, P>) -> Self {
        Self { rasters }
    }

    pub fn rasters_mut(&mut self) -> &mut PageRasters<'p, P> {
        &mut self.rasters
    }

    /// Crops every `Coords` element matched by `selector`.
    ///
    /// Malformed matches (not a Coords, no id, bad points) abort the whole
    /// batch before any pixel is touched. Raster failures of single elements
    /// follow [`CropOptions::on_error`].
    pub fn crop(
        &mut self,
        doc: &LayoutDocument,
        selector: &str,
        options: &CropOptions,
    ) -> Result<Vec<NamedCrop<P::Raster>>> {
        let matches = doc.select(selector, None)?;
        let jobs = matches
            .iter()
            .enumerate()
            .map(|(n, &coords)| resolve_job(doc, coords, n, selector))
            .collect::<Result<Vec<CropJob>>>()?;
        debug!(selector, matches = jobs.len(), "cropping");

        let mut crops = Vec::with_capacity(jobs.len());
        for job in &jobs {
            match self.crop_one(doc, job, options) {
                Ok(crop) => crops.push(crop),
                Err(e) if e.kind() == ErrorKind::Provider && options.on_error == ErrorPolicy::Skip => {
                    warn!(id = %job.id, error = %e, "skipping crop");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(crops)
    }

    fn crop_one(
        &mut self,
        doc: &LayoutDocument,
        job: &CropJob,
        options: &CropOptions,
    ) -> Result<NamedCrop<P::Raster>> {
        let (page_width, page_height) = doc.page_size(job.page)?;
        let window = crop_window(
            &job.points,
            options.margin.as_ref(),
            page_width,
            page_height,
        )?;
        let name = crop_name(doc, job, options)?;
        let rotation = crop_rotation(doc, job.element)?;
        let direction = crop_direction(doc, job.element)?;

        let mut transparent = Vec::new();
        if options.opaque_mask {
            if let Some(sel) = &options.transparency_selector {
                for c in doc.select(sel, Some(job.coords))? {
                    if doc.kind(c) != ElementKind::Coords {
                        return Err(LayoutError::validation(format!(
                            "expected transparency selector to match only Coords elements: {sel}"
                        )));
                    }
                    transparent.push(doc.points(c)?);
                }
            }
        }

        let provider = self.rasters.provider();
        let raster = self.rasters.get(doc, job.page)?;
        let window = window.to_crop_window()?;
        let mut cropped = provider.crop(raster, window)?;

        if options.opaque_mask {
            let mut polygons: Vec<(&[Point], u8)> = vec![(job.points.as_slice(), OPAQUE)];
            polygons.extend(transparent.iter().map(|p| (p.as_slice(), SEMI_TRANSPARENT)));
            let mask = polygon_mask(
                window.width,
                window.height,
                (window.x as f64, window.y as f64),
                &polygons,
            );
            cropped = provider.composite_alpha(&cropped, &mask)?;
        }

        Ok(NamedCrop {
            id: job.id.clone(),
            name,
            rotation,
            direction,
            x: window.x,
            y: window.y,
            raster: cropped,
            node: job.coords,
        })
    }

    /// Page raster rotated by the page's orientation angle.
    pub fn oriented_page(&mut self, doc: &LayoutDocument, page: NodeId) -> Result<P::Raster> {
        let turn = QuarterTurn::from_degrees(doc.page_orientation(page)?)?;
        let provider = self.rasters.provider();
        let raster = self.rasters.get(doc, page)?;
        Ok(provider.rotate(raster, turn))
    }
}

fn resolve_job(doc: &LayoutDocument, coords: NodeId, n: usize, selector: &str) -> Result<CropJob> {
    if doc.kind(coords) != ElementKind::Coords {
        return Err(LayoutError::validation(format!(
            "expected selector to match only Coords elements: match={} selector={selector}",
            n + 1
        )));
    }
    let element = doc
        .parent(coords)
        .ok_or_else(|| LayoutError::validation("Coords element without parent"))?;
    let id = doc
        .id(element)
        .ok_or_else(|| {
            LayoutError::validation(format!(
                "expected parent element to include id attribute: match={} selector={selector}",
                n + 1
            ))
        })?
        .to_string();
    let page = doc
        .closest(ElementKind::Page, coords)
        .ok_or_else(|| LayoutError::validation(format!("element {id} is not inside a page")))?;
    let points = doc.points(coords)?;
    Ok(CropJob {
        coords,
        element,
        page,
        id,
        points,
    })
}

/// `<base>.<region id>.<line id>...<element id>`
fn crop_name(doc: &LayoutDocument, job: &CropJob, options: &CropOptions) -> Result<String> {
    let base = match options.name_base {
        Some(node) => doc
            .id(node)
            .ok_or_else(|| LayoutError::validation("name base node has no id"))?
            .to_string(),
        None => doc.image_base(job.page)?,
    };

    let mut chain = vec![job.id.as_str()];
    if let Some(region) = doc.closest(ElementKind::TextRegion, job.element) {
        let mut current = job.element;
        while current != region {
            current = doc
                .parent(current)
                .ok_or_else(|| LayoutError::validation("element detached from its region"))?;
            chain.push(doc.id(current).ok_or_else(|| {
                LayoutError::validation(format!(
                    "{} ancestor of {} has no id",
                    doc.kind(current).name(),
                    job.id
                ))
            })?);
        }
    }
    chain.reverse();
    Ok(format!("{base}.{}", chain.join(".")))
}

/// Rotation of the element owning the cropped Coords. A line prefers its
/// baseline orientation over its stored rotation; any other element only
/// has its own `readingOrientation`.
fn crop_rotation(doc: &LayoutDocument, element: NodeId) -> Result<f64> {
    if doc.kind(element) == ElementKind::TextLine {
        if let Some(baseline) = doc.baseline(element)? {
            if let Ok(Some(angle)) = orientation(&baseline) {
                return Ok(-angle.to_degrees());
            }
        }
    }
    doc.rotation(element)
}

fn crop_direction(doc: &LayoutDocument, element: NodeId) -> Result<ReadingDirection> {
    doc.reading_direction(element)
}
