//! Raster access for page images.
//!
//! Core code only talks to rasters through [`RasterProvider`]. The
//! [`ImageRasterProvider`] implementation works on `image::DynamicImage`.
//! [`PageRasters`] loads each page image at most once and checks it against
//! the page's declared size.

pub mod dynamic;

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point as PixelPoint;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::document::{LayoutDocument, NodeId};
use crate::error::{LayoutError, Result};
use crate::utils::Point;

pub use dynamic::ImageRasterProvider;

/// Integer pixel window of a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Rotation by a multiple of 90 degrees, counter-clockwise positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuarterTurn {
    #[default]
    None,
    Ccw90,
    Half,
    Cw90,
}

impl QuarterTurn {
    /// Accepts the page orientation angles 0, 90, 180 (or -180) and -90
    /// (or 270).
    pub fn from_degrees(degrees: f64) -> Result<Self> {
        match degrees {
            d if d == 0.0 => Ok(QuarterTurn::None),
            d if d == 90.0 => Ok(QuarterTurn::Ccw90),
            d if d == 180.0 || d == -180.0 => Ok(QuarterTurn::Half),
            d if d == -90.0 || d == 270.0 => Ok(QuarterTurn::Cw90),
            d => Err(LayoutError::validation(format!(
                "unsupported page orientation: {d}"
            ))),
        }
    }
}

/// Pixel operations needed to crop layout elements out of page images.
pub trait RasterProvider {
    type Raster: Clone;

    fn load(&self, path: &Path) -> Result<Self::Raster>;
    /// `(width, height)` in pixels.
    fn dimensions(&self, raster: &Self::Raster) -> (u32, u32);
    /// Copies a window, failing when it does not fit inside the raster.
    fn crop(&self, raster: &Self::Raster, window: CropWindow) -> Result<Self::Raster>;
    /// Attaches `mask` (same size as the raster) as alpha channel.
    fn composite_alpha(&self, raster: &Self::Raster, mask: &GrayImage) -> Result<Self::Raster>;
    fn rotate(&self, raster: &Self::Raster, turn: QuarterTurn) -> Self::Raster;
}

/// Paints polygons into a `width × height` mask, each with its own value.
///
/// Points are translated by `-origin` and rounded to pixels. Later polygons
/// are painted over earlier ones.
pub fn polygon_mask(
    width: u32,
    height: u32,
    origin: Point,
    polygons: &[(&[Point], u8)],
) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for &(points, value) in polygons {
        let mut pixels: Vec<PixelPoint<i32>> = points
            .iter()
            .map(|&(x, y)| {
                PixelPoint::new(
                    (x - origin.0).round() as i32,
                    (y - origin.1).round() as i32,
                )
            })
            .collect();
        pixels.dedup();
        while pixels.len() > 1 && pixels.first() == pixels.last() {
            pixels.pop();
        }
        if pixels.len() < 3 {
            continue;
        }
        draw_polygon_mut(&mut mask, &pixels, Luma([value]));
    }
    mask
}

/// Page images of one document, loaded lazily and cached by page number.
pub struct PageRasters<'p, P: RasterProvider> {
    provider: &'p P,
    base_dir: Option<PathBuf>,
    cache: FxHashMap<usize, P::Raster>,
}

impl<'p, P: RasterProvider> PageRasters<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        Self {
            provider,
            base_dir: None,
            cache: FxHashMap::default(),
        }
    }

    /// Resolves relative image file names against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn provider(&self) -> &'p P {
        self.provider
    }

    fn check_size(&self, doc: &LayoutDocument, page: NodeId, raster: &P::Raster) -> Result<()> {
        let declared = doc.page_size(page)?;
        let actual = self.provider.dimensions(raster);
        if declared != actual {
            return Err(LayoutError::validation(format!(
                "page image size {}x{} differs from the declared {}x{}",
                actual.0, actual.1, declared.0, declared.1
            )));
        }
        Ok(())
    }

    fn page_index(doc: &LayoutDocument, page: NodeId) -> Result<usize> {
        doc.page_number(page)
            .ok_or_else(|| LayoutError::validation("node is not inside a page"))
    }

    /// Uses an already decoded raster for a page instead of loading its file.
    pub fn insert(&mut self, doc: &LayoutDocument, page: NodeId, raster: P::Raster) -> Result<()> {
        let index = Self::page_index(doc, page)?;
        self.check_size(doc, page, &raster)?;
        self.cache.insert(index, raster);
        Ok(())
    }

    /// Raster of a page, loading it on first use.
    pub fn get(&mut self, doc: &LayoutDocument, page: NodeId) -> Result<&P::Raster> {
        let index = Self::page_index(doc, page)?;
        if !self.cache.contains_key(&index) {
            let filename = doc.image_filename(page)?;
            let path = match &self.base_dir {
                Some(dir) => dir.join(filename),
                None => PathBuf::from(filename),
            };
            debug!(page = index, path = %path.display(), "loading page image");
            let raster = self.provider.load(&path)?;
            self.check_size(doc, page, &raster)?;
            self.cache.insert(index, raster);
        }
        self.cache
            .get(&index)
            .ok_or_else(|| LayoutError::provider("page raster vanished from cache"))
    }
}
