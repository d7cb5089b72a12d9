//! [`RasterProvider`] over `image::DynamicImage`.

use std::path::Path;

use image::{DynamicImage, GenericImageView, GrayImage};

use crate::error::{LayoutError, Result};

use super::{CropWindow, QuarterTurn, RasterProvider};

/// Decodes page images with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRasterProvider;

impl RasterProvider for ImageRasterProvider {
    type Raster = DynamicImage;

    fn load(&self, path: &Path) -> Result<Self::Raster> {
        Ok(image::open(path)?)
    }

    fn dimensions(&self, raster: &Self::Raster) -> (u32, u32) {
        raster.dimensions()
    }

    fn crop(&self, raster: &Self::Raster, window: CropWindow) -> Result<Self::Raster> {
        let (w, h) = raster.dimensions();
        let fits = window.width > 0
            && window.height > 0
            && window.x.checked_add(window.width).is_some_and(|r| r <= w)
            && window.y.checked_add(window.height).is_some_and(|b| b <= h);
        if !fits {
            return Err(LayoutError::provider(format!(
                "crop window {}x{}+{}+{} outside of {w}x{h} image",
                window.width, window.height, window.x, window.y
            )));
        }
        Ok(raster.crop_imm(window.x, window.y, window.width, window.height))
    }

    fn composite_alpha(&self, raster: &Self::Raster, mask: &GrayImage) -> Result<Self::Raster> {
        if raster.dimensions() != mask.dimensions() {
            return Err(LayoutError::provider(format!(
                "mask size {:?} differs from image size {:?}",
                mask.dimensions(),
                raster.dimensions()
            )));
        }
        let mut rgba = raster.to_rgba8();
        for (x, y, px) in rgba.enumerate_pixels_mut() {
            px[3] = mask.get_pixel(x, y)[0];
        }
        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn rotate(&self, raster: &Self::Raster, turn: QuarterTurn) -> Self::Raster {
        match turn {
            QuarterTurn::None => raster.clone(),
            QuarterTurn::Ccw90 => raster.rotate270(),
            QuarterTurn::Half => raster.rotate180(),
            QuarterTurn::Cw90 => raster.rotate90(),
        }
    }
}
