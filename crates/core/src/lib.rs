//! vellum - page layout geometry, reading order and overlap assignment.
//!
//! A layout document is a tree of Page → TextRegion → TextLine → Word → Glyph
//! elements carrying Coords polygons and Baseline polylines. This crate holds
//! the geometry engine that works on those shapes:
//! - point list parsing/formatting and segment math (`geometry`)
//! - baseline orientation and polystripe synthesis/verification
//! - crop windows and masks (`crop`, `raster`)
//! - polygon overlap scoring (`overlap`)
//! - line continuation and reading order (`reading_order`)
//! - cross-document line to region assignment (`assign`)

pub mod assign;
pub mod crop;
pub mod document;
pub mod error;
pub mod geometry;
pub mod overlap;
pub mod raster;
pub mod reading_order;
pub mod utils;

// Re-export the most used geometry routines at the crate root
pub use geometry::baseline::{PolyStripe, length, orientation, synthesize_stripe, verify_stripe};
pub use geometry::points::{BoundingBox, ParseMode, format_points, parse_points};

pub use document::{ElementKind, LayoutDocument, NodeId};
pub use error::{ErrorKind, LayoutError, Result};
