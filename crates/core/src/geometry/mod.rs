//! Geometry engine for layout shapes.
//!
//! This module contains:
//! - Point list parsing, formatting and bounding boxes (`points`)
//! - Segment intersection and collinearity tests (`segment`)
//! - Baseline orientation and polystripes (`baseline`)
//! - The boolean polygon provider seam (`polygon`)

pub mod baseline;
pub mod points;
pub mod polygon;
pub mod segment;

pub use baseline::*;
pub use points::*;
pub use polygon::{GeoProvider, GeometryKind, GeometryProvider};
pub use segment::*;
