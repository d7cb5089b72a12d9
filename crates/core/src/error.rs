//! Error types for vellum layout processing.

use thiserror::Error;

/// Primary error type for layout geometry operations.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("malformed point at token {index}: {token:?}")]
    MalformedPoints { index: usize, token: String },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`LayoutError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing geometry, wrong element types, id collisions.
    Validation,
    /// Zero-length vectors or zero areas that would make a division undefined.
    Degenerate,
    /// Raster or polygon provider failure.
    Provider,
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LayoutError::Validation(_) | LayoutError::MalformedPoints { .. } => {
                ErrorKind::Validation
            }
            LayoutError::Degenerate(_) => ErrorKind::Degenerate,
            LayoutError::Provider(_) | LayoutError::Image(_) | LayoutError::Io(_) => {
                ErrorKind::Provider
            }
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        LayoutError::Validation(msg.into())
    }

    pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
        LayoutError::Degenerate(msg.into())
    }

    pub(crate) fn provider(msg: impl Into<String>) -> Self {
        LayoutError::Provider(msg.into())
    }
}

/// Convenience Result type alias for LayoutError.
pub type Result<T> = std::result::Result<T, LayoutError>;
