/// Errors raised when constructing or resizing a coverage buffer
use thiserror::Error;

/// Largest supported viewport dimension, in pixels.
pub const MAX_DIMENSION: usize = 16384;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoverageBufferError {
    #[error("viewport dimensions must be non-zero (got {width}x{height})")]
    ZeroDimension { width: usize, height: usize },

    #[error("viewport dimension {dim} exceeds the supported maximum {max}")]
    DimensionTooLarge { dim: usize, max: usize },
}
