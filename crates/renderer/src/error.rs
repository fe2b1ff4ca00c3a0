//! Error types for overlay rendering.

use thiserror::Error;

/// Result type alias using RenderError.
pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    // === Input Errors ===
    #[error("Invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Field grid {nx}x{ny} is empty")]
    EmptyField { nx: usize, ny: usize },

    // === Output Errors ===
    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("PNG encoding failed: {0}")]
    Png(#[from] std::io::Error),
}
