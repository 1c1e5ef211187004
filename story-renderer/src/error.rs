//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering and export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The generated SVG could not be parsed.
    #[error("SVG parsing failed: {0}")]
    Svg(String),

    /// Rasterisation target could not be created.
    #[error("Rasterisation failed: {0}")]
    Raster(String),

    /// Image encoding failed.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// An image source could not be resolved.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// Exported bytes could not be persisted.
    #[error("Export failed: {0}")]
    Export(String),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
