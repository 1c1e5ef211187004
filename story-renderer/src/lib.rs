//! # Story Renderer
//!
//! Composite renderer for story frames. The same code path draws the live
//! preview and the flattened export; only the output pixel size differs.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        Scene (layers, ascending z)          │
//! ├─────────────────────────────────────────────┤
//! │   SVG intermediate (viewBox = logical)      │
//! ├─────────────┬─────────────┬─────────────────┤
//! │ PNG         │ JPEG        │ SVG             │
//! │ (tiny-skia) │ (flattened) │ (as is)         │
//! └─────────────┴─────────────┴─────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod composite;
pub mod error;
pub mod export;
pub mod source;

pub use composite::{CompositeRenderer, ExportFormat, RenderConfig};
pub use error::{RenderError, RenderResult};
pub use export::{DirectoryTarget, ExportTarget, SnapshotExporter};
pub use source::{FileImageSource, ImageSource, MemoryImageSource};

use std::sync::Arc;

use story_core::{FrameSize, Scene};

/// Renders the live preview at the current viewport size.
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    renderer: CompositeRenderer,
    viewport: FrameSize,
    frame_count: u64,
}

impl PreviewRenderer {
    /// Create a preview renderer for a viewport of `width` x `height` pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the viewport is empty.
    pub fn new(config: RenderConfig, width: u32, height: u32) -> RenderResult<Self> {
        let mut preview = Self {
            renderer: CompositeRenderer::new(config),
            viewport: FrameSize::ZERO,
            frame_count: 0,
        };
        preview.resize(width, height)?;
        Ok(preview)
    }

    /// Use another image source.
    #[must_use]
    pub fn with_image_source(mut self, images: Arc<dyn ImageSource>) -> Self {
        self.renderer = self.renderer.with_image_source(images);
        self
    }

    /// Render a frame.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&mut self, scene: &Scene) -> RenderResult<tiny_skia::Pixmap> {
        let pixmap = self.renderer.render_pixmap(scene)?;
        self.frame_count += 1;
        Ok(pixmap)
    }

    /// Get the current frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The viewport the canvas is fitted into.
    #[must_use]
    pub fn viewport(&self) -> FrameSize {
        self.viewport
    }

    /// Size of the rendered canvas in pixels.
    ///
    /// Feed this to the path recorder as the on-screen size.
    #[must_use]
    pub fn rendered_size(&self) -> (u32, u32) {
        self.renderer.config().output_size()
    }

    /// Get the renderer configuration.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        self.renderer.config()
    }

    /// Resize the viewport.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::Raster(format!(
                "viewport must be non-empty, got {width}x{height}"
            )));
        }
        let config = RenderConfig {
            width: Some(width),
            height: Some(height),
            ..self.renderer.config().clone()
        };
        self.renderer.set_config(config);
        self.viewport = FrameSize::new(width as f32, height as f32);
        tracing::debug!("Preview viewport resized to {width}x{height}");
        Ok(())
    }
}
