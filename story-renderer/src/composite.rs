//! Back-to-front flattening of a [`Scene`].
//!
//! Layers are written into an SVG intermediate whose `viewBox` is the logical
//! canvas and whose `width`/`height` are the output pixels. All layer
//! geometry and stroke widths stay in logical units, so a preview and a full
//! resolution export differ only in sharpness. The SVG is rasterised with the
//! resvg/tiny-skia pipeline.

use std::fmt::Write;
use std::sync::Arc;

use image::ImageEncoder;
use story_core::{fit_frame, FrameSize, Layer, Scene};

use crate::error::{RenderError, RenderResult};
use crate::source::{resolve_href, FileImageSource, ImageSource};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// PNG image.
    Png,
    /// JPEG image, alpha flattened onto the background.
    Jpeg,
    /// SVG vector graphics (the intermediate as UTF-8 bytes).
    Svg,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }

    /// MIME type.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Detect the format from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }
}

/// Configuration for compositing.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Logical canvas the layer geometry is expressed in.
    pub logical: FrameSize,
    /// Maximum output width in pixels (default: logical width).
    pub width: Option<u32>,
    /// Maximum output height in pixels (default: logical height).
    pub height: Option<u32>,
    /// Background color as RGBA bytes.
    pub background: [u8; 4],
    /// JPEG quality 1-100 (default: 90).
    pub jpeg_quality: u8,
    /// Scale factor (e.g. 2.0 for retina).
    pub scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            logical: FrameSize::STORY,
            width: None,
            height: None,
            background: [255, 255, 255, 255],
            jpeg_quality: 90,
            scale: 1.0,
        }
    }
}

impl RenderConfig {
    /// Output size in pixels.
    ///
    /// The logical canvas is fitted (contain) into the requested width and
    /// height, so the aspect ratio never changes.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn output_size(&self) -> (u32, u32) {
        let logical = self.logical;
        let max_w = self.width.map_or(f32::MAX, |w| w as f32);
        let max_h = self.height.map_or(f32::MAX, |h| h as f32);
        let fitted = if self.width.is_none() && self.height.is_none() {
            logical
        } else {
            fit_frame(logical.width, logical.height, max_w, max_h)
        };
        let scale = if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            1.0
        };
        let out_w = (fitted.width * scale).round() as u32;
        let out_h = (fitted.height * scale).round() as u32;
        (out_w.max(1), out_h.max(1))
    }
}

/// Flattens scenes to SVG, PNG and JPEG.
#[derive(Clone)]
pub struct CompositeRenderer {
    config: RenderConfig,
    images: Arc<dyn ImageSource>,
}

impl std::fmt::Debug for CompositeRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeRenderer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CompositeRenderer {
    /// Create a renderer that reads images from local files.
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            images: Arc::new(FileImageSource::new()),
        }
    }

    /// Create a renderer with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RenderConfig::default())
    }

    /// Use another image source.
    #[must_use]
    pub fn with_image_source(mut self, images: Arc<dyn ImageSource>) -> Self {
        self.images = images;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replace the configuration, keeping the image source.
    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
    }

    /// Render a scene to the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if the scene cannot be rendered or encoded.
    pub fn export(&self, scene: &Scene, format: ExportFormat) -> RenderResult<Vec<u8>> {
        match format {
            ExportFormat::Png => self.render_to_png(scene),
            ExportFormat::Jpeg => self.render_to_jpeg(scene),
            ExportFormat::Svg => Ok(self.render_to_svg(scene).into_bytes()),
        }
    }

    /// Render the scene to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn render_to_png(&self, scene: &Scene) -> RenderResult<Vec<u8>> {
        self.render_pixmap(scene)?
            .encode_png()
            .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}")))
    }

    /// Render the scene to JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render_to_jpeg(&self, scene: &Scene) -> RenderResult<Vec<u8>> {
        let pixmap = self.render_pixmap(scene)?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let bg = &self.config.background;
        let mut rgb_data = Vec::with_capacity(width as usize * height as usize * 3);
        // Pixmap data is premultiplied.
        for pixel in pixmap.data().chunks_exact(4) {
            let inv = 1.0 - f32::from(pixel[3]) / 255.0;
            for (&src, &back) in pixel[..3].iter().zip(bg.iter()) {
                let value = f32::from(back).mul_add(inv, f32::from(src));
                rgb_data.push(value.round().min(255.0) as u8);
            }
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality);
        encoder
            .write_image(&rgb_data, width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| RenderError::Encode(format!("JPEG encoding failed: {e}")))?;

        Ok(buf.into_inner())
    }

    /// Render the scene to a tiny-skia pixmap.
    ///
    /// # Errors
    ///
    /// Returns an error if the intermediate SVG cannot be rasterised.
    pub fn render_pixmap(&self, scene: &Scene) -> RenderResult<tiny_skia::Pixmap> {
        let svg = self.render_to_svg(scene);
        rasterize_svg(&svg)
    }

    /// Render the scene to an SVG string.
    ///
    /// Layers are drawn in ascending `z_index`. Images that cannot be
    /// resolved are skipped with a warning.
    #[must_use]
    pub fn render_to_svg(&self, scene: &Scene) -> String {
        let (out_w, out_h) = self.config.output_size();
        let FrameSize {
            width: view_w,
            height: view_h,
        } = self.config.logical;

        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {view_w} {view_h}\" preserveAspectRatio=\"none\">",
        );

        let bg = &self.config.background;
        let bg_alpha = f32::from(bg[3]) / 255.0;
        let _ = write!(
            svg,
            "<rect width=\"{view_w}\" height=\"{view_h}\" fill=\"rgb({},{},{})\" fill-opacity=\"{bg_alpha}\"/>",
            bg[0], bg[1], bg[2],
        );

        let mut layers: Vec<&Layer> = scene.iter().collect();
        layers.sort_by_key(|layer| layer.z_index);

        for (index, layer) in layers.iter().enumerate() {
            self.render_layer_svg(&mut svg, index, layer);
        }

        svg.push_str("</svg>");
        tracing::trace!("Composited {} layers into {out_w}x{out_h}", layers.len());
        svg
    }

    /// Render one layer.
    ///
    /// The image sits in a group carrying the layer transform. Paths hold
    /// logical canvas coordinates and are drawn after it, outside that group.
    /// Opacity applies to both.
    fn render_layer_svg(&self, svg: &mut String, index: usize, layer: &Layer) {
        svg.push_str("<g");
        if layer.opacity < 1.0 {
            let _ = write!(svg, " opacity=\"{}\"", layer.opacity.max(0.0));
        }
        svg.push('>');

        let t = &layer.transform;
        if t.scale.is_finite() && t.scale > 0.0 {
            let (sw, sh) = t.scaled_size();
            let degrees = t.rotation.to_degrees();
            let _ = write!(
                svg,
                "<g transform=\"translate({} {}) rotate({degrees} {} {}) scale({})\">",
                t.x,
                t.y,
                sw / 2.0,
                sh / 2.0,
                t.scale,
            );
            self.render_image_svg(svg, index, layer);
            svg.push_str("</g>");
        }

        for path in &layer.paths {
            let _ = write!(
                svg,
                "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
                escape_xml(&path.path_data),
                escape_xml(&path.color),
                path.stroke_width,
            );
        }

        svg.push_str("</g>");
    }

    /// Write the layer's image in layer-local units, if it resolves.
    fn render_image_svg(&self, svg: &mut String, index: usize, layer: &Layer) {
        let t = &layer.transform;
        let Some(uri) = &layer.source_uri else {
            return;
        };
        if t.width <= 0.0 || t.height <= 0.0 {
            return;
        }
        let Some(href) = resolve_href(self.images.as_ref(), uri) else {
            return;
        };
        let filter = layer
            .tint
            .as_deref()
            .map(|tint| write_tint_filter(svg, index, tint));
        let _ = write!(
            svg,
            "<image width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" href=\"{}\"",
            t.width,
            t.height,
            escape_xml(&href),
        );
        if let Some(id) = filter {
            let _ = write!(svg, " filter=\"url(#{id})\"");
        }
        svg.push_str("/>");
    }
}

/// Write a filter that repaints the image in `tint`, keeping its alpha.
fn write_tint_filter(svg: &mut String, index: usize, tint: &str) -> String {
    let id = format!("tint-{index}");
    let _ = write!(
        svg,
        "<defs><filter id=\"{id}\"><feFlood flood-color=\"{}\"/><feComposite in2=\"SourceAlpha\" operator=\"in\"/></filter></defs>",
        escape_xml(tint),
    );
    id
}

/// Rasterize an SVG string to a tiny-skia Pixmap.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rasterize_svg(svg_string: &str) -> RenderResult<tiny_skia::Pixmap> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg_string, &opt)
        .map_err(|e| RenderError::Svg(e.to_string()))?;

    let px_w = tree.size().width().round() as u32;
    let px_h = tree.size().height().round() as u32;

    let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
        .ok_or_else(|| RenderError::Raster(format!("cannot allocate {px_w}x{px_h} pixmap")))?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    Ok(pixmap)
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
