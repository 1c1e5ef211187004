//! Resolution of layer image references.
//!
//! A layer's `source_uri` is opaque to the editing core. The renderer asks an
//! [`ImageSource`] for the bytes and embeds them into the SVG intermediate as
//! a base64 data URI, so rasterisation never touches the filesystem or the
//! network. `data:` URIs are passed through untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::Engine;

use crate::error::{RenderError, RenderResult};

/// Supplies encoded image bytes for a source URI.
pub trait ImageSource: Send + Sync {
    /// Fetch the encoded bytes (PNG, JPEG, GIF or WebP) behind `uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is unknown or cannot be read.
    fn fetch(&self, uri: &str) -> RenderResult<Vec<u8>>;
}

/// Reads local files, given as plain paths or `file://` URIs.
///
/// Relative paths are resolved against an optional root directory.
#[derive(Debug, Clone, Default)]
pub struct FileImageSource {
    root: Option<PathBuf>,
}

impl FileImageSource {
    /// Resolve relative paths against the working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, uri: &str) -> RenderResult<PathBuf> {
        let path = if let Some(rest) = uri.strip_prefix("file://") {
            Path::new(rest)
        } else if uri.contains("://") {
            return Err(RenderError::Resource(format!("Unsupported URI scheme: {uri}")));
        } else {
            Path::new(uri)
        };
        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        })
    }
}

impl ImageSource for FileImageSource {
    fn fetch(&self, uri: &str) -> RenderResult<Vec<u8>> {
        let path = self.resolve(uri)?;
        std::fs::read(&path)
            .map_err(|e| RenderError::Resource(format!("{}: {e}", path.display())))
    }
}

/// In-memory images keyed by URI, for pre-fetched assets.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImageSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes for a URI.
    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(uri.into(), bytes);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(uri, bytes);
        self
    }
}

impl ImageSource for MemoryImageSource {
    fn fetch(&self, uri: &str) -> RenderResult<Vec<u8>> {
        self.images
            .get(uri)
            .cloned()
            .ok_or_else(|| RenderError::Resource(format!("Unknown image: {uri}")))
    }
}

/// MIME type of encoded image bytes, sniffed from their magic bytes.
///
/// # Errors
///
/// Returns an error for formats the rasteriser cannot decode.
pub fn mime_type(bytes: &[u8]) -> RenderResult<&'static str> {
    let format = image::guess_format(bytes)
        .map_err(|e| RenderError::Resource(format!("Unrecognised image data: {e}")))?;
    match format {
        image::ImageFormat::Png => Ok("image/png"),
        image::ImageFormat::Jpeg => Ok("image/jpeg"),
        image::ImageFormat::Gif => Ok("image/gif"),
        image::ImageFormat::WebP => Ok("image/webp"),
        other => Err(RenderError::Resource(format!(
            "Unsupported image format: {other:?}"
        ))),
    }
}

/// Encode image bytes as a base64 data URI.
///
/// # Errors
///
/// Returns an error if the bytes are not a supported image format.
pub fn encode_data_uri(bytes: &[u8]) -> RenderResult<String> {
    let mime = mime_type(bytes)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}

/// Turn a layer's source URI into something the rasteriser can load.
///
/// Returns `None`, after logging a warning, when the source cannot be
/// resolved; the layer then draws no image content.
#[must_use]
pub fn resolve_href(source: &dyn ImageSource, uri: &str) -> Option<String> {
    if uri.starts_with("data:") {
        return Some(uri.to_string());
    }
    match source.fetch(uri).and_then(|bytes| encode_data_uri(&bytes)) {
        Ok(href) => Some(href),
        Err(e) => {
            tracing::warn!("Skipping image {uri}: {e}");
            None
        }
    }
}
