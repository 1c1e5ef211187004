//! Asynchronous export of flattened frames.
//!
//! The caller hands over a [`Scene`] by value (a cheap copy-on-write
//! snapshot). Rendering runs on a blocking task and the encoded bytes are
//! persisted through an [`ExportTarget`]. The scene store is never touched,
//! so the editor keeps working while an export is in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use story_core::{Scene, Snapshot};
use uuid::Uuid;

use crate::composite::{CompositeRenderer, ExportFormat};
use crate::error::{RenderError, RenderResult};

/// Where exported bytes end up.
#[async_trait]
pub trait ExportTarget: Send + Sync {
    /// Store the encoded frame and return a URI for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be persisted.
    async fn persist(&self, bytes: Vec<u8>, format: ExportFormat) -> RenderResult<String>;
}

/// Writes each export to a uniquely named file in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryTarget {
    dir: PathBuf,
}

impl DirectoryTarget {
    /// Export into `dir`, created on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportTarget for DirectoryTarget {
    async fn persist(&self, bytes: Vec<u8>, format: ExportFormat) -> RenderResult<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("story-{}.{}", Uuid::new_v4(), format.extension()));
        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(format!("file://{}", path.display()))
    }
}

/// Renders scenes off the caller's thread and persists them.
#[derive(Clone)]
pub struct SnapshotExporter {
    renderer: Arc<CompositeRenderer>,
    target: Arc<dyn ExportTarget>,
    format: ExportFormat,
}

impl std::fmt::Debug for SnapshotExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotExporter")
            .field("renderer", &self.renderer)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl SnapshotExporter {
    /// Create an exporter writing PNG frames to `target`.
    #[must_use]
    pub fn new(renderer: CompositeRenderer, target: Arc<dyn ExportTarget>) -> Self {
        Self {
            renderer: Arc::new(renderer),
            target,
            format: ExportFormat::Png,
        }
    }

    /// Use another output format.
    #[must_use]
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// The output format.
    #[must_use]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Flatten the scene and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering, encoding or persistence fails.
    pub async fn export(&self, scene: Scene) -> RenderResult<Snapshot> {
        let renderer = Arc::clone(&self.renderer);
        let format = self.format;
        let layers = scene.len();
        let bytes = tokio::task::spawn_blocking(move || renderer.export(&scene, format))
            .await
            .map_err(|e| RenderError::Export(format!("Render task failed: {e}")))??;

        let uri = self.target.persist(bytes, format).await?;
        tracing::info!("Exported {layers} layers to {uri}");
        Ok(Snapshot::new(uri))
    }
}
