//! Serialized scene document used by the export tooling.
//!
//! Layer IDs are plain strings in the document so hand-written files stay
//! readable; layers without a `z_index` keep their document order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geometry::FrameSize;
use crate::snapshot::current_timestamp_ms;
use crate::{DrawingPath, Layer, LayerId, LayerKind, Scene, StoryError, StoryResult, Transform};

/// Document-friendly layer description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDocument {
    /// Layer identifier (UUID). A fresh ID is generated when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Layer content type.
    pub kind: LayerKind,
    /// Image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    /// Transform in logical canvas units.
    #[serde(default)]
    pub transform: Transform,
    /// Opacity from 0.0 to 1.0.
    #[serde(default = "LayerDocument::default_opacity")]
    pub opacity: f32,
    /// Paint order rank; ties keep document order.
    #[serde(default)]
    pub z_index: u32,
    /// Color override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint: Option<String>,
    /// Finished strokes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<DrawingPath>,
}

impl From<&Layer> for LayerDocument {
    fn from(layer: &Layer) -> Self {
        Self {
            id: Some(layer.id.to_string()),
            kind: layer.kind,
            source_uri: layer.source_uri.clone(),
            transform: layer.transform,
            opacity: layer.opacity,
            z_index: layer.z_index,
            tint: layer.tint.clone(),
            paths: layer.paths.clone(),
        }
    }
}

impl LayerDocument {
    const fn default_opacity() -> f32 {
        1.0
    }

    /// Convert the document to a runtime layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is not a valid UUID.
    pub fn into_layer(self) -> StoryResult<Layer> {
        let mut layer = Layer::new(self.kind)
            .with_transform(self.transform)
            .with_opacity(self.opacity);
        if let Some(id) = &self.id {
            layer.id = LayerId::parse(id)?;
        }
        layer.source_uri = self.source_uri;
        layer.z_index = self.z_index;
        layer.tint = self.tint;
        layer.paths = self.paths;
        Ok(layer)
    }
}

/// Canonical scene document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Logical canvas size the layers are expressed in.
    #[serde(default = "SceneDocument::default_canvas")]
    pub canvas: FrameSize,
    /// Layers, back to front.
    #[serde(default)]
    pub layers: Vec<LayerDocument>,
    /// Selected layer ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    /// Timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: u64,
}

impl SceneDocument {
    const fn default_canvas() -> FrameSize {
        FrameSize::STORY
    }

    /// Build a document from a runtime scene.
    #[must_use]
    pub fn from_scene(canvas: FrameSize, scene: &Scene, selected: Option<LayerId>) -> Self {
        Self {
            canvas,
            layers: scene.iter().map(LayerDocument::from).collect(),
            selected: selected.map(|id| id.to_string()),
            timestamp: current_timestamp_ms(),
        }
    }

    /// Parse a document from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a scene document.
    pub fn from_json(json: &str) -> StoryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> StoryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The selected layer, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection is not a valid UUID.
    pub fn selected_id(&self) -> StoryResult<Option<LayerId>> {
        self.selected.as_deref().map(LayerId::parse).transpose()
    }

    /// Materialize the runtime scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas is empty, an ID is malformed or two
    /// layers share an ID.
    pub fn into_scene(self) -> StoryResult<Scene> {
        if self.canvas.is_empty() {
            return Err(StoryError::InvalidDocument(format!(
                "canvas must be positive, got {}x{}",
                self.canvas.width, self.canvas.height
            )));
        }
        let mut seen = HashSet::new();
        let mut layers = Vec::with_capacity(self.layers.len());
        for doc in self.layers {
            let layer = doc.into_layer()?;
            if !seen.insert(layer.id) {
                return Err(StoryError::InvalidDocument(format!(
                    "duplicate layer id {}",
                    layer.id
                )));
            }
            layers.push(layer);
        }
        Ok(Scene::from_layers(layers))
    }
}
