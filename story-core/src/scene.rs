//! The ordered layer list of a story frame.
//!
//! A [`Scene`] is a copy-on-write value: cloning it is cheap and mutating a
//! clone never affects snapshots that were captured earlier. Layers are kept
//! in paint order (back to front) and their `z_index` is always `1..=N`.

use std::sync::Arc;

use crate::{Layer, LayerId, LayerPatch};

/// An immutable-by-default ordered collection of layers.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Layers in paint order, shared between snapshots until mutated.
    layers: Arc<Vec<Layer>>,
}

impl PartialEq for Scene {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.layers, &other.layers) || self.layers == other.layers
    }
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene from layers, ordering them by their current `z_index`
    /// (stable for ties) and renumbering densely.
    #[must_use]
    pub fn from_layers(mut layers: Vec<Layer>) -> Self {
        layers.sort_by_key(|layer| layer.z_index);
        let mut seen = std::collections::HashSet::new();
        layers.retain(|layer| seen.insert(layer.id));
        let mut scene = Self {
            layers: Arc::new(layers),
        };
        scene.normalize_z();
        scene
    }

    /// Layers in paint order (back to front).
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Iterate layers back to front.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Layer IDs in paint order.
    #[must_use]
    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|layer| layer.id).collect()
    }

    /// Get a layer by ID.
    #[must_use]
    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Paint-order index of a layer.
    #[must_use]
    pub fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    /// Check whether a layer is present.
    #[must_use]
    pub fn contains(&self, id: LayerId) -> bool {
        self.position(id).is_some()
    }

    /// The front-most layer.
    #[must_use]
    pub fn top(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// Find the front-most layer containing the given canvas point.
    #[must_use]
    pub fn layer_at(&self, x: f32, y: f32) -> Option<LayerId> {
        self.layers
            .iter()
            .rev()
            .find(|layer| layer.contains_point(x, y))
            .map(|layer| layer.id)
    }

    /// Get the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// True if both values share the same underlying layer storage.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.layers, &other.layers)
    }

    // -----------------------------------------------------------------------
    // Mutation (store-internal)
    // -----------------------------------------------------------------------

    /// Append a layer at the front. Returns `false` if the ID already exists.
    pub(crate) fn push(&mut self, layer: Layer) -> bool {
        if self.contains(layer.id) {
            return false;
        }
        Arc::make_mut(&mut self.layers).push(layer);
        self.normalize_z();
        true
    }

    /// Remove a layer by ID.
    pub(crate) fn remove(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.position(id)?;
        let removed = Arc::make_mut(&mut self.layers).remove(index);
        self.normalize_z();
        Some(removed)
    }

    /// Apply a patch to one layer. Returns `true` only if a field changed.
    pub(crate) fn update(&mut self, id: LayerId, patch: &LayerPatch) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        // Patch a copy first so an unchanged layer never forces a deep clone.
        let mut candidate = self.layers[index].clone();
        if !patch.apply_to(&mut candidate) {
            return false;
        }
        Arc::make_mut(&mut self.layers)[index] = candidate;
        true
    }

    /// Move a layer to the end of paint order. `false` if absent or already front.
    pub(crate) fn move_to_front(&mut self, id: LayerId) -> bool {
        match self.position(id) {
            Some(index) if index + 1 < self.layers.len() => {
                let layers = Arc::make_mut(&mut self.layers);
                let layer = layers.remove(index);
                layers.push(layer);
                self.normalize_z();
                true
            }
            _ => false,
        }
    }

    /// Move a layer to the start of paint order. `false` if absent or already back.
    pub(crate) fn move_to_back(&mut self, id: LayerId) -> bool {
        match self.position(id) {
            Some(index) if index > 0 => {
                let layers = Arc::make_mut(&mut self.layers);
                let layer = layers.remove(index);
                layers.insert(0, layer);
                self.normalize_z();
                true
            }
            _ => false,
        }
    }

    /// Renumber `z_index` to `1..=N` following paint order.
    fn normalize_z(&mut self) {
        let dense = self
            .layers
            .iter()
            .zip(1u32..)
            .all(|(layer, z)| layer.z_index == z);
        if dense {
            return;
        }
        for (layer, z) in Arc::make_mut(&mut self.layers).iter_mut().zip(1u32..) {
            layer.z_index = z;
        }
    }
}
