//! The single owner of the editing session's scene.
//!
//! [`SceneStore`] owns the live [`Scene`], the selection and the undo/redo
//! [`History`]. Every write goes through its operations; readers get cheap
//! copy-on-write snapshots, either directly or by subscribing.
//!
//! Operations are total. An ID that is not in the scene is a silent no-op,
//! because gesture callbacks can race with a concurrent delete.
//!
//! # Example
//!
//! ```
//! use story_core::{Layer, LayerPatch, SceneStore};
//!
//! let mut store = SceneStore::new();
//! let layer = Layer::image("asset://sticker.png");
//! let id = layer.id;
//!
//! store.add_layer(layer);
//! store.update_layer(id, &LayerPatch::new().position(40.0, 80.0), true);
//! assert_eq!(store.history().past().len(), 2);
//!
//! store.undo();
//! assert!(store.scene().get(id).is_some_and(|l| l.transform.x == 0.0));
//! ```

use tokio::sync::watch;

use crate::{DrawingPath, EditorConfig, History, Layer, LayerId, LayerPatch, Scene};

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Outcome of a store operation.
#[derive(Debug, Clone)]
pub struct Mutation {
    /// The live scene after the operation.
    pub scene: Scene,
    /// Whether the live scene changed.
    pub changed: bool,
    /// Whether a new undo step was recorded.
    pub committed: bool,
}

/// What observers see after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    /// The live scene.
    pub scene: Scene,
    /// The selected layer, always present in `scene` when set.
    pub selected: Option<LayerId>,
    /// Whether `undo` would do something.
    pub can_undo: bool,
    /// Whether `redo` would do something.
    pub can_redo: bool,
    /// Incremented on every published change.
    pub revision: u64,
}

/// Scene, selection and history for one editing session.
///
/// The store keeps two scenes. The live scene is what readers see and what
/// uncommitted updates write to. The committed scene is the last state
/// recorded in history. A committing operation is applied to both, so a
/// commit only records its own change and never the in-flight values of
/// another gesture.
#[derive(Debug)]
pub struct SceneStore {
    scene: Scene,
    committed: Scene,
    selected: Option<LayerId>,
    history: History,
    revision: u64,
    observers: watch::Sender<SceneState>,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneStore {
    /// Create an empty store with the default history limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_history_limit(Some(DEFAULT_HISTORY_LIMIT))
    }

    /// Create an empty store using the editor configuration.
    #[must_use]
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::with_history_limit(config.history_limit)
    }

    /// Create an empty store keeping at most `limit` undo steps.
    #[must_use]
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        let (observers, _) = watch::channel(SceneState {
            scene: Scene::new(),
            selected: None,
            can_undo: false,
            can_redo: false,
            revision: 0,
        });
        Self {
            scene: Scene::new(),
            committed: Scene::new(),
            selected: None,
            history: History::new(limit),
            revision: 0,
            observers,
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The live scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The scene as of the last committed change.
    #[must_use]
    pub fn committed_scene(&self) -> &Scene {
        &self.committed
    }

    /// The selected layer ID.
    #[must_use]
    pub fn selected_layer_id(&self) -> Option<LayerId> {
        self.selected
    }

    /// The selected layer.
    #[must_use]
    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected.and_then(|id| self.scene.get(id))
    }

    /// The undo/redo stacks.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// True if the live scene differs from the committed scene.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.scene.shares_storage_with(&self.committed) && self.scene != self.committed
    }

    /// Whether `undo` would do something.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || self.has_pending_changes()
    }

    /// Whether `redo` would do something.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo() && !self.has_pending_changes()
    }

    /// Current observable state.
    #[must_use]
    pub fn state(&self) -> SceneState {
        SceneState {
            scene: self.scene.clone(),
            selected: self.selected,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            revision: self.revision,
        }
    }

    /// Subscribe to state changes.
    ///
    /// The receiver always holds the latest state; intermediate states may be
    /// skipped by slow readers.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SceneState> {
        self.observers.subscribe()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add a layer in front of all others, select it and commit.
    ///
    /// Adding a layer whose ID is already present is a no-op.
    pub fn add_layer(&mut self, layer: Layer) -> Mutation {
        let id = layer.id;
        if self.scene.contains(id) {
            tracing::trace!("Layer {id} already present, add ignored");
            return self.unchanged();
        }
        self.selected = Some(id);
        tracing::debug!("Adding layer {id} ({} layers)", self.scene.len() + 1);
        self.apply(true, move |scene| scene.push(layer.clone()))
    }

    /// Remove a layer, clear the selection and commit.
    pub fn remove_layer(&mut self, id: LayerId) -> Mutation {
        if !self.scene.contains(id) {
            tracing::trace!("Remove of missing layer {id} ignored");
            return self.unchanged();
        }
        self.selected = None;
        tracing::debug!("Removing layer {id}");
        self.apply(true, |scene| scene.remove(id).is_some())
    }

    /// Merge `patch` into a layer.
    ///
    /// Nothing happens (no history entry either) when no field actually
    /// changes. With `commit == false` only the live scene is updated. With
    /// `commit == true` the patch is also applied to the committed scene and
    /// recorded as one undo step, even when the live scene already holds the
    /// final value from earlier uncommitted updates.
    pub fn update_layer(&mut self, id: LayerId, patch: &LayerPatch, commit: bool) -> Mutation {
        if !self.scene.contains(id) {
            tracing::trace!("Update of missing layer {id} ignored");
            return self.unchanged();
        }
        tracing::trace!("Updating layer {id} (commit: {commit})");
        self.apply(commit, |scene| scene.update(id, patch))
    }

    /// Append a finished path to a layer and commit.
    pub fn append_path(&mut self, id: LayerId, path: DrawingPath) -> Mutation {
        if !self.scene.contains(id) {
            tracing::trace!("Path for missing layer {id} dropped");
            return self.unchanged();
        }
        self.apply(true, move |scene| {
            let Some(layer) = scene.get(id) else {
                return false;
            };
            let mut paths = layer.paths.clone();
            paths.push(path.clone());
            scene.update(id, &LayerPatch::new().paths(paths))
        })
    }

    /// Move a layer to the front of paint order.
    ///
    /// No-op if the layer is missing or already in front.
    pub fn bring_to_front(&mut self, id: LayerId, commit: bool) -> Mutation {
        let mutation = self.apply(commit, |scene| scene.move_to_front(id));
        if mutation.changed || mutation.committed {
            tracing::debug!("Layer {id} brought to front");
        }
        mutation
    }

    /// Move a layer to the back of paint order.
    ///
    /// No-op if the layer is missing or already at the back.
    pub fn send_to_back(&mut self, id: LayerId, commit: bool) -> Mutation {
        let mutation = self.apply(commit, |scene| scene.move_to_back(id));
        if mutation.changed || mutation.committed {
            tracing::debug!("Layer {id} sent to back");
        }
        mutation
    }

    /// Change the selection. Never touches history.
    ///
    /// Returns `true` if the selection changed. Selecting a missing layer is
    /// ignored.
    pub fn select_layer(&mut self, id: Option<LayerId>) -> bool {
        if id.is_some_and(|id| !self.scene.contains(id)) || id == self.selected {
            return false;
        }
        self.selected = id;
        self.publish();
        true
    }

    /// Record every uncommitted change as one undo step.
    ///
    /// No-op when the live scene equals the committed scene.
    pub fn commit_pending(&mut self) -> Mutation {
        if !self.has_pending_changes() {
            return self.unchanged();
        }
        let previous = std::mem::replace(&mut self.committed, self.scene.clone());
        self.history.push(previous);
        tracing::debug!("Committed pending changes");
        self.publish();
        Mutation {
            scene: self.scene.clone(),
            changed: false,
            committed: true,
        }
    }

    /// Step back.
    ///
    /// Uncommitted changes are the newest edit: if there are any, undo
    /// discards them and stops there. Otherwise the previous committed
    /// snapshot is restored.
    pub fn undo(&mut self) -> Mutation {
        if self.has_pending_changes() {
            self.restore(self.committed.clone());
            tracing::debug!("Undo discarded uncommitted changes");
            return self.changed_uncommitted();
        }
        let Some(previous) = self.history.undo(self.committed.clone()) else {
            tracing::trace!("Nothing to undo");
            return self.unchanged();
        };
        self.restore(previous);
        tracing::debug!("Undo ({} steps left)", self.history.past().len());
        self.changed_uncommitted()
    }

    /// Re-apply the most recently undone snapshot.
    ///
    /// No-op while uncommitted changes are live.
    pub fn redo(&mut self) -> Mutation {
        if self.has_pending_changes() {
            tracing::trace!("Redo ignored with uncommitted changes");
            return self.unchanged();
        }
        let Some(next) = self.history.redo(self.committed.clone()) else {
            tracing::trace!("Nothing to redo");
            return self.unchanged();
        };
        self.restore(next);
        tracing::debug!("Redo ({} steps left)", self.history.future().len());
        self.changed_uncommitted()
    }

    /// Clear layers, selection and both history stacks.
    pub fn reset(&mut self) {
        self.scene = Scene::new();
        self.committed = Scene::new();
        self.selected = None;
        self.history.clear();
        tracing::debug!("Scene store reset");
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Run `edit` on the live scene and, when committing, on the committed
    /// scene. History records the committed scene only if `edit` changed it.
    fn apply(&mut self, commit: bool, edit: impl Fn(&mut Scene) -> bool) -> Mutation {
        let changed = edit(&mut self.scene);
        let mut committed = false;
        if commit {
            let mut next = self.committed.clone();
            if edit(&mut next) {
                let previous = std::mem::replace(&mut self.committed, next);
                self.history.push(previous);
                committed = true;
            }
            if !self.has_pending_changes() {
                // Share storage again so later comparisons stay cheap.
                self.scene = self.committed.clone();
            }
        }
        if changed || committed {
            self.publish();
        }
        Mutation {
            scene: self.scene.clone(),
            changed,
            committed,
        }
    }

    fn restore(&mut self, scene: Scene) {
        self.committed = scene.clone();
        self.scene = scene;
        if self.selected.is_some_and(|id| !self.scene.contains(id)) {
            self.selected = None;
        }
        self.publish();
    }

    fn publish(&mut self) {
        self.revision += 1;
        let state = self.state();
        self.observers.send_replace(state);
    }

    fn unchanged(&self) -> Mutation {
        Mutation {
            scene: self.scene.clone(),
            changed: false,
            committed: false,
        }
    }

    fn changed_uncommitted(&self) -> Mutation {
        Mutation {
            scene: self.scene.clone(),
            changed: true,
            committed: false,
        }
    }
}
