//! Interactive pan, pinch and rotate of layers.
//!
//! Gesture recognition may run on another thread than the one owning the
//! [`SceneStore`]. Recognisers post [`GestureMessage`]s through a cloneable
//! [`GestureSender`]; the owner drains them from its [`GestureQueue`] and
//! applies them to the store one at a time.
//!
//! Every gesture follows the same lifecycle:
//!
//! - `Began`: capture the layer's authoritative field as the baseline and
//!   select the layer.
//! - updates: `baseline OP cumulative delta`, applied with `commit == false`.
//! - `Ended`: one committing update with the final value.
//! - `Cancelled`: the baseline is restored and nothing is committed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{Layer, LayerId, LayerPatch, Mutation, SceneStore, Transform};

/// Default lower bound for gesture scaling.
pub const DEFAULT_MIN_SCALE: f32 = 0.1;

/// Default upper bound for gesture scaling.
pub const DEFAULT_MAX_SCALE: f32 = 10.0;

/// Gesture tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Smallest scale a pinch may produce. Must be positive.
    pub min_scale: f32,
    /// Largest scale a pinch may produce.
    pub max_scale: f32,
    /// Zoom of the canvas view; pan deltas are divided by it.
    pub view_zoom: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            view_zoom: 1.0,
        }
    }
}

impl GestureConfig {
    /// Clamp a scale into `[min_scale, max_scale]`.
    #[must_use]
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale.max(self.min_scale))
    }

    fn pan_zoom(&self) -> f32 {
        if self.view_zoom.is_finite() && self.view_zoom > 0.0 {
            self.view_zoom
        } else {
            1.0
        }
    }
}

/// The three continuous gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    /// Translate.
    Pan,
    /// Scale.
    Pinch,
    /// Rotate.
    Rotate,
}

/// One event from a gesture recogniser.
///
/// Update deltas are cumulative since the gesture began.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "data", rename_all = "snake_case")]
pub enum GestureInput {
    /// A gesture started.
    Began(GestureKind),
    /// Pan update, in screen units.
    Pan {
        /// Horizontal translation since begin.
        translation_x: f32,
        /// Vertical translation since begin.
        translation_y: f32,
    },
    /// Pinch update.
    Pinch {
        /// Scale factor since begin.
        scale: f32,
    },
    /// Rotation update.
    Rotate {
        /// Rotation since begin, in radians.
        rotation: f32,
    },
    /// A gesture finished normally.
    Ended(GestureKind),
    /// A gesture was interrupted.
    Cancelled(GestureKind),
}

/// A gesture event addressed to a layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureMessage {
    /// Target layer.
    pub layer_id: LayerId,
    /// The event.
    pub input: GestureInput,
}

/// The controller's live copy of the gesture-driven transform fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveTransform {
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
    /// Scale multiplier.
    pub scale: f32,
    /// Rotation in radians.
    pub rotation: f32,
}

impl From<&Transform> for LiveTransform {
    fn from(transform: &Transform) -> Self {
        Self {
            x: transform.x,
            y: transform.y,
            scale: transform.scale,
            rotation: transform.rotation,
        }
    }
}

/// Drives one layer's transform from pan, pinch and rotate gestures.
///
/// The three gestures are independent and may run at the same time; each
/// one commits its own undo step when it ends.
#[derive(Debug, Clone)]
pub struct TransformGestureController {
    layer_id: LayerId,
    config: GestureConfig,
    live: LiveTransform,
    pan_start: Option<(f32, f32)>,
    pinch_start: Option<f32>,
    rotate_start: Option<f32>,
}

impl TransformGestureController {
    /// Create a controller for a layer.
    #[must_use]
    pub fn new(layer: &Layer, config: GestureConfig) -> Self {
        Self {
            layer_id: layer.id,
            config,
            live: LiveTransform::from(&layer.transform),
            pan_start: None,
            pinch_start: None,
            rotate_start: None,
        }
    }

    /// The controlled layer.
    #[must_use]
    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    /// The live transform as last applied.
    #[must_use]
    pub fn live(&self) -> LiveTransform {
        self.live
    }

    /// Check whether a gesture of the given kind is in progress.
    #[must_use]
    pub fn is_active(&self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::Pan => self.pan_start.is_some(),
            GestureKind::Pinch => self.pinch_start.is_some(),
            GestureKind::Rotate => self.rotate_start.is_some(),
        }
    }

    /// Check whether any gesture is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pan_start.is_none() && self.pinch_start.is_none() && self.rotate_start.is_none()
    }

    /// Change the view zoom used to convert pan deltas.
    pub fn set_view_zoom(&mut self, view_zoom: f32) {
        self.config.view_zoom = view_zoom;
    }

    /// Re-read the fields not driven by an active gesture from the layer.
    ///
    /// Called after undo/redo or external updates so the next gesture does
    /// not baseline off stale values.
    pub fn sync(&mut self, layer: &Layer) {
        let transform = &layer.transform;
        if self.pan_start.is_none() {
            self.live.x = transform.x;
            self.live.y = transform.y;
        }
        if self.pinch_start.is_none() {
            self.live.scale = transform.scale;
        }
        if self.rotate_start.is_none() {
            self.live.rotation = transform.rotation;
        }
    }

    /// Apply one gesture event to the store.
    ///
    /// Returns the store mutation, or `None` when the event had no effect on
    /// the scene (begin, updates without a begin, unknown layer).
    pub fn handle(&mut self, input: GestureInput, store: &mut SceneStore) -> Option<Mutation> {
        let id = self.layer_id;
        match input {
            GestureInput::Began(kind) => {
                let transform = store.scene().get(id)?.transform;
                self.begin(kind, &transform);
                store.select_layer(Some(id));
                tracing::trace!("Gesture {kind:?} began on layer {id}");
                None
            }
            GestureInput::Pan {
                translation_x,
                translation_y,
            } => {
                let (start_x, start_y) = self.pan_start?;
                if !translation_x.is_finite() || !translation_y.is_finite() {
                    return None;
                }
                let zoom = self.config.pan_zoom();
                self.live.x = start_x + translation_x / zoom;
                self.live.y = start_y + translation_y / zoom;
                let patch = LayerPatch::new().position(self.live.x, self.live.y);
                Some(store.update_layer(id, &patch, false))
            }
            GestureInput::Pinch { scale } => {
                let start = self.pinch_start?;
                if !scale.is_finite() {
                    return None;
                }
                self.live.scale = self.config.clamp_scale(start * scale);
                let patch = LayerPatch::new().scale(self.live.scale);
                Some(store.update_layer(id, &patch, false))
            }
            GestureInput::Rotate { rotation } => {
                let start = self.rotate_start?;
                if !rotation.is_finite() {
                    return None;
                }
                self.live.rotation = start + rotation;
                let patch = LayerPatch::new().rotation(self.live.rotation);
                Some(store.update_layer(id, &patch, false))
            }
            GestureInput::Ended(kind) => {
                if !self.take_baseline(kind) {
                    return None;
                }
                let patch = self.final_patch(kind);
                let mutation = store.update_layer(id, &patch, true);
                tracing::debug!(
                    "Gesture {kind:?} ended on layer {id} (committed: {})",
                    mutation.committed
                );
                Some(mutation)
            }
            GestureInput::Cancelled(kind) => {
                let patch = self.restore_patch(kind)?;
                tracing::debug!("Gesture {kind:?} cancelled on layer {id}");
                Some(store.update_layer(id, &patch, false))
            }
        }
    }

    fn begin(&mut self, kind: GestureKind, transform: &Transform) {
        match kind {
            GestureKind::Pan => {
                self.live.x = transform.x;
                self.live.y = transform.y;
                self.pan_start = Some((transform.x, transform.y));
            }
            GestureKind::Pinch => {
                self.live.scale = transform.scale;
                self.pinch_start = Some(transform.scale);
            }
            GestureKind::Rotate => {
                self.live.rotation = transform.rotation;
                self.rotate_start = Some(transform.rotation);
            }
        }
    }

    /// Clear the baseline of a gesture. `false` if it was not active.
    fn take_baseline(&mut self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::Pan => self.pan_start.take().is_some(),
            GestureKind::Pinch => self.pinch_start.take().is_some(),
            GestureKind::Rotate => self.rotate_start.take().is_some(),
        }
    }

    fn final_patch(&self, kind: GestureKind) -> LayerPatch {
        match kind {
            GestureKind::Pan => LayerPatch::new().position(self.live.x, self.live.y),
            GestureKind::Pinch => LayerPatch::new().scale(self.live.scale),
            GestureKind::Rotate => LayerPatch::new().rotation(self.live.rotation),
        }
    }

    fn restore_patch(&mut self, kind: GestureKind) -> Option<LayerPatch> {
        match kind {
            GestureKind::Pan => {
                let (x, y) = self.pan_start.take()?;
                self.live.x = x;
                self.live.y = y;
                Some(LayerPatch::new().position(x, y))
            }
            GestureKind::Pinch => {
                let scale = self.pinch_start.take()?;
                self.live.scale = scale;
                Some(LayerPatch::new().scale(scale))
            }
            GestureKind::Rotate => {
                let rotation = self.rotate_start.take()?;
                self.live.rotation = rotation;
                Some(LayerPatch::new().rotation(rotation))
            }
        }
    }
}

/// Create a gesture message channel.
#[must_use]
pub fn gesture_channel(config: GestureConfig) -> (GestureSender, GestureQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        GestureSender { tx },
        GestureQueue {
            rx,
            config,
            controllers: HashMap::new(),
        },
    )
}

/// Posting side of the gesture channel. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct GestureSender {
    tx: mpsc::UnboundedSender<GestureMessage>,
}

impl GestureSender {
    /// Post a gesture event for a layer.
    ///
    /// Returns `false` if the owning queue has been dropped.
    pub fn post(&self, layer_id: LayerId, input: GestureInput) -> bool {
        if self.tx.send(GestureMessage { layer_id, input }).is_err() {
            tracing::warn!("Gesture queue closed, dropped {input:?} for layer {layer_id}");
            return false;
        }
        true
    }
}

/// Counts from one [`GestureQueue::drain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages taken off the queue.
    pub processed: usize,
    /// Messages that changed the live scene.
    pub changed: usize,
    /// Messages that recorded an undo step.
    pub committed: usize,
}

/// Owner side of the gesture channel.
#[derive(Debug)]
pub struct GestureQueue {
    rx: mpsc::UnboundedReceiver<GestureMessage>,
    config: GestureConfig,
    controllers: HashMap<LayerId, TransformGestureController>,
}

impl GestureQueue {
    /// Apply every queued message to the store, in posting order.
    pub fn drain(&mut self, store: &mut SceneStore) -> DrainReport {
        self.resync(store);
        let mut report = DrainReport::default();
        while let Ok(message) = self.rx.try_recv() {
            report.processed += 1;
            if let Some(mutation) = self.apply(message, store) {
                report.changed += usize::from(mutation.changed);
                report.committed += usize::from(mutation.committed);
            }
        }
        if report.processed > 0 {
            tracing::trace!(
                "Drained {} gesture messages ({} commits)",
                report.processed,
                report.committed
            );
        }
        report
    }

    /// Apply one message directly.
    pub fn apply(&mut self, message: GestureMessage, store: &mut SceneStore) -> Option<Mutation> {
        let id = message.layer_id;
        let Some(layer) = store.scene().get(id) else {
            // Deleted mid-gesture.
            self.controllers.remove(&id);
            tracing::trace!("Gesture for missing layer {id} ignored");
            return None;
        };
        let config = self.config;
        let controller = self
            .controllers
            .entry(id)
            .or_insert_with(|| TransformGestureController::new(layer, config));
        controller.handle(message.input, store)
    }

    /// Re-synchronise controllers with the store and drop those whose layer
    /// no longer exists.
    pub fn resync(&mut self, store: &SceneStore) {
        let scene = store.scene();
        self.controllers.retain(|id, controller| match scene.get(*id) {
            Some(layer) => {
                controller.sync(layer);
                true
            }
            None => false,
        });
    }

    /// Change the view zoom for current and future controllers.
    pub fn set_view_zoom(&mut self, view_zoom: f32) {
        self.config.view_zoom = view_zoom;
        for controller in self.controllers.values_mut() {
            controller.set_view_zoom(view_zoom);
        }
    }

    /// Controller for a layer, if one was created.
    #[must_use]
    pub fn controller(&self, id: LayerId) -> Option<&TransformGestureController> {
        self.controllers.get(&id)
    }

    /// The active gesture configuration.
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }
}
