//! # Story Core
//!
//! Layer compositing and history engine for story-frame editing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 story-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Scene Store     │  Input                   │
//! │  - Layers        │  - Gesture queue         │
//! │  - Selection     │  - Transform controller  │
//! │  - Undo / redo   │  - Path recorder         │
//! ├─────────────────────────────────────────────┤
//! │  Geometry        │  Documents               │
//! │  - Frame fit     │  - Editor config         │
//! │  - Screen map    │  - Scene JSON, snapshots │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! All layer geometry lives in logical canvas units (1080×1920 by default).
//! Gesture input is posted from any thread and drained by the single owner of
//! the [`SceneStore`]; renderers read immutable [`Scene`] snapshots.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod history;
pub mod layer;
pub mod path;
pub mod scene;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use config::EditorConfig;
pub use error::{StoryError, StoryResult};
pub use geometry::{
    cover_crop, fit, fit_frame, CropRect, FitMode, FrameMapping, FrameSize, Placement, Point,
    STORY_FRAME_HEIGHT, STORY_FRAME_WIDTH,
};
pub use gesture::{
    gesture_channel, DrainReport, GestureConfig, GestureInput, GestureKind, GestureMessage,
    GestureQueue, GestureSender, LiveTransform, TransformGestureController,
};
pub use history::History;
pub use layer::{DrawingPath, Layer, LayerId, LayerKind, LayerPatch, PathId, Transform};
pub use path::{PathRecorder, RecorderState, StrokeStyle};
pub use scene::Scene;
pub use schema::{LayerDocument, SceneDocument};
pub use snapshot::{current_timestamp_ms, Snapshot, SnapshotStrip};
pub use store::{Mutation, SceneState, SceneStore, DEFAULT_HISTORY_LIMIT};

/// Story core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
