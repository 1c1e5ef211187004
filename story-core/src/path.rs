//! Freehand path recording.
//!
//! A [`PathRecorder`] turns a streamed pointer drag into one [`DrawingPath`]
//! in logical canvas units:
//!
//! ```text
//! idle --begin--> recording --extend*--> recording --end--> idle
//!                                                      \--> DrawingPath (if it moved)
//! ```
//!
//! The stroke in progress is transient recorder state; only a finished,
//! non-degenerate stroke becomes a `DrawingPath`.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::geometry::{FrameMapping, FrameSize, Point};
use crate::DrawingPath;

/// Default stroke color.
pub const DEFAULT_STROKE_COLOR: &str = "#000000";

/// Default stroke width in logical units.
pub const DEFAULT_STROKE_WIDTH: f32 = 8.0;

/// Color and width of the active drawing tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Stroke color (CSS color string).
    pub color: String,
    /// Stroke width in logical units.
    pub width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_STROKE_COLOR.to_string(),
            width: DEFAULT_STROKE_WIDTH,
        }
    }
}

/// Recorder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// No gesture in progress.
    Idle,
    /// A drag is being recorded.
    Recording,
}

#[derive(Debug, Clone)]
struct ActiveStroke {
    data: String,
    last: Point,
    moved: bool,
}

type CompletionCallback = Box<dyn FnMut(&DrawingPath) + Send>;

/// Records pointer drags as SVG polylines in canvas coordinates.
pub struct PathRecorder {
    mapping: FrameMapping,
    style: StrokeStyle,
    active: Option<ActiveStroke>,
    on_complete: Option<CompletionCallback>,
}

impl std::fmt::Debug for PathRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathRecorder")
            .field("mapping", &self.mapping)
            .field("style", &self.style)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl PathRecorder {
    /// Create a recorder for the given logical frame. The on-screen size is
    /// unknown until [`set_rendered_size`](Self::set_rendered_size) is called.
    #[must_use]
    pub fn new(logical: FrameSize) -> Self {
        Self {
            mapping: FrameMapping::new(logical),
            style: StrokeStyle::default(),
            active: None,
            on_complete: None,
        }
    }

    /// Use the given tool style.
    #[must_use]
    pub fn with_style(mut self, style: StrokeStyle) -> Self {
        self.style = style;
        self
    }

    /// Register a callback invoked with every finished path.
    #[must_use]
    pub fn on_complete(mut self, callback: impl FnMut(&DrawingPath) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Record the measured on-screen size of the canvas.
    pub fn set_rendered_size(&mut self, rendered: FrameSize) {
        self.mapping.set_rendered(rendered);
    }

    /// Change the tool style. Applies to paths finished from now on.
    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
    }

    /// The active tool style.
    #[must_use]
    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    /// Screen/canvas mapping in use.
    #[must_use]
    pub fn mapping(&self) -> &FrameMapping {
        &self.mapping
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RecorderState {
        if self.active.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    /// The path data recorded so far, for live preview.
    #[must_use]
    pub fn in_progress(&self) -> Option<&str> {
        self.active.as_ref().map(|stroke| stroke.data.as_str())
    }

    /// Start a stroke at a screen point. An unfinished stroke is discarded.
    pub fn begin(&mut self, screen: Point) {
        let p = self.mapping.to_canvas(screen);
        let mut data = String::with_capacity(256);
        let _ = write!(data, "M{} {}", Coord(p.x), Coord(p.y));
        if self.active.is_some() {
            tracing::trace!("Restarting unfinished stroke");
        }
        self.active = Some(ActiveStroke {
            data,
            last: p,
            moved: false,
        });
    }

    /// Extend the stroke with a screen point. Ignored while idle.
    pub fn extend(&mut self, screen: Point) {
        let p = self.mapping.to_canvas(screen);
        let Some(stroke) = self.active.as_mut() else {
            return;
        };
        if !p.x.is_finite() || !p.y.is_finite() || p == stroke.last {
            return;
        }
        let _ = write!(stroke.data, " L{} {}", Coord(p.x), Coord(p.y));
        stroke.last = p;
        stroke.moved = true;
    }

    /// Finish the stroke.
    ///
    /// Returns the finished path, or `None` for a tap (no movement) or when
    /// idle. The completion callback sees every returned path.
    pub fn end(&mut self) -> Option<DrawingPath> {
        let stroke = self.active.take()?;
        if !stroke.moved {
            tracing::trace!("Tap without movement, no path emitted");
            return None;
        }
        let path = DrawingPath::new(stroke.data, self.style.color.clone(), self.style.width);
        tracing::debug!("Finished path {} ({} bytes)", path.id, path.path_data.len());
        if let Some(callback) = self.on_complete.as_mut() {
            callback(&path);
        }
        Some(path)
    }

    /// Drop the stroke in progress without emitting anything.
    pub fn cancel(&mut self) {
        self.active = None;
    }
}

/// Compact coordinate formatting: at most two decimals, no trailing zeros.
struct Coord(f32);

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = format!("{:.2}", self.0);
        let text = text.trim_end_matches('0').trim_end_matches('.');
        if text == "-0" {
            f.write_str("0")
        } else {
            f.write_str(text)
        }
    }
}
