//! Editor configuration.
//!
//! Every field has a default, so a partial JSON file only overrides what it
//! names:
//!
//! ```json
//! { "history_limit": 50, "gesture": { "max_scale": 6.0 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::FrameSize;
use crate::gesture::GestureConfig;
use crate::path::StrokeStyle;
use crate::store::DEFAULT_HISTORY_LIMIT;
use crate::{StoryError, StoryResult};

/// Settings for one editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Logical story-frame size all layer geometry is expressed in.
    pub canvas: FrameSize,
    /// Maximum number of undo steps kept. `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Gesture tuning.
    pub gesture: GestureConfig,
    /// Initial drawing tool style.
    pub stroke: StrokeStyle,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: FrameSize::STORY,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
            gesture: GestureConfig::default(),
            stroke: StrokeStyle::default(),
        }
    }
}

impl EditorConfig {
    /// Parse and validate a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> StoryResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// configuration.
    pub fn load(path: impl AsRef<Path>) -> StoryResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        tracing::debug!("Loaded editor config from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> StoryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> StoryResult<()> {
        if !positive(self.canvas.width) || !positive(self.canvas.height) {
            return Err(invalid(format!(
                "canvas must be positive, got {}x{}",
                self.canvas.width, self.canvas.height
            )));
        }
        if self.history_limit == Some(0) {
            return Err(invalid("history_limit must be at least 1".to_string()));
        }
        let gesture = &self.gesture;
        if !positive(gesture.min_scale) {
            return Err(invalid(format!(
                "gesture.min_scale must be positive, got {}",
                gesture.min_scale
            )));
        }
        if !gesture.max_scale.is_finite() || gesture.max_scale < gesture.min_scale {
            return Err(invalid(format!(
                "gesture.max_scale ({}) is below min_scale ({})",
                gesture.max_scale, gesture.min_scale
            )));
        }
        if !positive(gesture.view_zoom) {
            return Err(invalid(format!(
                "gesture.view_zoom must be positive, got {}",
                gesture.view_zoom
            )));
        }
        if !positive(self.stroke.width) {
            return Err(invalid(format!(
                "stroke.width must be positive, got {}",
                self.stroke.width
            )));
        }
        Ok(())
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn invalid(message: String) -> StoryError {
    StoryError::InvalidConfig(message)
}
