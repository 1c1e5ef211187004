//! Layers - the positionable items of a story frame.
//!
//! A [`Layer`] is a plain value. Every mutation of a layer that lives in a
//! scene goes through the [`SceneStore`](crate::SceneStore), usually as a
//! [`LayerPatch`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Point;
use crate::StoryResult;

/// Unique identifier for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    /// Create a new unique layer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a layer ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid UUID.
    pub fn parse(text: &str) -> StoryResult<Self> {
        Ok(Self(Uuid::parse_str(text)?))
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a finished drawing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathId(Uuid);

impl PathId {
    /// Create a new unique path ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PathId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a layer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// A sticker, photo or coloring page supplied by the asset source.
    Image,
    /// A freehand drawing layer holding only paths.
    Drawing,
    /// Reserved for text layers.
    Text,
}

/// Position, size, rotation and scale of a layer in logical canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// X position of the top-left anchor.
    pub x: f32,
    /// Y position of the top-left anchor.
    pub y: f32,
    /// Unscaled width.
    pub width: f32,
    /// Unscaled height.
    pub height: f32,
    /// Rotation in radians. Not normalized; large cumulative values are valid.
    pub rotation: f32,
    /// Positive multiplier applied to the size at render time.
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

impl Transform {
    /// Size after scaling.
    #[must_use]
    pub fn scaled_size(&self) -> (f32, f32) {
        (self.width * self.scale, self.height * self.scale)
    }

    /// Centre of the scaled bounding box, the rotation pivot.
    #[must_use]
    pub fn center(&self) -> Point {
        let (w, h) = self.scaled_size();
        Point::new(self.x + w / 2.0, self.y + h / 2.0)
    }
}

/// One completed freehand stroke.
///
/// `path_data` is an SVG path string in logical canvas units. Immutable once
/// created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingPath {
    /// Unique identifier.
    #[serde(default)]
    pub id: PathId,
    /// Serialized polyline (`M x y L x y ...`).
    pub path_data: String,
    /// Stroke color (CSS color string).
    pub color: String,
    /// Stroke width in logical units.
    pub stroke_width: f32,
}

impl DrawingPath {
    /// Create a new path with a fresh ID.
    #[must_use]
    pub fn new(path_data: impl Into<String>, color: impl Into<String>, stroke_width: f32) -> Self {
        Self {
            id: PathId::new(),
            path_data: path_data.into(),
            color: color.into(),
            stroke_width,
        }
    }
}

/// A positionable element on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique identifier, stable for the layer's lifetime.
    pub id: LayerId,
    /// Layer content type.
    pub kind: LayerKind,
    /// Opaque reference to externally supplied image content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    /// Position, size, rotation and scale.
    pub transform: Transform,
    /// Opacity from 0.0 to 1.0.
    pub opacity: f32,
    /// Dense 1-based paint order rank, maintained by the scene.
    pub z_index: u32,
    /// Optional color override applied to image content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint: Option<String>,
    /// Finished strokes, in drawing order.
    #[serde(default)]
    pub paths: Vec<DrawingPath>,
}

impl Layer {
    /// Create a new layer of the given kind.
    #[must_use]
    pub fn new(kind: LayerKind) -> Self {
        Self {
            id: LayerId::new(),
            kind,
            source_uri: None,
            transform: Transform::default(),
            opacity: 1.0,
            z_index: 0,
            tint: None,
            paths: Vec::new(),
        }
    }

    /// Create an image layer referencing `source_uri`.
    #[must_use]
    pub fn image(source_uri: impl Into<String>) -> Self {
        let mut layer = Self::new(LayerKind::Image);
        layer.source_uri = Some(source_uri.into());
        layer
    }

    /// Create an empty drawing layer.
    #[must_use]
    pub fn drawing() -> Self {
        Self::new(LayerKind::Drawing)
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the anchor position.
    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.transform.x = x;
        self.transform.y = y;
        self
    }

    /// Set the unscaled size.
    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.transform.width = width;
        self.transform.height = height;
        self
    }

    /// Set the opacity, clamped to 0.0..=1.0.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = clamp_opacity(opacity);
        self
    }

    /// Set the tint color.
    #[must_use]
    pub fn with_tint(mut self, tint: impl Into<String>) -> Self {
        self.tint = Some(tint.into());
        self
    }

    /// Check if a point (in canvas coordinates) is within this layer's
    /// rotated, scaled bounding box.
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        let t = &self.transform;
        let (w, h) = t.scaled_size();
        let c = t.center();

        // Undo the rotation around the pivot, then test the axis-aligned box.
        let (sin, cos) = (-t.rotation).sin_cos();
        let dx = x - c.x;
        let dy = y - c.y;
        let lx = dx * cos - dy * sin + c.x;
        let ly = dx * sin + dy * cos + c.y;

        lx >= t.x && lx <= t.x + w && ly >= t.y && ly <= t.y + h
    }
}

/// A partial update of a layer's mutable fields.
///
/// `None` leaves a field untouched. Nested options (`source_uri`, `tint`)
/// distinguish "leave" from "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerPatch {
    /// New anchor X.
    pub x: Option<f32>,
    /// New anchor Y.
    pub y: Option<f32>,
    /// New unscaled width.
    pub width: Option<f32>,
    /// New unscaled height.
    pub height: Option<f32>,
    /// New rotation in radians.
    pub rotation: Option<f32>,
    /// New scale; non-positive or non-finite values are ignored.
    pub scale: Option<f32>,
    /// New opacity, clamped to 0.0..=1.0.
    pub opacity: Option<f32>,
    /// Replace or clear the source URI.
    pub source_uri: Option<Option<String>>,
    /// Replace or clear the tint.
    pub tint: Option<Option<String>>,
    /// Replace the path list wholesale.
    pub paths: Option<Vec<DrawingPath>>,
}

impl LayerPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the anchor position.
    #[must_use]
    pub fn position(mut self, x: f32, y: f32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Set the unscaled size.
    #[must_use]
    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the rotation.
    #[must_use]
    pub fn rotation(mut self, rotation: f32) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Set the scale.
    #[must_use]
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set the opacity.
    #[must_use]
    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    /// Set or clear the tint.
    #[must_use]
    pub fn tint(mut self, tint: Option<String>) -> Self {
        self.tint = Some(tint);
        self
    }

    /// Set or clear the source URI.
    #[must_use]
    pub fn source_uri(mut self, source_uri: Option<String>) -> Self {
        self.source_uri = Some(source_uri);
        self
    }

    /// Replace the path list.
    #[must_use]
    pub fn paths(mut self, paths: Vec<DrawingPath>) -> Self {
        self.paths = Some(paths);
        self
    }

    /// True if the patch names no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the patch into `layer`, comparing field by field.
    ///
    /// Returns `true` only if some field actually changed value.
    pub fn apply_to(&self, layer: &mut Layer) -> bool {
        let t = &mut layer.transform;
        let mut changed = false;

        changed |= set_finite(&mut t.x, self.x);
        changed |= set_finite(&mut t.y, self.y);
        changed |= set_finite(&mut t.width, self.width);
        changed |= set_finite(&mut t.height, self.height);
        changed |= set_finite(&mut t.rotation, self.rotation);
        changed |= set_finite(&mut t.scale, self.scale.filter(|s| *s > 0.0));
        changed |= set_finite(&mut layer.opacity, self.opacity.map(clamp_opacity));

        if let Some(source_uri) = &self.source_uri {
            changed |= replace(&mut layer.source_uri, source_uri);
        }
        if let Some(tint) = &self.tint {
            changed |= replace(&mut layer.tint, tint);
        }
        if let Some(paths) = &self.paths {
            changed |= replace(&mut layer.paths, paths);
        }

        changed
    }
}

#[allow(clippy::float_cmp)] // exact comparison: any real change counts
fn set_finite(field: &mut f32, value: Option<f32>) -> bool {
    match value {
        Some(v) if v.is_finite() && *field != v => {
            *field = v;
            true
        }
        _ => false,
    }
}

fn replace<T: PartialEq + Clone>(field: &mut T, value: &T) -> bool {
    if field == value {
        false
    } else {
        field.clone_from(value);
        true
    }
}

fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        1.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_ids_are_unique() {
        let a = Layer::drawing();
        let b = Layer::drawing();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_layer_id_parse_round_trip() {
        let id = LayerId::new();
        let parsed = LayerId::parse(&id.to_string()).expect("valid uuid");
        assert_eq!(id, parsed);
        assert!(LayerId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_patch_same_value_is_not_a_change() {
        let mut layer = Layer::image("asset://star.png").with_position(10.0, 20.0);
        let patch = LayerPatch::new().position(10.0, 20.0);
        assert!(!patch.apply_to(&mut layer));
    }

    #[test]
    fn test_patch_applies_changes() {
        let mut layer = Layer::image("asset://star.png");
        let patch = LayerPatch::new()
            .position(5.0, 6.0)
            .rotation(1.5)
            .tint(Some("#ff0000".to_string()));
        assert!(patch.apply_to(&mut layer));
        assert!((layer.transform.x - 5.0).abs() < f32::EPSILON);
        assert!((layer.transform.rotation - 1.5).abs() < f32::EPSILON);
        assert_eq!(layer.tint.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_patch_rejects_degenerate_scale() {
        let mut layer = Layer::drawing();
        assert!(!LayerPatch::new().scale(0.0).apply_to(&mut layer));
        assert!(!LayerPatch::new().scale(-2.0).apply_to(&mut layer));
        assert!(!LayerPatch::new().scale(f32::NAN).apply_to(&mut layer));
        assert!((layer.transform.scale - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_patch_clamps_opacity() {
        let mut layer = Layer::drawing();
        // Clamps to 1.0, which is the current value.
        assert!(!LayerPatch::new().opacity(3.0).apply_to(&mut layer));
        assert!((layer.opacity - 1.0).abs() < f32::EPSILON);
        assert!(LayerPatch::new().opacity(-1.0).apply_to(&mut layer));
        assert!(layer.opacity.abs() < f32::EPSILON);
    }

    #[test]
    fn test_patch_clears_tint() {
        let mut layer = Layer::image("a.png").with_tint("#00ff00");
        assert!(LayerPatch::new().tint(None).apply_to(&mut layer));
        assert!(layer.tint.is_none());
    }

    #[test]
    fn test_empty_patch() {
        assert!(LayerPatch::new().is_empty());
        assert!(!LayerPatch::new().rotation(0.0).is_empty());
    }

    #[test]
    fn test_contains_point_axis_aligned() {
        let layer = Layer::drawing()
            .with_position(100.0, 100.0)
            .with_size(200.0, 50.0);
        assert!(layer.contains_point(150.0, 125.0));
        assert!(!layer.contains_point(50.0, 50.0));
    }

    #[test]
    fn test_contains_point_rotated() {
        // A 200x20 bar rotated a quarter turn becomes a 20x200 bar around its centre.
        let layer = Layer::drawing().with_transform(Transform {
            x: 0.0,
            y: 90.0,
            width: 200.0,
            height: 20.0,
            rotation: std::f32::consts::FRAC_PI_2,
            scale: 1.0,
        });
        assert!(layer.contains_point(100.0, 10.0));
        assert!(!layer.contains_point(10.0, 100.0));
    }

    #[test]
    fn test_contains_point_scaled() {
        let layer = Layer::drawing().with_transform(Transform {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            rotation: 0.0,
            scale: 3.0,
        });
        assert!(layer.contains_point(25.0, 25.0));
        assert!(!layer.contains_point(35.0, 5.0));
    }
}
