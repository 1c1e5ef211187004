//! Mapping between the logical story frame and on-screen viewports.
//!
//! All layer geometry lives in logical canvas units (a fixed frame such as
//! 1080x1920). The viewport renders that frame at whatever size fits; these
//! helpers are pure so they can run on every resize.

use serde::{Deserialize, Serialize};

/// Default logical story frame width in pixels.
pub const STORY_FRAME_WIDTH: f32 = 1080.0;

/// Default logical story frame height in pixels.
pub const STORY_FRAME_HEIGHT: f32 = 1920.0;

/// A 2D point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Width and height of a rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl FrameSize {
    /// The empty size returned for degenerate inputs.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    /// The default logical story frame (1080x1920).
    pub const STORY: Self = Self {
        width: STORY_FRAME_WIDTH,
        height: STORY_FRAME_HEIGHT,
    };

    /// Create a new size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is non-positive or not finite.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !is_positive(self.width) || !is_positive(self.height)
    }

    /// Width divided by height, or `None` for an empty size.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.is_empty() {
            None
        } else {
            Some(self.width / self.height)
        }
    }
}

/// A crop rectangle inside a source image, in source pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Crop width.
    pub width: f32,
    /// Crop height.
    pub height: f32,
}

impl CropRect {
    /// The whole of a source of the given size.
    #[must_use]
    pub const fn full(size: FrameSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width,
            height: size.height,
        }
    }
}

/// How a source rectangle is fitted into a target rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Largest rectangle with the source aspect that fits inside the target.
    #[default]
    Contain,
    /// Fill the target exactly, cropping the source overflow around its centre.
    Cover,
}

/// Result of fitting a source into a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Output size in target units.
    pub size: FrameSize,
    /// Region of the source that is shown.
    pub crop: CropRect,
}

/// Largest rectangle with the logical aspect ratio that fits inside
/// `max_width` x `max_height` ("contain").
///
/// Returns [`FrameSize::ZERO`] when any dimension is non-positive.
#[must_use]
pub fn fit_frame(logical_width: f32, logical_height: f32, max_width: f32, max_height: f32) -> FrameSize {
    if !is_positive(logical_width)
        || !is_positive(logical_height)
        || !is_positive(max_width)
        || !is_positive(max_height)
    {
        return FrameSize::ZERO;
    }

    let scale = (max_width / logical_width).min(max_height / logical_height);
    FrameSize {
        width: (logical_width * scale).min(max_width),
        height: (logical_height * scale).min(max_height),
    }
}

/// Crop rectangle inside a `source_width` x `source_height` image so that it
/// exactly fills the target aspect ratio ("cover"), centred on the overflow.
///
/// Returns an empty crop when any dimension is non-positive.
#[must_use]
pub fn cover_crop(source_width: f32, source_height: f32, target_width: f32, target_height: f32) -> CropRect {
    if !is_positive(source_width)
        || !is_positive(source_height)
        || !is_positive(target_width)
        || !is_positive(target_height)
    {
        return CropRect::default();
    }

    let scale = (target_width / source_width).max(target_height / source_height);
    let width = (target_width / scale).min(source_width);
    let height = (target_height / scale).min(source_height);
    CropRect {
        x: (source_width - width) / 2.0,
        y: (source_height - height) / 2.0,
        width,
        height,
    }
}

/// Fit `source` into `target` using the given mode.
#[must_use]
pub fn fit(mode: FitMode, source: FrameSize, target: FrameSize) -> Placement {
    match mode {
        FitMode::Contain => Placement {
            size: fit_frame(source.width, source.height, target.width, target.height),
            crop: if source.is_empty() {
                CropRect::default()
            } else {
                CropRect::full(source)
            },
        },
        FitMode::Cover => {
            let crop = cover_crop(source.width, source.height, target.width, target.height);
            let size = if crop.width > 0.0 && crop.height > 0.0 {
                target
            } else {
                FrameSize::ZERO
            };
            Placement { size, crop }
        }
    }
}

/// Screen <-> logical canvas conversion for one viewport.
///
/// The rendered size is unknown until the viewport has been measured; while
/// it is unknown (or degenerate) the scale on that axis is treated as `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMapping {
    logical: FrameSize,
    rendered: Option<FrameSize>,
}

impl FrameMapping {
    /// Mapping for a logical frame whose on-screen size is not yet measured.
    #[must_use]
    pub const fn new(logical: FrameSize) -> Self {
        Self {
            logical,
            rendered: None,
        }
    }

    /// Mapping with a known rendered size.
    #[must_use]
    pub const fn with_rendered(mut self, rendered: FrameSize) -> Self {
        self.rendered = Some(rendered);
        self
    }

    /// Record the measured on-screen size of the frame.
    pub fn set_rendered(&mut self, rendered: FrameSize) {
        self.rendered = Some(rendered);
    }

    /// Forget the measured size (e.g. the viewport was unmounted).
    pub fn clear_rendered(&mut self) {
        self.rendered = None;
    }

    /// Logical frame size.
    #[must_use]
    pub const fn logical(&self) -> FrameSize {
        self.logical
    }

    /// Last measured on-screen size, if any.
    #[must_use]
    pub const fn rendered(&self) -> Option<FrameSize> {
        self.rendered
    }

    /// Per-axis `logical / rendered` factors.
    #[must_use]
    pub fn screen_to_canvas_scale(&self) -> (f32, f32) {
        let Some(rendered) = self.rendered else {
            return (1.0, 1.0);
        };
        (
            axis_scale(self.logical.width, rendered.width),
            axis_scale(self.logical.height, rendered.height),
        )
    }

    /// Convert an on-screen point (relative to the frame origin) into canvas units.
    #[must_use]
    pub fn to_canvas(&self, screen: Point) -> Point {
        let (sx, sy) = self.screen_to_canvas_scale();
        Point::new(screen.x * sx, screen.y * sy)
    }

    /// Convert a canvas point into on-screen units.
    #[must_use]
    pub fn to_screen(&self, canvas: Point) -> Point {
        let (sx, sy) = self.screen_to_canvas_scale();
        Point::new(canvas.x / sx, canvas.y / sy)
    }
}

impl Default for FrameMapping {
    fn default() -> Self {
        Self::new(FrameSize::STORY)
    }
}

fn axis_scale(logical: f32, rendered: f32) -> f32 {
    if is_positive(logical) && is_positive(rendered) {
        logical / rendered
    } else {
        1.0
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_fit_frame_height_bound() {
        let size = fit_frame(1080.0, 1920.0, 400.0, 400.0);
        assert!(approx(size.height, 400.0));
        assert!(approx(size.width, 225.0));
    }

    #[test]
    fn test_fit_frame_width_bound() {
        let size = fit_frame(1080.0, 1920.0, 540.0, 2000.0);
        assert!(approx(size.width, 540.0));
        assert!(approx(size.height, 960.0));
    }

    #[test]
    fn test_fit_frame_rejects_degenerate() {
        assert_eq!(fit_frame(1080.0, 1920.0, 0.0, 100.0), FrameSize::ZERO);
        assert_eq!(fit_frame(1080.0, 1920.0, 100.0, -5.0), FrameSize::ZERO);
        assert_eq!(fit_frame(0.0, 1920.0, 100.0, 100.0), FrameSize::ZERO);
        assert_eq!(fit_frame(1080.0, 1920.0, f32::NAN, 100.0), FrameSize::ZERO);
    }

    #[test]
    fn test_cover_crop_centres_overflow() {
        // Landscape source into a square target: crop the sides.
        let crop = cover_crop(200.0, 100.0, 50.0, 50.0);
        assert!(approx(crop.width, 100.0));
        assert!(approx(crop.height, 100.0));
        assert!(approx(crop.x, 50.0));
        assert!(approx(crop.y, 0.0));
    }

    #[test]
    fn test_cover_crop_portrait_target() {
        let crop = cover_crop(1920.0, 1080.0, 1080.0, 1920.0);
        assert!(approx(crop.height, 1080.0));
        assert!(approx(crop.width / crop.height, 1080.0 / 1920.0));
        assert!(approx(crop.x, (1920.0 - crop.width) / 2.0));
    }

    #[test]
    fn test_cover_crop_degenerate() {
        assert_eq!(cover_crop(0.0, 10.0, 10.0, 10.0), CropRect::default());
    }

    #[test]
    fn test_fit_modes() {
        let source = FrameSize::new(200.0, 100.0);
        let target = FrameSize::new(100.0, 100.0);

        let contain = fit(FitMode::Contain, source, target);
        assert!(approx(contain.size.width, 100.0));
        assert!(approx(contain.size.height, 50.0));
        assert_eq!(contain.crop, CropRect::full(source));

        let cover = fit(FitMode::Cover, source, target);
        assert_eq!(cover.size, target);
        assert!(approx(cover.crop.width, 100.0));
    }

    #[test]
    fn test_mapping_unknown_size_is_identity() {
        let mapping = FrameMapping::new(FrameSize::STORY);
        assert_eq!(mapping.screen_to_canvas_scale(), (1.0, 1.0));
        let p = mapping.to_canvas(Point::new(12.0, 34.0));
        assert_eq!(p, Point::new(12.0, 34.0));
    }

    #[test]
    fn test_mapping_zero_rendered_size_is_identity() {
        let mapping = FrameMapping::new(FrameSize::STORY).with_rendered(FrameSize::ZERO);
        assert_eq!(mapping.screen_to_canvas_scale(), (1.0, 1.0));
    }

    #[test]
    fn test_mapping_scales_to_logical() {
        let mut mapping = FrameMapping::new(FrameSize::STORY);
        mapping.set_rendered(FrameSize::new(270.0, 480.0));
        let p = mapping.to_canvas(Point::new(10.0, 20.0));
        assert!(approx(p.x, 40.0));
        assert!(approx(p.y, 80.0));

        let back = mapping.to_screen(p);
        assert!(approx(back.x, 10.0));
        assert!(approx(back.y, 20.0));

        mapping.clear_rendered();
        assert!(mapping.rendered().is_none());
    }

    proptest! {
        #[test]
        fn prop_fit_frame_preserves_story_aspect(
            max_w in 1.0f32..5000.0f32,
            max_h in 1.0f32..5000.0f32,
        ) {
            let size = fit_frame(1080.0, 1920.0, max_w, max_h);
            prop_assert!(size.width <= max_w);
            prop_assert!(size.height <= max_h);
            let ratio = size.width / size.height;
            prop_assert!((ratio - 1080.0 / 1920.0).abs() < 1e-3, "ratio {} drifted", ratio);
        }
    }
}
