//! Integration tests for compositing and export (story-renderer).
//!
//! Tests pixel output of layer stacking, transforms, opacity and tint,
//! image source resolution, and the async export boundary.

use std::io::Cursor;
use std::sync::Arc;

use story_core::{
    DrawingPath, FrameSize, Layer, LayerPatch, PathRecorder, Point, SceneDocument, SceneStore,
    SnapshotStrip, StrokeStyle, Transform,
};
use story_renderer::{
    CompositeRenderer, DirectoryTarget, ExportFormat, MemoryImageSource, RenderConfig,
    SnapshotExporter,
};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Encode a solid-color PNG.
fn solid_png(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba(rgba));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

fn images() -> Arc<MemoryImageSource> {
    Arc::new(
        MemoryImageSource::new()
            .with("asset://red", solid_png(RED))
            .with("asset://blue", solid_png(BLUE)),
    )
}

/// Renderer for a 100x100 logical canvas, rendered 1:1.
fn renderer() -> CompositeRenderer {
    CompositeRenderer::new(RenderConfig {
        logical: FrameSize::new(100.0, 100.0),
        ..RenderConfig::default()
    })
    .with_image_source(images())
}

fn placed(uri: &str, x: f32, y: f32, width: f32, height: f32) -> Layer {
    Layer::image(uri).with_transform(Transform {
        x,
        y,
        width,
        height,
        rotation: 0.0,
        scale: 1.0,
    })
}

fn pixel_at(renderer: &CompositeRenderer, store: &SceneStore, x: u32, y: u32) -> [u8; 4] {
    let pixmap = renderer.render_pixmap(store.scene()).expect("render");
    let p = pixmap.pixel(x, y).expect("in bounds");
    [p.red(), p.green(), p.blue(), p.alpha()]
}

fn assert_close(actual: [u8; 4], expected: [u8; 4]) {
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!(a.abs_diff(*e) <= 2, "expected {expected:?}, got {actual:?}");
    }
}

// ==========================================================================
// Layer stacking
// ==========================================================================

#[test]
fn test_front_layer_covers_back_layer() {
    let mut store = SceneStore::new();
    let red = placed("asset://red", 0.0, 0.0, 60.0, 60.0);
    let red_id = red.id;
    store.add_layer(red);
    store.add_layer(placed("asset://blue", 40.0, 40.0, 60.0, 60.0));

    let r = renderer();
    assert_close(pixel_at(&r, &store, 10, 10), RED);
    assert_close(pixel_at(&r, &store, 50, 50), BLUE);
    assert_close(pixel_at(&r, &store, 90, 10), WHITE);

    // Reordering changes what is visible in the overlap.
    store.bring_to_front(red_id, true);
    assert_close(pixel_at(&r, &store, 50, 50), RED);

    store.undo();
    assert_close(pixel_at(&r, &store, 50, 50), BLUE);
}

#[test]
fn test_rotation_about_center() {
    let mut store = SceneStore::new();
    let bar = placed("asset://red", 0.0, 40.0, 100.0, 20.0);
    let id = bar.id;
    store.add_layer(bar);

    let r = renderer();
    assert_close(pixel_at(&r, &store, 10, 50), RED);
    assert_close(pixel_at(&r, &store, 50, 10), WHITE);

    store.update_layer(
        id,
        &LayerPatch::new().rotation(std::f32::consts::FRAC_PI_2),
        true,
    );
    assert_close(pixel_at(&r, &store, 50, 10), RED);
    assert_close(pixel_at(&r, &store, 10, 50), WHITE);
}

#[test]
fn test_scale_grows_from_anchor() {
    let mut store = SceneStore::new();
    let layer = placed("asset://blue", 0.0, 0.0, 20.0, 20.0);
    let id = layer.id;
    store.add_layer(layer);

    let r = renderer();
    assert_close(pixel_at(&r, &store, 30, 30), WHITE);
    store.update_layer(id, &LayerPatch::new().scale(2.0), true);
    assert_close(pixel_at(&r, &store, 30, 30), BLUE);
}

#[test]
fn test_opacity_and_tint() {
    let mut store = SceneStore::new();
    store.add_layer(placed("asset://red", 0.0, 0.0, 50.0, 100.0).with_opacity(0.5));
    store.add_layer(placed("asset://red", 50.0, 0.0, 50.0, 100.0).with_tint("#0000ff"));

    let r = renderer();
    assert_close(pixel_at(&r, &store, 25, 50), [255, 128, 128, 255]);
    assert_close(pixel_at(&r, &store, 75, 50), BLUE);
}

#[test]
fn test_unresolved_source_draws_nothing() {
    let mut store = SceneStore::new();
    store.add_layer(placed("asset://missing", 0.0, 0.0, 100.0, 100.0));
    assert_close(pixel_at(&renderer(), &store, 50, 50), WHITE);
}

#[test]
fn test_drawing_paths_on_top_of_image() {
    let mut store = SceneStore::new();
    let layer = placed("asset://blue", 0.0, 0.0, 100.0, 100.0);
    let id = layer.id;
    store.add_layer(layer);
    store.append_path(id, DrawingPath::new("M0 50 L100 50", "#ff0000", 10.0));

    let r = renderer();
    assert_close(pixel_at(&r, &store, 50, 50), RED);
    assert_close(pixel_at(&r, &store, 50, 20), BLUE);
}

#[test]
fn test_stroke_on_offset_scaled_layer_lands_where_drawn() {
    let mut store = SceneStore::new();
    let mut layer = placed("asset://blue", 50.0, 50.0, 100.0, 100.0);
    layer.transform.scale = 0.5;
    let id = layer.id;
    store.add_layer(layer);

    let mut recorder = PathRecorder::new(FrameSize::new(100.0, 100.0)).with_style(StrokeStyle {
        color: "#ff0000".to_string(),
        width: 6.0,
    });
    recorder.set_rendered_size(FrameSize::new(100.0, 100.0));
    recorder.begin(Point::new(10.0, 20.0));
    recorder.extend(Point::new(40.0, 20.0));
    let path = recorder.end().expect("path");
    store.append_path(id, path);

    let r = renderer();
    assert_close(pixel_at(&r, &store, 25, 20), RED);
    // Not shifted or shrunk by the layer transform.
    assert_close(pixel_at(&r, &store, 62, 60), BLUE);
    assert_close(pixel_at(&r, &store, 25, 45), WHITE);
}

// ==========================================================================
// Documents and formats
// ==========================================================================

#[test]
fn test_document_renders_all_formats() {
    let json = r##"{
        "canvas": {"width": 100, "height": 100},
        "layers": [
            {"kind": "image", "source_uri": "asset://red",
             "transform": {"x": 10, "y": 10, "width": 80, "height": 80, "rotation": 0, "scale": 1}},
            {"kind": "drawing",
             "paths": [{"path_data": "M0 0 L100 100", "color": "#000000", "stroke_width": 3}]}
        ]
    }"##;
    let doc = SceneDocument::from_json(json).expect("document");
    let canvas = doc.canvas;
    let scene = doc.into_scene().expect("scene");

    let r = CompositeRenderer::new(RenderConfig {
        logical: canvas,
        width: Some(50),
        ..RenderConfig::default()
    })
    .with_image_source(images());

    let png = r.export(&scene, ExportFormat::Png).expect("png");
    let decoded = image::load_from_memory(&png).expect("decode png");
    assert_eq!((decoded.width(), decoded.height()), (50, 50));

    let jpeg = r.export(&scene, ExportFormat::Jpeg).expect("jpeg");
    let decoded = image::load_from_memory(&jpeg).expect("decode jpeg");
    assert_eq!((decoded.width(), decoded.height()), (50, 50));

    let svg = String::from_utf8(r.export(&scene, ExportFormat::Svg).expect("svg")).expect("utf8");
    assert!(svg.contains("data:image/png;base64,"));
    assert!(svg.contains("M0 0 L100 100"));
}

// ==========================================================================
// Async export
// ==========================================================================

#[tokio::test]
async fn test_export_to_directory_and_strip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exporter = SnapshotExporter::new(renderer(), Arc::new(DirectoryTarget::new(dir.path())))
        .with_format(ExportFormat::Png);

    let mut store = SceneStore::new();
    store.add_layer(placed("asset://red", 0.0, 0.0, 100.0, 100.0));

    let mut strip = SnapshotStrip::new();
    let first = exporter.export(store.scene().clone()).await.expect("export");
    strip.push(first.clone());

    // The store keeps working on its own copy while exports run.
    store.undo();
    let second = exporter.export(store.scene().clone()).await.expect("export");
    strip.push(second.clone());
    assert_ne!(first.uri, second.uri);

    let path = first.uri.strip_prefix("file://").expect("file uri");
    let bytes = std::fs::read(path).expect("read export");
    assert_eq!(&bytes[0..4], &[137, 80, 78, 71]);

    assert!(strip.move_item(1, 0));
    assert_eq!(strip.items()[0].id, second.id);
}
