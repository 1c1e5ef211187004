//! Editing Session Integration Tests
//!
//! Drives the store the way an editor front end does:
//! - Gesture messages posted from another thread and drained by the owner
//! - One undo step per finished gesture
//! - Freehand drawing through the path recorder
//! - Observers following the live scene

use std::thread;

use story_core::{
    gesture_channel, EditorConfig, FrameSize, GestureInput, GestureKind, Layer, LayerPatch,
    PathRecorder, Point, SceneStore, Transform,
};

fn layer_at_origin() -> Layer {
    Layer::image("asset://sticker.png").with_transform(Transform {
        x: 0.0,
        y: 0.0,
        width: 300.0,
        height: 300.0,
        rotation: 0.0,
        scale: 1.0,
    })
}

fn x_of(store: &SceneStore) -> f32 {
    store.scene().layers()[0].transform.x
}

// ============================================================================
// Gesture Round Trip
// ============================================================================

#[test]
fn test_pan_gesture_end_to_end() {
    let mut store = SceneStore::new();
    let layer = layer_at_origin();
    let id = layer.id;

    store.add_layer(layer);
    assert_eq!(store.scene().len(), 1);
    assert_eq!(store.scene().layers()[0].z_index, 1);
    assert_eq!(store.selected_layer_id(), Some(id));
    assert_eq!(store.history().past().len(), 1);
    assert!(store.history().past()[0].is_empty());

    // Three uncommitted updates leave history alone.
    for x in [10.0, 20.0, 30.0] {
        let m = store.update_layer(id, &LayerPatch::new().position(x, 0.0), false);
        assert!(m.changed);
        assert!(!m.committed);
        assert_eq!(store.history().past().len(), 1);
    }

    // Gesture end commits the final value.
    let end = store.update_layer(id, &LayerPatch::new().position(30.0, 0.0), true);
    assert!(end.committed);
    assert_eq!(store.history().past().len(), 2);

    store.undo();
    assert!(x_of(&store).abs() < f32::EPSILON);
    assert_eq!(store.history().future().len(), 1);

    store.redo();
    assert!((x_of(&store) - 30.0).abs() < f32::EPSILON);
}

#[test]
fn test_gestures_posted_from_another_thread() {
    let config = EditorConfig::default();
    let mut store = SceneStore::from_config(&config);
    let (sender, mut queue) = gesture_channel(config.gesture);

    let layer = layer_at_origin();
    let id = layer.id;
    store.add_layer(layer);

    let recogniser = thread::spawn(move || {
        sender.post(id, GestureInput::Began(GestureKind::Pan));
        for step in 1..=20u8 {
            let d = f32::from(step) * 5.0;
            sender.post(
                id,
                GestureInput::Pan {
                    translation_x: d,
                    translation_y: d / 2.0,
                },
            );
        }
        sender.post(id, GestureInput::Ended(GestureKind::Pan));
    });
    recogniser.join().expect("recogniser thread");

    let report = queue.drain(&mut store);
    assert_eq!(report.processed, 22);
    assert_eq!(report.committed, 1);
    assert_eq!(store.history().past().len(), 2);

    let t = store.scene().layers()[0].transform;
    assert!((t.x - 100.0).abs() < f32::EPSILON);
    assert!((t.y - 50.0).abs() < f32::EPSILON);

    store.undo();
    assert!(x_of(&store).abs() < f32::EPSILON);
}

#[test]
fn test_two_layers_panned_together_undo_separately() {
    let mut store = SceneStore::new();
    let (sender, mut queue) = gesture_channel(EditorConfig::default().gesture);
    let a = layer_at_origin();
    let b = layer_at_origin();
    let (a_id, b_id) = (a.id, b.id);
    store.add_layer(a);
    store.add_layer(b);

    let pan = |dx: f32| GestureInput::Pan {
        translation_x: dx,
        translation_y: 0.0,
    };
    sender.post(a_id, GestureInput::Began(GestureKind::Pan));
    sender.post(b_id, GestureInput::Began(GestureKind::Pan));
    sender.post(a_id, pan(10.0));
    sender.post(b_id, pan(50.0));
    sender.post(a_id, GestureInput::Ended(GestureKind::Pan));
    assert_eq!(queue.drain(&mut store).committed, 1);

    sender.post(b_id, pan(100.0));
    sender.post(b_id, GestureInput::Ended(GestureKind::Pan));
    assert_eq!(queue.drain(&mut store).committed, 1);

    let xs = |store: &SceneStore| {
        let scene = store.scene();
        let x = |id| scene.get(id).map_or(f32::NAN, |l| l.transform.x);
        (x(a_id), x(b_id))
    };
    assert_eq!(xs(&store), (10.0, 100.0));

    // Neither step captured the other layer mid-drag.
    store.undo();
    assert_eq!(xs(&store), (10.0, 0.0));
    store.undo();
    assert_eq!(xs(&store), (0.0, 0.0));
}

#[test]
fn test_pan_and_rotate_ending_together_are_two_steps() {
    let mut store = SceneStore::new();
    let (sender, mut queue) = gesture_channel(EditorConfig::default().gesture);
    let layer = layer_at_origin();
    let id = layer.id;
    store.add_layer(layer);

    sender.post(id, GestureInput::Began(GestureKind::Pan));
    sender.post(id, GestureInput::Began(GestureKind::Rotate));
    sender.post(
        id,
        GestureInput::Pan {
            translation_x: 40.0,
            translation_y: 0.0,
        },
    );
    sender.post(id, GestureInput::Rotate { rotation: 0.5 });
    sender.post(id, GestureInput::Ended(GestureKind::Pan));
    sender.post(id, GestureInput::Ended(GestureKind::Rotate));

    let report = queue.drain(&mut store);
    assert_eq!(report.committed, 2);
    assert_eq!(store.history().past().len(), 3);

    store.undo();
    let t = store.scene().layers()[0].transform;
    assert!((t.x - 40.0).abs() < f32::EPSILON);
    assert!(t.rotation.abs() < f32::EPSILON);

    store.undo();
    assert!(x_of(&store).abs() < f32::EPSILON);
}

#[test]
fn test_next_gesture_baselines_after_undo() {
    let mut store = SceneStore::new();
    let (sender, mut queue) = gesture_channel(EditorConfig::default().gesture);
    let layer = layer_at_origin();
    let id = layer.id;
    store.add_layer(layer);

    let pan = |dx: f32| {
        sender.post(id, GestureInput::Began(GestureKind::Pan));
        sender.post(
            id,
            GestureInput::Pan {
                translation_x: dx,
                translation_y: 0.0,
            },
        );
        sender.post(id, GestureInput::Ended(GestureKind::Pan));
    };

    pan(40.0);
    queue.drain(&mut store);
    assert!((x_of(&store) - 40.0).abs() < f32::EPSILON);

    store.undo();
    pan(10.0);
    queue.drain(&mut store);
    assert!((x_of(&store) - 10.0).abs() < f32::EPSILON);
    assert!(!store.can_redo());
}

#[test]
fn test_delete_mid_gesture_is_harmless() {
    let mut store = SceneStore::new();
    let (sender, mut queue) = gesture_channel(EditorConfig::default().gesture);
    let layer = layer_at_origin();
    let id = layer.id;
    store.add_layer(layer);

    sender.post(id, GestureInput::Began(GestureKind::Rotate));
    sender.post(id, GestureInput::Rotate { rotation: 0.3 });
    queue.drain(&mut store);

    store.remove_layer(id);
    let past = store.history().past().len();

    sender.post(id, GestureInput::Rotate { rotation: 0.6 });
    sender.post(id, GestureInput::Ended(GestureKind::Rotate));
    let report = queue.drain(&mut store);
    assert_eq!(report.committed, 0);
    assert_eq!(store.history().past().len(), past);
    assert!(store.scene().is_empty());
}

// ============================================================================
// Drawing
// ============================================================================

#[test]
fn test_tap_produces_no_path() {
    let mut store = SceneStore::new();
    store.add_layer(Layer::drawing().with_size(1080.0, 1920.0));

    let mut recorder = PathRecorder::new(FrameSize::STORY);
    recorder.begin(Point::new(200.0, 200.0));
    recorder.extend(Point::new(200.0, 200.0));
    assert!(recorder.end().is_none());

    assert!(store.scene().layers()[0].paths.is_empty());
    assert_eq!(store.history().past().len(), 1);
}

#[test]
fn test_stroke_appended_as_one_undo_step() {
    let mut store = SceneStore::new();
    let canvas = Layer::drawing().with_size(1080.0, 1920.0);
    let id = canvas.id;
    store.add_layer(canvas);

    let mut recorder = PathRecorder::new(FrameSize::STORY);
    recorder.set_rendered_size(FrameSize::new(540.0, 960.0));
    recorder.begin(Point::new(10.0, 10.0));
    for i in 1..=10u8 {
        recorder.extend(Point::new(10.0 + f32::from(i), 10.0));
    }
    let path = recorder.end().expect("path");
    assert!(path.path_data.starts_with("M20 20 L22 20"));

    let m = store.append_path(id, path.clone());
    assert!(m.committed);
    assert_eq!(store.scene().layers()[0].paths, vec![path]);

    store.undo();
    assert!(store.scene().layers()[0].paths.is_empty());
}

// ============================================================================
// Observation
// ============================================================================

#[test]
fn test_observer_sees_live_and_committed_state() {
    let mut store = SceneStore::new();
    let mut rx = store.subscribe();
    let layer = layer_at_origin();
    let id = layer.id;

    store.add_layer(layer);
    assert!(rx.has_changed().expect("sender alive"));
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.scene.len(), 1);
    assert!(state.can_undo);

    store.update_layer(id, &LayerPatch::new().opacity(0.5), false);
    let state = rx.borrow_and_update().clone();
    assert!((state.scene.layers()[0].opacity - 0.5).abs() < f32::EPSILON);

    // Undo drops the uncommitted change; the layer itself stays.
    store.undo();
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.scene.len(), 1);
    assert!((state.scene.layers()[0].opacity - 1.0).abs() < f32::EPSILON);
    assert!(!state.can_redo);

    store.undo();
    let state = rx.borrow_and_update().clone();
    assert!(state.scene.is_empty());
    assert!(state.can_redo);
}
