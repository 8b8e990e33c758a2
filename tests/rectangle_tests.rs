//! Scenario tests for the rectangle and point fast paths.
use glam::Vec2;
use tilecull::TiledCoverageBuffer;

fn quad(x1: f32, y1: f32, x2: f32, y2: f32) -> [Vec2; 4] {
    [
        Vec2::new(x1, y1),
        Vec2::new(x2, y1),
        Vec2::new(x2, y2),
        Vec2::new(x1, y2),
    ]
}

#[test]
fn test_rectangle_against_full_tile() {
    println!("[SETUP] tile (0,0) fully covered at depth 10");
    let mut buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    buffer.insert_polygon(&quad(0.0, 0.0, 32.0, 64.0), 10.0);

    let data = buffer
        .prepare_test_rectangle(Vec2::new(2.0, 2.0), Vec2::new(30.0, 60.0))
        .expect("on-screen rectangle must prepare");
    assert!(!buffer.test_rectangle(&data, 20.0), "deeper rect is hidden");
    assert!(buffer.test_rectangle(&data, 5.0), "nearer rect is visible");
    assert!(!buffer.quick_test_rectangle(&data, 20.0));
    assert!(buffer.quick_test_rectangle(&data, 5.0));
}

#[test]
fn test_rectangle_spanning_two_depths() {
    println!("[SETUP] left tiles at depth 10, right tiles at depth 30");
    let mut buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    buffer.insert_polygon(&quad(0.0, 0.0, 64.0, 64.0), 10.0);
    buffer.insert_polygon(&quad(64.0, 0.0, 128.0, 64.0), 30.0);

    let data = buffer
        .prepare_test_rectangle(Vec2::new(4.0, 4.0), Vec2::new(124.0, 60.0))
        .unwrap();
    assert!(
        buffer.test_rectangle(&data, 20.0),
        "visible where the right half is deeper than the candidate"
    );
    assert!(!buffer.test_rectangle(&data, 40.0), "deeper than both halves");
}

#[test]
fn test_rectangle_reaching_uncovered_tiles() {
    let mut buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    buffer.insert_polygon(&quad(0.0, 0.0, 128.0, 64.0), 10.0);

    // Extends into the second tile row, which is only grazed by the
    // occluder's bottom edge.
    let data = buffer
        .prepare_test_rectangle(Vec2::new(4.0, 4.0), Vec2::new(124.0, 100.0))
        .unwrap();
    assert!(
        buffer.test_rectangle(&data, 40.0),
        "uncovered pixels keep the rectangle visible at any depth"
    );
}

#[test]
fn test_prepare_rejects_offscreen_rectangles() {
    let buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    assert!(
        buffer
            .prepare_test_rectangle(Vec2::new(-50.0, 10.0), Vec2::new(-10.0, 40.0))
            .is_none(),
        "entirely left of the viewport"
    );
    assert!(
        buffer
            .prepare_test_rectangle(Vec2::new(10.0, 200.0), Vec2::new(40.0, 300.0))
            .is_none(),
        "entirely below the viewport"
    );
    assert!(
        buffer
            .prepare_test_rectangle(Vec2::new(20000.0, 10.0), Vec2::new(30000.0, 40.0))
            .is_none(),
        "beyond the coordinate limit"
    );
    assert!(
        buffer
            .prepare_test_rectangle(Vec2::new(10.0, 10.0), Vec2::new(120.0, 40.0))
            .is_some()
    );
}

#[test]
fn test_partially_clipped_rectangle_prepares() {
    let mut buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    buffer.insert_polygon(&quad(0.0, 0.0, 128.0, 120.0), 10.0);

    let data = buffer
        .prepare_test_rectangle(Vec2::new(-40.0, -40.0), Vec2::new(60.0, 60.0))
        .expect("overlapping rectangle must clamp, not reject");
    assert!(!buffer.test_rectangle(&data, 20.0));
    assert!(buffer.test_rectangle(&data, 5.0));
}

#[test]
fn test_point_lifecycle() {
    let mut buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    let p = Vec2::new(40.0, 30.0);

    assert!(buffer.test_point(p, 50.0), "empty buffer hides nothing");
    buffer.insert_polygon(&quad(16.0, 16.0, 80.0, 48.0), 10.0);
    assert!(!buffer.test_point(p, 50.0));
    assert!(buffer.test_point(p, 5.0));
    assert!(
        !buffer.test_point(Vec2::new(-1.0, 30.0), 5.0),
        "points outside the viewport are never visible"
    );

    buffer.initialize();
    assert!(buffer.test_point(p, 50.0), "frame reset clears occlusion");
}
