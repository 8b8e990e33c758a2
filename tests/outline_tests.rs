//! Scenario tests for silhouette outline insertion.
use glam::{Vec2, Vec3};
use tilecull::{OutlineCamera, TiledCoverageBuffer};

fn camera() -> OutlineCamera {
    OutlineCamera {
        focal_length: 64.0,
        screen_offset: Vec2::new(64.0, 64.0),
        ..Default::default()
    }
}

/// Square silhouette facing the camera at the given depth.
fn square(z: f32) -> [Vec3; 4] {
    [
        Vec3::new(-2.0, -2.0, z),
        Vec3::new(2.0, -2.0, z),
        Vec3::new(2.0, 2.0, z),
        Vec3::new(-2.0, 2.0, z),
    ]
}

const SQUARE_EDGES: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];

#[test]
fn test_outline_occludes_its_interior() {
    println!("[SETUP] square silhouette at z=10, projected around screen center");
    let mut buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    let modified = buffer.insert_outline(
        &camera(),
        &square(10.0),
        &[true; 4],
        &SQUARE_EDGES,
        false,
    );
    assert!(modified, "outline insertion must touch the buffer");

    let center = Vec2::new(64.0, 64.0);
    assert!(
        !buffer.test_point(center, 20.0),
        "point behind the silhouette interior is hidden"
    );
    assert!(
        buffer.test_point(center, 5.0),
        "point in front of the silhouette is visible"
    );
    assert!(
        buffer.test_point(Vec2::new(100.0, 64.0), 20.0),
        "point outside the silhouette is visible"
    );
}

#[test]
fn test_near_vertex_without_splatting_aborts() {
    let mut buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    let mut verts = square(10.0);
    verts[3].z = 0.1;

    let modified = buffer.insert_outline(&camera(), &verts, &[true; 4], &SQUARE_EDGES, false);
    assert!(!modified, "a used vertex at the near plane must abort the insert");
    for ty in 0..buffer.tile_rows() {
        for tx in 0..buffer.tile_cols() {
            assert!(
                buffer.tile_at(tx, ty).is_untouched(),
                "aborted insert must leave tile {},{} untouched",
                tx,
                ty
            );
        }
    }
}

#[test]
fn test_splatting_draws_a_conservative_outline() {
    println!("[SETUP] one vertex behind the camera, splatting enabled");
    let mut buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    let mut verts = square(10.0);
    verts[3].z = -1.0;

    let modified = buffer.insert_outline(&camera(), &verts, &[true; 4], &SQUARE_EDGES, true);
    assert!(modified, "splatted outline must still draw");

    let touched = (0..buffer.tile_rows())
        .flat_map(|ty| (0..buffer.tile_cols()).map(move |tx| (tx, ty)))
        .any(|(tx, ty)| !buffer.tile_at(tx, ty).is_untouched());
    assert!(touched, "splatted edges must reach at least one tile");
}

#[test]
fn test_unused_vertices_still_bound_depth() {
    println!("[SETUP] silhouette at z=10 with an unused vertex at z=30");
    let mut buffer = TiledCoverageBuffer::new(128, 128).unwrap();
    let verts = [
        Vec3::new(-2.0, -2.0, 10.0),
        Vec3::new(2.0, -2.0, 10.0),
        Vec3::new(2.0, 2.0, 10.0),
        Vec3::new(-2.0, 2.0, 10.0),
        Vec3::new(0.0, 0.0, 30.0),
    ];
    let used = [true, true, true, true, false];
    assert!(buffer.insert_outline(&camera(), &verts, &used, &SQUARE_EDGES, false));

    // The committed depth is the object's farthest vertex, so a candidate at
    // depth 20 still counts as potentially in front.
    assert!(
        buffer.test_point(Vec2::new(64.0, 64.0), 20.0),
        "depth bound must include unused vertices"
    );
    assert!(!buffer.test_point(Vec2::new(64.0, 64.0), 40.0));
}
