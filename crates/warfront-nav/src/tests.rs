use glam::{Vec2, Vec3};

use warfront_core::enums::AgentType;

use crate::corridor::{ConvexPolygon, Corridor, NavError, NavQuery, OpenField};
use crate::funnel::{string_pull, straighten_or_direct, FunnelError};
use crate::tile_mesh::TileNavMesh;

fn p(x: f32, z: f32) -> Vec3 {
    Vec3::new(x, 0.0, z)
}

fn square(x: f32, z: f32) -> ConvexPolygon {
    ConvexPolygon::rect(Vec2::new(x, z), Vec2::new(x + 1.0, z + 1.0))
}

fn assert_path(actual: &[Vec3], expected: &[Vec3]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "path {actual:?} != expected {expected:?}"
    );
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.distance(*e) < 1e-4, "path {actual:?} != expected {expected:?}");
    }
}

// ---- Funnel ----

#[test]
fn test_single_polygon_is_start_end() {
    let corridor = Corridor::new(vec![square(0.0, 0.0)]);
    let path = string_pull(&corridor, p(0.2, 0.2), p(0.8, 0.7)).unwrap();
    assert_path(&path, &[p(0.2, 0.2), p(0.8, 0.7)]);
}

#[test]
fn test_straight_corridor_has_no_interior_points() {
    let corridor = Corridor::new((0..6).map(|i| square(i as f32, 0.0)).collect());
    let path = string_pull(&corridor, p(0.5, 0.5), p(5.5, 0.5)).unwrap();
    assert_path(&path, &[p(0.5, 0.5), p(5.5, 0.5)]);
}

#[test]
fn test_straight_corridor_with_diagonal_travel() {
    let corridor = Corridor::new((0..4).map(|i| square(i as f32, 0.0)).collect());
    let path = string_pull(&corridor, p(0.1, 0.1), p(3.9, 0.9)).unwrap();
    assert_path(&path, &[p(0.1, 0.1), p(3.9, 0.9)]);
}

#[test]
fn test_l_shaped_corridor_has_one_corner() {
    // Right along the bottom row, then up.
    let corridor = Corridor::new(vec![square(0.0, 0.0), square(1.0, 0.0), square(1.0, 1.0)]);
    let path = string_pull(&corridor, p(0.5, 0.5), p(1.2, 1.8)).unwrap();
    assert_path(&path, &[p(0.5, 0.5), p(1.0, 1.0), p(1.2, 1.8)]);
}

#[test]
fn test_l_shaped_corridor_turning_right() {
    // Up the left column, then right along the top.
    let corridor = Corridor::new(vec![square(0.0, 0.0), square(0.0, 1.0), square(1.0, 1.0)]);
    let path = string_pull(&corridor, p(0.5, 0.2), p(1.8, 1.5)).unwrap();
    assert_path(&path, &[p(0.5, 0.2), p(1.0, 1.0), p(1.8, 1.5)]);
}

#[test]
fn test_l_shape_with_clear_line_of_sight_stays_straight() {
    let corridor = Corridor::new(vec![square(0.0, 0.0), square(1.0, 0.0), square(1.0, 1.0)]);
    let path = string_pull(&corridor, p(0.5, 0.5), p(1.8, 1.5)).unwrap();
    assert_path(&path, &[p(0.5, 0.5), p(1.8, 1.5)]);
}

#[test]
fn test_u_turn_has_two_corners() {
    // Right, up, then back left.
    let corridor = Corridor::new(vec![
        square(0.0, 0.0),
        square(1.0, 0.0),
        square(1.0, 1.0),
        square(1.0, 2.0),
        square(0.0, 2.0),
    ]);
    let path = string_pull(&corridor, p(0.5, 0.5), p(0.5, 2.5)).unwrap();
    assert_path(
        &path,
        &[p(0.5, 0.5), p(1.0, 1.0), p(1.0, 2.0), p(0.5, 2.5)],
    );
}

#[test]
fn test_disconnected_corridor_is_an_error() {
    let corridor = Corridor::new(vec![square(0.0, 0.0), square(5.0, 5.0)]);
    let err = string_pull(&corridor, p(0.5, 0.5), p(5.5, 5.5)).unwrap_err();
    assert_eq!(err, FunnelError::Corridor(NavError::Disconnected { index: 0 }));
}

#[test]
fn test_failed_corridor_falls_back_to_direct_line() {
    let corridor = Corridor::new(vec![square(0.0, 0.0), square(5.0, 5.0)]);
    let (path, fallback) = straighten_or_direct(&corridor, p(0.5, 0.5), p(5.5, 5.5));
    assert!(fallback);
    assert_path(&path, &[p(0.5, 0.5), p(5.5, 5.5)]);
}

#[test]
fn test_portals_are_oriented_by_travel_direction() {
    let corridor = Corridor::new(vec![square(0.0, 0.0), square(1.0, 0.0)]);
    let portals = corridor.portals(p(0.5, 0.5), p(1.5, 0.5)).unwrap();
    assert_eq!(portals.len(), 3);
    // Travelling +x, +z is on the left.
    assert_eq!(portals[1].left, p(1.0, 1.0));
    assert_eq!(portals[1].right, p(1.0, 0.0));
}

// ---- Tile mesh ----

fn mesh_10x10() -> TileNavMesh {
    TileNavMesh::new(Vec2::ZERO, Vec2::splat(10.0), 1.0)
}

#[test]
fn test_open_mesh_gives_direct_path() {
    let mesh = mesh_10x10();
    let start = p(1.5, 1.5);
    let end = p(8.5, 1.5);
    let corridor = mesh.find_corridor(start, end, AgentType::Infantry).unwrap();
    assert_eq!(corridor.polygons.len(), 8);
    let path = string_pull(&corridor, start, end).unwrap();
    assert_path(&path, &[start, end]);
}

#[test]
fn test_wall_forces_detour_around_its_end() {
    let mut mesh = mesh_10x10();
    // Wall along x = 5..6 from z = 0 up to z = 8, open above.
    mesh.carve(Vec2::new(5.0, 0.0), Vec2::new(6.0, 8.0), true);
    let start = p(2.5, 2.5);
    let end = p(8.5, 2.5);
    let corridor = mesh.find_corridor(start, end, AgentType::Infantry).unwrap();
    let path = string_pull(&corridor, start, end).unwrap();
    assert!(path[0].distance(start) < 1e-4);
    assert!(path[path.len() - 1].distance(end) < 1e-4);

    // Every leg stays out of the wall, so the path has to climb over its top.
    let inside_wall = |q: Vec3| q.x > 5.0 + 1e-4 && q.x < 6.0 - 1e-4 && q.z < 8.0 - 1e-4;
    for leg in path.windows(2) {
        for step in 0..=100 {
            let q = leg[0].lerp(leg[1], step as f32 / 100.0);
            assert!(!inside_wall(q), "leg {leg:?} cuts through the wall at {q:?}");
        }
    }
    assert!(path.iter().any(|q| q.z >= 8.0 - 1e-4), "{path:?}");
    assert!(path.len() >= 3, "{path:?}");
}

#[test]
fn test_carve_then_restore() {
    let mut mesh = mesh_10x10();
    let min = Vec2::new(3.0, 3.0);
    let max = Vec2::new(5.0, 5.0);
    mesh.carve(min, max, true);
    assert!(mesh.is_blocked((3, 3)));
    assert!(mesh.is_blocked((4, 4)));
    assert!(!mesh.is_blocked((5, 5)), "edge-aligned max must not claim the next tile");
    mesh.carve(min, max, false);
    assert!(!mesh.is_blocked((3, 3)));
}

#[test]
fn test_overlapping_carves_are_counted() {
    let mut mesh = mesh_10x10();
    mesh.carve(Vec2::new(3.0, 3.0), Vec2::new(4.0, 4.0), true);
    mesh.carve(Vec2::new(3.0, 3.0), Vec2::new(4.0, 4.0), true);
    mesh.carve(Vec2::new(3.0, 3.0), Vec2::new(4.0, 4.0), false);
    assert!(mesh.is_blocked((3, 3)));
}

#[test]
fn test_vehicle_needs_clearance_through_gap() {
    let mut mesh = mesh_10x10();
    mesh.carve(Vec2::new(5.0, 0.0), Vec2::new(6.0, 4.0), true);
    mesh.carve(Vec2::new(5.0, 5.0), Vec2::new(6.0, 10.0), true);
    let start = p(2.5, 4.5);
    let end = p(8.5, 4.5);
    assert!(mesh.find_corridor(start, end, AgentType::Infantry).is_ok());
    assert_eq!(
        mesh.find_corridor(start, end, AgentType::Vehicle),
        Err(NavError::NoCorridor)
    );
}

#[test]
fn test_out_of_bounds_and_blocked_endpoints() {
    let mut mesh = mesh_10x10();
    assert!(matches!(
        mesh.find_corridor(p(-1.0, 0.5), p(2.0, 2.0), AgentType::Infantry),
        Err(NavError::OutOfBounds { .. })
    ));
    mesh.carve(Vec2::new(5.0, 5.0), Vec2::new(10.0, 10.0), true);
    assert!(matches!(
        mesh.find_corridor(p(1.0, 1.0), p(7.5, 7.5), AgentType::Infantry),
        Err(NavError::Blocked { .. })
    ));
}

#[test]
fn test_endpoint_in_small_blocker_snaps_to_neighbour() {
    let mut mesh = mesh_10x10();
    mesh.carve(Vec2::new(7.0, 7.0), Vec2::new(8.0, 8.0), true);
    let corridor = mesh
        .find_corridor(p(1.5, 7.5), p(7.5, 7.5), AgentType::Infantry)
        .unwrap();
    let last = corridor.polygons.last().unwrap();
    let centre = last.vertices.iter().fold(Vec3::ZERO, |acc, v| acc + *v) / 4.0;
    assert!(p(7.5, 7.5).distance(centre) <= 1.0 + 1e-4);
    assert!(!corridor
        .polygons
        .iter()
        .any(|poly| poly.vertices.contains(&Vec3::new(7.0, 0.0, 7.0))
            && poly.vertices.contains(&Vec3::new(8.0, 0.0, 8.0))));
}

#[test]
fn test_open_field_is_single_polygon() {
    let field = OpenField {
        min: Vec2::splat(-10.0),
        max: Vec2::splat(10.0),
    };
    let corridor = field
        .find_corridor(p(0.0, 0.0), p(5.0, 5.0), AgentType::Infantry)
        .unwrap();
    assert_eq!(corridor.polygons.len(), 1);
    assert!(field
        .find_corridor(p(0.0, 0.0), p(50.0, 5.0), AgentType::Infantry)
        .is_err());
}
