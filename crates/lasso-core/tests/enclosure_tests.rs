use std::f32::consts::TAU;

use glam::Vec2;
use lasso_core::enclosure::{find_enclosed, point_in_polygon};
use lasso_core::obstacle::{Layers, Obstacle, ObstacleField};
use rand::{Rng, SeedableRng};

fn unit_square() -> Vec<Vec2> {
    vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y]
}

fn regular_polygon(sides: usize, radius: f32, center: Vec2) -> Vec<Vec2> {
    (0..sides)
        .map(|i| center + Vec2::from_angle(i as f32 / sides as f32 * TAU) * radius)
        .collect()
}

#[test]
fn test_unit_square() {
    let square = unit_square();
    assert!(point_in_polygon(Vec2::new(0.5, 0.5), &square));
    assert!(!point_in_polygon(Vec2::new(2.0, 2.0), &square));
    assert!(!point_in_polygon(Vec2::new(-0.5, 0.5), &square));
}

#[test]
fn test_winding_does_not_matter() {
    let mut square = unit_square();
    square.reverse();
    assert!(point_in_polygon(Vec2::new(0.25, 0.75), &square));
}

#[test]
fn test_degenerate_polygons_contain_nothing() {
    assert!(!point_in_polygon(Vec2::ZERO, &[]));
    assert!(!point_in_polygon(Vec2::new(0.5, 0.0), &[Vec2::ZERO, Vec2::X]));
}

#[test]
fn test_concave_polygon() {
    // U shape opening upward
    let u = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(3.0, 0.0),
        Vec2::new(3.0, 3.0),
        Vec2::new(2.0, 3.0),
        Vec2::new(2.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 3.0),
        Vec2::new(0.0, 3.0),
    ];
    assert!(point_in_polygon(Vec2::new(0.5, 2.0), &u), "left arm");
    assert!(point_in_polygon(Vec2::new(2.5, 2.0), &u), "right arm");
    assert!(!point_in_polygon(Vec2::new(1.5, 2.0), &u), "notch is outside");
    assert!(point_in_polygon(Vec2::new(1.5, 0.5), &u), "base");
}

#[test]
fn test_random_points_against_regular_polygons() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);

    for _ in 0..20 {
        let sides = rng.gen_range(12..64);
        let radius = rng.gen_range(1.0..10.0);
        let center = Vec2::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0));
        let polygon = regular_polygon(sides, radius, center);
        // Inscribed circle radius
        let apothem = radius * (std::f32::consts::PI / sides as f32).cos();

        for _ in 0..50 {
            let dir = Vec2::from_angle(rng.gen_range(0.0..TAU));
            let inner = center + dir * rng.gen_range(0.0..apothem * 0.95);
            let outer = center + dir * rng.gen_range(radius * 1.05..radius * 3.0);
            assert!(point_in_polygon(inner, &polygon), "{:?} should be inside", inner);
            assert!(!point_in_polygon(outer, &polygon), "{:?} should be outside", outer);
        }
    }
}

#[test]
fn test_find_enclosed_by_center() {
    let mut field = ObstacleField::default();
    let inside = field.insert(Obstacle::circle(Vec2::new(1.0, 1.0), 0.3, Layers::OBSTACLE));
    let _outside = field.insert(Obstacle::circle(Vec2::new(6.0, 1.0), 0.3, Layers::OBSTACLE));
    // Center outside, body overlapping the loop: not enclosed
    let _straddling = field.insert(Obstacle::rect(Vec2::new(4.5, 1.0), Vec2::new(1.0, 0.5), Layers::GROUND));

    let loop_points = regular_polygon(32, 3.0, Vec2::new(1.0, 1.0));
    let enclosed = find_enclosed(&loop_points, &field, Layers::GROUND | Layers::OBSTACLE);

    assert_eq!(enclosed.into_iter().collect::<Vec<_>>(), vec![inside]);
}

#[test]
fn test_find_enclosed_respects_mask() {
    let mut field = ObstacleField::default();
    let ground = field.insert(Obstacle::circle(Vec2::ZERO, 0.3, Layers::GROUND));
    field.insert(Obstacle::circle(Vec2::new(0.5, 0.0), 0.3, Layers::PLAYER));

    let loop_points = regular_polygon(16, 2.0, Vec2::ZERO);
    let enclosed = find_enclosed(&loop_points, &field, Layers::GROUND | Layers::OBSTACLE);

    assert!(enclosed.contains(&ground));
    assert_eq!(enclosed.len(), 1, "player should not be captured");
}

#[test]
fn test_find_enclosed_empty_loop() {
    let mut field = ObstacleField::default();
    field.insert(Obstacle::circle(Vec2::ZERO, 0.3, Layers::GROUND));

    assert!(find_enclosed(&[], &field, Layers::all()).is_empty());
}
