//! Which obstacles does a closed rope surround?

use std::collections::BTreeSet;

use glam::Vec2;

use crate::math::Aabb;
use crate::obstacle::{Layers, ObstacleQuery, ObstacleRef};

/// Even-odd ray cast: toggle on every polygon edge crossed by the horizontal
/// ray from `point` toward +x.
///
/// Self-intersecting polygons get the even-odd answer, which may not match
/// the visual "inside" of the loop. Fewer than 3 vertices is never inside.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_at_y = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_at_y {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Obstacles on `mask` whose center lies inside the polygon traced by
/// `chain_points`.
///
/// The broadphase is the polygon's bounding box; each candidate is tested
/// independently, so the result does not depend on query order.
pub fn find_enclosed<Q: ObstacleQuery + ?Sized>(
    chain_points: &[Vec2],
    obstacles: &Q,
    mask: Layers,
) -> BTreeSet<ObstacleRef> {
    let Some(bounds) = Aabb::from_points(chain_points) else {
        return BTreeSet::new();
    };

    let mut candidates = Vec::new();
    obstacles.query_aabb(bounds, mask, &mut candidates);

    candidates
        .into_iter()
        .filter(|&handle| {
            obstacles
                .info(handle)
                .is_some_and(|info| point_in_polygon(info.position, chain_points))
        })
        .collect()
}
