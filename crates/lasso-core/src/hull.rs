//! Wrap-tight convex boundary around enclosed obstacles.
//!
//! Each enclosed obstacle contributes a ring of points at its bounding radius
//! plus a clearance; the convex hull of all rings, resampled along its edges,
//! becomes the target path the rope contracts onto. With nothing enclosed the
//! target is a circle that keeps the rope's approximate size.

use std::f32::consts::TAU;

use glam::Vec2;

use crate::math::{centroid, cross, mean_distance, signed_area, EPSILON};
use crate::obstacle::ObstacleInfo;

/// Minimum ring size per enclosed obstacle.
const MIN_POINTS_PER_OBSTACLE: usize = 8;

/// Closed target boundary. Indexing wraps around.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    points: Vec<Vec2>,
}

impl Path {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Point at `index` modulo the length. Panics on an empty path.
    #[inline]
    pub fn get(&self, index: usize) -> Vec2 {
        self.points[index % self.points.len()]
    }

    /// Length of the closed polyline.
    pub fn perimeter(&self) -> f32 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| self.points[i].distance(self.points[(i + 1) % n]))
            .sum()
    }

    pub fn centroid(&self) -> Vec2 {
        centroid(&self.points)
    }

    /// Match the winding of `polygon` and start at the path point nearest
    /// its first vertex, so index-proportional mapping does not cross over.
    pub fn align_to(&mut self, polygon: &[Vec2]) {
        let Some(&first) = polygon.first() else {
            return;
        };
        if self.points.is_empty() {
            return;
        }
        if signed_area(polygon) * signed_area(&self.points) < 0.0 {
            self.points.reverse();
        }
        let start = self
            .points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.distance_squared(first).total_cmp(&b.distance_squared(first)))
            .map_or(0, |(i, _)| i);
        self.points.rotate_left(start);
    }
}

/// Regular polygon of `resolution` points around the centroid of
/// `drawn`, at the mean distance of the drawn points from it.
pub fn circular_loop(drawn: &[Vec2], resolution: usize) -> Path {
    let center = centroid(drawn);
    let radius = mean_distance(drawn, center);
    let points = (0..resolution)
        .map(|i| {
            let angle = i as f32 / resolution as f32 * TAU;
            center + Vec2::from_angle(angle) * radius
        })
        .collect();
    Path::new(points)
}

/// Convex hull by Andrew's monotone chain.
///
/// Returns the hull counter-clockwise without repeating the first point.
/// Collinear points on hull edges are dropped. Inputs with fewer than three
/// distinct points are returned sorted and deduplicated.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut sorted: Vec<Vec2> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut hull: Vec<Vec2> = Vec::with_capacity(sorted.len() + 1);

    // Lower hull
    for &p in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    // Upper hull
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    hull.pop();
    hull
}

/// Resample a closed polygon: each edge becomes
/// `max(2, floor(edge_length / spacing))` evenly spaced points starting at
/// its first vertex.
pub fn smooth_hull(hull: &[Vec2], spacing: f32) -> Vec<Vec2> {
    if hull.len() < 3 {
        return hull.to_vec();
    }
    let mut out = Vec::new();
    for (i, &current) in hull.iter().enumerate() {
        let next = hull[(i + 1) % hull.len()];
        let length = current.distance(next);
        let subdivisions = if spacing > EPSILON {
            ((length / spacing).floor() as usize).max(2)
        } else {
            2
        };
        out.extend((0..subdivisions).map(|j| current.lerp(next, j as f32 / subdivisions as f32)));
    }
    out
}

/// Target path for a rope enclosing `enclosed`.
///
/// Every enclosed obstacle gets `max(8, resolution / count)` points on a
/// circle of radius `max(half_width, half_height) + clearance`; the convex
/// hull of all of them is resampled into the final path. Nothing enclosed
/// (or too few points) falls back to [`circular_loop`].
pub fn compute_target_path(
    enclosed: &[ObstacleInfo],
    drawn: &[Vec2],
    wrap_clearance: f32,
    resolution: usize,
) -> Path {
    if enclosed.is_empty() {
        return circular_loop(drawn, resolution);
    }

    let per_obstacle = (resolution / enclosed.len()).max(MIN_POINTS_PER_OBSTACLE);
    let mut ring_points = Vec::with_capacity(per_obstacle * enclosed.len());
    for obstacle in enclosed {
        let radius = obstacle.half_extents.max_element() + wrap_clearance;
        ring_points.extend((0..per_obstacle).map(|i| {
            let angle = i as f32 / per_obstacle as f32 * TAU;
            obstacle.position + Vec2::from_angle(angle) * radius
        }));
    }

    if ring_points.len() < 3 {
        return circular_loop(drawn, resolution);
    }

    let hull = convex_hull(&ring_points);
    Path::new(smooth_hull(&hull, wrap_clearance))
}
