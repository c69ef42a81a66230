use glam::Vec2;

use crate::math::{reflect, EPSILON};
use crate::obstacle::{Layers, ObstacleQuery, ObstacleRef};
use crate::segment::SegmentChain;

/// Per-pass collision response parameters, resolved from the physics config
/// and the rope's shrink state.
#[derive(Clone, Copy, Debug)]
pub struct ContactParams {
    pub radius: f32,
    pub mask: Layers,
    pub bounce: f32,
    pub damping: f32,
    pub friction: f32,
    pub buffer: f32,
}

/// Push every segment out of the obstacles its probe disk overlaps.
///
/// For each overlapping obstacle closer than `radius`:
/// 1. normal = surface -> segment (inverted when the segment is inside,
///    obstacle center -> segment when degenerate)
/// 2. move the segment out by penetration + buffer
/// 3. reflect the implicit velocity about the normal, scale by bounce and damping
/// 4. remove `friction` of the remaining tangential velocity
///
/// `previous_position` is re-derived so the next step sees the new velocity.
/// Returns the number of corrections applied.
pub fn handle_collisions<Q: ObstacleQuery + ?Sized>(
    chain: &mut SegmentChain,
    obstacles: &Q,
    params: &ContactParams,
) -> u32 {
    let mut hits: Vec<ObstacleRef> = Vec::new();
    let mut resolved = 0;

    for segment in chain.segments.iter_mut() {
        hits.clear();
        obstacles.query_circle(segment.position, params.radius, params.mask, &mut hits);
        if hits.is_empty() {
            continue;
        }

        let mut position = segment.position;
        let mut velocity = segment.velocity();

        for &handle in &hits {
            let surface = obstacles.closest_point(handle, position);
            let inside = obstacles.contains(handle, position);
            let offset = position - surface;
            let dist = offset.length();
            if !inside && dist >= params.radius {
                continue;
            }

            let mut normal = if dist > EPSILON {
                if inside { -offset / dist } else { offset / dist }
            } else {
                Vec2::ZERO
            };
            if normal == Vec2::ZERO {
                if let Some(info) = obstacles.info(handle) {
                    normal = (position - info.position).normalize_or_zero();
                }
            }
            if normal == Vec2::ZERO {
                continue;
            }

            let penetration = if inside {
                dist + params.radius
            } else {
                params.radius - dist
            };
            position += normal * (penetration + params.buffer);

            velocity = reflect(velocity, normal) * params.bounce * params.damping;
            if params.friction > 0.0 {
                let tangential = velocity - normal * velocity.dot(normal);
                velocity -= tangential * params.friction;
            }
            resolved += 1;
        }

        segment.position = position;
        segment.previous_position = position - velocity;
    }

    resolved
}
