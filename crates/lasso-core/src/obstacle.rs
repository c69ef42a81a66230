//! The environment boundary: what the rope collides with and wraps around.
//!
//! The physics core only talks to its surroundings through [`ObstacleQuery`].
//! [`ObstacleField`] is an in-memory implementation backed by a spatial hash.

use bitflags::bitflags;
use glam::Vec2;

use crate::grid::SpatialHashGrid;
use crate::math::{Aabb, EPSILON};

bitflags! {
    /// Capability tags used to filter obstacle queries.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Layers: u32 {
        const GROUND = 1 << 0;
        const OBSTACLE = 1 << 1;
        const PLAYER = 1 << 2;
    }
}

/// Opaque handle to an obstacle owned by the environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObstacleRef(pub u32);

/// What the core needs to know about an obstacle beyond collision queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleInfo {
    pub handle: ObstacleRef,
    /// World position (used as the center for enclosure tests).
    pub position: Vec2,
    /// Half size of the axis-aligned extent.
    pub half_extents: Vec2,
}

/// Synchronous, side-effect-free spatial queries against the environment.
pub trait ObstacleQuery {
    /// Append handles of obstacles on `mask` overlapping the disk.
    fn query_circle(&self, center: Vec2, radius: f32, mask: Layers, out: &mut Vec<ObstacleRef>);

    /// Append handles of obstacles on `mask` overlapping the box.
    fn query_aabb(&self, area: Aabb, mask: Layers, out: &mut Vec<ObstacleRef>);

    /// Closest point on the obstacle's boundary to `point`.
    fn closest_point(&self, handle: ObstacleRef, point: Vec2) -> Vec2;

    /// Whether `point` lies strictly inside the obstacle.
    fn contains(&self, handle: ObstacleRef, point: Vec2) -> bool;

    /// Position and extent, `None` for a stale handle.
    fn info(&self, handle: ObstacleRef) -> Option<ObstacleInfo>;
}

/// Collision shape of an obstacle, centered on its position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { half_extents: Vec2 },
}

impl Shape {
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Rect { half_extents } => half_extents,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub position: Vec2,
    pub shape: Shape,
    pub layers: Layers,
}

impl Obstacle {
    pub fn circle(position: Vec2, radius: f32, layers: Layers) -> Self {
        Self {
            position,
            shape: Shape::Circle { radius },
            layers,
        }
    }

    pub fn rect(position: Vec2, half_extents: Vec2, layers: Layers) -> Self {
        Self {
            position,
            shape: Shape::Rect { half_extents },
            layers,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.shape.half_extents())
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let d = point - self.position;
        match self.shape {
            Shape::Circle { radius } => d.length_squared() < radius * radius,
            Shape::Rect { half_extents } => d.x.abs() < half_extents.x && d.y.abs() < half_extents.y,
        }
    }

    /// Closest point on the boundary, for points inside as well as outside.
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let d = point - self.position;
        match self.shape {
            Shape::Circle { radius } => {
                let len = d.length();
                let dir = if len > EPSILON { d / len } else { Vec2::X };
                self.position + dir * radius
            }
            Shape::Rect { half_extents: h } => {
                if d.x.abs() < h.x && d.y.abs() < h.y {
                    // Inside: snap to the nearest face.
                    let gap_x = h.x - d.x.abs();
                    let gap_y = h.y - d.y.abs();
                    if gap_x < gap_y {
                        self.position + Vec2::new(h.x.copysign(d.x), d.y)
                    } else {
                        self.position + Vec2::new(d.x, h.y.copysign(d.y))
                    }
                } else {
                    self.position + d.clamp(-h, h)
                }
            }
        }
    }

    fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        self.contains(center) || self.closest_point(center).distance_squared(center) <= radius * radius
    }

    fn overlaps_aabb(&self, area: &Aabb) -> bool {
        match self.shape {
            Shape::Circle { radius } => {
                let nearest = self.position.clamp(area.min, area.max);
                nearest.distance_squared(self.position) <= radius * radius
            }
            Shape::Rect { .. } => self.aabb().overlaps(area),
        }
    }
}

/// In-memory obstacle environment with a spatial hash broadphase.
///
/// Slots of removed obstacles stay vacant, so handles remain stable.
pub struct ObstacleField {
    obstacles: Vec<Option<Obstacle>>,
    grid: SpatialHashGrid,
}

impl Default for ObstacleField {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ObstacleField {
    pub fn new(cell_size: f32) -> Self {
        Self {
            obstacles: Vec::new(),
            grid: SpatialHashGrid::new(cell_size, 4096),
        }
    }

    pub fn insert(&mut self, obstacle: Obstacle) -> ObstacleRef {
        let handle = ObstacleRef(self.obstacles.len() as u32);
        self.obstacles.push(Some(obstacle));
        self.rebuild();
        handle
    }

    /// Insert several obstacles with a single broadphase rebuild.
    pub fn extend<I: IntoIterator<Item = Obstacle>>(&mut self, obstacles: I) -> Vec<ObstacleRef> {
        let start = self.obstacles.len();
        self.obstacles.extend(obstacles.into_iter().map(Some));
        self.rebuild();
        (start..self.obstacles.len()).map(|i| ObstacleRef(i as u32)).collect()
    }

    /// Move an obstacle. Returns `false` for a stale handle.
    pub fn set_position(&mut self, handle: ObstacleRef, position: Vec2) -> bool {
        match self.obstacles.get_mut(handle.0 as usize) {
            Some(Some(obstacle)) => {
                obstacle.position = position;
                self.rebuild();
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, handle: ObstacleRef) -> Option<Obstacle> {
        let removed = self.obstacles.get_mut(handle.0 as usize)?.take();
        if removed.is_some() {
            self.rebuild();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
        self.rebuild();
    }

    pub fn get(&self, handle: ObstacleRef) -> Option<&Obstacle> {
        self.obstacles.get(handle.0 as usize)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.obstacles.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rebuild(&mut self) {
        let boxes: Vec<Option<Aabb>> = self
            .obstacles
            .iter()
            .map(|o| o.as_ref().map(Obstacle::aabb))
            .collect();
        self.grid.build(&boxes);
    }

    fn collect<F>(&self, area: &Aabb, mask: Layers, out: &mut Vec<ObstacleRef>, exact: F)
    where
        F: Fn(&Obstacle) -> bool,
    {
        let mut candidates = Vec::new();
        self.grid.query(area, &mut candidates);
        for index in candidates {
            if let Some(Some(obstacle)) = self.obstacles.get(index as usize) {
                if obstacle.layers.intersects(mask) && exact(obstacle) {
                    out.push(ObstacleRef(index));
                }
            }
        }
    }
}

impl ObstacleQuery for ObstacleField {
    fn query_circle(&self, center: Vec2, radius: f32, mask: Layers, out: &mut Vec<ObstacleRef>) {
        let area = Aabb::from_center(center, Vec2::splat(radius));
        self.collect(&area, mask, out, |o| o.overlaps_circle(center, radius));
    }

    fn query_aabb(&self, area: Aabb, mask: Layers, out: &mut Vec<ObstacleRef>) {
        self.collect(&area, mask, out, |o| o.overlaps_aabb(&area));
    }

    fn closest_point(&self, handle: ObstacleRef, point: Vec2) -> Vec2 {
        self.get(handle).map_or(point, |o| o.closest_point(point))
    }

    fn contains(&self, handle: ObstacleRef, point: Vec2) -> bool {
        self.get(handle).is_some_and(|o| o.contains(point))
    }

    fn info(&self, handle: ObstacleRef) -> Option<ObstacleInfo> {
        self.get(handle).map(|o| ObstacleInfo {
            handle,
            position: o.position,
            half_extents: o.shape.half_extents(),
        })
    }
}
