use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::error::{RopeError, RopeResult};

/// One point mass of the rope. Velocity is implicit: `position - previous_position`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Segment {
    pub position: Vec2,
    pub previous_position: Vec2,
}

impl Segment {
    /// A segment at rest at `position`.
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            previous_position: position,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.position - self.previous_position
    }
}

/// Ordered sequence of segments kept `rest_length` apart by the solver.
///
/// The chain is the single owned buffer shared by the solver and the shrink
/// controller; both receive it by `&mut` for the duration of a step.
#[derive(Clone, Debug)]
pub struct SegmentChain {
    pub segments: Vec<Segment>,
    pub rest_length: f32,
    pub closed: bool,
}

impl SegmentChain {
    /// Start an empty open chain.
    pub fn new(rest_length: f32) -> RopeResult<Self> {
        if !(rest_length > 0.0 && rest_length.is_finite()) {
            return Err(RopeError::InvalidRestLength(rest_length));
        }
        Ok(Self {
            segments: Vec::new(),
            rest_length,
            closed: false,
        })
    }

    /// Build a chain directly from positions, all at rest.
    pub fn from_points(points: &[Vec2], rest_length: f32, closed: bool) -> RopeResult<Self> {
        let mut chain = Self::new(rest_length)?;
        chain.segments = points.iter().copied().map(Segment::new).collect();
        chain.closed = closed;
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a drawn point.
    ///
    /// The first point is taken as-is. Afterwards points closer than
    /// `rest_length` to the last segment are skipped, and longer gaps are
    /// filled with evenly spaced segments along the stroke direction.
    /// Returns the number of segments added.
    pub fn append_point(&mut self, point: Vec2) -> usize {
        let Some(last) = self.segments.last() else {
            self.segments.push(Segment::new(point));
            return 1;
        };
        let last_pos = last.position;
        let distance = last_pos.distance(point);
        if distance < self.rest_length {
            return 0;
        }

        let count = (distance / self.rest_length).floor() as usize;
        let direction = (point - last_pos) / distance;
        for i in 1..=count {
            let p = last_pos + direction * (self.rest_length * i as f32);
            self.segments.push(Segment::new(p));
        }
        count
    }

    /// Close the loop, bridging the gap back to the first segment with
    /// evenly spaced segments.
    pub fn close(&mut self) {
        if let Some(first) = self.segments.first() {
            let first_pos = first.position;
            self.append_point(first_pos);
            // The bridge may land exactly on the first point.
            if self.segments.len() > 1 {
                let last = self.segments[self.segments.len() - 1].position;
                if last.distance(first_pos) < self.rest_length * 0.5 {
                    self.segments.pop();
                }
            }
        }
        self.closed = true;
    }

    /// Current positions, in order.
    pub fn positions(&self) -> Vec<Vec2> {
        self.segments.iter().map(|s| s.position).collect()
    }

    /// Raw segment memory as `[x, y, prev_x, prev_y]` per segment.
    pub fn positions_f32(&self) -> &[f32] {
        bytemuck::cast_slice(&self.segments)
    }

    /// Mean segment position.
    pub fn centroid(&self) -> Vec2 {
        if self.segments.is_empty() {
            return Vec2::ZERO;
        }
        self.segments.iter().map(|s| s.position).sum::<Vec2>() / self.segments.len() as f32
    }

    /// Number of neighbour pairs: `len - 1` when open, `len` when closed.
    pub fn edge_count(&self) -> usize {
        match self.segments.len() {
            0 | 1 => 0,
            2 => 1,
            n if self.closed => n,
            n => n - 1,
        }
    }

    /// Index pair of the `edge`-th neighbour pair.
    #[inline]
    pub fn edge(&self, edge: usize) -> (usize, usize) {
        (edge, (edge + 1) % self.segments.len())
    }

    /// Sum of distances over all neighbour pairs.
    pub fn total_length(&self) -> f32 {
        (0..self.edge_count())
            .map(|e| {
                let (a, b) = self.edge(e);
                self.segments[a].position.distance(self.segments[b].position)
            })
            .sum()
    }

    /// Mean distance over all neighbour pairs, `0.0` without edges.
    pub fn average_distance(&self) -> f32 {
        let edges = self.edge_count();
        if edges == 0 {
            return 0.0;
        }
        self.total_length() / edges as f32
    }

    /// Insert a segment at `index`, at rest at `position`.
    pub fn insert(&mut self, index: usize, position: Vec2) {
        self.segments.insert(index, Segment::new(position));
    }

    pub fn remove(&mut self, index: usize) -> Segment {
        self.segments.remove(index)
    }

    /// Display copy of the positions with `passes` rounds of neighbour
    /// averaging applied to interior points. The chain is untouched.
    pub fn smoothed_positions(&self, passes: usize) -> Vec<Vec2> {
        let mut points = self.positions();
        if points.len() <= 2 {
            return points;
        }
        for _ in 0..passes {
            for i in 1..points.len() - 1 {
                let mid = (points[i - 1] + points[i + 1]) * 0.5;
                points[i] = points[i].lerp(mid, 0.5);
            }
        }
        points
    }
}
