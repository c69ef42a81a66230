use glam::Vec2;
use log::{info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{DrawConfig, PhysicsConfig, ShrinkConfig};
use crate::error::{RopeError, RopeResult};
use crate::obstacle::ObstacleQuery;
use crate::quality::StepStats;
use crate::segment::SegmentChain;
use crate::shrink::{ShrinkController, ShrinkState};
use crate::solver::VerletSolver;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RopeId(pub u32);

/// A closed rope: its chain plus the solver and shrink controller that own
/// it exclusively.
pub struct Rope {
    id: RopeId,
    chain: SegmentChain,
    solver: VerletSolver,
    controller: ShrinkController,
}

impl Rope {
    /// Wrap a chain with a fresh solver and an armed shrink controller.
    pub fn new<Q: ObstacleQuery + ?Sized>(
        id: RopeId,
        chain: SegmentChain,
        physics: PhysicsConfig,
        shrink: ShrinkConfig,
        obstacles: &Q,
    ) -> Self {
        let mut controller = ShrinkController::new(shrink);
        controller.initialize(&chain, obstacles);
        Self {
            id,
            chain,
            solver: VerletSolver::new(physics),
            controller,
        }
    }

    /// One fixed step: solver first, then the shrink controller.
    pub fn step<Q: ObstacleQuery + ?Sized>(&mut self, obstacles: &Q, dt: f32) -> StepStats {
        let stats = self.solver.step(&mut self.chain, obstacles, dt);
        self.controller.step(&mut self.chain, &mut self.solver, dt);
        stats
    }

    pub fn id(&self) -> RopeId {
        self.id
    }

    pub fn chain(&self) -> &SegmentChain {
        &self.chain
    }

    pub fn solver(&self) -> &VerletSolver {
        &self.solver
    }

    pub fn controller(&self) -> &ShrinkController {
        &self.controller
    }

    pub fn state(&self) -> ShrinkState {
        self.controller.state()
    }

    /// Finished ropes no longer move.
    pub fn is_static(&self) -> bool {
        !self.solver.enabled
    }
}

/// Every rope in play plus the stroke currently being drawn.
pub struct RopeWorld {
    physics: PhysicsConfig,
    shrink: ShrinkConfig,
    draw: DrawConfig,
    ropes: Vec<Rope>,
    stroke: Option<SegmentChain>,
    next_id: u32,
}

impl RopeWorld {
    pub fn new(physics: PhysicsConfig, shrink: ShrinkConfig, draw: DrawConfig) -> RopeResult<Self> {
        physics.validate()?;
        shrink.validate()?;
        draw.validate()?;
        Ok(Self {
            physics,
            shrink,
            draw,
            ropes: Vec::new(),
            stroke: None,
            next_id: 0,
        })
    }

    pub fn physics_config(&self) -> &PhysicsConfig {
        &self.physics
    }

    pub fn shrink_config(&self) -> &ShrinkConfig {
        &self.shrink
    }

    pub fn draw_config(&self) -> &DrawConfig {
        &self.draw
    }

    /// Replace the physics config of this world and every live rope.
    /// Takes effect from the next step.
    pub fn set_physics_config(&mut self, physics: PhysicsConfig) -> RopeResult<()> {
        physics.validate()?;
        for rope in &mut self.ropes {
            rope.solver.config = physics.clone();
        }
        self.physics = physics;
        Ok(())
    }

    /// Replace the shrink config used for ropes created from now on.
    pub fn set_shrink_config(&mut self, shrink: ShrinkConfig) -> RopeResult<()> {
        shrink.validate()?;
        self.shrink = shrink;
        Ok(())
    }

    pub fn set_draw_config(&mut self, draw: DrawConfig) -> RopeResult<()> {
        draw.validate()?;
        self.draw = draw;
        Ok(())
    }

    /// Start drawing a new rope at `position`.
    pub fn begin_stroke(&mut self, position: Vec2) -> RopeResult<()> {
        if self.stroke.is_some() {
            return Err(RopeError::StrokeInProgress);
        }
        let mut chain = SegmentChain::new(self.draw.segment_length)?;
        chain.append_point(position);
        self.stroke = Some(chain);
        Ok(())
    }

    /// Feed the next input position. Returns the number of segments added.
    pub fn extend_stroke(&mut self, position: Vec2) -> RopeResult<usize> {
        let chain = self.stroke.as_mut().ok_or(RopeError::StrokeNotStarted)?;
        Ok(chain.append_point(position))
    }

    /// Finish the stroke.
    ///
    /// Short strokes are discarded (`Ok(None)`); anything longer is closed
    /// into a loop and becomes a simulated rope whose shrink controller is
    /// armed against `obstacles`.
    pub fn end_stroke<Q: ObstacleQuery + ?Sized>(&mut self, obstacles: &Q) -> RopeResult<Option<RopeId>> {
        let mut chain = self.stroke.take().ok_or(RopeError::StrokeNotStarted)?;
        if chain.len() <= self.draw.min_segment_count {
            warn!(
                "stroke discarded: {} segments, need more than {}",
                chain.len(),
                self.draw.min_segment_count
            );
            return Ok(None);
        }

        chain.close();
        let id = RopeId(self.next_id);
        self.next_id += 1;
        info!("rope {:?} created with {} segments", id, chain.len());
        let rope = Rope::new(id, chain, self.physics.clone(), self.shrink.clone(), obstacles);
        self.ropes.push(rope);
        Ok(Some(id))
    }

    /// Drop the stroke in progress, if any.
    pub fn cancel_stroke(&mut self) {
        self.stroke = None;
    }

    pub fn stroke(&self) -> Option<&SegmentChain> {
        self.stroke.as_ref()
    }

    /// Discard every rope and any stroke in progress.
    pub fn reset(&mut self) {
        info!("reset: discarding {} ropes", self.ropes.len());
        self.ropes.clear();
        self.stroke = None;
    }

    pub fn remove(&mut self, id: RopeId) -> Option<Rope> {
        let index = self.ropes.iter().position(|r| r.id == id)?;
        Some(self.ropes.remove(index))
    }

    pub fn ropes(&self) -> &[Rope] {
        &self.ropes
    }

    pub fn rope(&self, id: RopeId) -> Option<&Rope> {
        self.ropes.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.ropes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ropes.is_empty()
    }

    /// Advance every rope by one fixed step. Ropes are independent, so with
    /// the `parallel` feature they are stepped concurrently.
    #[cfg(feature = "parallel")]
    pub fn step<Q: ObstacleQuery + Sync + ?Sized>(&mut self, obstacles: &Q, dt: f32) -> StepStats {
        self.ropes
            .par_iter_mut()
            .map(|rope| rope.step(obstacles, dt))
            .reduce(StepStats::default, merge_stats)
    }

    /// Advance every rope by one fixed step.
    #[cfg(not(feature = "parallel"))]
    pub fn step<Q: ObstacleQuery + ?Sized>(&mut self, obstacles: &Q, dt: f32) -> StepStats {
        self.ropes
            .iter_mut()
            .map(|rope| rope.step(obstacles, dt))
            .fold(StepStats::default(), merge_stats)
    }
}

/// Totals across ropes; the budget fields keep the largest values seen.
fn merge_stats(a: StepStats, b: StepStats) -> StepStats {
    StepStats {
        runs: a.runs.max(b.runs),
        collision_frequency: a.collision_frequency.max(b.collision_frequency),
        collision_passes: a.collision_passes + b.collision_passes,
        contacts_resolved: a.contacts_resolved + b.contacts_resolved,
        high_budget: a.high_budget || b.high_budget,
        segment_count: a.segment_count + b.segment_count,
    }
}
