use glam::Vec2;

use crate::config::PhysicsConfig;
use crate::constraints::contact::{handle_collisions, ContactParams};
use crate::constraints::distance::apply_constraints;
use crate::obstacle::{ObstacleQuery, ObstacleRef};
use crate::quality::{IterationBudget, StepStats};
use crate::segment::SegmentChain;

/// Verlet integrator and constraint solver for one rope.
///
/// The chain itself is not stored here; it is passed in by `&mut` each step
/// so the shrink controller can edit the same buffer between steps.
pub struct VerletSolver {
    pub config: PhysicsConfig,
    /// Runtime centripetal pull, overridden by the shrink controller.
    pub centripetal_force: f32,
    /// Runtime pin flag, cleared when shrinking starts.
    pub pin_first_point: bool,
    /// Set while the shrink controller is tightening the rope.
    pub shrinking: bool,
    /// A disabled solver leaves the chain static.
    pub enabled: bool,
    probe_hits: Vec<ObstacleRef>,
}

impl VerletSolver {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            centripetal_force: config.centripetal_force,
            pin_first_point: config.pin_first_point,
            shrinking: false,
            enabled: true,
            config,
            probe_hits: Vec::new(),
        }
    }

    /// Advance the chain by one fixed step: integrate, then relax constraints
    /// and resolve collisions on the schedule of the selected budget.
    pub fn step<Q: ObstacleQuery + ?Sized>(
        &mut self,
        chain: &mut SegmentChain,
        obstacles: &Q,
        dt: f32,
    ) -> StepStats {
        if !self.enabled || chain.is_empty() {
            return StepStats::default();
        }

        self.simulate(chain, dt);

        let player_nearby = self.player_nearby(chain, obstacles);
        let budget = IterationBudget::select(
            (self.config.constraint_runs, self.config.collision_check_frequency),
            (
                self.config.constraint_runs_high,
                self.config.collision_check_frequency_high,
            ),
            player_nearby,
            self.shrinking,
        );
        let contact = self.contact_params();

        let mut stats = StepStats {
            runs: budget.runs,
            collision_frequency: budget.collision_frequency,
            high_budget: player_nearby,
            segment_count: chain.len() as u32,
            ..StepStats::default()
        };
        for run in 0..budget.runs {
            apply_constraints(chain, self.pin_first_point);
            if budget.checks_collisions(run) {
                stats.contacts_resolved += handle_collisions(chain, obstacles, &contact);
                stats.collision_passes += 1;
            }
        }
        stats
    }

    /// Verlet integration of every segment.
    ///
    /// `velocity = (position - previous) * damping`, then
    /// `position += velocity + force * dt` where force is gravity plus, when
    /// active, a pull of magnitude `centripetal_force` toward the centroid.
    pub fn simulate(&self, chain: &mut SegmentChain, dt: f32) {
        let centripetal = if self.config.geometric_tension {
            0.0
        } else {
            self.centripetal_force
        };
        let center = if centripetal != 0.0 {
            chain.centroid()
        } else {
            Vec2::ZERO
        };
        let gravity = self.config.gravity;
        let damping = self.config.damping;

        for segment in chain.segments.iter_mut() {
            let velocity = (segment.position - segment.previous_position) * damping;
            let mut force = gravity;
            if centripetal != 0.0 {
                force += (center - segment.position).normalize_or_zero() * centripetal;
            }
            segment.previous_position = segment.position;
            segment.position += velocity + force * dt;
        }
    }

    /// One relaxation pass with the current pin setting.
    pub fn apply_constraints(&self, chain: &mut SegmentChain) {
        apply_constraints(chain, self.pin_first_point);
    }

    /// One collision pass with the current shrink-dependent parameters.
    pub fn handle_collisions<Q: ObstacleQuery + ?Sized>(
        &self,
        chain: &mut SegmentChain,
        obstacles: &Q,
    ) -> u32 {
        handle_collisions(chain, obstacles, &self.contact_params())
    }

    fn contact_params(&self) -> ContactParams {
        let c = &self.config;
        let (damping, buffer) = if self.shrinking {
            (c.shrink_collision_damping, c.shrink_collision_buffer)
        } else {
            (c.collision_damping, c.collision_buffer)
        };
        ContactParams {
            radius: c.collision_radius,
            mask: c.obstacle_mask,
            bounce: c.bounce_factor,
            damping,
            friction: c.friction,
            buffer,
        }
    }

    /// Whether any player-tagged obstacle is within the proximity radius of
    /// the first segment.
    fn player_nearby<Q: ObstacleQuery + ?Sized>(&mut self, chain: &SegmentChain, obstacles: &Q) -> bool {
        let Some(first) = chain.segments.first() else {
            return false;
        };
        if self.config.player_mask.is_empty() {
            return false;
        }
        self.probe_hits.clear();
        obstacles.query_circle(
            first.position,
            self.config.player_proximity_radius,
            self.config.player_mask,
            &mut self.probe_hits,
        );
        !self.probe_hits.is_empty()
    }
}
