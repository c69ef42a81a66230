use glam::Vec2;

use crate::error::{non_negative, RopeError, RopeResult};
use crate::obstacle::Layers;

/// Solver parameters. Read-only during a step; may change between steps.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub gravity: Vec2,
    /// Velocity retained per step, in (0, 1].
    pub damping: f32,
    /// Radius of the collision probe around each segment.
    pub collision_radius: f32,
    /// Scale applied to the reflected velocity on contact.
    pub bounce_factor: f32,
    /// Fraction of tangential velocity removed on contact. Zero disables friction.
    pub friction: f32,
    /// Extra velocity multiplier on contact.
    pub collision_damping: f32,
    /// Contact velocity multiplier while the rope is shrinking.
    pub shrink_collision_damping: f32,
    /// Extra push-out distance beyond the penetration depth.
    pub collision_buffer: f32,
    /// Push-out buffer while the rope is shrinking.
    pub shrink_collision_buffer: f32,
    /// Pull toward the chain centroid. Zero disables it.
    pub centripetal_force: f32,
    /// Reserved for an alternative tension model; suppresses the centripetal force.
    pub geometric_tension: bool,
    pub pin_first_point: bool,
    pub obstacle_mask: Layers,
    pub player_mask: Layers,
    pub player_proximity_radius: f32,
    pub constraint_runs: u32,
    pub constraint_runs_high: u32,
    pub collision_check_frequency: u32,
    pub collision_check_frequency_high: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::ZERO,
            damping: 0.98,
            collision_radius: 0.125,
            bounce_factor: 0.5,
            friction: 0.1,
            collision_damping: 0.9,
            shrink_collision_damping: 0.7,
            collision_buffer: 0.005,
            shrink_collision_buffer: 0.02,
            centripetal_force: 0.0,
            geometric_tension: false,
            pin_first_point: false,
            obstacle_mask: Layers::GROUND | Layers::OBSTACLE,
            player_mask: Layers::PLAYER,
            player_proximity_radius: 5.0,
            constraint_runs: 30,
            constraint_runs_high: 60,
            collision_check_frequency: 2,
            collision_check_frequency_high: 1,
        }
    }
}

impl PhysicsConfig {
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_collision_radius(mut self, radius: f32) -> Self {
        self.collision_radius = radius;
        self
    }

    pub fn with_pin_first_point(mut self, pin: bool) -> Self {
        self.pin_first_point = pin;
        self
    }

    /// Set base and high constraint runs.
    pub fn with_constraint_runs(mut self, base: u32, high: u32) -> Self {
        self.constraint_runs = base;
        self.constraint_runs_high = high;
        self
    }

    /// Set base and high collision check frequencies.
    pub fn with_collision_frequency(mut self, base: u32, high: u32) -> Self {
        self.collision_check_frequency = base;
        self.collision_check_frequency_high = high;
        self
    }

    pub fn validate(&self) -> RopeResult<()> {
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(RopeError::InvalidDamping(self.damping));
        }
        if self.constraint_runs == 0 || self.constraint_runs_high == 0 {
            return Err(RopeError::InvalidIterations);
        }
        if self.collision_check_frequency == 0 || self.collision_check_frequency_high == 0 {
            return Err(RopeError::InvalidCollisionFrequency);
        }
        non_negative("collision_radius", self.collision_radius)?;
        non_negative("bounce_factor", self.bounce_factor)?;
        non_negative("friction", self.friction)?;
        non_negative("collision_damping", self.collision_damping)?;
        non_negative("shrink_collision_damping", self.shrink_collision_damping)?;
        non_negative("collision_buffer", self.collision_buffer)?;
        non_negative("shrink_collision_buffer", self.shrink_collision_buffer)?;
        non_negative("player_proximity_radius", self.player_proximity_radius)?;
        Ok(())
    }
}

/// How the rope tightens once shrinking starts.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShrinkStrategy {
    /// Shorten the rest length, keep every segment.
    ReduceLength = 0,
    /// Keep the rest length, drop redundant segments.
    RemoveSegments = 1,
    /// Remove segments while the chain is long, then shorten.
    Hybrid = 2,
    /// Choose between removing and shortening from the current spacing.
    SmartShrink = 3,
    /// Interpolate toward a convex path wrapped around the enclosed obstacles.
    OptimalPath = 4,
}

impl ShrinkStrategy {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ReduceLength),
            1 => Some(Self::RemoveSegments),
            2 => Some(Self::Hybrid),
            3 => Some(Self::SmartShrink),
            4 => Some(Self::OptimalPath),
            _ => None,
        }
    }
}

/// Shrink controller parameters, fixed once the controller is initialized.
#[derive(Clone, Debug, PartialEq)]
pub struct ShrinkConfig {
    /// Rest length lost per second (and removal pace for segment removal).
    pub shrink_rate: f32,
    pub min_segment_length: f32,
    /// Seconds between initialization and the start of shrinking.
    pub shrink_delay: f32,
    pub strategy: ShrinkStrategy,
    /// Neighbours closer than this stop the shrink.
    pub min_allowable_distance: f32,
    /// Neighbour direction dot product above which a vertex counts as folded.
    pub tension_threshold: f32,
    /// Consecutive steps without length change (or without progress once the
    /// strategy is at its floor) before giving up.
    pub stuck_frame_threshold: u32,
    pub centripetal_force: f32,
    /// Distance per second a segment travels toward its path target.
    pub path_transition_speed: f32,
    /// Distance at which a segment counts as arrived on the path.
    pub path_tolerance: f32,
    /// Gap between an enclosed obstacle and the wrapped path.
    pub wrap_clearance: f32,
    /// Point budget of the wrapped path.
    pub path_resolution: usize,
    /// Obstacles considered for enclosure.
    pub enclosure_mask: Layers,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            shrink_rate: 0.01,
            min_segment_length: 0.1,
            shrink_delay: 2.0,
            strategy: ShrinkStrategy::OptimalPath,
            min_allowable_distance: 0.05,
            tension_threshold: 2.0,
            stuck_frame_threshold: 30,
            centripetal_force: 1.0,
            path_transition_speed: 2.0,
            path_tolerance: 0.05,
            wrap_clearance: 0.1,
            path_resolution: 100,
            enclosure_mask: Layers::GROUND | Layers::OBSTACLE,
        }
    }
}

impl ShrinkConfig {
    pub fn with_strategy(mut self, strategy: ShrinkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_shrink_rate(mut self, rate: f32) -> Self {
        self.shrink_rate = rate;
        self
    }

    pub fn with_min_segment_length(mut self, length: f32) -> Self {
        self.min_segment_length = length;
        self
    }

    pub fn with_shrink_delay(mut self, delay: f32) -> Self {
        self.shrink_delay = delay;
        self
    }

    pub fn with_stuck_frame_threshold(mut self, frames: u32) -> Self {
        self.stuck_frame_threshold = frames;
        self
    }

    pub fn validate(&self) -> RopeResult<()> {
        non_negative("shrink_rate", self.shrink_rate)?;
        non_negative("min_segment_length", self.min_segment_length)?;
        non_negative("shrink_delay", self.shrink_delay)?;
        non_negative("min_allowable_distance", self.min_allowable_distance)?;
        non_negative("tension_threshold", self.tension_threshold)?;
        non_negative("centripetal_force", self.centripetal_force)?;
        non_negative("path_transition_speed", self.path_transition_speed)?;
        non_negative("path_tolerance", self.path_tolerance)?;
        non_negative("wrap_clearance", self.wrap_clearance)?;
        Ok(())
    }
}

/// Stroke-to-rope conversion parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawConfig {
    /// Rest length of a freshly drawn rope.
    pub segment_length: f32,
    /// Strokes with this many segments or fewer are discarded.
    pub min_segment_count: usize,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            segment_length: 0.5,
            min_segment_count: 20,
        }
    }
}

impl DrawConfig {
    pub fn validate(&self) -> RopeResult<()> {
        if !(self.segment_length > 0.0 && self.segment_length.is_finite()) {
            return Err(RopeError::InvalidRestLength(self.segment_length));
        }
        Ok(())
    }
}
