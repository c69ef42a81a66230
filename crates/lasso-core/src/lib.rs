//! Shrinking lasso ropes for 2D games.
//!
//! A player draws a closed loop; the loop becomes a Verlet rope that contracts
//! onto whatever obstacles it encloses. [`rope::RopeWorld`] owns the drawing
//! session and every live rope; obstacles are supplied through
//! [`obstacle::ObstacleQuery`], with [`obstacle::ObstacleField`] as the
//! built-in implementation.

pub mod config;
pub mod constraints;
pub mod enclosure;
pub mod error;
pub mod grid;
pub mod hull;
pub mod math;
pub mod obstacle;
pub mod quality;
pub mod rope;
pub mod segment;
pub mod shrink;
pub mod solver;

pub use config::{DrawConfig, PhysicsConfig, ShrinkConfig, ShrinkStrategy};
pub use error::{RopeError, RopeResult};
pub use obstacle::{Layers, Obstacle, ObstacleField, ObstacleInfo, ObstacleQuery, ObstacleRef, Shape};
pub use quality::StepStats;
pub use rope::{Rope, RopeId, RopeWorld};
pub use segment::{Segment, SegmentChain};
pub use shrink::{ShrinkController, ShrinkState, StopReason};
pub use solver::VerletSolver;
