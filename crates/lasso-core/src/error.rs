//! Error types for rope construction and configuration.

use thiserror::Error;

/// Errors raised at the construction boundary. Stepping never fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RopeError {
    /// Rest length must be positive and finite.
    #[error("invalid rest length: {0} (must be positive and finite)")]
    InvalidRestLength(f32),

    /// Velocity damping must lie in (0, 1].
    #[error("invalid damping: {0} (must be in (0, 1])")]
    InvalidDamping(f32),

    /// Constraint iteration counts must be at least 1.
    #[error("constraint iteration counts must be at least 1")]
    InvalidIterations,

    /// Collision check frequencies must be at least 1.
    #[error("collision check frequencies must be at least 1")]
    InvalidCollisionFrequency,

    /// A parameter that must be non-negative was negative or NaN.
    #[error("{name} must be non-negative, got {value}")]
    NegativeParameter { name: &'static str, value: f32 },

    /// A stroke operation was issued with no stroke in progress.
    #[error("no stroke in progress")]
    StrokeNotStarted,

    /// A new stroke was started while another is still being drawn.
    #[error("a stroke is already in progress")]
    StrokeInProgress,
}

/// Result type for rope operations.
pub type RopeResult<T> = std::result::Result<T, RopeError>;

/// Reject negative or NaN values for a named parameter.
pub(crate) fn non_negative(name: &'static str, value: f32) -> RopeResult<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(RopeError::NegativeParameter { name, value })
    }
}
