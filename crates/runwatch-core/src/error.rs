//! Core domain errors.

use thiserror::Error;

/// Core domain errors for runwatch.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Task description was empty.
    #[error("Task description must not be empty")]
    EmptyDescription,

    /// Max steps must be a positive integer.
    #[error("Max steps must be at least 1, got {0}")]
    InvalidMaxSteps(u32),

    /// Viewport dimension outside the accepted range.
    #[error("Invalid viewport {dimension}: {value} (allowed {min}..={max})")]
    InvalidViewport {
        dimension: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}
