//! runwatch Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Async runtimes
//! - The worker process
//! - Filesystem access
//!
//! Everything here is a value a display layer can hold on to without
//! keeping a run alive.

pub mod artifact;
pub mod error;
pub mod ids;
pub mod log;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use artifact::{Artifact, Viewport};
pub use error::CoreError;
pub use ids::{RunId, TaskId};
pub use log::{LogLevel, LogLine};
pub use status::{RunState, RunStatus};
pub use task::Task;
