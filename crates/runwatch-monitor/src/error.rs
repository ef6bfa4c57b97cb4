//! Error types for the run monitor.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported synchronously by monitor operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// `start` (or another run-scoped operation) while a run is active.
    #[error("A run is already in progress")]
    AlreadyRunning,

    /// `attach` on an interceptor that is already attached.
    #[error("Log interceptor is already attached to a worker")]
    InterceptorMisuse,

    /// Reading or deleting the artifact file failed.
    #[error("Artifact I/O error at '{}': {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a worker run.
///
/// These never leave the runner: they are rendered into the failed status.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Worker-reported failure with a free-text message.
    #[error("{0}")]
    Failed(String),

    /// Failed to spawn the worker process.
    #[error("Failed to spawn worker process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Worker process exited unsuccessfully.
    #[error("Worker exited with code {code}: {stderr_tail}")]
    ProcessExit { code: i32, stderr_tail: String },

    /// I/O error while talking to the worker.
    #[error("Worker I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled before the worker finished.
    #[error("Run cancelled")]
    Cancelled,

    /// The worker's task panicked.
    #[error("Worker panicked")]
    Panicked,
}

impl WorkerError {
    /// Convenience constructor for worker-reported failures.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
