//! Live run monitor for runwatch.
//!
//! Launches one long-lived worker run at a time, captures the worker's
//! log emissions into a bounded store, estimates progress from them and
//! publishes a status snapshot that display layers can poll or subscribe to.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use runwatch_core::Task;
//! use runwatch_monitor::{CommandWorker, RunnerConfig, TaskRunner};
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = Arc::new(CommandWorker::new("python").with_arg("agent.py"));
//!     let runner = TaskRunner::new(worker, RunnerConfig::default());
//!
//!     runner.start(Task::new("Check the Reddit front page title", 25)?)?;
//!     runner.wait().await;
//!
//!     println!("{}", runner.session().status().snapshot());
//!     Ok(())
//! }
//! ```

mod artifact;
mod command;
mod config;
mod error;
mod interceptor;
mod log_store;
mod publisher;
mod runner;
mod session;
mod step;
mod worker;

pub use artifact::ArtifactLoader;
pub use command::CommandWorker;
pub use config::RunnerConfig;
pub use error::{MonitorError, WorkerError};
pub use interceptor::LogInterceptor;
pub use log_store::{LogStore, DEFAULT_LOG_CAPACITY};
pub use publisher::StatusPublisher;
pub use runner::TaskRunner;
pub use session::RunSession;
pub use step::{StepEstimator, StepSource, DEFAULT_STEP_MARKER};
pub use worker::{LogEmitter, LogObserver, Registration, Worker};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the guard if a previous holder panicked.
///
/// Every value guarded in this crate stays valid across a partial update.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
