//! Shared handle to one runner's live state.

use std::sync::{Arc, Mutex};

use runwatch_core::Artifact;

use crate::lock;
use crate::log_store::LogStore;
use crate::publisher::StatusPublisher;

/// Everything a display layer reads while a run progresses.
///
/// Owned by one [`crate::TaskRunner`] and shared by `Arc`; it is cleared at
/// the start of every run rather than replaced, so a display can hold the
/// same handle across runs.
pub struct RunSession {
    logs: Arc<LogStore>,
    status: Arc<StatusPublisher>,
    artifact: Mutex<Option<Arc<Artifact>>>,
}

impl RunSession {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            logs: Arc::new(LogStore::new(log_capacity)),
            status: Arc::new(StatusPublisher::new()),
            artifact: Mutex::new(None),
        }
    }

    pub fn logs(&self) -> &Arc<LogStore> {
        &self.logs
    }

    pub fn status(&self) -> &Arc<StatusPublisher> {
        &self.status
    }

    /// Artifact of the last successful run, if it produced one.
    pub fn artifact(&self) -> Option<Arc<Artifact>> {
        lock(&self.artifact).clone()
    }

    pub(crate) fn set_artifact(&self, artifact: Option<Artifact>) {
        *lock(&self.artifact) = artifact.map(Arc::new);
    }

    /// Discard the previous run's logs, status and artifact.
    pub(crate) fn reset(&self) {
        self.logs.clear();
        self.status.reset();
        self.set_artifact(None);
    }
}
