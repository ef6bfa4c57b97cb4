//! Holder of the current run-status snapshot.

use chrono::Utc;
use runwatch_core::{RunId, RunState, RunStatus};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

/// Single source of truth for the current [`RunStatus`].
///
/// Backed by a `watch` channel: every update swaps in a whole snapshot, so
/// readers never see a half-written status, and subscribers are woken with
/// the latest value (intermediate values may be coalesced).
pub struct StatusPublisher {
    tx: watch::Sender<RunStatus>,
}

impl StatusPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunStatus::default());
        Self { tx }
    }

    /// Return to the idle state. Only the runner calls this, at the start of a run.
    pub fn reset(&self) {
        self.tx.send_replace(RunStatus::default());
    }

    /// Enter the running state for a new run at step zero.
    pub fn begin(&self, run_id: RunId, max_steps: u32) {
        self.tx.send_replace(RunStatus::running(run_id, max_steps));
    }

    /// Record progress while running.
    ///
    /// The step is clamped to `max_steps` and never moves backwards. Ignored
    /// unless the run is in the running state. Returns whether the snapshot
    /// changed.
    pub fn set_running(&self, step: u32, max_steps: u32) -> bool {
        self.tx.send_if_modified(|status| {
            if status.state != RunState::Running {
                return false;
            }
            let step = step.min(max_steps).max(status.current_step.min(max_steps));
            if status.current_step == step && status.max_steps == max_steps {
                return false;
            }
            status.current_step = step;
            status.max_steps = max_steps;
            true
        })
    }

    /// Transition to completed. No-op unless currently running.
    pub fn set_completed(&self) -> bool {
        self.tx.send_if_modified(|status| {
            if status.state != RunState::Running {
                return false;
            }
            status.state = RunState::Completed;
            status.finished_at = Some(Utc::now());
            true
        })
    }

    /// Transition to failed with a message. No-op unless currently running.
    pub fn set_failed(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        let changed = self.tx.send_if_modified(|status| {
            if status.state != RunState::Running {
                return false;
            }
            status.state = RunState::Failed;
            status.error = Some(message.clone());
            status.finished_at = Some(Utc::now());
            true
        });
        if !changed {
            debug!(error = %message, "Ignoring failure for a run that is not running");
        }
        changed
    }

    /// Consistent copy of the current status.
    pub fn snapshot(&self) -> RunStatus {
        self.tx.borrow().clone()
    }

    /// Receiver woken on every status change.
    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.tx.subscribe()
    }

    /// [`StatusPublisher::subscribe`] as a `Stream`, starting with the current value.
    pub fn updates(&self) -> WatchStream<RunStatus> {
        WatchStream::new(self.subscribe())
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(max_steps: u32) -> StatusPublisher {
        let publisher = StatusPublisher::new();
        publisher.begin(RunId::generate(), max_steps);
        publisher
    }

    #[test]
    fn test_starts_idle() {
        let publisher = StatusPublisher::new();
        let status = publisher.snapshot();
        assert_eq!(status.state, RunState::Idle);
        assert_eq!(status.current_step, 0);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_set_running_clamps_and_never_decreases() {
        let publisher = running(5);

        assert!(publisher.set_running(3, 5));
        assert!(!publisher.set_running(2, 5));
        assert_eq!(publisher.snapshot().current_step, 3);

        publisher.set_running(9, 5);
        assert_eq!(publisher.snapshot().current_step, 5);
    }

    #[test]
    fn test_set_running_ignored_when_idle() {
        let publisher = StatusPublisher::new();
        assert!(!publisher.set_running(1, 5));
        assert_eq!(publisher.snapshot().state, RunState::Idle);
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let publisher = running(5);
        publisher.set_running(2, 5);

        assert!(publisher.set_failed("network timeout"));
        assert!(!publisher.set_completed());
        assert!(!publisher.set_failed("second failure"));
        assert!(!publisher.set_running(4, 5));

        let status = publisher.snapshot();
        assert_eq!(status.state, RunState::Failed);
        assert_eq!(status.error.as_deref(), Some("network timeout"));
        assert_eq!(status.current_step, 2);
        assert!(status.finished_at.is_some());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let publisher = running(5);
        publisher.set_completed();
        publisher.reset();
        assert_eq!(publisher.snapshot(), RunStatus::default());
    }

    #[tokio::test]
    async fn test_subscriber_sees_final_value() {
        let publisher = running(3);
        let mut rx = publisher.subscribe();

        publisher.set_running(1, 3);
        publisher.set_running(2, 3);
        publisher.set_completed();

        rx.changed().await.unwrap();
        let status = rx.borrow_and_update().clone();
        assert_eq!(status.state, RunState::Completed);
        assert_eq!(status.current_step, 2);
    }
}
