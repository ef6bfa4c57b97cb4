//! Run state and the status snapshot handed to display layers.

use crate::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// No run has been started, or the session was just reset.
    #[default]
    Idle,
    /// The worker is executing.
    Running,
    /// The worker finished successfully.
    Completed,
    /// The worker failed or the run was cancelled.
    Failed,
}

impl RunState {
    /// Returns true if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the run is still active.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Point-in-time copy of a run's progress.
///
/// `error` is only ever set alongside [`RunState::Failed`], and
/// `current_step` never exceeds `max_steps`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: Option<RunId>,
    pub state: RunState,
    pub current_step: u32,
    pub max_steps: u32,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStatus {
    /// Fresh Running status for a run that has not made progress yet.
    pub fn running(run_id: RunId, max_steps: u32) -> Self {
        Self {
            run_id: Some(run_id),
            state: RunState::Running,
            current_step: 0,
            max_steps,
            error: None,
            started_at: Some(Utc::now()),
            finished_at: None,
        }
    }

    /// Whether a display should render this snapshot as an error entry.
    pub fn is_error(&self) -> bool {
        self.state == RunState::Failed
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            RunState::Idle => f.write_str("Idle"),
            RunState::Running => write!(
                f,
                "Task is running... (Step {}/{})",
                self.current_step, self.max_steps
            ),
            RunState::Completed => f.write_str("Task completed successfully!"),
            RunState::Failed => write!(
                f,
                "Error: {}",
                self.error.as_deref().unwrap_or("unknown failure")
            ),
        }
    }
}
