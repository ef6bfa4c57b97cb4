//! Task type.

use crate::{CoreError, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Task is one instruction handed to the worker.
///
/// Immutable once constructed; the runner takes it by value for the
/// duration of a single run and drops it when the run finalizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    description: String,
    max_steps: u32,
    created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new Task.
    ///
    /// The description must contain non-whitespace text and `max_steps`
    /// must be positive.
    pub fn new(description: impl Into<String>, max_steps: u32) -> Result<Self, CoreError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(CoreError::EmptyDescription);
        }
        if max_steps == 0 {
            return Err(CoreError::InvalidMaxSteps(max_steps));
        }
        Ok(Self {
            id: TaskId::generate(),
            description,
            max_steps,
            created_at: Utc::now(),
        })
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task() {
        let task = Task::new("Go to amazon.com and search for laptop", 25).unwrap();
        assert_eq!(task.max_steps(), 25);
        assert_eq!(task.description(), "Go to amazon.com and search for laptop");
        assert!(task.created_at() <= Utc::now());
    }

    #[test]
    fn test_rejects_blank_description() {
        assert!(matches!(
            Task::new("   \n", 5),
            Err(CoreError::EmptyDescription)
        ));
    }

    #[test]
    fn test_rejects_zero_max_steps() {
        assert!(matches!(
            Task::new("open 3 tabs", 0),
            Err(CoreError::InvalidMaxSteps(0))
        ));
    }

    #[test]
    fn test_serializes_for_worker() {
        let task = Task::new("find the NASA image of the day", 10)
            .unwrap()
            .with_id(TaskId::new("t-1"));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], "t-1");
        assert_eq!(json["max_steps"], 10);
    }
}
