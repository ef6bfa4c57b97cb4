//! Runner configuration.

use std::path::PathBuf;

use runwatch_core::Viewport;

use crate::artifact::DEFAULT_CONTENT_TYPE;
use crate::log_store::DEFAULT_LOG_CAPACITY;
use crate::step::StepSource;

/// Default location browser agents write their run history animation to.
pub const DEFAULT_ARTIFACT_PATH: &str = "agent_history.gif";

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Log lines kept per run.
    pub log_capacity: usize,

    /// How progress steps are detected.
    pub step_source: StepSource,

    /// Where the worker writes its artifact on success.
    pub artifact_path: PathBuf,

    /// Content type declared for the artifact.
    pub artifact_content_type: String,

    /// Display dimensions declared for the artifact.
    pub viewport: Viewport,
}

impl RunnerConfig {
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn with_step_source(mut self, source: StepSource) -> Self {
        self.step_source = source;
        self
    }

    pub fn with_artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = path.into();
        self
    }

    pub fn with_artifact_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.artifact_content_type = content_type.into();
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            step_source: StepSource::default(),
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            artifact_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            viewport: Viewport::default(),
        }
    }
}
