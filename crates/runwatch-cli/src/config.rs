//! Command line configuration.

use std::path::PathBuf;

use clap::Parser;
use runwatch_core::{CoreError, Viewport};
use runwatch_monitor::{RunnerConfig, StepSource, DEFAULT_LOG_CAPACITY, DEFAULT_STEP_MARKER};

/// runwatch - run a browser agent task and follow its progress
#[derive(Debug, Parser)]
#[command(name = "runwatch")]
#[command(about = "Run a browser agent task and follow its progress", long_about = None)]
pub struct Cli {
    /// Task for the agent to perform
    pub task: Option<String>,

    /// Maximum number of steps the agent can take
    #[arg(long, default_value = "25", value_parser = clap::value_parser!(u32).range(5..=50))]
    pub max_steps: u32,

    /// Browser viewport width in pixels
    #[arg(long, default_value = "1280")]
    pub viewport_width: u32,

    /// Browser viewport height in pixels
    #[arg(long, default_value = "720")]
    pub viewport_height: u32,

    /// Run the browser without a visible window
    #[arg(long)]
    pub headless: bool,

    /// Path the agent writes its run history animation to
    #[arg(long, default_value = "agent_history.gif")]
    pub artifact: PathBuf,

    /// Log lines kept while the task runs
    #[arg(long, default_value_t = DEFAULT_LOG_CAPACITY)]
    pub log_capacity: usize,

    /// Substring marking a progress step in the agent's log
    #[arg(
        long,
        default_value = DEFAULT_STEP_MARKER,
        value_parser = parse_step_marker,
        conflicts_with = "structured_steps"
    )]
    pub step_marker: String,

    /// Count steps from `STEP <n>` lines instead of scanning log text
    #[arg(long)]
    pub structured_steps: bool,

    /// Delete the previous run's artifact before doing anything else
    #[arg(long)]
    pub clear_history: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Agent command and its arguments
    #[arg(last = true)]
    pub worker: Vec<String>,
}

fn parse_step_marker(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("step marker must not be empty".to_string());
    }
    Ok(value.to_string())
}

impl Cli {
    pub fn viewport(&self) -> Result<Viewport, CoreError> {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn step_source(&self) -> StepSource {
        if self.structured_steps {
            StepSource::EventFeed
        } else {
            StepSource::marker(self.step_marker.clone())
        }
    }

    pub fn runner_config(&self, viewport: Viewport) -> RunnerConfig {
        RunnerConfig::default()
            .with_log_capacity(self.log_capacity)
            .with_step_source(self.step_source())
            .with_artifact_path(self.artifact.clone())
            .with_viewport(viewport)
    }
}
