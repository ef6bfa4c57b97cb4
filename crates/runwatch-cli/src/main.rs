//! runwatch - run a browser agent task and follow its progress.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use runwatch_core::{RunState, Task};
use runwatch_monitor::{ArtifactLoader, CommandWorker, TaskRunner};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the run itself
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let viewport = cli.viewport()?;
    let config = cli.runner_config(viewport);

    if cli.clear_history && ArtifactLoader::clear(&config.artifact_path).await? {
        info!(path = %config.artifact_path.display(), "Cleared previous run history");
    }

    let Some(description) = cli.task.clone() else {
        if cli.clear_history {
            return Ok(ExitCode::SUCCESS);
        }
        return Err("no task given".into());
    };
    let Some((program, args)) = cli.worker.split_first() else {
        return Err("no agent command given (pass it after `--`)".into());
    };

    let worker = CommandWorker::new(program.clone())
        .with_args(args.iter().cloned())
        .with_viewport(viewport)
        .with_headless(cli.headless)
        .with_step_events(cli.structured_steps);
    let runner = TaskRunner::new(Arc::new(worker), config);

    let session = runner.session();
    let logs = session.logs().subscribe();
    let status = session.status().subscribe();

    let task = Task::new(description, cli.max_steps)?;
    let description = task.description().to_string();
    let run_id = runner.start(task)?;
    println!("[task]   {} (run {})", description, run_id.short());

    let final_status = render::follow(&runner, logs, status).await;
    runner.wait().await;
    render::print_artifact(&session);

    Ok(match final_status.state {
        RunState::Completed => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
