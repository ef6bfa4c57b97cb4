//! Lifecycle of a single worker run.
//!
//! `Idle -> Running -> {Completed, Failed}`; a terminal run stays visible
//! until the next `start` resets the session. Only one run is active per
//! runner; a second `start` while running is rejected, never queued.

use std::sync::{Arc, Mutex};

use runwatch_core::{RunId, Task};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::artifact::ArtifactLoader;
use crate::config::RunnerConfig;
use crate::error::{MonitorError, WorkerError};
use crate::interceptor::LogInterceptor;
use crate::lock;
use crate::session::RunSession;
use crate::step::StepEstimator;
use crate::worker::Worker;

struct ActiveRun {
    run_id: RunId,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

/// Drives one worker run at a time and keeps its [`RunSession`] current.
pub struct TaskRunner {
    worker: Arc<dyn Worker>,
    config: RunnerConfig,
    loader: ArtifactLoader,
    session: Arc<RunSession>,
    active: Mutex<Option<ActiveRun>>,
}

impl TaskRunner {
    pub fn new(worker: Arc<dyn Worker>, config: RunnerConfig) -> Self {
        let loader = ArtifactLoader::new(config.artifact_content_type.clone(), config.viewport);
        let session = Arc::new(RunSession::new(config.log_capacity));
        Self {
            worker,
            config,
            loader,
            session,
            active: Mutex::new(None),
        }
    }

    /// Handle for display layers.
    pub fn session(&self) -> Arc<RunSession> {
        Arc::clone(&self.session)
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Id of the current or most recent run.
    pub fn current_run(&self) -> Option<RunId> {
        lock(&self.active).as_ref().map(|run| run.run_id.clone())
    }

    /// Start running `task` in the background.
    ///
    /// Returns as soon as the worker has been launched. Fails with
    /// [`MonitorError::AlreadyRunning`] without touching the active run's
    /// state if a run is in progress.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, task: Task) -> Result<RunId, MonitorError> {
        let mut active = lock(&self.active);
        if self.session.status().snapshot().state.is_active() {
            warn!("Rejecting start: a run is already in progress");
            return Err(MonitorError::AlreadyRunning);
        }

        let run_id = RunId::generate();
        let max_steps = task.max_steps();
        self.session.reset();

        let steps = Arc::new(StepEstimator::new(
            self.config.step_source.clone(),
            max_steps,
            Arc::clone(self.session.status()),
        ));
        let cancel = CancellationToken::new();
        let interceptor = LogInterceptor::new(
            Arc::clone(self.session.logs()),
            steps,
            cancel.clone(),
        );
        interceptor.attach(self.worker.as_ref())?;
        self.session.status().begin(run_id.clone(), max_steps);

        info!(
            run_id = %run_id,
            task_id = %task.id(),
            max_steps,
            description_len = task.description().len(),
            "Starting run"
        );

        let driver = tokio::spawn(drive_run(RunContext {
            run_id: run_id.clone(),
            worker: Arc::clone(&self.worker),
            session: Arc::clone(&self.session),
            loader: self.loader.clone(),
            config: self.config.clone(),
            interceptor,
            cancel: cancel.clone(),
            task,
        }));

        *active = Some(ActiveRun {
            run_id: run_id.clone(),
            cancel,
            driver: Some(driver),
        });
        Ok(run_id)
    }

    /// Stop forwarding updates from the current run and mark it failed.
    ///
    /// Best-effort: the worker's future is dropped, but a worker that does
    /// its own work outside of it may keep going. Returns false if no run
    /// was active.
    pub fn cancel(&self) -> bool {
        let active = lock(&self.active);
        match active.as_ref() {
            Some(run) if self.session.status().snapshot().state.is_active() => {
                info!(run_id = %run.run_id, "Cancelling run");
                run.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait until the current run has been finalized.
    ///
    /// Returns immediately if there is nothing to wait for. The run's
    /// outcome is read from the session status, never from here.
    pub async fn wait(&self) {
        let driver = lock(&self.active)
            .as_mut()
            .and_then(|run| run.driver.take());
        if let Some(driver) = driver {
            if let Err(e) = driver.await {
                error!(error = %e, "Run driver task failed");
            }
        }
    }

    /// Delete the artifact file and forget the loaded artifact.
    pub async fn clear_artifact(&self) -> Result<bool, MonitorError> {
        if self.session.status().snapshot().state.is_active() {
            return Err(MonitorError::AlreadyRunning);
        }
        let removed = ArtifactLoader::clear(&self.config.artifact_path).await?;
        self.session.set_artifact(None);
        Ok(removed)
    }
}

/// Everything the background driver owns for one run.
struct RunContext {
    run_id: RunId,
    worker: Arc<dyn Worker>,
    session: Arc<RunSession>,
    loader: ArtifactLoader,
    config: RunnerConfig,
    interceptor: LogInterceptor,
    cancel: CancellationToken,
    task: Task,
}

async fn drive_run(ctx: RunContext) {
    let RunContext {
        run_id,
        worker,
        session,
        loader,
        config,
        interceptor,
        cancel,
        task,
    } = ctx;

    // The task moves into the worker's own tokio task and is dropped with it.
    let worker_task = {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move { worker.run(&task).await })
    };
    let abort = worker_task.abort_handle();

    let outcome = tokio::select! {
        joined = worker_task => match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(WorkerError::Panicked),
            Err(_) => Err(WorkerError::Cancelled),
        },
        _ = cancel.cancelled() => {
            abort.abort();
            Err(WorkerError::Cancelled)
        }
    };

    interceptor.detach(worker.as_ref());

    match outcome {
        Ok(()) => {
            let artifact = match loader.load(&config.artifact_path).await {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!(run_id = %run_id, error = %e, "Failed to load artifact");
                    None
                }
            };
            let artifact_len = artifact.as_ref().map(|a| a.len());
            session.set_artifact(artifact);
            session.status().set_completed();
            info!(
                run_id = %run_id,
                steps = session.status().snapshot().current_step,
                artifact_len = ?artifact_len,
                "Run completed"
            );
        }
        Err(e) => {
            let message = e.to_string();
            warn!(run_id = %run_id, error = %message, "Run failed");
            session.status().set_failed(message);
        }
    }
}
