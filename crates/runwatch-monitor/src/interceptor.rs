//! Bridge from a worker's emission channel into the run session.

use std::sync::{Arc, Mutex};

use runwatch_core::LogLevel;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::MonitorError;
use crate::lock;
use crate::log_store::LogStore;
use crate::step::StepEstimator;
use crate::worker::{LogObserver, Registration, Worker};

/// Observer registered on the worker. Appends, then estimates.
///
/// `live` is a child of the run's cancellation token and is also cancelled
/// on detach. An emission that reaches the sink after detach is dropped.
struct InterceptSink {
    logs: Arc<LogStore>,
    steps: Arc<StepEstimator>,
    live: CancellationToken,
}

impl LogObserver for InterceptSink {
    fn on_line(&self, level: LogLevel, message: &str) {
        if self.live.is_cancelled() {
            return;
        }
        let line = self.logs.append(level, message);
        self.steps.observe(&line);
    }

    fn on_step(&self, step: u32) {
        if self.live.is_cancelled() {
            return;
        }
        self.steps.observe_event(step);
    }
}

/// Per-run registration of the log sink on a worker.
///
/// Attach once, detach once. Once `cancel` fires or the interceptor is
/// detached the sink drops everything the worker still emits.
pub struct LogInterceptor {
    sink: Arc<InterceptSink>,
    registration: Mutex<Option<Registration>>,
}

impl LogInterceptor {
    pub fn new(
        logs: Arc<LogStore>,
        steps: Arc<StepEstimator>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sink: Arc::new(InterceptSink {
                logs,
                steps,
                live: cancel.child_token(),
            }),
            registration: Mutex::new(None),
        }
    }

    /// Register on the worker's emitter.
    ///
    /// Fails with [`MonitorError::InterceptorMisuse`] if already attached.
    pub fn attach(&self, worker: &dyn Worker) -> Result<(), MonitorError> {
        let mut registration = lock(&self.registration);
        if registration.is_some() {
            warn!("Log interceptor attached twice");
            return Err(MonitorError::InterceptorMisuse);
        }
        let sink: Arc<dyn LogObserver> = self.sink.clone();
        *registration = Some(worker.emitter().register(sink));
        debug!("Log interceptor attached");
        Ok(())
    }

    /// Unregister from the worker. Safe to call more than once.
    ///
    /// Returns true if this call removed the registration.
    pub fn detach(&self, worker: &dyn Worker) -> bool {
        let Some(registration) = lock(&self.registration).take() else {
            return false;
        };
        self.sink.live.cancel();
        let removed = worker.emitter().unregister(registration);
        debug!(removed, "Log interceptor detached");
        removed
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.registration).is_some()
    }
}
