//! Worker collaborator contract.
//!
//! A worker is the external agent that actually performs a task. The
//! monitor only needs two things from it: an async `run` that completes or
//! fails, and an emission channel it writes log lines to while running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use runwatch_core::{LogLevel, Task};
use tracing::trace;

use crate::error::WorkerError;
use crate::lock;

/// Observer callbacks invoked for every worker emission.
///
/// Called on the worker's own execution path, so implementations must
/// return quickly and must not block on anything the worker holds.
pub trait LogObserver: Send + Sync {
    /// Called for each free-text log line.
    fn on_line(&self, level: LogLevel, message: &str);

    /// Called when the worker reports a structured step event.
    fn on_step(&self, _step: u32) {}
}

/// Token returned by [`LogEmitter::register`]; hand it back to unregister.
#[derive(Debug, PartialEq, Eq)]
pub struct Registration(u64);

/// Fan-out point for a worker's log emissions.
///
/// The observer list is copied out under a short lock and the observers are
/// invoked after the lock is released, so an observer may register or
/// unregister without deadlocking the emitting worker.
#[derive(Default)]
pub struct LogEmitter {
    observers: Mutex<Vec<(u64, Arc<dyn LogObserver>)>>,
    next_id: AtomicU64,
}

impl LogEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer.
    pub fn register(&self, observer: Arc<dyn LogObserver>) -> Registration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.observers).push((id, observer));
        trace!(registration = id, "Log observer registered");
        Registration(id)
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unregister(&self, registration: Registration) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(id, _)| *id != registration.0);
        trace!(registration = registration.0, "Log observer unregistered");
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }

    /// Emit a log line to every registered observer.
    pub fn emit(&self, level: LogLevel, message: &str) {
        for observer in self.snapshot() {
            observer.on_line(level, message);
        }
    }

    /// Emit a structured step event to every registered observer.
    pub fn emit_step(&self, step: u32) {
        for observer in self.snapshot() {
            observer.on_step(step);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn LogObserver>> {
        lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

/// The external agent executed by [`crate::TaskRunner`].
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Emission channel the worker writes its log lines to.
    fn emitter(&self) -> &LogEmitter;

    /// Perform the task. Log output goes through [`Worker::emitter`].
    async fn run(&self, task: &Task) -> Result<(), WorkerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
        steps: Mutex<Vec<u32>>,
    }

    impl LogObserver for Recorder {
        fn on_line(&self, level: LogLevel, message: &str) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{}: {}", level, message));
        }

        fn on_step(&self, step: u32) {
            self.steps.lock().unwrap().push(step);
        }
    }

    #[test]
    fn test_emit_reaches_registered_observers() {
        let emitter = LogEmitter::new();
        let recorder = Arc::new(Recorder::default());
        let registration = emitter.register(recorder.clone());

        emitter.emit(LogLevel::Info, "📍 Step 1");
        emitter.emit_step(1);

        assert_eq!(*recorder.lines.lock().unwrap(), vec!["INFO: 📍 Step 1"]);
        assert_eq!(*recorder.steps.lock().unwrap(), vec![1]);

        assert!(emitter.unregister(registration));
        emitter.emit(LogLevel::Info, "after");
        assert_eq!(recorder.lines.lock().unwrap().len(), 1);
        assert_eq!(emitter.observer_count(), 0);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let emitter = LogEmitter::new();
        let recorder = Arc::new(Recorder::default());
        let _kept = emitter.register(recorder);
        assert!(!emitter.unregister(Registration(42)));
        assert_eq!(emitter.observer_count(), 1);
    }

    struct SelfRemoving {
        emitter: Arc<LogEmitter>,
        registration: Mutex<Option<Registration>>,
    }

    impl LogObserver for SelfRemoving {
        fn on_line(&self, _level: LogLevel, _message: &str) {
            if let Some(registration) = self.registration.lock().unwrap().take() {
                self.emitter.unregister(registration);
            }
        }
    }

    #[test]
    fn test_observer_can_unregister_during_emit() {
        let emitter = Arc::new(LogEmitter::new());
        let observer = Arc::new(SelfRemoving {
            emitter: emitter.clone(),
            registration: Mutex::new(None),
        });
        let registration = emitter.register(observer.clone());
        *observer.registration.lock().unwrap() = Some(registration);

        emitter.emit(LogLevel::Warn, "remove me");
        assert_eq!(emitter.observer_count(), 0);
    }
}
