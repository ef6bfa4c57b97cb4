//! Progress estimation from worker output.
//!
//! The worker emits free text, not progress events, so the default source
//! counts a step for every line containing a marker substring. This is a
//! heuristic: a line that mentions the marker for another reason counts,
//! and a step the worker never logs is missed. Workers that report
//! structured step events can switch to [`StepSource::EventFeed`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use runwatch_core::LogLine;
use tracing::trace;

use crate::publisher::StatusPublisher;

/// Marker substring that browser agents print once per step.
pub const DEFAULT_STEP_MARKER: &str = "Step";

/// Where step-completion evidence comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSource {
    /// Count one step per log line whose message contains `marker`
    /// (case-sensitive). An empty marker matches nothing.
    MarkerScan { marker: String },
    /// Use the step numbers the worker reports; log text is ignored.
    EventFeed,
}

impl StepSource {
    pub fn marker(marker: impl Into<String>) -> Self {
        Self::MarkerScan {
            marker: marker.into(),
        }
    }
}

impl Default for StepSource {
    fn default() -> Self {
        Self::marker(DEFAULT_STEP_MARKER)
    }
}

/// Per-run step counter feeding a [`StatusPublisher`].
pub struct StepEstimator {
    source: StepSource,
    max_steps: u32,
    count: AtomicU32,
    publisher: Arc<StatusPublisher>,
}

impl StepEstimator {
    pub fn new(source: StepSource, max_steps: u32, publisher: Arc<StatusPublisher>) -> Self {
        Self {
            source,
            max_steps,
            count: AtomicU32::new(0),
            publisher,
        }
    }

    /// Evaluate one log line. Returns the new step count if the line counted.
    pub fn observe(&self, line: &LogLine) -> Option<u32> {
        let StepSource::MarkerScan { marker } = &self.source else {
            return None;
        };
        if marker.is_empty() || !line.message.contains(marker.as_str()) {
            return None;
        }

        let max = self.max_steps;
        let previous = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some(c.saturating_add(1).min(max))
            })
            .unwrap_or_else(|c| c);
        let step = previous.saturating_add(1).min(max);

        trace!(seq = line.seq, step, "Step marker matched");
        self.publisher.set_running(step, max);
        Some(step)
    }

    /// Apply a structured step event. Ignored by the marker-scan source.
    pub fn observe_event(&self, step: u32) -> Option<u32> {
        if self.source != StepSource::EventFeed {
            return None;
        }
        let step = step.min(self.max_steps);
        let current = self.count.fetch_max(step, Ordering::AcqRel).max(step);

        trace!(step = current, "Step event applied");
        self.publisher.set_running(current, self.max_steps);
        Some(current)
    }

    pub fn current(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn source(&self) -> &StepSource {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runwatch_core::{LogLevel, RunId};

    fn setup(source: StepSource, max_steps: u32) -> (StepEstimator, Arc<StatusPublisher>) {
        let publisher = Arc::new(StatusPublisher::new());
        publisher.begin(RunId::generate(), max_steps);
        (
            StepEstimator::new(source, max_steps, publisher.clone()),
            publisher,
        )
    }

    fn line(seq: u64, message: &str) -> LogLine {
        LogLine::new(seq, LogLevel::Info, message)
    }

    #[test]
    fn test_marker_lines_advance_by_one() {
        let (estimator, publisher) = setup(StepSource::default(), 5);

        assert_eq!(estimator.observe(&line(1, "📍 Step 1")), Some(1));
        assert_eq!(estimator.observe(&line(2, "🛠️  Action 1/1: click")), None);
        assert_eq!(estimator.observe(&line(3, "📍 Step 2")), Some(2));

        assert_eq!(estimator.current(), 2);
        assert_eq!(publisher.snapshot().current_step, 2);
    }

    #[test]
    fn test_clamped_to_max_steps() {
        let (estimator, publisher) = setup(StepSource::default(), 2);
        for seq in 0..5 {
            estimator.observe(&line(seq, "Step"));
        }
        assert_eq!(estimator.current(), 2);
        assert_eq!(publisher.snapshot().current_step, 2);
    }

    #[test]
    fn test_repeated_text_counts_each_time() {
        let (estimator, _publisher) = setup(StepSource::default(), 10);
        estimator.observe(&line(1, "Step 3 retried"));
        estimator.observe(&line(2, "Step 3 retried"));
        assert_eq!(estimator.current(), 2);
    }

    #[test]
    fn test_heuristic_false_positive_and_negative() {
        let (estimator, _publisher) = setup(StepSource::default(), 10);

        // Mentions the marker without being a step.
        estimator.observe(&line(1, "Stepping back to previous page"));
        // A step logged without the marker is missed; matching is case-sensitive.
        estimator.observe(&line(2, "step 2 done"));

        assert_eq!(estimator.current(), 1);
    }

    #[test]
    fn test_custom_marker() {
        let (estimator, _publisher) = setup(StepSource::marker("📍"), 10);
        assert_eq!(estimator.observe(&line(1, "Step 1")), None);
        assert_eq!(estimator.observe(&line(2, "📍 Step 1")), Some(1));
    }

    #[test]
    fn test_empty_marker_matches_nothing() {
        let (estimator, publisher) = setup(StepSource::marker(""), 10);
        assert_eq!(estimator.observe(&line(1, "📍 Step 1")), None);
        assert_eq!(estimator.observe(&line(2, "anything")), None);
        assert_eq!(publisher.snapshot().current_step, 0);
    }

    #[test]
    fn test_event_feed_ignores_text() {
        let (estimator, publisher) = setup(StepSource::EventFeed, 5);

        assert_eq!(estimator.observe(&line(1, "📍 Step 1")), None);
        assert_eq!(estimator.observe_event(3), Some(3));
        assert_eq!(estimator.observe_event(2), Some(3));
        assert_eq!(estimator.observe_event(40), Some(5));
        assert_eq!(publisher.snapshot().current_step, 5);
    }

    #[test]
    fn test_marker_scan_ignores_events() {
        let (estimator, _publisher) = setup(StepSource::default(), 5);
        assert_eq!(estimator.observe_event(4), None);
        assert_eq!(estimator.current(), 0);
    }
}
