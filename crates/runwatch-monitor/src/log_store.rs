//! Bounded buffer of captured worker log lines.

use std::collections::VecDeque;
use std::sync::Mutex;

use runwatch_core::{LogLevel, LogLine};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::lock;

/// Maximum lines kept per run.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Broadcast channel capacity for live subscribers.
const BROADCAST_CAPACITY: usize = 256;

struct StoreInner {
    lines: VecDeque<LogLine>,
    next_seq: u64,
}

/// FIFO buffer holding the most recent `capacity` log lines.
///
/// Appends are atomic from a reader's point of view: `lines()` returns
/// either the buffer before or after a given append, never a mix.
pub struct LogStore {
    capacity: usize,
    inner: Mutex<StoreInner>,
    tx: broadcast::Sender<LogLine>,
}

impl LogStore {
    /// Create a store. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            capacity,
            inner: Mutex::new(StoreInner {
                lines: VecDeque::with_capacity(capacity),
                next_seq: 1,
            }),
            tx,
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub fn append(&self, level: LogLevel, message: impl Into<String>) -> LogLine {
        let line = {
            let mut inner = lock(&self.inner);
            let line = LogLine::new(inner.next_seq, level, message);
            inner.next_seq += 1;
            if inner.lines.len() >= self.capacity {
                inner.lines.pop_front();
            }
            inner.lines.push_back(line.clone());
            line
        };

        // Send to real-time subscribers
        let _ = self.tx.send(line.clone());
        line
    }

    /// Copy of the buffered lines, oldest first.
    pub fn lines(&self) -> Vec<LogLine> {
        lock(&self.inner).lines.iter().cloned().collect()
    }

    /// Last `n` buffered lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LogLine> {
        let inner = lock(&self.inner);
        let skip = inner.lines.len().saturating_sub(n);
        inner.lines.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all buffered lines. Sequence numbers keep counting up.
    pub fn clear(&self) {
        lock(&self.inner).lines.clear();
    }

    /// Receive every line appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogLine> {
        self.tx.subscribe()
    }

    /// [`LogStore::subscribe`] as a `Stream`.
    pub fn stream(&self) -> BroadcastStream<LogLine> {
        BroadcastStream::new(self.subscribe())
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
