//! Bounded entry queue shared by producers and the sender thread.
//!
//! One `parking_lot::Mutex` guards the queued entries, the pending partial
//! line, and the in-flight and closed flags. Two condition variables hang off
//! it: `wake` rouses the sender thread when work arrives or the queue
//! closes, and `idle` releases flush waiters once the queue is empty and no
//! drained batch is still being delivered.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::log_entry::LogEntry;

/// Default number of entries held before new arrivals are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Result of offering an entry to the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted,
    /// The queue was full; the new entry was discarded.
    Full,
    /// The queue no longer accepts entries.
    Closed,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<LogEntry>,
    pending_line: Option<String>,
    in_flight: bool,
    closed: bool,
}

pub struct EntryQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    wake: Condvar,
    idle: Condvar,
}

impl EntryQueue {
    /// Create a queue holding at most `capacity` entries.
    ///
    /// A zero capacity is clamped to one; configuration validation rejects
    /// zero before a sink is built.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(QueueState {
                entries: VecDeque::with_capacity(capacity),
                ..QueueState::default()
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn push_locked(&self, state: &mut MutexGuard<'_, QueueState>, entry: LogEntry) -> PushOutcome {
        if state.closed {
            return PushOutcome::Closed;
        }
        if state.entries.len() >= self.capacity {
            return PushOutcome::Full;
        }
        state.entries.push_back(entry);
        self.wake.notify_one();
        PushOutcome::Accepted
    }

    /// Append `entry` unless the queue is full or closed.
    ///
    /// When full, the newest arrival is the one discarded; entries already
    /// queued are never evicted.
    pub fn push(&self, entry: LogEntry) -> PushOutcome {
        let mut state = self.state.lock();
        self.push_locked(&mut state, entry)
    }

    /// Append `text` to the pending partial line, creating it if absent.
    ///
    /// Ignored once the queue is closed.
    pub fn push_line_fragment(&self, text: &str) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state
            .pending_line
            .get_or_insert_with(String::new)
            .push_str(text);
    }

    /// Complete a line and enqueue it as one entry.
    ///
    /// Any pending partial line is prefixed to `text` and cleared; `make`
    /// turns the combined message into an entry. Taking the pending line and
    /// pushing the entry happen under a single lock acquisition.
    pub fn complete_line(&self, text: &str, make: impl FnOnce(String) -> LogEntry) -> PushOutcome {
        let mut state = self.state.lock();
        let message = match state.pending_line.take() {
            Some(mut line) => {
                line.push_str(text);
                line
            }
            None => text.to_owned(),
        };
        self.push_locked(&mut state, make(message))
    }

    /// Remove and return every queued entry, oldest first.
    ///
    /// A non-empty batch is marked in flight until
    /// [`finish_batch`](Self::finish_batch) is called.
    pub fn drain_all(&self) -> Vec<LogEntry> {
        let mut state = self.state.lock();
        let batch: Vec<LogEntry> = state.entries.drain(..).collect();
        if !batch.is_empty() {
            state.in_flight = true;
        }
        batch
    }

    /// Mark the drained batch as settled, waking flush waiters if idle.
    pub fn finish_batch(&self) {
        let mut state = self.state.lock();
        state.in_flight = false;
        if state.entries.is_empty() {
            self.idle.notify_all();
        }
    }

    /// Block until work is queued, the queue closes, or `timeout` elapses.
    ///
    /// Returns `true` when woken with work pending or on close.
    pub fn wait_for_work(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if !state.entries.is_empty() || state.closed {
            return true;
        }
        let _ = self.wake.wait_for(&mut state, timeout);
        !state.entries.is_empty() || state.closed
    }

    /// Block until the queue is empty with nothing in flight.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.entries.is_empty() && !state.in_flight {
                return true;
            }
            if self.idle.wait_until(&mut state, deadline).timed_out() {
                return state.entries.is_empty() && !state.in_flight;
            }
        }
    }

    /// Stop accepting entries, keeping queued ones for a final drain.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.pending_line = None;
        self.wake.notify_all();
    }

    /// Stop accepting entries and discard everything still queued.
    ///
    /// Returns the number of entries discarded.
    pub fn close_and_discard(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        state.pending_line = None;
        let discarded = state.entries.len();
        state.entries.clear();
        self.wake.notify_all();
        if !state.in_flight {
            self.idle.notify_all();
        }
        discarded
    }

    #[cfg(test)]
    pub(crate) fn pending_line(&self) -> Option<String> {
        self.state.lock().pending_line.clone()
    }
}

impl Default for EntryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
